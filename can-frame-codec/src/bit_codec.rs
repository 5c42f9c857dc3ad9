//! Payload bit codec
//!
//! Packs and unpacks signal values against a byte buffer by walking a padded
//! layout. Each entry occupies a fixed-width run of bits; runs are
//! concatenated in layout order and the resulting bit stream is laid into
//! bytes most significant bit first.

use std::collections::HashMap;

use crate::padder::{EntryKind, LayoutEntry, PaddedLayout};
use crate::signals::{ByteOrder, FrameSchema, SignalDef, ValueType};
use crate::types::{CodecError, RawValue, Result};

/// Decoded raw values keyed by signal name
pub type SignalValues = HashMap<String, RawValue>;

/// Stateless pack/unpack over padded layouts
pub struct BitCodec;

impl BitCodec {
    /// Pack named raw values into a payload
    ///
    /// Every schema signal needs a value; padding is written as zero.
    ///
    /// # Errors
    /// * `SignalNotFound` for a value whose name is not in the schema
    /// * `MissingValue` for a schema signal without a value
    /// * `ValueRangeError` for a value that does not fit its signal
    /// * `LengthMismatchError` if the layout does not total the frame width
    /// * `InvalidSignalDefinition` if the layout was built from another schema
    pub fn pack(
        schema: &FrameSchema,
        layout: &PaddedLayout,
        values: &SignalValues,
    ) -> Result<Vec<u8>> {
        if let Some(unknown) = values
            .keys()
            .find(|name| !schema.signals().iter().any(|s| &s.name == *name))
        {
            return Err(CodecError::SignalNotFound(unknown.clone()));
        }

        let total_bits = layout.total_bits();
        if total_bits != schema.frame_bits() {
            return Err(CodecError::LengthMismatchError {
                expected_bits: schema.frame_bits() as usize,
                actual_bits: total_bits as usize,
            });
        }

        let mut data = vec![0u8; schema.frame_byte_length()];
        let mut offset = 0usize;

        for entry in layout.entries() {
            if let EntryKind::Signal(index) = entry.kind {
                let signal = Self::signal_for(schema, entry, index)?;
                let value = *values
                    .get(&signal.name)
                    .ok_or_else(|| CodecError::MissingValue(signal.name.clone()))?;
                let raw = Self::encode_raw(signal, value)?;
                Self::write_bits(&mut data, offset, entry.length_bits as usize, raw);
            }
            offset += entry.length_bits as usize;
        }

        Ok(data)
    }

    /// Unpack a payload into named raw values, omitting padding
    ///
    /// # Errors
    /// * `LengthMismatchError` if `data` is not exactly the declared frame width
    /// * `InvalidSignalDefinition` if the layout was built from another schema
    pub fn unpack(
        schema: &FrameSchema,
        layout: &PaddedLayout,
        data: &[u8],
    ) -> Result<SignalValues> {
        let frame_bits = schema.frame_bits() as usize;
        if data.len() * 8 != frame_bits {
            return Err(CodecError::LengthMismatchError {
                expected_bits: frame_bits,
                actual_bits: data.len() * 8,
            });
        }

        let mut values = SignalValues::with_capacity(schema.signals().len());
        let mut offset = 0usize;

        for entry in layout.entries() {
            let length = entry.length_bits as usize;
            if let EntryKind::Signal(index) = entry.kind {
                let signal = Self::signal_for(schema, entry, index)?;
                if offset + length > frame_bits {
                    // Only reachable with a lenient, overflowing layout
                    log::warn!(
                        "Signal '{}' ends at bit {} past the {}-bit frame '{}', skipping",
                        signal.name,
                        offset + length,
                        frame_bits,
                        schema.name()
                    );
                } else {
                    let raw = Self::read_bits(data, offset, length);
                    values.insert(signal.name.clone(), Self::decode_raw(signal, raw));
                }
            }
            offset += length;
        }

        Ok(values)
    }

    /// Decode a single layout entry from a payload
    ///
    /// Returns `None` for padding and for entries that do not fit `data`.
    pub fn extract(schema: &FrameSchema, entry: &LayoutEntry, data: &[u8]) -> Option<RawValue> {
        let EntryKind::Signal(index) = entry.kind else {
            return None;
        };
        let offset = entry.start_bit as usize - 1;
        let length = entry.length_bits as usize;
        if offset + length > data.len() * 8 {
            return None;
        }
        let signal = schema.signals().get(index)?;
        Some(Self::decode_raw(signal, Self::read_bits(data, offset, length)))
    }

    /// Resolve a layout entry against the schema it claims to describe
    fn signal_for<'a>(
        schema: &'a FrameSchema,
        entry: &LayoutEntry,
        index: usize,
    ) -> Result<&'a SignalDef> {
        match schema.signals().get(index) {
            Some(signal) if signal.length_bits as u32 == entry.length_bits => Ok(signal),
            _ => Err(CodecError::InvalidSignalDefinition(format!(
                "layout entry at bit {} ({} bits) does not match frame '{}'",
                entry.start_bit,
                entry.length_bits,
                schema.name()
            ))),
        }
    }

    /// Range-check a value and render its two's complement bit pattern
    fn encode_raw(signal: &SignalDef, value: RawValue) -> Result<u64> {
        signal.check_range(value)?;
        let length = signal.length_bits as usize;
        let raw = (value as u64) & Self::mask(length);
        Ok(match signal.byte_order {
            ByteOrder::BigEndian => raw,
            ByteOrder::LittleEndian => Self::swap_bytes(raw, length),
        })
    }

    fn decode_raw(signal: &SignalDef, raw: u64) -> RawValue {
        let length = signal.length_bits as usize;
        let raw = match signal.byte_order {
            ByteOrder::BigEndian => raw,
            ByteOrder::LittleEndian => Self::swap_bytes(raw, length),
        };
        match signal.value_type {
            ValueType::Unsigned => raw as i64,
            ValueType::Signed => Self::sign_extend(raw, length),
        }
    }

    fn mask(length: usize) -> u64 {
        if length >= 64 {
            u64::MAX
        } else {
            (1u64 << length) - 1
        }
    }

    /// Reverse the byte order of a value spanning `length / 8` bytes
    fn swap_bytes(raw: u64, length: usize) -> u64 {
        let bytes = length / 8;
        (0..bytes).fold(0u64, |swapped, i| {
            let byte = (raw >> (8 * i)) & 0xFF;
            swapped | (byte << (8 * (bytes - 1 - i)))
        })
    }

    /// Write `length` bits of `raw`, MSB first, starting at bit `offset`
    ///
    /// Offset 0 is the most significant bit of byte 0. Target bits are
    /// expected to be clear.
    fn write_bits(data: &mut [u8], offset: usize, length: usize, raw: u64) {
        for i in 0..length {
            let bit_value = (raw >> (length - 1 - i)) & 0x01;
            let bit_pos = offset + i;
            let byte_idx = bit_pos / 8;
            let bit_in_byte = 7 - (bit_pos % 8);

            if bit_value != 0 && byte_idx < data.len() {
                data[byte_idx] |= 1 << bit_in_byte;
            }
        }
    }

    /// Read `length` bits starting at bit `offset`, MSB first
    fn read_bits(data: &[u8], offset: usize, length: usize) -> u64 {
        let mut result: u64 = 0;

        for i in 0..length {
            let bit_pos = offset + i;
            let byte_idx = bit_pos / 8;
            let bit_in_byte = 7 - (bit_pos % 8); // Bit 0 = MSB, bit 7 = LSB

            if byte_idx < data.len() {
                let bit_value = (data[byte_idx] >> bit_in_byte) & 0x01;
                result |= (bit_value as u64) << (length - 1 - i);
            }
        }

        result
    }

    /// Sign-extend a value from N bits to 64 bits
    fn sign_extend(value: u64, bit_length: usize) -> i64 {
        if bit_length >= 64 {
            return value as i64;
        }

        let sign_bit = 1u64 << (bit_length - 1);
        if (value & sign_bit) != 0 {
            let mask = !0u64 << bit_length;
            (value | mask) as i64
        } else {
            value as i64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PaddingPolicy;
    use crate::padder::Padder;

    fn prepare(frame_bytes: usize, signals: Vec<SignalDef>) -> (FrameSchema, PaddedLayout) {
        let schema = FrameSchema::new("TestFrame", frame_bytes, signals).unwrap();
        let layout = Padder::default().pad(&schema).unwrap();
        (schema, layout)
    }

    fn values(pairs: &[(&str, RawValue)]) -> SignalValues {
        pairs.iter().map(|(n, v)| (n.to_string(), *v)).collect()
    }

    #[test]
    fn test_layout_from_other_schema() {
        let (_, layout) = prepare(8, vec![SignalDef::new("Speed", 1, 16)]);
        let empty = FrameSchema::new("Empty", 8, Vec::new()).unwrap();
        let narrow = FrameSchema::new("Narrow", 8, vec![SignalDef::new("Speed", 1, 8)]).unwrap();

        for schema in [&empty, &narrow] {
            assert!(matches!(
                BitCodec::unpack(schema, &layout, &[0; 8]),
                Err(CodecError::InvalidSignalDefinition(_))
            ));
            assert!(matches!(
                BitCodec::pack(schema, &layout, &values(&[("Speed", 1)])),
                Err(CodecError::InvalidSignalDefinition(_)) | Err(CodecError::SignalNotFound(_))
            ));
        }
        assert!(matches!(
            BitCodec::pack(&narrow, &layout, &values(&[("Speed", 1)])),
            Err(CodecError::InvalidSignalDefinition(_))
        ));
    }

    #[test]
    fn test_read_bits_msb_first() {
        let data = [0xAB, 0xCD];
        assert_eq!(BitCodec::read_bits(&data, 0, 8), 0xAB);
        assert_eq!(BitCodec::read_bits(&data, 4, 8), 0xBC);
        assert_eq!(BitCodec::read_bits(&data, 0, 16), 0xABCD);
        assert_eq!(BitCodec::read_bits(&data, 15, 1), 1);
    }

    #[test]
    fn test_sign_extend() {
        assert_eq!(BitCodec::sign_extend(0x7F, 8), 127);
        assert_eq!(BitCodec::sign_extend(0xFF, 8), -1);
        assert_eq!(BitCodec::sign_extend(0x8000, 16), -32768);
        assert_eq!(BitCodec::sign_extend(0b100, 3), -4);
    }

    #[test]
    fn test_pack_known_layout() {
        let (schema, layout) = prepare(
            2,
            vec![
                SignalDef::new("Nibble", 1, 4),
                SignalDef::new("Delta", 5, 4).signed(),
                SignalDef::new("Byte", 9, 8),
            ],
        );
        let data = BitCodec::pack(
            &schema,
            &layout,
            &values(&[("Nibble", 0xA), ("Delta", -1), ("Byte", 0x5C)]),
        )
        .unwrap();
        assert_eq!(data, vec![0xAF, 0x5C]);

        let decoded = BitCodec::unpack(&schema, &layout, &data).unwrap();
        assert_eq!(decoded, values(&[("Nibble", 0xA), ("Delta", -1), ("Byte", 0x5C)]));
    }

    #[test]
    fn test_padding_written_as_zero_and_omitted() {
        let (schema, layout) = prepare(2, vec![SignalDef::new("Mid", 5, 8)]);
        let data = BitCodec::pack(&schema, &layout, &values(&[("Mid", 0xFF)])).unwrap();
        assert_eq!(data, vec![0x0F, 0xF0]);

        let decoded = BitCodec::unpack(&schema, &layout, &[0xFF, 0xFF]).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded["Mid"], 0xFF);
    }

    #[test]
    fn test_little_endian_field() {
        let (schema, layout) = prepare(
            2,
            vec![SignalDef::new("Speed", 1, 16).with_byte_order(ByteOrder::LittleEndian)],
        );
        let data = BitCodec::pack(&schema, &layout, &values(&[("Speed", 0x1234)])).unwrap();
        assert_eq!(data, vec![0x34, 0x12]);
        assert_eq!(BitCodec::unpack(&schema, &layout, &data).unwrap()["Speed"], 0x1234);
    }

    #[test]
    fn test_signed_little_endian_field() {
        let (schema, layout) = prepare(
            2,
            vec![SignalDef::new("Torque", 1, 16)
                .signed()
                .with_byte_order(ByteOrder::LittleEndian)],
        );
        let data = BitCodec::pack(&schema, &layout, &values(&[("Torque", -2)])).unwrap();
        assert_eq!(data, vec![0xFE, 0xFF]);
        assert_eq!(BitCodec::unpack(&schema, &layout, &data).unwrap()["Torque"], -2);
    }

    #[test]
    fn test_full_width_signed() {
        let (schema, layout) = prepare(8, vec![SignalDef::new("Counter", 1, 64).signed()]);
        let data = BitCodec::pack(&schema, &layout, &values(&[("Counter", i64::MIN)])).unwrap();
        assert_eq!(data, vec![0x80, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(BitCodec::unpack(&schema, &layout, &data).unwrap()["Counter"], i64::MIN);
    }

    #[test]
    fn test_unpack_length_mismatch() {
        let (schema, layout) = prepare(8, vec![SignalDef::new("A", 1, 8)]);
        assert_eq!(
            BitCodec::unpack(&schema, &layout, &[0; 7]),
            Err(CodecError::LengthMismatchError {
                expected_bits: 64,
                actual_bits: 56
            })
        );
    }

    #[test]
    fn test_pack_errors() {
        let (schema, layout) = prepare(1, vec![SignalDef::new("A", 1, 4)]);

        assert_eq!(
            BitCodec::pack(&schema, &layout, &values(&[])),
            Err(CodecError::MissingValue("A".to_string()))
        );
        assert_eq!(
            BitCodec::pack(&schema, &layout, &values(&[("A", 1), ("Z", 1)])),
            Err(CodecError::SignalNotFound("Z".to_string()))
        );
        assert!(matches!(
            BitCodec::pack(&schema, &layout, &values(&[("A", 16)])),
            Err(CodecError::ValueRangeError { .. })
        ));
        assert!(matches!(
            BitCodec::pack(&schema, &layout, &values(&[("A", -1)])),
            Err(CodecError::ValueRangeError { .. })
        ));
    }

    #[test]
    fn test_pack_rejects_overflowing_layout() {
        let schema = FrameSchema::new("Wide", 1, vec![SignalDef::new("A", 1, 12)]).unwrap();
        let layout = Padder::new(PaddingPolicy::Lenient).pad(&schema).unwrap();
        assert_eq!(
            BitCodec::pack(&schema, &layout, &values(&[("A", 1)])),
            Err(CodecError::LengthMismatchError {
                expected_bits: 8,
                actual_bits: 12
            })
        );
    }

    #[test]
    fn test_unpack_overflowing_layout_decodes_what_fits() {
        let schema = FrameSchema::new(
            "Wide",
            1,
            vec![SignalDef::new("Fits", 1, 4), SignalDef::new("Spills", 5, 8)],
        )
        .unwrap();
        let layout = Padder::new(PaddingPolicy::Lenient).pad(&schema).unwrap();

        let decoded = BitCodec::unpack(&schema, &layout, &[0xA5]).unwrap();
        assert_eq!(decoded, values(&[("Fits", 0xA)]));
    }

    #[test]
    fn test_extract_single_entry() {
        let (schema, layout) = prepare(2, vec![SignalDef::new("Hi", 1, 4).signed()]);
        let entry = layout.entries()[0];
        assert_eq!(BitCodec::extract(&schema, &entry, &[0xF0, 0x00]), Some(-1));
        assert_eq!(BitCodec::extract(&schema, &layout.entries()[1], &[0, 0]), None);
    }
}
