//! Frame schema: the ordered signal definitions of one frame
//!
//! Bits are numbered from 1, bit 1 being the most significant bit of payload
//! byte 0. A schema is validated and sorted once when it is built and is
//! read-only afterwards.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::types::{CodecError, RawValue, ResolvedValue, Result};

/// Reserved name carried by synthesized padding entries
pub const PADDING_NAME: &str = "__padding__";

/// Largest classic CAN payload in bytes
pub const MAX_FRAME_BYTES: usize = 8;

/// Byte order of a signal within its span
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    /// Most significant byte first (Motorola)
    #[default]
    BigEndian,
    /// Least significant byte first (Intel); span must be whole bytes
    LittleEndian,
}

/// Value type for signal interpretation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// Two's complement integer
    Signed,
    /// Unsigned integer
    #[default]
    Unsigned,
}

impl ValueType {
    fn as_str(self) -> &'static str {
        match self {
            ValueType::Signed => "signed",
            ValueType::Unsigned => "unsigned",
        }
    }
}

/// A CAN signal definition
#[derive(Debug, Clone, PartialEq)]
pub struct SignalDef {
    /// Signal name
    pub name: String,
    /// First bit of the signal (1-based, MSB of byte 0 is bit 1)
    pub start_bit: u16,
    /// Length in bits
    pub length_bits: u16,
    /// Byte order within the span
    pub byte_order: ByteOrder,
    /// Value type (signed/unsigned)
    pub value_type: ValueType,
    /// Value table for enum-like values (raw_value -> label)
    pub value_table: Option<HashMap<RawValue, String>>,
    /// Engineering unit (e.g., "km/h", "°C", "V")
    pub unit: Option<String>,
}

impl SignalDef {
    /// Create an unsigned big-endian signal
    pub fn new(name: impl Into<String>, start_bit: u16, length_bits: u16) -> Self {
        Self {
            name: name.into(),
            start_bit,
            length_bits,
            byte_order: ByteOrder::default(),
            value_type: ValueType::default(),
            value_table: None,
            unit: None,
        }
    }

    /// Builder method: interpret the signal as two's complement
    pub fn signed(mut self) -> Self {
        self.value_type = ValueType::Signed;
        self
    }

    /// Builder method: set byte order
    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    /// Builder method: set engineering unit
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Builder method: add one value table entry
    pub fn with_value(mut self, raw: RawValue, label: impl Into<String>) -> Self {
        self.value_table
            .get_or_insert_with(HashMap::new)
            .insert(raw, label.into());
        self
    }

    /// First bit after the signal
    pub fn end_bit(&self) -> u32 {
        self.start_bit as u32 + self.length_bits as u32
    }

    pub fn is_signed(&self) -> bool {
        self.value_type == ValueType::Signed
    }

    /// Inclusive range of raw values the signal can carry
    pub fn raw_range(&self) -> (i128, i128) {
        let width = self.length_bits as u32;
        match self.value_type {
            ValueType::Signed => (-(1i128 << (width - 1)), (1i128 << (width - 1)) - 1),
            ValueType::Unsigned => (0, (1i128 << width) - 1),
        }
    }

    /// Check that a raw value fits the signal's width and signedness
    pub fn check_range(&self, value: RawValue) -> Result<()> {
        let (min, max) = self.raw_range();
        let value = value as i128;
        if value < min || value > max {
            return Err(CodecError::ValueRangeError {
                field: self.name.clone(),
                value,
                width: self.length_bits as u32,
                signedness: self.value_type.as_str(),
            });
        }
        Ok(())
    }

    /// Map a raw value through the value table, falling back to the number
    pub fn resolve(&self, raw: RawValue) -> ResolvedValue {
        match self.value_table.as_ref().and_then(|table| table.get(&raw)) {
            Some(label) => ResolvedValue::Label(label.clone()),
            None => ResolvedValue::Raw(raw),
        }
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason: String| {
            Err(CodecError::InvalidSignalDefinition(format!(
                "signal '{}': {}",
                self.name, reason
            )))
        };

        if self.name.is_empty() {
            return Err(CodecError::InvalidSignalDefinition(
                "signal name must not be empty".to_string(),
            ));
        }
        if self.name == PADDING_NAME {
            return invalid(format!("'{}' is reserved for padding", PADDING_NAME));
        }
        if self.start_bit == 0 {
            return invalid("bit numbering starts at 1".to_string());
        }
        let max_length = match self.value_type {
            ValueType::Signed => 64,
            ValueType::Unsigned => 63,
        };
        if self.length_bits == 0 || self.length_bits > max_length {
            return invalid(format!(
                "length {} outside 1..={} for {} signals",
                self.length_bits,
                max_length,
                self.value_type.as_str()
            ));
        }
        if self.byte_order == ByteOrder::LittleEndian && self.length_bits % 8 != 0 {
            return invalid(format!(
                "little-endian length {} is not a whole number of bytes",
                self.length_bits
            ));
        }
        Ok(())
    }
}

/// Ordered signal definitions for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSchema {
    name: String,
    frame_byte_length: usize,
    signals: Vec<SignalDef>,
}

impl FrameSchema {
    /// Validate the signals and sort them by start bit
    ///
    /// Overlaps are left to the padder, which reports them with both names.
    pub fn new(
        name: impl Into<String>,
        frame_byte_length: usize,
        mut signals: Vec<SignalDef>,
    ) -> Result<Self> {
        let name = name.into();
        if frame_byte_length > MAX_FRAME_BYTES {
            return Err(CodecError::InvalidSignalDefinition(format!(
                "frame '{}' is {} bytes long, at most {} allowed",
                name, frame_byte_length, MAX_FRAME_BYTES
            )));
        }

        let mut seen = HashSet::new();
        for signal in &signals {
            signal.validate()?;
            if !seen.insert(signal.name.as_str()) {
                return Err(CodecError::InvalidSignalDefinition(format!(
                    "frame '{}' defines signal '{}' twice",
                    name, signal.name
                )));
            }
        }

        signals.sort_by_key(|s| s.start_bit);

        Ok(Self {
            name,
            frame_byte_length,
            signals,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frame_byte_length(&self) -> usize {
        self.frame_byte_length
    }

    /// Declared frame width in bits
    pub fn frame_bits(&self) -> u32 {
        (self.frame_byte_length * 8) as u32
    }

    /// Signals sorted by start bit
    pub fn signals(&self) -> &[SignalDef] {
        &self.signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_sorts_signals() {
        let schema = FrameSchema::new(
            "EngineData",
            8,
            vec![
                SignalDef::new("Temp", 17, 8),
                SignalDef::new("Speed", 1, 16),
            ],
        )
        .unwrap();

        let names: Vec<_> = schema.signals().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Speed", "Temp"]);
        assert_eq!(schema.frame_bits(), 64);
    }

    #[test]
    fn test_schema_rejects_bad_definitions() {
        assert!(FrameSchema::new("F", 9, vec![]).is_err());
        assert!(FrameSchema::new("F", 8, vec![SignalDef::new("A", 0, 8)]).is_err());
        assert!(FrameSchema::new("F", 8, vec![SignalDef::new("A", 1, 0)]).is_err());
        assert!(FrameSchema::new("F", 8, vec![SignalDef::new("A", 1, 64)]).is_err());
        assert!(FrameSchema::new("F", 8, vec![SignalDef::new("A", 1, 64).signed()]).is_ok());
        assert!(FrameSchema::new("F", 8, vec![SignalDef::new(PADDING_NAME, 1, 8)]).is_err());
        assert!(FrameSchema::new(
            "F",
            8,
            vec![SignalDef::new("A", 1, 12).with_byte_order(ByteOrder::LittleEndian)]
        )
        .is_err());
        assert!(FrameSchema::new(
            "F",
            8,
            vec![SignalDef::new("A", 1, 8), SignalDef::new("A", 9, 8)]
        )
        .is_err());
    }

    #[test]
    fn test_raw_range() {
        assert_eq!(SignalDef::new("u", 1, 8).raw_range(), (0, 255));
        assert_eq!(SignalDef::new("s", 1, 8).signed().raw_range(), (-128, 127));
        assert_eq!(
            SignalDef::new("s", 1, 64).signed().raw_range(),
            (i64::MIN as i128, i64::MAX as i128)
        );
    }

    #[test]
    fn test_check_range() {
        let signal = SignalDef::new("Gear", 1, 4).signed();
        assert!(signal.check_range(-8).is_ok());
        assert!(signal.check_range(7).is_ok());
        assert_eq!(
            signal.check_range(8),
            Err(CodecError::ValueRangeError {
                field: "Gear".to_string(),
                value: 8,
                width: 4,
                signedness: "signed",
            })
        );
        assert!(SignalDef::new("Flag", 1, 1).check_range(-1).is_err());
    }

    #[test]
    fn test_resolve_value_table() {
        let signal = SignalDef::new("State", 1, 2)
            .with_value(0, "Off")
            .with_value(1, "On");
        assert_eq!(signal.resolve(1), ResolvedValue::Label("On".to_string()));
        assert_eq!(signal.resolve(3), ResolvedValue::Raw(3));
        assert_eq!(SignalDef::new("Plain", 1, 2).resolve(2), ResolvedValue::Raw(2));
    }
}
