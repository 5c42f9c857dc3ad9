//! Core types for the CAN frame codec library
//!
//! This module defines the error type shared by every component, the raw frame
//! record handed over by a bus transport, and the decoded records the runtime
//! emits. The codec is stateless apart from its cached layouts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::identifier::{AddressingMode, Identifier};

/// Timestamp type used throughout the codec
pub type Timestamp = DateTime<Utc>;

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, CodecError>;

/// Raw signal value as carried through pack/unpack
pub type RawValue = i64;

/// Raw CAN frame as supplied by a bus transport
#[derive(Debug, Clone, PartialEq)]
pub struct CanFrame {
    /// Timestamp in nanoseconds since epoch
    pub timestamp_ns: u64,
    /// CAN channel number (e.g., 0, 1, 2...)
    pub channel: u8,
    /// Arbitration id (11-bit or 29-bit, bit 31 never set here)
    pub can_id: u32,
    /// Frame data bytes (0-8 bytes)
    pub data: Vec<u8>,
    /// True if this is an extended (29-bit) CAN ID
    pub is_extended: bool,
}

impl CanFrame {
    /// Build an extended frame from a composed J1939 identifier
    pub fn extended(identifier: &Identifier, data: Vec<u8>) -> Result<Self> {
        Ok(Self {
            timestamp_ns: 0,
            channel: 0,
            can_id: identifier.compose()?,
            data,
            is_extended: true,
        })
    }

    /// Build a frame from a raw wire arbitration id.
    ///
    /// Bit 31 is the extended-frame-format flag and is moved into
    /// `is_extended`.
    pub fn from_wire(raw_id: u32, data: Vec<u8>) -> Self {
        Self {
            timestamp_ns: 0,
            channel: 0,
            can_id: raw_id & !crate::identifier::EFF_FLAG,
            data,
            is_extended: raw_id & crate::identifier::EFF_FLAG != 0,
        }
    }

    /// Builder method: set the capture timestamp
    pub fn with_timestamp_ns(mut self, timestamp_ns: u64) -> Self {
        self.timestamp_ns = timestamp_ns;
        self
    }

    /// Builder method: set the channel
    pub fn with_channel(mut self, channel: u8) -> Self {
        self.channel = channel;
        self
    }

    /// Convert timestamp from nanoseconds to DateTime<Utc>
    pub fn timestamp(&self) -> Timestamp {
        let secs = (self.timestamp_ns / 1_000_000_000) as i64;
        let nsecs = (self.timestamp_ns % 1_000_000_000) as u32;
        DateTime::from_timestamp(secs, nsecs).unwrap_or_default()
    }

    /// Get the data length code (DLC) - number of data bytes
    pub fn dlc(&self) -> usize {
        self.data.len()
    }

    /// Decompose the arbitration id as a J1939 identifier (extended frames only)
    pub fn identifier(&self) -> Option<Result<Identifier>> {
        self.is_extended.then(|| Identifier::decompose(self.can_id))
    }
}

/// Errors that can occur while modelling identifiers or coding payloads
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("Identifier 0x{raw:08X} does not fit in 29 bits")]
    FormatError { raw: u32 },

    #[error("{accessor} is not available for {mode} identifiers")]
    WrongAddressingModeError {
        accessor: &'static str,
        mode: AddressingMode,
    },

    #[error("Signal '{signal}' starts at bit {start_bit} but bits up to {expected_next_bit} are already claimed by '{previous}'")]
    OverlapError {
        signal: String,
        previous: String,
        start_bit: u16,
        expected_next_bit: u32,
    },

    #[error("Length mismatch: expected {expected_bits} bits, got {actual_bits}")]
    LengthMismatchError {
        expected_bits: usize,
        actual_bits: usize,
    },

    #[error("Value {value} does not fit field '{field}' ({width} bits, {signedness})")]
    ValueRangeError {
        field: String,
        value: i128,
        width: u32,
        signedness: &'static str,
    },

    #[error("Frame '{frame}' declares {described_bits} bits but only holds {frame_bits}")]
    OverflowError {
        frame: String,
        described_bits: u32,
        frame_bits: u32,
    },

    #[error("Invalid signal definition: {0}")]
    InvalidSignalDefinition(String),

    #[error("Signal not found: {0}")]
    SignalNotFound(String),

    #[error("No value supplied for signal '{0}'")]
    MissingValue(String),

    #[error("Frame not found: {0}")]
    FrameNotFound(String),
}

/// Result of resolving a raw value through a signal's value table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResolvedValue {
    /// Symbolic label from the value table
    Label(String),
    /// No table entry matched, raw number kept
    Raw(RawValue),
}

impl fmt::Display for ResolvedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedValue::Label(label) => write!(f, "{}", label),
            ResolvedValue::Raw(raw) => write!(f, "{}", raw),
        }
    }
}

/// A decoded signal with its display decorations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedSignal {
    /// Signal name from the schema
    pub name: String,
    /// Raw decoded value (unsigned or sign-extended)
    pub raw_value: RawValue,
    /// Engineering unit (e.g., "km/h", "°C", "V")
    pub unit: Option<String>,
    /// Label from the value table, if the raw value has one
    pub value_description: Option<String>,
}

impl DecodedSignal {
    /// Label if present, otherwise the raw number
    pub fn resolved(&self) -> ResolvedValue {
        match &self.value_description {
            Some(label) => ResolvedValue::Label(label.clone()),
            None => ResolvedValue::Raw(self.raw_value),
        }
    }
}

/// A fully decoded frame: identifier plus signals
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFrame {
    /// Absolute timestamp of the frame
    pub timestamp: Timestamp,
    /// CAN channel number
    pub channel: u8,
    /// Arbitration id as received
    pub can_id: u32,
    /// J1939 view of the id (extended frames only)
    pub identifier: Option<Identifier>,
    /// Frame name from the schema
    pub frame_name: String,
    /// All decoded signals, in layout order
    pub signals: Vec<DecodedSignal>,
}

impl DecodedFrame {
    /// Find a decoded signal by name
    pub fn signal(&self, name: &str) -> Option<&DecodedSignal> {
        self.signals.iter().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_from_wire_strips_eff_flag() {
        let frame = CanFrame::from_wire(0x8CFF_C2F6, vec![0; 8]);
        assert!(frame.is_extended);
        assert_eq!(frame.can_id, 0x0CFF_C2F6);
        assert_eq!(frame.dlc(), 8);

        let id = frame.identifier().unwrap().unwrap();
        assert_eq!(id.source_address, 0xF6);
    }

    #[test]
    fn test_standard_frame_has_no_identifier() {
        let frame = CanFrame::from_wire(0x123, vec![1, 2]);
        assert!(!frame.is_extended);
        assert!(frame.identifier().is_none());
    }

    #[test]
    fn test_frame_timestamp() {
        let frame = CanFrame::from_wire(0x123, vec![]).with_timestamp_ns(1_500_000_000);
        assert_eq!(frame.timestamp().timestamp(), 1);
        assert_eq!(frame.timestamp().timestamp_subsec_millis(), 500);
    }

    #[test]
    fn test_resolved_value_display() {
        assert_eq!(ResolvedValue::Label("On".into()).to_string(), "On");
        assert_eq!(ResolvedValue::Raw(-3).to_string(), "-3");
    }

    #[test]
    fn test_error_messages() {
        let err = CodecError::FormatError { raw: 0x7FFF_FFFF };
        assert_eq!(err.to_string(), "Identifier 0x7FFFFFFF does not fit in 29 bits");

        let err = CodecError::LengthMismatchError {
            expected_bits: 64,
            actual_bits: 56,
        };
        assert_eq!(err.to_string(), "Length mismatch: expected 64 bits, got 56");
    }
}
