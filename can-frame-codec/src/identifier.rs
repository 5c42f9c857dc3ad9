//! J1939 29-bit identifier model
//!
//! Splits an extended CAN arbitration id into its six J1939 sub-fields and
//! back, and derives the Parameter Group Number (PGN).
//!
//! Layout, most significant bit first:
//!
//! ```text
//!  28..26     25    24    23..16       15..8         7..0
//! priority | EDP |  DP  | PDU format | PDU specific | source address
//! ```
//!
//! Bit 31 of a 32-bit wire id is the extended-frame-format flag and never
//! belongs to the identifier.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{CodecError, Result};

/// Extended-frame-format flag carried in bit 31 of a wire arbitration id
pub const EFF_FLAG: u32 = 1 << 31;

/// Number of bits in a J1939 identifier
pub const IDENTIFIER_BITS: u32 = 29;

/// Highest PDU format value that still addresses a single destination
pub const PDU1_MAX_FORMAT: u8 = 239;

/// Destination address meaning "all nodes"
pub const GLOBAL_ADDRESS: u8 = 0xFF;

/// One of the six identifier sub-fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentifierField {
    Priority,
    ExtendedDataPage,
    DataPage,
    PduFormat,
    PduSpecific,
    SourceAddress,
}

/// Field widths, most significant field first
pub const FIELD_WIDTHS: [(IdentifierField, u32); 6] = [
    (IdentifierField::Priority, 3),
    (IdentifierField::ExtendedDataPage, 1),
    (IdentifierField::DataPage, 1),
    (IdentifierField::PduFormat, 8),
    (IdentifierField::PduSpecific, 8),
    (IdentifierField::SourceAddress, 8),
];

const fn total_width() -> u32 {
    let mut total = 0;
    let mut i = 0;
    while i < FIELD_WIDTHS.len() {
        total += FIELD_WIDTHS[i].1;
        i += 1;
    }
    total
}

const _: () = assert!(total_width() == IDENTIFIER_BITS);

impl IdentifierField {
    /// Human readable field name
    pub const fn name(self) -> &'static str {
        match self {
            IdentifierField::Priority => "priority",
            IdentifierField::ExtendedDataPage => "extended_data_page",
            IdentifierField::DataPage => "data_page",
            IdentifierField::PduFormat => "pdu_format",
            IdentifierField::PduSpecific => "pdu_specific",
            IdentifierField::SourceAddress => "source_address",
        }
    }

    /// Width in bits, from the static table
    pub const fn width(self) -> u32 {
        let mut i = 0;
        while i < FIELD_WIDTHS.len() {
            if FIELD_WIDTHS[i].0 as u8 == self as u8 {
                return FIELD_WIDTHS[i].1;
            }
            i += 1;
        }
        0
    }

    /// Bit position of the field's least significant bit
    pub const fn shift(self) -> u32 {
        let mut shift = 0;
        let mut i = FIELD_WIDTHS.len();
        while i > 0 {
            i -= 1;
            if FIELD_WIDTHS[i].0 as u8 == self as u8 {
                return shift;
            }
            shift += FIELD_WIDTHS[i].1;
        }
        shift
    }

    /// Largest value the field can hold
    pub const fn max_value(self) -> u32 {
        (1 << self.width()) - 1
    }
}

/// J1939 addressing mode, derived from the PDU format field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressingMode {
    /// PDU specific carries a destination address
    Pdu1,
    /// PDU specific carries a group extension
    Pdu2,
}

impl fmt::Display for AddressingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressingMode::Pdu1 => write!(f, "PDU1"),
            AddressingMode::Pdu2 => write!(f, "PDU2"),
        }
    }
}

/// A J1939 identifier split into its sub-fields
///
/// Fields are public so callers can assemble an identifier directly;
/// [`Identifier::compose`] rejects any field wider than its slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    pub priority: u8,
    pub extended_data_page: u8,
    pub data_page: u8,
    pub pdu_format: u8,
    pub pdu_specific: u8,
    pub source_address: u8,
}

impl Identifier {
    /// Create an identifier, checking every field against its width
    pub fn new(
        priority: u8,
        extended_data_page: u8,
        data_page: u8,
        pdu_format: u8,
        pdu_specific: u8,
        source_address: u8,
    ) -> Result<Self> {
        let id = Self {
            priority,
            extended_data_page,
            data_page,
            pdu_format,
            pdu_specific,
            source_address,
        };
        id.validate()?;
        Ok(id)
    }

    /// Create an identifier from a priority, an 18-bit PGN and a source address
    ///
    /// For a PDU1 PGN the low byte must be zero; the destination defaults to
    /// [`GLOBAL_ADDRESS`] and can be set with
    /// [`Identifier::with_destination_address`].
    pub fn from_pgn(priority: u8, pgn: u32, source_address: u8) -> Result<Self> {
        if pgn >> 18 != 0 {
            return Err(CodecError::ValueRangeError {
                field: "pgn".to_string(),
                value: pgn as i128,
                width: 18,
                signedness: "unsigned",
            });
        }

        let pdu_format = (pgn >> 8) as u8;
        let low_byte = pgn as u8;
        let pdu_specific = if pdu_format <= PDU1_MAX_FORMAT {
            if low_byte != 0 {
                return Err(CodecError::ValueRangeError {
                    field: "pgn (PDU1 low byte)".to_string(),
                    value: low_byte as i128,
                    width: 0,
                    signedness: "unsigned",
                });
            }
            GLOBAL_ADDRESS
        } else {
            low_byte
        };

        Self::new(
            priority,
            ((pgn >> 17) & 1) as u8,
            ((pgn >> 16) & 1) as u8,
            pdu_format,
            pdu_specific,
            source_address,
        )
    }

    /// Split a 32-bit wire id into its sub-fields
    ///
    /// Bit 31 is cleared first; any bit left above bit 28 is a
    /// [`CodecError::FormatError`].
    pub fn decompose(raw: u32) -> Result<Self> {
        let value = raw & !EFF_FLAG;
        if value >> IDENTIFIER_BITS != 0 {
            return Err(CodecError::FormatError { raw });
        }

        let slice = |field: IdentifierField| ((value >> field.shift()) & field.max_value()) as u8;

        Ok(Self {
            priority: slice(IdentifierField::Priority),
            extended_data_page: slice(IdentifierField::ExtendedDataPage),
            data_page: slice(IdentifierField::DataPage),
            pdu_format: slice(IdentifierField::PduFormat),
            pdu_specific: slice(IdentifierField::PduSpecific),
            source_address: slice(IdentifierField::SourceAddress),
        })
    }

    /// Reassemble the 29-bit id (bit 31 clear)
    pub fn compose(&self) -> Result<u32> {
        self.validate()?;
        Ok(FIELD_WIDTHS
            .iter()
            .fold(0u32, |raw, (field, _)| raw | (self.field(*field) << field.shift())))
    }

    /// Reassemble the id with the extended-frame-format flag set
    pub fn to_extended_raw(&self) -> Result<u32> {
        Ok(self.compose()? | EFF_FLAG)
    }

    /// Value of one sub-field
    pub fn field(&self, field: IdentifierField) -> u32 {
        let value = match field {
            IdentifierField::Priority => self.priority,
            IdentifierField::ExtendedDataPage => self.extended_data_page,
            IdentifierField::DataPage => self.data_page,
            IdentifierField::PduFormat => self.pdu_format,
            IdentifierField::PduSpecific => self.pdu_specific,
            IdentifierField::SourceAddress => self.source_address,
        };
        value as u32
    }

    fn validate(&self) -> Result<()> {
        for (field, width) in FIELD_WIDTHS {
            let value = self.field(field);
            if value > field.max_value() {
                return Err(CodecError::ValueRangeError {
                    field: field.name().to_string(),
                    value: value as i128,
                    width,
                    signedness: "unsigned",
                });
            }
        }
        Ok(())
    }

    /// Addressing mode implied by the PDU format
    pub fn addressing_mode(&self) -> AddressingMode {
        if self.pdu_format <= PDU1_MAX_FORMAT {
            AddressingMode::Pdu1
        } else {
            AddressingMode::Pdu2
        }
    }

    /// Destination address (PDU1 only)
    pub fn destination_address(&self) -> Result<u8> {
        match self.addressing_mode() {
            AddressingMode::Pdu1 => Ok(self.pdu_specific),
            mode => Err(CodecError::WrongAddressingModeError {
                accessor: "destination_address",
                mode,
            }),
        }
    }

    /// Group extension (PDU2 only)
    pub fn group_extension(&self) -> Result<u8> {
        match self.addressing_mode() {
            AddressingMode::Pdu2 => Ok(self.pdu_specific),
            mode => Err(CodecError::WrongAddressingModeError {
                accessor: "group_extension",
                mode,
            }),
        }
    }

    /// Copy of this identifier addressed to `destination` (PDU1 only)
    pub fn with_destination_address(mut self, destination: u8) -> Result<Self> {
        self.destination_address()?;
        self.pdu_specific = destination;
        Ok(self)
    }

    /// True for PDU2 frames and PDU1 frames sent to the global address
    pub fn is_broadcast(&self) -> bool {
        match self.addressing_mode() {
            AddressingMode::Pdu1 => self.pdu_specific == GLOBAL_ADDRESS,
            AddressingMode::Pdu2 => true,
        }
    }

    /// Parameter Group Number
    ///
    /// Under PDU1 the destination address is replaced by zero.
    pub fn pgn(&self) -> u32 {
        let group_extension = match self.addressing_mode() {
            AddressingMode::Pdu1 => 0,
            AddressingMode::Pdu2 => self.pdu_specific as u32,
        };
        ((self.extended_data_page as u32) << 17)
            | ((self.data_page as u32) << 16)
            | ((self.pdu_format as u32) << 8)
            | group_extension
    }

    pub fn is_proprietary_a(&self) -> bool {
        self.extended_data_page == 0 && self.data_page == 0 && self.pdu_format == 239
    }

    pub fn is_proprietary_a2(&self) -> bool {
        self.extended_data_page == 0 && self.data_page == 1 && self.pdu_format == 239
    }

    pub fn is_proprietary_b(&self) -> bool {
        self.extended_data_page == 0 && self.data_page == 0 && self.pdu_format == 255
    }

    /// ISO 15765-3 frames occupy the page with both data page bits set
    pub fn is_iso15765_3(&self) -> bool {
        self.extended_data_page == 1 && self.data_page == 1
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "prio={} pgn=0x{:05X} sa=0x{:02X}",
            self.priority,
            self.pgn(),
            self.source_address
        )?;
        if let Ok(da) = self.destination_address() {
            write!(f, " da=0x{:02X}", da)?;
        }
        Ok(())
    }
}
