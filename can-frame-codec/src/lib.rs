//! CAN Frame Codec Library
//!
//! Translates raw CAN frames into named signal values and back, driven by a
//! per-frame schema, and models J1939 29-bit identifiers.
//!
//! # Architecture
//!
//! - [`Identifier`] splits an arbitration id into its J1939 sub-fields and
//!   derives the PGN and addressing mode
//! - [`FrameSchema`] holds the ordered signal definitions of one frame
//! - [`Padder`] fills the gaps of a schema's bit layout with padding
//! - [`BitCodec`] packs and unpacks values against a padded layout
//! - [`FrameRuntime`] caches the padded layout and exposes encode/decode
//! - [`FrameCatalog`] routes incoming frames to runtimes by PGN
//!
//! The library does NOT:
//! - Talk to a CAN bus
//! - Parse schema files
//! - Persist anything
//!
//! # Example Usage
//!
//! ```
//! use can_frame_codec::{FrameRuntime, FrameSchema, Identifier, SignalDef};
//! use std::collections::HashMap;
//!
//! let schema = FrameSchema::new(
//!     "EngineData",
//!     8,
//!     vec![
//!         SignalDef::new("EngineSpeed", 1, 16).with_unit("rpm"),
//!         SignalDef::new("CoolantTemp", 17, 8).signed(),
//!     ],
//! )
//! .unwrap();
//! let runtime = FrameRuntime::new(schema);
//!
//! let values: HashMap<String, i64> =
//!     [("EngineSpeed".to_string(), 1800), ("CoolantTemp".to_string(), -5)].into();
//! let payload = runtime.encode(&values).unwrap();
//! assert_eq!(runtime.decode(&payload).unwrap(), values);
//!
//! let id = Identifier::decompose(0x0CFF_C2F6).unwrap();
//! assert_eq!(id.pgn(), 0xFFC2);
//! ```

// Public modules
pub mod bit_codec;
pub mod config;
pub mod identifier;
pub mod padder;
pub mod runtime;
pub mod signals;
pub mod types;

// Re-export main types for convenience
pub use bit_codec::{BitCodec, SignalValues};
pub use config::{CodecConfig, PaddingPolicy};
pub use identifier::{AddressingMode, Identifier, IdentifierField, EFF_FLAG, GLOBAL_ADDRESS};
pub use padder::{EntryKind, LayoutEntry, LayoutWarning, PaddedLayout, Padder};
pub use runtime::FrameRuntime;
pub use signals::{
    ByteOrder, CatalogStats, FrameCatalog, FrameSchema, SignalDef, ValueType, PADDING_NAME,
};
pub use types::{
    CanFrame, CodecError, DecodedFrame, DecodedSignal, RawValue, ResolvedValue, Result, Timestamp,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
