//! Frame schemas and the frame catalog
//!
//! This module contains the signal/frame definitions handed over by an
//! external schema loader and the registry that groups them by PGN.

pub mod catalog;
pub mod schema;

// Re-export key types for convenience
pub use catalog::{CatalogStats, FrameCatalog};
pub use schema::{ByteOrder, FrameSchema, SignalDef, ValueType, MAX_FRAME_BYTES, PADDING_NAME};
