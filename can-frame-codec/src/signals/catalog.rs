//! Frame catalog
//!
//! Collects frame runtimes from one or more schema sources into a single
//! registry that can be queried by PGN or by frame name, and routes incoming
//! frames to the runtime that knows how to decode them.

use std::collections::HashMap;

use crate::config::CodecConfig;
use crate::runtime::FrameRuntime;
use crate::signals::schema::FrameSchema;
use crate::types::{CanFrame, CodecError, DecodedFrame, Result};

/// Registry of frame runtimes keyed by PGN
#[derive(Debug, Default)]
pub struct FrameCatalog {
    /// All runtimes in insertion order
    frames: Vec<FrameRuntime>,

    /// Key: PGN, Value: index into `frames`
    pgn_lookup: HashMap<u32, usize>,

    /// Key: frame name, Value: index into `frames`
    name_lookup: HashMap<String, usize>,

    /// Configuration applied to every runtime created here
    config: CodecConfig,
}

impl FrameCatalog {
    /// Create an empty catalog with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty catalog whose runtimes use `config`
    pub fn with_config(config: CodecConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Register a frame schema under a PGN
    ///
    /// A later schema with the same PGN or name replaces the earlier one.
    /// If the PGN and the name belong to two different frames, both go.
    pub fn add_frame(&mut self, pgn: u32, schema: FrameSchema) {
        let name = schema.name().to_string();
        let runtime = FrameRuntime::with_config(schema, self.config.clone());

        let mut stale: Vec<usize> = [self.pgn_lookup.get(&pgn), self.name_lookup.get(&name)]
            .into_iter()
            .flatten()
            .copied()
            .collect();
        stale.sort_unstable();
        stale.dedup();

        if !stale.is_empty() {
            log::warn!("Frame '{}' (PGN 0x{:05X}) replaces an earlier definition", name, pgn);
        }
        for index in stale.into_iter().rev() {
            self.remove_slot(index);
        }

        self.frames.push(runtime);
        let index = self.frames.len() - 1;
        self.pgn_lookup.insert(pgn, index);
        self.name_lookup.insert(name, index);
    }

    /// Drop one runtime together with every key pointing at it
    fn remove_slot(&mut self, index: usize) {
        self.frames.remove(index);
        self.pgn_lookup.retain(|_, i| *i != index);
        self.name_lookup.retain(|_, i| *i != index);
        for i in self
            .pgn_lookup
            .values_mut()
            .chain(self.name_lookup.values_mut())
        {
            if *i > index {
                *i -= 1;
            }
        }
    }

    /// Get the runtime registered for a PGN
    pub fn get_by_pgn(&self, pgn: u32) -> Option<&FrameRuntime> {
        self.pgn_lookup.get(&pgn).map(|index| &self.frames[*index])
    }

    /// Get the runtime registered under a frame name
    pub fn get_by_name(&self, name: &str) -> Option<&FrameRuntime> {
        self.name_lookup.get(name).map(|index| &self.frames[*index])
    }

    /// Decode an extended frame by routing on its PGN
    pub fn decode(&self, frame: &CanFrame) -> Result<DecodedFrame> {
        let identifier = frame
            .identifier()
            .ok_or_else(|| {
                CodecError::FrameNotFound(format!("standard CAN ID 0x{:03X}", frame.can_id))
            })??;

        let pgn = identifier.pgn();
        let runtime = self
            .get_by_pgn(pgn)
            .ok_or_else(|| CodecError::FrameNotFound(format!("PGN 0x{:05X}", pgn)))?;

        runtime.decode_frame(frame)
    }

    /// Get all registered PGNs, sorted
    pub fn pgns(&self) -> Vec<u32> {
        let mut pgns: Vec<u32> = self.pgn_lookup.keys().copied().collect();
        pgns.sort_unstable();
        pgns
    }

    /// Get catalog statistics
    pub fn stats(&self) -> CatalogStats {
        CatalogStats {
            num_frames: self.frames.len(),
            num_signals: self.frames.iter().map(|f| f.schema().signals().len()).sum(),
        }
    }
}

/// Catalog statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogStats {
    /// Total number of frame definitions
    pub num_frames: usize,
    /// Total number of signal definitions
    pub num_signals: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::Identifier;
    use crate::signals::schema::SignalDef;

    fn ccvs() -> FrameSchema {
        FrameSchema::new(
            "CCVS",
            8,
            vec![
                SignalDef::new("ParkingBrake", 1, 2),
                SignalDef::new("WheelSpeed", 9, 16).with_unit("km/h"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = FrameCatalog::new();
        let stats = catalog.stats();
        assert_eq!(stats.num_frames, 0);
        assert_eq!(stats.num_signals, 0);
    }

    #[test]
    fn test_add_and_lookup() {
        let mut catalog = FrameCatalog::new();
        catalog.add_frame(0xFEF1, ccvs());

        assert_eq!(catalog.stats().num_signals, 2);
        assert_eq!(catalog.get_by_pgn(0xFEF1).unwrap().name(), "CCVS");
        assert!(catalog.get_by_name("CCVS").is_some());
        assert_eq!(catalog.pgns(), vec![0xFEF1]);
    }

    #[test]
    fn test_replace_same_pgn() {
        let mut catalog = FrameCatalog::new();
        catalog.add_frame(0xFEF1, ccvs());
        catalog.add_frame(
            0xFEF1,
            FrameSchema::new("CCVS_v2", 8, vec![SignalDef::new("X", 1, 8)]).unwrap(),
        );

        assert_eq!(catalog.stats().num_frames, 1);
        assert!(catalog.get_by_name("CCVS").is_none());
        assert_eq!(catalog.get_by_pgn(0xFEF1).unwrap().name(), "CCVS_v2");
    }

    #[test]
    fn test_replace_name_and_pgn_of_different_frames() {
        let named = |name: &str| FrameSchema::new(name, 8, vec![SignalDef::new("X", 1, 8)]).unwrap();

        let mut catalog = FrameCatalog::new();
        catalog.add_frame(0xFEF1, named("X"));
        catalog.add_frame(0xFEEE, named("Y"));
        catalog.add_frame(0xFEE5, named("Z"));
        catalog.add_frame(0xFEEE, named("X"));

        assert_eq!(catalog.stats().num_frames, 2);
        assert_eq!(catalog.pgns(), vec![0xFEE5, 0xFEEE]);
        assert!(catalog.get_by_pgn(0xFEF1).is_none());
        assert!(catalog.get_by_name("Y").is_none());
        assert_eq!(catalog.get_by_pgn(0xFEEE).unwrap().name(), "X");
        assert_eq!(catalog.get_by_name("X").unwrap().name(), "X");
        assert_eq!(catalog.get_by_name("Z").unwrap().name(), "Z");
        assert_eq!(catalog.get_by_pgn(0xFEE5).unwrap().name(), "Z");
    }

    #[test]
    fn test_decode_routes_by_pgn() {
        let mut catalog = FrameCatalog::new();
        catalog.add_frame(0xFEF1, ccvs());

        let id = Identifier::from_pgn(6, 0xFEF1, 0x17).unwrap();
        let frame = CanFrame::extended(&id, vec![0x40, 0x12, 0x34, 0, 0, 0, 0, 0]).unwrap();
        let decoded = catalog.decode(&frame).unwrap();

        assert_eq!(decoded.frame_name, "CCVS");
        assert_eq!(decoded.signal("ParkingBrake").unwrap().raw_value, 1);
        assert_eq!(decoded.signal("WheelSpeed").unwrap().raw_value, 0x1234);
    }

    #[test]
    fn test_decode_unknown_frames() {
        let catalog = FrameCatalog::new();

        let standard = CanFrame::from_wire(0x123, vec![0; 8]);
        assert!(matches!(catalog.decode(&standard), Err(CodecError::FrameNotFound(_))));

        let id = Identifier::from_pgn(6, 0xFEF1, 0x17).unwrap();
        let extended = CanFrame::extended(&id, vec![0; 8]).unwrap();
        assert_eq!(
            catalog.decode(&extended),
            Err(CodecError::FrameNotFound("PGN 0x0FEF1".to_string()))
        );
    }
}
