//! Per-frame encode/decode facility
//!
//! A `FrameRuntime` owns one frame schema, a signal name lookup table and the
//! padded layout derived from the schema. The layout is computed on first use
//! and cached; it is rebuilt only after the signal list is replaced.

use once_cell::sync::OnceCell;
use std::collections::HashMap;

use crate::bit_codec::{BitCodec, SignalValues};
use crate::config::CodecConfig;
use crate::padder::{EntryKind, PaddedLayout, Padder};
use crate::signals::{FrameSchema, SignalDef};
use crate::types::{
    CanFrame, CodecError, DecodedFrame, DecodedSignal, RawValue, ResolvedValue, Result,
};

/// Cached encode/decode for one frame schema
///
/// `FrameRuntime` is `Send + Sync`: once the layout is cached, any number of
/// threads can encode and decode through a shared reference.
#[derive(Debug)]
pub struct FrameRuntime {
    schema: FrameSchema,
    config: CodecConfig,
    /// Signal name -> index into `schema.signals()`
    signal_index: HashMap<String, usize>,
    layout: OnceCell<PaddedLayout>,
}

impl FrameRuntime {
    /// Create a runtime with the default (strict) configuration
    pub fn new(schema: FrameSchema) -> Self {
        Self::with_config(schema, CodecConfig::default())
    }

    pub fn with_config(schema: FrameSchema, config: CodecConfig) -> Self {
        let signal_index = Self::index_signals(&schema);
        Self {
            schema,
            config,
            signal_index,
            layout: OnceCell::new(),
        }
    }

    fn index_signals(schema: &FrameSchema) -> HashMap<String, usize> {
        schema
            .signals()
            .iter()
            .enumerate()
            .map(|(index, signal)| (signal.name.clone(), index))
            .collect()
    }

    pub fn schema(&self) -> &FrameSchema {
        &self.schema
    }

    pub fn name(&self) -> &str {
        self.schema.name()
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Padded layout, computed once on first use
    ///
    /// Concurrent first callers block until a single computation finishes.
    /// A failed computation is not cached.
    pub fn layout(&self) -> Result<&PaddedLayout> {
        self.layout.get_or_try_init(|| {
            log::debug!("Computing padded layout for frame '{}'", self.schema.name());
            Padder::new(self.config.padding_policy).pad(&self.schema)
        })
    }

    /// True once the layout has been computed and cached
    pub fn is_prepared(&self) -> bool {
        self.layout.get().is_some()
    }

    /// Replace the signal list, keeping the frame name and length
    ///
    /// The lookup table is rebuilt and the cached layout discarded.
    pub fn replace_signals(&mut self, signals: Vec<SignalDef>) -> Result<()> {
        let schema = FrameSchema::new(
            self.schema.name(),
            self.schema.frame_byte_length(),
            signals,
        )?;
        self.replace_schema(schema);
        Ok(())
    }

    /// Replace the whole schema and discard the cached layout
    pub fn replace_schema(&mut self, schema: FrameSchema) {
        log::debug!("Replacing schema of frame '{}'", self.schema.name());
        self.signal_index = Self::index_signals(&schema);
        self.schema = schema;
        self.layout = OnceCell::new();
    }

    /// Look up a signal definition by name
    pub fn signal(&self, name: &str) -> Option<&SignalDef> {
        self.signal_index
            .get(name)
            .and_then(|index| self.schema.signals().get(*index))
    }

    /// Pack named raw values into a payload
    pub fn encode(&self, values: &SignalValues) -> Result<Vec<u8>> {
        BitCodec::pack(&self.schema, self.layout()?, values)
    }

    /// Unpack a payload into named raw values
    pub fn decode(&self, data: &[u8]) -> Result<SignalValues> {
        BitCodec::unpack(&self.schema, self.layout()?, data)
    }

    /// Map a raw value of one signal through its value table
    pub fn resolve(&self, name: &str, raw: RawValue) -> Result<ResolvedValue> {
        self.signal(name)
            .map(|signal| signal.resolve(raw))
            .ok_or_else(|| CodecError::SignalNotFound(name.to_string()))
    }

    /// Decode a payload into per-signal records, in layout order
    pub fn decode_signals(&self, data: &[u8]) -> Result<Vec<DecodedSignal>> {
        let layout = self.layout()?;
        let mut values = BitCodec::unpack(&self.schema, layout, data)?;

        let signals = layout
            .entries()
            .iter()
            .filter_map(|entry| match entry.kind {
                EntryKind::Signal(index) => self.schema.signals().get(index),
                EntryKind::Padding => None,
            })
            .filter_map(|signal| {
                let raw_value = values.remove(&signal.name)?;
                let value_description = signal
                    .value_table
                    .as_ref()
                    .and_then(|table| table.get(&raw_value))
                    .cloned();
                Some(DecodedSignal {
                    name: signal.name.clone(),
                    raw_value,
                    unit: signal.unit.clone(),
                    value_description,
                })
            })
            .collect();

        Ok(signals)
    }

    /// Decode a raw frame, attaching the J1939 view of its identifier
    pub fn decode_frame(&self, frame: &CanFrame) -> Result<DecodedFrame> {
        log::trace!("Decoding frame '{}' (ID 0x{:X})", self.name(), frame.can_id);

        let identifier = frame.identifier().transpose()?;
        let signals = self.decode_signals(&frame.data)?;

        Ok(DecodedFrame {
            timestamp: frame.timestamp(),
            channel: frame.channel,
            can_id: frame.can_id,
            identifier,
            frame_name: self.name().to_string(),
            signals,
        })
    }
}
