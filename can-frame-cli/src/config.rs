//! Schema file loading
//!
//! The codec library never reads files; this module is the loader that turns
//! a TOML schema file into frame schemas and a frame catalog.

use anyhow::{Context, Result};
use can_frame_codec::{ByteOrder, CodecConfig, FrameCatalog, FrameSchema, SignalDef, ValueType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Top-level schema file (loaded from e.g. frames.toml)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchemaFile {
    #[serde(default)]
    pub codec: CodecConfig,
    #[serde(default)]
    pub frames: Vec<FrameConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FrameConfig {
    pub name: String,
    pub pgn: u32,
    #[serde(default = "default_length")]
    pub length: usize,
    #[serde(default)]
    pub signals: Vec<SignalConfig>,
}

fn default_length() -> usize {
    8
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignalConfig {
    pub name: String,
    pub start_bit: u16,
    pub length: u16,
    #[serde(default)]
    pub byte_order: ByteOrder,
    #[serde(default)]
    pub value_type: ValueType,
    pub unit: Option<String>,
    /// Value table; keys are raw values written as strings
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

impl SignalConfig {
    fn to_signal(&self) -> Result<SignalDef> {
        let mut signal = SignalDef::new(&self.name, self.start_bit, self.length)
            .with_byte_order(self.byte_order);
        signal.value_type = self.value_type;
        signal.unit = self.unit.clone();

        for (raw, label) in &self.values {
            let raw: i64 = raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid value table key '{}' in signal '{}'", raw, self.name))?;
            signal = signal.with_value(raw, label);
        }

        Ok(signal)
    }
}

impl FrameConfig {
    pub fn to_schema(&self) -> Result<FrameSchema> {
        let signals = self
            .signals
            .iter()
            .map(SignalConfig::to_signal)
            .collect::<Result<Vec<_>>>()?;

        FrameSchema::new(&self.name, self.length, signals)
            .with_context(|| format!("Invalid frame '{}'", self.name))
    }
}

impl SchemaFile {
    /// Build a catalog holding every frame of the file
    pub fn build_catalog(&self) -> Result<FrameCatalog> {
        let mut catalog = FrameCatalog::with_config(self.codec.clone());
        for frame in &self.frames {
            catalog.add_frame(frame.pgn, frame.to_schema()?);
        }
        Ok(catalog)
    }
}

/// Load a schema file from disk
pub fn load_schema_file(path: &Path) -> Result<SchemaFile> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read schema file: {:?}", path))?;

    let schema_file: SchemaFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse schema file: {:?}", path))?;

    log::debug!(
        "Loaded {} frame definitions from {:?}",
        schema_file.frames.len(),
        path
    );

    Ok(schema_file)
}
