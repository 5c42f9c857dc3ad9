//! Padding synthesis
//!
//! Walks a frame's signals in start-bit order and fills every gap, plus the
//! tail of the frame, with padding entries so the resulting layout covers the
//! payload without holes. The padded layout is what the bit codec iterates.

use crate::config::PaddingPolicy;
use crate::signals::{FrameSchema, SignalDef, PADDING_NAME};
use crate::types::{CodecError, Result};

/// What a layout entry stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Index into the schema's ordered signals
    Signal(usize),
    /// Synthesized filler, always packed as zero
    Padding,
}

/// One contiguous span of the padded layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutEntry {
    /// First bit of the span (1-based)
    pub start_bit: u32,
    /// Length in bits
    pub length_bits: u32,
    pub kind: EntryKind,
}

impl LayoutEntry {
    fn padding(start_bit: u32, length_bits: u32) -> Self {
        Self {
            start_bit,
            length_bits,
            kind: EntryKind::Padding,
        }
    }

    pub fn is_padding(&self) -> bool {
        self.kind == EntryKind::Padding
    }

    /// First bit after the span
    pub fn end_bit(&self) -> u32 {
        self.start_bit + self.length_bits
    }

    /// Materialize a padding entry as an unsigned signal definition
    ///
    /// Returns `None` for entries that refer to a real signal.
    pub fn as_padding_signal(&self) -> Option<SignalDef> {
        self.is_padding()
            .then(|| SignalDef::new(PADDING_NAME, self.start_bit as u16, self.length_bits as u16))
    }
}

/// Non-fatal findings recorded while padding in lenient mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutWarning {
    /// Signals reach past the end of the frame
    Overflow { described_bits: u32, frame_bits: u32 },
}

/// Gapless, ordered layout of a frame's signals and padding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaddedLayout {
    entries: Vec<LayoutEntry>,
    frame_bits: u32,
    warnings: Vec<LayoutWarning>,
}

impl PaddedLayout {
    pub fn entries(&self) -> &[LayoutEntry] {
        &self.entries
    }

    /// Declared frame width in bits
    pub fn frame_bits(&self) -> u32 {
        self.frame_bits
    }

    /// Sum of all entry lengths
    pub fn total_bits(&self) -> u32 {
        self.entries.iter().map(|e| e.length_bits).sum()
    }

    /// Bits taken by padding entries
    pub fn padding_bits(&self) -> u32 {
        self.entries
            .iter()
            .filter(|e| e.is_padding())
            .map(|e| e.length_bits)
            .sum()
    }

    pub fn warnings(&self) -> &[LayoutWarning] {
        &self.warnings
    }

    /// True when the layout describes more bits than the frame holds
    pub fn is_overflowing(&self) -> bool {
        self.total_bits() > self.frame_bits
    }
}

/// Builds padded layouts under a fixed overflow policy
#[derive(Debug, Clone, Copy, Default)]
pub struct Padder {
    policy: PaddingPolicy,
}

impl Padder {
    pub fn new(policy: PaddingPolicy) -> Self {
        Self { policy }
    }

    /// Compute the padded layout of a schema
    ///
    /// # Errors
    /// * `OverlapError` if a signal starts inside the previous one
    /// * `OverflowError` if the signals run past the frame end (strict only)
    pub fn pad(&self, schema: &FrameSchema) -> Result<PaddedLayout> {
        let frame_bits = schema.frame_bits();
        let mut entries = Vec::with_capacity(schema.signals().len() * 2 + 1);
        let mut warnings = Vec::new();
        let mut expected_next_bit: u32 = 1;
        let mut previous: Option<&SignalDef> = None;

        for (index, signal) in schema.signals().iter().enumerate() {
            let start_bit = signal.start_bit as u32;

            if start_bit < expected_next_bit {
                return Err(CodecError::OverlapError {
                    signal: signal.name.clone(),
                    previous: previous.map(|p| p.name.clone()).unwrap_or_default(),
                    start_bit: signal.start_bit,
                    expected_next_bit,
                });
            }

            if start_bit > expected_next_bit {
                entries.push(LayoutEntry::padding(
                    expected_next_bit,
                    start_bit - expected_next_bit,
                ));
            }

            entries.push(LayoutEntry {
                start_bit,
                length_bits: signal.length_bits as u32,
                kind: EntryKind::Signal(index),
            });
            expected_next_bit = signal.end_bit();
            previous = Some(signal);
        }

        // Bits are 1-based, so the last frame bit is frame_bits itself.
        let trailing = frame_bits as i64 - expected_next_bit as i64 + 1;
        if trailing > 0 {
            entries.push(LayoutEntry::padding(expected_next_bit, trailing as u32));
        } else if trailing < 0 {
            let described_bits = expected_next_bit - 1;
            match self.policy {
                PaddingPolicy::Strict => {
                    return Err(CodecError::OverflowError {
                        frame: schema.name().to_string(),
                        described_bits,
                        frame_bits,
                    });
                }
                PaddingPolicy::Lenient => {
                    log::warn!(
                        "Frame '{}' describes {} bits but only holds {}, continuing in lenient mode",
                        schema.name(),
                        described_bits,
                        frame_bits
                    );
                    warnings.push(LayoutWarning::Overflow {
                        described_bits,
                        frame_bits,
                    });
                }
            }
        }

        log::debug!(
            "Padded layout for '{}': {} entries, {} padding bits",
            schema.name(),
            entries.len(),
            entries
                .iter()
                .filter(|e| e.is_padding())
                .map(|e| e.length_bits)
                .sum::<u32>()
        );

        Ok(PaddedLayout {
            entries,
            frame_bits,
            warnings,
        })
    }
}
