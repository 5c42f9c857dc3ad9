//! Output formatting for decoded frames, identifiers and layouts

use can_frame_codec::{DecodedFrame, EntryKind, FrameRuntime, Identifier, PaddedLayout};
use clap::ValueEnum;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Txt,
    Json,
}

/// Render the J1939 view of an identifier
pub fn identifier_report(raw: u32, id: &Identifier, format: OutputFormat) -> String {
    let destination = id.destination_address().ok();
    let group_extension = id.group_extension().ok();

    match format {
        OutputFormat::Json => json!({
            "raw": format!("0x{:08X}", raw),
            "priority": id.priority,
            "extended_data_page": id.extended_data_page,
            "data_page": id.data_page,
            "pdu_format": id.pdu_format,
            "pdu_specific": id.pdu_specific,
            "source_address": id.source_address,
            "addressing_mode": id.addressing_mode(),
            "destination_address": destination,
            "group_extension": group_extension,
            "pgn": id.pgn(),
            "proprietary_a": id.is_proprietary_a(),
            "proprietary_a2": id.is_proprietary_a2(),
            "proprietary_b": id.is_proprietary_b(),
            "iso15765_3": id.is_iso15765_3(),
        })
        .to_string(),
        OutputFormat::Txt => {
            let mut lines = vec![
                format!("Identifier 0x{:08X}", raw),
                format!("  priority            {}", id.priority),
                format!("  extended data page  {}", id.extended_data_page),
                format!("  data page           {}", id.data_page),
                format!("  PDU format          0x{:02X} ({})", id.pdu_format, id.addressing_mode()),
                format!("  PDU specific        0x{:02X}", id.pdu_specific),
                format!("  source address      0x{:02X}", id.source_address),
                format!("  PGN                 0x{:05X} ({})", id.pgn(), id.pgn()),
            ];
            if let Some(da) = destination {
                lines.push(format!("  destination address 0x{:02X}", da));
            }
            if let Some(ge) = group_extension {
                lines.push(format!("  group extension     0x{:02X}", ge));
            }
            let classes: Vec<&str> = [
                (id.is_proprietary_a(), "proprietary A"),
                (id.is_proprietary_a2(), "proprietary A2"),
                (id.is_proprietary_b(), "proprietary B"),
                (id.is_iso15765_3(), "ISO 15765-3"),
            ]
            .iter()
            .filter(|(hit, _)| *hit)
            .map(|(_, name)| *name)
            .collect();
            if !classes.is_empty() {
                lines.push(format!("  class               {}", classes.join(", ")));
            }
            lines.join("\n")
        }
    }
}

/// Render one decoded frame
pub fn frame_report(payload: &str, frame: &DecodedFrame, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            let signals: Vec<Value> = frame
                .signals
                .iter()
                .map(|s| {
                    json!({
                        "name": s.name,
                        "raw": s.raw_value,
                        "value": s.resolved(),
                        "unit": s.unit,
                    })
                })
                .collect();
            json!({
                "frame": frame.frame_name,
                "payload": payload,
                "pgn": frame.identifier.map(|id| id.pgn()),
                "signals": signals,
            })
            .to_string()
        }
        OutputFormat::Txt => {
            let mut lines = vec![format!("{} [{}]", frame.frame_name, payload)];
            for signal in &frame.signals {
                let unit = signal.unit.as_deref().unwrap_or("");
                match &signal.value_description {
                    Some(label) => lines.push(format!(
                        "  {:<24} {} ({}) {}",
                        signal.name, label, signal.raw_value, unit
                    )),
                    None => lines.push(format!("  {:<24} {} {}", signal.name, signal.raw_value, unit)),
                }
            }
            lines
                .iter()
                .map(|l| l.trim_end())
                .collect::<Vec<_>>()
                .join("\n")
        }
    }
}

/// Render the padded layout of a frame
pub fn layout_report(runtime: &FrameRuntime, layout: &PaddedLayout) -> String {
    let mut lines = vec![format!(
        "{}: {} bits, {} padding",
        runtime.name(),
        layout.frame_bits(),
        layout.padding_bits()
    )];

    for entry in layout.entries() {
        let name = match entry.kind {
            EntryKind::Signal(index) => runtime
                .schema()
                .signals()
                .get(index)
                .map_or("?", |signal| signal.name.as_str()),
            EntryKind::Padding => can_frame_codec::PADDING_NAME,
        };
        lines.push(format!(
            "  {:>3}..{:<3} {:>2} bits  {}",
            entry.start_bit,
            entry.end_bit() - 1,
            entry.length_bits,
            name
        ));
    }

    for warning in layout.warnings() {
        lines.push(format!("  warning: {:?}", warning));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use can_frame_codec::{FrameSchema, SignalDef};

    #[test]
    fn test_identifier_report_txt() {
        let id = Identifier::decompose(0x0CFF_C2F6).unwrap();
        let report = identifier_report(0x0CFF_C2F6, &id, OutputFormat::Txt);
        assert!(report.contains("PGN                 0x0FFC2 (65474)"));
        assert!(report.contains("group extension     0xC2"));
        assert!(report.contains("proprietary B"));
        assert!(!report.contains("destination"));
    }

    #[test]
    fn test_identifier_report_json() {
        let id = Identifier::decompose(0x18EA_1020).unwrap();
        let report: Value =
            serde_json::from_str(&identifier_report(0x18EA_1020, &id, OutputFormat::Json)).unwrap();
        assert_eq!(report["pgn"], 0xEA00);
        assert_eq!(report["destination_address"], 0x10);
        assert_eq!(report["group_extension"], Value::Null);
        assert_eq!(report["addressing_mode"], "Pdu1");
    }

    #[test]
    fn test_frame_report() {
        let runtime = FrameRuntime::new(
            FrameSchema::new(
                "F",
                1,
                vec![SignalDef::new("State", 1, 4).with_value(2, "On").with_unit("-")],
            )
            .unwrap(),
        );
        let frame = can_frame_codec::CanFrame::from_wire(0, vec![0x20]);
        let decoded = runtime.decode_frame(&frame).unwrap();

        let txt = frame_report("20", &decoded, OutputFormat::Txt);
        assert!(txt.starts_with("F [20]"));
        assert!(txt.contains("On (2) -"));

        let json: Value = serde_json::from_str(&frame_report("20", &decoded, OutputFormat::Json)).unwrap();
        assert_eq!(json["signals"][0]["value"], "On");
        assert_eq!(json["pgn"], Value::Null);
    }

    #[test]
    fn test_layout_report() {
        let runtime =
            FrameRuntime::new(FrameSchema::new("F", 2, vec![SignalDef::new("A", 5, 4)]).unwrap());
        let report = layout_report(&runtime, runtime.layout().unwrap());
        assert!(report.starts_with("F: 16 bits, 12 padding"));
        assert!(report.contains("__padding__"));
    }
}
