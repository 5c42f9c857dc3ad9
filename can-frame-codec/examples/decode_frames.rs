//! Encode and decode a few J1939 frames through a frame catalog
//!
//! Usage:
//!   cargo run --example decode_frames
//!
//! Set RUST_LOG=debug to see layout construction.

use can_frame_codec::{
    CanFrame, FrameCatalog, FrameSchema, Identifier, Result, SignalDef, SignalValues,
};

fn main() -> Result<()> {
    env_logger::init();

    let eec1 = FrameSchema::new(
        "EEC1",
        8,
        vec![
            SignalDef::new("TorqueMode", 1, 4)
                .with_value(0, "LowIdle")
                .with_value(1, "AcceleratorPedal"),
            SignalDef::new("DriverDemandTorque", 9, 8).with_unit("%"),
            SignalDef::new("EngineSpeed", 25, 16).with_unit("rpm"),
        ],
    )?;

    let mut catalog = FrameCatalog::new();
    catalog.add_frame(0xF004, eec1);

    let runtime = catalog
        .get_by_name("EEC1")
        .expect("frame registered above");
    let layout = runtime.layout()?;
    println!(
        "EEC1 layout: {} entries, {} padding bits",
        layout.entries().len(),
        layout.padding_bits()
    );

    let identifier = Identifier::from_pgn(3, 0xF004, 0x00)?;
    println!("Identifier: {} (0x{:08X})", identifier, identifier.compose()?);

    for (mode, speed) in [(0, 800), (1, 1850), (1, 2400)] {
        let values: SignalValues = [
            ("TorqueMode".to_string(), mode),
            ("DriverDemandTorque".to_string(), 40),
            ("EngineSpeed".to_string(), speed),
        ]
        .into();
        let payload = runtime.encode(&values)?;

        let frame = CanFrame::extended(&identifier, payload)?;
        let decoded = catalog.decode(&frame)?;

        println!("\n{} {:02X?}", decoded.frame_name, frame.data);
        for signal in &decoded.signals {
            println!(
                "  {:<20} {} {}",
                signal.name,
                signal.resolved(),
                signal.unit.as_deref().unwrap_or("")
            );
        }
    }

    Ok(())
}
