//! CAN Frame CLI Application
//!
//! Command-line front end for the can-frame-codec library. It adds what the
//! library deliberately leaves out:
//! - Loading frame schemas from TOML files
//! - Parsing hex payloads and identifiers from the command line
//! - Text/JSON reports

use anyhow::{anyhow, bail, Context, Result};
use can_frame_codec::{
    CanFrame, FrameCatalog, FrameRuntime, Identifier, SignalValues, EFF_FLAG,
};
use clap::{Args as ClapArgs, Parser, Subcommand};
use rayon::prelude::*;
use std::path::PathBuf;

mod config;
mod report;

use report::OutputFormat;

/// CAN Frame Codec - Inspect J1939 identifiers and encode/decode frame payloads
#[derive(Parser, Debug)]
#[command(name = "can-frame-cli")]
#[command(about = "Inspect J1939 identifiers and encode/decode CAN payloads", long_about = None)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Output format
    #[arg(short, long, value_enum, default_value = "txt", global = true)]
    format: OutputFormat,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decompose a 32-bit arbitration id into its J1939 fields
    Id {
        /// Arbitration id (hex with 0x prefix, or decimal)
        #[arg(value_parser = parse_u32)]
        raw: u32,
    },

    /// Compose an arbitration id from priority, PGN and addresses
    Compose {
        #[arg(long, default_value = "6")]
        priority: u8,
        #[arg(long, value_parser = parse_u32)]
        pgn: u32,
        #[arg(long, value_parser = parse_u32)]
        source: u32,
        /// Destination address (PDU1 PGNs only)
        #[arg(long, value_parser = parse_u32)]
        destination: Option<u32>,
    },

    /// Decode hex payloads with a frame schema
    Decode {
        #[command(flatten)]
        target: FrameTarget,
        /// Payloads as hex (e.g. 0011AABB00000000)
        #[arg(required = true)]
        payloads: Vec<String>,
    },

    /// Encode NAME=VALUE pairs into a hex payload
    Encode {
        #[command(flatten)]
        target: FrameTarget,
        /// Signal values (e.g. EngineSpeed=1800)
        values: Vec<String>,
    },

    /// Print the padded bit layout of a frame
    Layout {
        #[command(flatten)]
        target: FrameTarget,
    },
}

/// Which frame of which schema file to use
#[derive(ClapArgs, Debug)]
struct FrameTarget {
    /// Path to the TOML schema file
    #[arg(short, long, value_name = "FILE")]
    schema: PathBuf,

    /// Frame name from the schema file
    #[arg(long, conflicts_with = "id", required_unless_present = "id")]
    frame: Option<String>,

    /// Arbitration id; the frame is looked up by its PGN
    #[arg(long, value_parser = parse_u32)]
    id: Option<u32>,
}

impl FrameTarget {
    fn load_catalog(&self) -> Result<FrameCatalog> {
        let schema_file = config::load_schema_file(&self.schema)?;
        let catalog = schema_file.build_catalog()?;
        let stats = catalog.stats();
        log::info!(
            "Loaded {} frames with {} signals from {:?}",
            stats.num_frames,
            stats.num_signals,
            self.schema
        );
        Ok(catalog)
    }

    fn runtime<'a>(&self, catalog: &'a FrameCatalog) -> Result<&'a FrameRuntime> {
        match (&self.frame, self.id) {
            (Some(name), _) => catalog
                .get_by_name(name)
                .ok_or_else(|| anyhow!("Frame '{}' not found in {:?}", name, self.schema)),
            (None, Some(raw)) => {
                let pgn = Identifier::decompose(raw)?.pgn();
                catalog
                    .get_by_pgn(pgn)
                    .ok_or_else(|| anyhow!("No frame with PGN 0x{:05X} in {:?}", pgn, self.schema))
            }
            (None, None) => bail!("Either --frame or --id is required"),
        }
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::debug!("CAN Frame CLI v{}", env!("CARGO_PKG_VERSION"));
    log::debug!("Using codec library v{}", can_frame_codec::VERSION);

    match &args.command {
        Command::Id { raw } => {
            let id = Identifier::decompose(*raw)?;
            println!("{}", report::identifier_report(*raw, &id, args.format));
        }
        Command::Compose {
            priority,
            pgn,
            source,
            destination,
        } => {
            let source = u8::try_from(*source).context("Source address must fit in 8 bits")?;
            let mut id = Identifier::from_pgn(*priority, *pgn, source)?;
            if let Some(destination) = destination {
                let destination =
                    u8::try_from(*destination).context("Destination address must fit in 8 bits")?;
                id = id.with_destination_address(destination)?;
            }
            let raw = id.compose()?;
            println!("{}", report::identifier_report(raw, &id, args.format));
        }
        Command::Decode { target, payloads } => decode_mode(target, payloads, args.format)?,
        Command::Encode { target, values } => encode_mode(target, values)?,
        Command::Layout { target } => {
            let catalog = target.load_catalog()?;
            let runtime = target.runtime(&catalog)?;
            println!("{}", report::layout_report(runtime, runtime.layout()?));
        }
    }

    Ok(())
}

/// Decode every payload, in parallel, and print the results in input order
fn decode_mode(target: &FrameTarget, payloads: &[String], format: OutputFormat) -> Result<()> {
    let catalog = target.load_catalog()?;
    let runtime = target.runtime(&catalog)?;

    // Build the layout up front so schema errors surface once
    runtime.layout()?;

    // Ids wider than 11 bits are extended even without the EFF flag
    let wire_id = match target.id {
        Some(raw) if raw > 0x7FF => raw | EFF_FLAG,
        Some(raw) => raw,
        None => 0,
    };
    let results: Vec<Result<String>> = payloads
        .par_iter()
        .map(|payload| {
            let data = parse_payload(payload)?;
            let frame = CanFrame::from_wire(wire_id, data);
            let decoded = runtime
                .decode_frame(&frame)
                .with_context(|| format!("Failed to decode payload {}", payload))?;
            Ok(report::frame_report(payload, &decoded, format))
        })
        .collect();

    let mut failures = 0;
    for result in results {
        match result {
            Ok(line) => println!("{}", line),
            Err(e) => {
                failures += 1;
                log::error!("{:#}", e);
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} payloads failed to decode", failures, payloads.len());
    }
    Ok(())
}

fn encode_mode(target: &FrameTarget, pairs: &[String]) -> Result<()> {
    let catalog = target.load_catalog()?;
    let runtime = target.runtime(&catalog)?;

    let values = parse_values(pairs)?;
    let payload = runtime.encode(&values)?;
    println!("{}", hex::encode_upper(payload));
    Ok(())
}

/// Parse `NAME=VALUE` pairs into signal values
fn parse_values(pairs: &[String]) -> Result<SignalValues> {
    pairs
        .iter()
        .map(|pair| {
            let (name, value) = pair
                .split_once('=')
                .ok_or_else(|| anyhow!("Expected NAME=VALUE, got '{}'", pair))?;
            let value = parse_i64(value.trim())
                .with_context(|| format!("Invalid value for signal '{}'", name))?;
            Ok((name.trim().to_string(), value))
        })
        .collect()
}

/// Parse a hex payload, ignoring ':', '_' and ' ' separators
fn parse_payload(payload: &str) -> Result<Vec<u8>> {
    let digits: String = payload
        .trim_start_matches("0x")
        .chars()
        .filter(|c| !matches!(c, ':' | '_' | ' '))
        .collect();
    hex::decode(&digits).with_context(|| format!("Invalid hex payload '{}'", payload))
}

fn parse_u32(s: &str) -> Result<u32> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(digits) => u32::from_str_radix(digits, 16),
        None => s.parse(),
    };
    parsed.with_context(|| format!("Invalid number '{}'", s))
}

fn parse_i64(s: &str) -> Result<i64> {
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let magnitude = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex_digits) => i128::from_str_radix(hex_digits, 16)?,
        None => digits.parse::<i128>()?,
    };
    let value = if negative { -magnitude } else { magnitude };
    i64::try_from(value).with_context(|| format!("Value '{}' does not fit in 64 bits", s))
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
