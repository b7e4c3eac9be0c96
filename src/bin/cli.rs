//! segwal CLI
//!
//! Command-line interface for appending to and inspecting a WAL directory.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use segwal::wal::{segment_path, RecoveryReport, WalRecovery};
use segwal::{ChecksumPolicy, WalConfig, WalManager, WalReader};
use tracing_subscriber::{fmt, EnvFilter};

/// segwal CLI
#[derive(Parser, Debug)]
#[command(name = "segwal")]
#[command(about = "Append to and inspect a segmented write-ahead log")]
#[command(version)]
struct Args {
    /// WAL directory
    #[arg(short, long, default_value = "./wal_data")]
    dir: PathBuf,

    /// Skip checksum verification when reading
    #[arg(long)]
    no_verify: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Append each payload as one entry
    Append {
        /// Segment size threshold in bytes
        #[arg(short, long, default_value = "67108864")]
        max_segment_size: u64,

        /// Payloads to append (UTF-8 text)
        #[arg(required = true)]
        payloads: Vec<String>,
    },

    /// Print every entry in one segment
    Dump {
        /// Segment number
        segment: u64,
    },

    /// Scan all segments and report what recovery would find
    Verify {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,segwal=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> segwal::Result<()> {
    let policy = if args.no_verify {
        ChecksumPolicy::PassThrough
    } else {
        ChecksumPolicy::Verify
    };

    match args.command {
        Commands::Append {
            max_segment_size,
            payloads,
        } => {
            let config = WalConfig::builder()
                .dir(&args.dir)
                .max_segment_size(max_segment_size)
                .checksum_policy(policy)
                .build()?;
            let wal = WalManager::open(config)?;

            for payload in &payloads {
                let entry = wal.append(payload.as_bytes())?;
                println!(
                    "appended seq={} segment={} bytes={}",
                    entry.sequence_number(),
                    wal.active_segment(),
                    entry.encoded_len()
                );
            }
            wal.close()?;
        }

        Commands::Dump { segment } => {
            let reader = WalReader::open_with_policy(&segment_path(&args.dir, segment), policy)?;
            for entry in reader.entries() {
                let entry = entry?;
                println!(
                    "seq={} ts={} len={} payload={}",
                    entry.sequence_number(),
                    entry.timestamp_millis(),
                    entry.payload().len(),
                    String::from_utf8_lossy(&entry.payload())
                );
            }
        }

        Commands::Verify { json } => {
            let report = WalRecovery::verify(&args.dir, policy)?;
            println!("{}", render_report(&report, json)?);
        }
    }

    Ok(())
}

fn render_report(report: &RecoveryReport, json: bool) -> segwal::Result<String> {
    if json {
        return serde_json::to_string_pretty(report)
            .map_err(|e| segwal::WalError::Validation(e.to_string()));
    }

    let last_sequence = match report.last_sequence {
        Some(seq) => seq.to_string(),
        None => "(none)".to_string(),
    };
    Ok(format!(
        "segments scanned:  {}\n\
         entries recovered: {}\n\
         last sequence:     {}\n\
         next segment:      {}\n\
         next sequence:     {}",
        report.segments_scanned,
        report.entries_recovered,
        last_sequence,
        report.active_segment,
        report.next_sequence
    ))
}
