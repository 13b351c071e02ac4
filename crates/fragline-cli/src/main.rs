//! fragline-decode - raw-capture decoder front-end
//!
//! Decodes a raw capture file into CSV (decode-and-save mode, the default)
//! or bridges the routed packets into fragments and forwards them to a
//! running builder's ingest endpoint (`--route`).
//!
//! ## Usage
//! ```bash
//! fragline-decode capture.bin                         # CSV to stdout
//! fragline-decode capture.bin -o samples.csv          # CSV to a file
//! fragline-decode capture.bin --route                 # feed 127.0.0.1:8080
//! fragline-decode capture.bin --route --addr host:99  # feed another builder
//! ```
//!
//! Exit code 0 on success, 1 on a missing argument or open error.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use fragline_capture::{
    CaptureDecoder, CaptureError, CapturePacket, CaptureStats, PacketSink,
};
use fragline_client::{ClientError, FragmentSender};
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "fragline-decode", about = "Decode a raw capture file")]
struct Args {
    /// Path to the raw capture file
    input: PathBuf,

    /// Write CSV here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Forward bridged fragments to a builder instead of dumping CSV
    #[arg(long)]
    route: bool,

    /// Builder ingest endpoint for routing mode
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: String,
}

/// Builder-feeding sink: bridges each routed packet into a fragment and
/// delivers it over one TCP connection, the same contract producers use.
struct BuilderSink {
    sender: FragmentSender,
    runtime: tokio::runtime::Runtime,
}

impl BuilderSink {
    fn connect(addr: &str) -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            sender: FragmentSender::new(addr),
            runtime,
        })
    }
}

impl PacketSink for BuilderSink {
    fn dispatch(&mut self, packet: CapturePacket) -> fragline_capture::Result<()> {
        let Some(fragment) = packet.into_fragment() else {
            return Ok(());
        };
        self.runtime
            .block_on(self.sender.send(&fragment))
            .map_err(|e| match e {
                ClientError::Io(io) => CaptureError::Io(io),
            })?;
        debug!(
            timestamp = fragment.timestamp,
            logical_event_id = fragment.logical_event_id,
            contributor = %fragment.contributor,
            "fragment forwarded to builder"
        );
        Ok(())
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // A plain `1` regardless of how the parse failed, so wrappers
            // can treat every argument problem uniformly.
            let _ = e.print();
            return ExitCode::from(1);
        }
    };

    match run(args) {
        Ok(stats) => {
            info!(
                forwarded = stats.forwarded,
                skipped = stats.skipped,
                resyncs = stats.resyncs,
                "decode finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("fragline-decode: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn run(args: Args) -> anyhow::Result<CaptureStats> {
    let file = File::open(&args.input)
        .with_context(|| format!("cannot open {}", args.input.display()))?;
    let mut decoder = CaptureDecoder::new(BufReader::new(file));

    let stats = if args.route {
        let sink = BuilderSink::connect(&args.addr)?;
        decoder
            .route(sink)
            .with_context(|| format!("routing to {}", args.addr))?
    } else {
        match &args.output {
            Some(path) => {
                let out = File::create(path)
                    .with_context(|| format!("cannot create {}", path.display()))?;
                let mut writer = BufWriter::new(out);
                let stats = decoder.decode_to_csv(&mut writer)?;
                writer.flush()?;
                stats
            }
            None => {
                let stdout = std::io::stdout();
                let mut writer = BufWriter::new(stdout.lock());
                let stats = decoder.decode_to_csv(&mut writer)?;
                writer.flush()?;
                stats
            }
        }
    };

    Ok(stats)
}
