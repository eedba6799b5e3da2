mod config;

use anyhow::{bail, Context, Result};
use bm257s_core::{list_ports, Frame, Measurement, PackageReader, SerialSource};
use clap::{Args, Parser, Subcommand};
use config::AppConfig;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::filter::LevelFilter;

const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Reads measurements from a Brymen BM257s multimeter.
#[derive(Parser)]
#[command(name = "bm257s-console", version)]
struct Cli {
    /// Increase log output (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file instead of the per-user default.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List available serial ports.
    Ports,
    /// Print readings as they arrive.
    Watch(WatchArgs),
    /// Decode a single frame given as hex.
    Decode {
        /// 15 bytes, e.g. "02 1A 20 3C 47 50 6A 78 8F 9F A7 B0 C0 D0 E5".
        hex: Vec<String>,
    },
}

#[derive(Args)]
struct WatchArgs {
    #[arg(short, long)]
    port: Option<String>,
    #[arg(short, long)]
    baud: Option<u32>,
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Stop after this many frames.
    #[arg(short = 'n', long)]
    count: Option<usize>,
    /// One JSON object per frame.
    #[arg(long, conflicts_with = "raw")]
    json: bool,
    /// Display digits and symbols without interpretation.
    #[arg(long)]
    raw: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Ports => ports(),
        Command::Watch(args) => {
            let path = cli.config.or_else(AppConfig::default_path);
            let file_cfg = match path {
                Some(path) => AppConfig::load(&path)?,
                None => AppConfig::default(),
            };
            watch(args, file_cfg)
        }
        Command::Decode { hex } => decode(&hex.concat()),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn ports() -> Result<()> {
    let ports = list_ports();
    if ports.is_empty() {
        println!("no serial ports found");
    }
    for p in ports {
        match &p.usb {
            Some(usb) => println!(
                "{} ({:04X}:{:04X}) {}",
                p.port_name,
                usb.vid,
                usb.pid,
                usb.product.as_deref().unwrap_or_default()
            ),
            None => println!("{} {}", p.port_name, p.port_type),
        }
    }
    Ok(())
}

fn watch(args: WatchArgs, file_cfg: AppConfig) -> Result<()> {
    let flags = AppConfig {
        port: args.port.clone(),
        baud_rate: args.baud,
        read_timeout_ms: args.timeout_ms,
    };
    let cfg = file_cfg.merged(flags).serial_config();

    let source = SerialSource::open(&cfg)?;
    let name = source.name().unwrap_or_else(|| cfg.port_name.clone());
    let mut reader = PackageReader::new(source);
    reader.start()?;
    log::info!("reading from {name}");

    let mut seen = 0;
    while args.count.map_or(true, |n| seen < n) {
        if !reader.wait_for_package(POLL_INTERVAL) {
            if !reader.is_running() {
                reader.stop().with_context(|| format!("reading from {name}"))?;
                bail!("reader on {name} stopped unexpectedly");
            }
            log::debug!("no frame within {POLL_INTERVAL:?}");
            continue;
        }
        let Some(frame) = reader.next_package() else {
            continue;
        };
        seen += 1;

        let line = if args.json {
            frame_json(&frame)?
        } else if args.raw {
            frame_raw(&frame)
        } else {
            frame_text(&frame)
        };
        println!("{line}");
    }

    reader.stop()?;
    Ok(())
}

fn decode(input: &str) -> Result<()> {
    let cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = hex::decode(&cleaned).context("frame is not valid hex")?;
    let frame = Frame::try_from(bytes.as_slice())?;

    println!("{}", frame_raw(&frame));
    match Measurement::from_frame(&frame) {
        Ok(m) => println!("{m}"),
        Err(e) => println!("unclassified: {e}"),
    }
    Ok(())
}

fn symbol_list(frame: &Frame) -> String {
    let names: Vec<&str> = frame.symbols().iter().map(|s| s.as_str()).collect();
    names.join(" ")
}

fn frame_raw(frame: &Frame) -> String {
    let display = frame
        .display_string()
        .unwrap_or_else(|e| format!("<{e}>"));
    format!("{display:>6} [{}]", symbol_list(frame))
}

fn frame_text(frame: &Frame) -> String {
    match Measurement::from_frame(frame) {
        Ok(m) => m.to_string(),
        Err(e) => {
            log::debug!("cannot classify frame: {e}");
            frame_raw(frame)
        }
    }
}

fn frame_json(frame: &Frame) -> Result<String> {
    let measurement = Measurement::from_frame(frame).ok();
    let value = serde_json::json!({
        "display": frame.display_string().ok(),
        "symbols": frame.symbols(),
        "measurement": measurement,
    });
    Ok(serde_json::to_string(&value)?)
}
