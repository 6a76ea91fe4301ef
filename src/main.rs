// VGA Viewer - Main Entry Point
//
// Subcommands:
// - view: connect to the relay and show the picture live
// - headless: reconstruct without a window and save the final picture
// - relay: run the broadcast relay
// - pattern: stream a synthesized test picture to the relay

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vga_view::config::{ViewerConfig, CONFIG_FILE};
use vga_view::net::{Relay, DEFAULT_MAX_CLIENTS};
use vga_view::screenshot::save_png;
use vga_view::session::{HeadlessOutcome, Session};
use vga_view::signal::{Pattern, SignalGenerator};
use vga_view::SyncPolarity;

#[derive(Debug, Parser)]
#[command(name = "vga-view", version, about = "Virtual VGA display for simulated hardware")]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Log filter (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Write logs to a file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(flatten)]
    timing: TimingArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Args)]
struct ConnectionArgs {
    /// Relay address
    #[arg(short, long)]
    address: Option<String>,

    /// Relay port
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Debug, Args)]
struct TimingArgs {
    /// Visible width
    #[arg(short = 'x', long)]
    width: Option<u32>,

    /// Visible height
    #[arg(short = 'y', long)]
    height: Option<u32>,

    /// Bits per color channel
    #[arg(short, long)]
    depth: Option<u8>,

    /// Sync pulses drive the line low
    #[arg(short, long)]
    low_active: bool,

    /// Horizontal front porch in pixels
    #[arg(long)]
    h_front_porch: Option<u32>,

    /// Horizontal sync pulse in pixels
    #[arg(long)]
    h_sync_pulse: Option<u32>,

    /// Horizontal back porch in pixels
    #[arg(long)]
    h_back_porch: Option<u32>,

    /// Vertical front porch in lines
    #[arg(long)]
    v_front_porch: Option<u32>,

    /// Vertical sync pulse in lines
    #[arg(long)]
    v_sync_pulse: Option<u32>,

    /// Vertical back porch in lines
    #[arg(long)]
    v_back_porch: Option<u32>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the picture live (default)
    View {
        /// Scale factor
        #[arg(short, long)]
        zoom: Option<u32>,
    },
    /// Reconstruct without a window and save the final picture
    Headless {
        /// Stop after this many events
        #[arg(long)]
        limit: Option<u64>,

        /// PNG file for the final picture
        #[arg(short, long, default_value = "frame.png")]
        output: PathBuf,
    },
    /// Run the broadcast relay
    Relay {
        /// Maximum number of connections
        #[arg(short, long, default_value_t = DEFAULT_MAX_CLIENTS)]
        nmax: usize,
    },
    /// Stream a synthesized test picture
    Pattern {
        /// Picture to send
        #[arg(value_enum, default_value_t = PatternArg::Bars)]
        pattern: PatternArg,

        /// Timestamp units per pixel
        #[arg(long, default_value_t = 4)]
        time_per_pixel: u32,

        /// Number of frames to send
        #[arg(long, default_value_t = 1)]
        frames: u64,

        /// Keep sending until the relay goes away
        #[arg(long = "loop")]
        repeat: bool,

        /// Pause between frames in milliseconds
        #[arg(long, default_value_t = 0)]
        frame_delay_ms: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PatternArg {
    Bars,
    Gradient,
    Checkerboard,
}

impl From<PatternArg> for Pattern {
    fn from(arg: PatternArg) -> Self {
        match arg {
            PatternArg::Bars => Pattern::ColorBars,
            PatternArg::Gradient => Pattern::Gradient,
            PatternArg::Checkerboard => Pattern::Checkerboard,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_file.as_deref())?;

    let mut config = ViewerConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    apply_overrides(&mut config, &cli);

    match cli.command.unwrap_or(Command::View { zoom: None }) {
        Command::View { zoom } => {
            if let Some(zoom) = zoom {
                config.display.scale = zoom;
            }
            view(&config)
        }
        Command::Headless { limit, output } => headless(&config, limit, &output),
        Command::Relay { nmax } => {
            let relay = Relay::bind(config.connection.endpoint(), nmax)?;
            relay.serve()?;
            Ok(())
        }
        Command::Pattern {
            pattern,
            time_per_pixel,
            frames,
            repeat,
            frame_delay_ms,
        } => send_pattern(
            &config,
            pattern.into(),
            time_per_pixel,
            if repeat { None } else { Some(frames) },
            Duration::from_millis(frame_delay_ms),
        ),
    }
}

fn init_logging(level: &str, file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

fn apply_overrides(config: &mut ViewerConfig, cli: &Cli) {
    if let Some(address) = &cli.connection.address {
        config.connection.address = address.clone();
    }
    if let Some(port) = cli.connection.port {
        config.connection.port = port;
    }

    let args = &cli.timing;
    let timing = &mut config.timing;
    if let Some(width) = args.width {
        timing.width = width;
    }
    if let Some(height) = args.height {
        timing.height = height;
    }
    if let Some(depth) = args.depth {
        timing.color_depth = depth;
    }
    if args.low_active {
        timing.polarity = SyncPolarity::ActiveLow;
    }
    let porches = [
        (args.h_front_porch, &mut timing.horizontal.front),
        (args.h_sync_pulse, &mut timing.horizontal.sync),
        (args.h_back_porch, &mut timing.horizontal.back),
        (args.v_front_porch, &mut timing.vertical.front),
        (args.v_sync_pulse, &mut timing.vertical.sync),
        (args.v_back_porch, &mut timing.vertical.back),
    ];
    for (value, slot) in porches {
        if let Some(value) = value {
            *slot = value;
        }
    }
}

#[cfg(feature = "gui")]
fn view(config: &ViewerConfig) -> Result<()> {
    let session = Session::connect(config)?;
    let session = vga_view::run_viewer(config, session)?;
    let stats = session.stats();
    info!(frames = stats.frames, events = stats.events, "viewer closed");
    Ok(())
}

#[cfg(not(feature = "gui"))]
fn view(_config: &ViewerConfig) -> Result<()> {
    bail!("built without the `gui` feature; use `headless` instead")
}

fn headless(config: &ViewerConfig, limit: Option<u64>, output: &Path) -> Result<()> {
    let mut session = Session::connect(config)?;
    let outcome = session.run_headless(limit);
    let stats = session.stats();
    info!(
        ?outcome,
        events = stats.events,
        lines = stats.lines,
        frames = stats.frames,
        dropped = stats.dropped,
        "reconstruction finished"
    );

    save_png(output, &session.snapshot())
        .with_context(|| format!("saving {}", output.display()))?;
    info!(path = %output.display(), "picture saved");

    if outcome == HeadlessOutcome::Failed {
        bail!("connection to the relay failed");
    }
    Ok(())
}

fn send_pattern(
    config: &ViewerConfig,
    pattern: Pattern,
    time_per_pixel: u32,
    frames: Option<u64>,
    delay: Duration,
) -> Result<()> {
    let geometry = config.geometry()?;
    let endpoint = config.connection.endpoint();
    let mut stream = std::net::TcpStream::connect(endpoint.as_str())
        .with_context(|| format!("connecting to {endpoint}"))?;
    let mut generator = SignalGenerator::new(geometry, time_per_pixel.max(1))
        .with_tag(config.connection.source_tag.clone());

    info!(?pattern, %endpoint, "streaming test pattern");
    while frames.map_or(true, |frames| generator.frames() < frames) {
        let records = generator.pattern_records(pattern);
        if let Err(err) = stream.write_all(records.as_bytes()) {
            if frames.is_none() {
                warn!(error = %err, "relay went away");
                break;
            }
            return Err(err).context("sending to the relay");
        }
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }
    info!(frames = generator.frames(), "pattern sent");
    Ok(())
}
