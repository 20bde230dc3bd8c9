use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "miri-stream",
    version,
    about = "Mirics SDR receive stream tool",
    long_about = "Inspect and exercise the miri-stream receive core.\n\
                  The capture command runs a synthetic transport through the\n\
                  slot ring and reader, as a hardware-free stand-in for the USB device."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show stream formats and accepted stream arguments
    Info(InfoArgs),
    /// Capture samples from the synthetic transport
    Capture(CaptureArgs),
}

#[derive(Args)]
pub struct InfoArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct CaptureArgs {
    /// Number of I/Q elements to capture
    #[arg(long, default_value_t = 65536)]
    pub elements: usize,

    /// Elements requested per read
    #[arg(long, default_value_t = 4096)]
    pub chunk: usize,

    /// Slot size in bytes (stream argument "bufflen")
    #[arg(long)]
    pub bufflen: Option<String>,

    /// Number of ring slots (stream argument "buffers")
    #[arg(long)]
    pub buffers: Option<String>,

    /// Bytes per synthetic burst (defaults to the slot size)
    #[arg(long)]
    pub burst_bytes: Option<usize>,

    /// Delay between synthetic bursts in microseconds
    #[arg(long, default_value_t = 0)]
    pub pace_us: u64,

    /// Per-read timeout in microseconds
    #[arg(long, default_value_t = 100_000)]
    pub timeout_us: u64,

    /// Give up after this many consecutive timeouts
    #[arg(long, default_value_t = 10)]
    pub max_timeouts: u32,

    /// Write captured CF32 samples (little-endian) to this file
    #[arg(short, long)]
    pub output: Option<String>,

    /// Output summary as JSON
    #[arg(long)]
    pub json: bool,
}
