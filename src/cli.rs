// cli.rs - Command-line interface configuration
use std::path::PathBuf;

use clap::Parser;

use crate::config::Backend;

#[derive(Parser, Debug, Clone)]
#[command(name = "dualscreen")]
#[command(about = "Dual-display presentation loop", long_about = None)]
pub struct Cli {
    /// JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Resource directory (default font, background music)
    #[arg(long)]
    pub resources: Option<PathBuf>,

    /// Output backend
    #[arg(long, value_enum)]
    pub backend: Option<Backend>,

    /// Stop after this many frames
    #[arg(long)]
    pub frames: Option<u64>,

    /// JSON input script replayed on the controller channels
    #[arg(long)]
    pub script: Option<PathBuf>,

    /// Vertical sync rate in Hz
    #[arg(long = "refresh-hz")]
    pub refresh_hz: Option<f32>,

    /// Run without vsync pacing
    #[arg(long, default_value = "false")]
    pub unpaced: bool,

    /// Give up on deferred releases after this many milliseconds at shutdown
    #[arg(long = "drain-timeout-ms")]
    pub drain_timeout_ms: Option<u64>,

    /// Debug-level logging unless RUST_LOG says otherwise
    #[arg(short, long, default_value = "false")]
    pub verbose: bool,
}
