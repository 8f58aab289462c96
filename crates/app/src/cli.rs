//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Lit shapes scene rendered with a ring of frame resources.
#[derive(Debug, Parser)]
#[command(name = "shapes", version, about)]
pub struct Args {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Run on the software backend without a window.
    #[arg(long)]
    pub headless: bool,

    /// Number of frames to render in headless mode.
    #[arg(long, value_name = "N", default_value_t = 6)]
    pub frames: u64,

    /// Start in wireframe (holding `1` toggles it in the window).
    #[arg(long)]
    pub wireframe: bool,
}
