//! `shapes`: a lit scene of boxes, cylinders and spheres rendered through a
//! ring of frame resources so the CPU can run ahead of the GPU.

mod cli;
mod headless;
mod windowed;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use shapes_core::{AppConfig, BackendKind};

use crate::cli::Args;

fn main() -> Result<()> {
    shapes_core::init_logging();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => AppConfig::default(),
    };

    info!("Starting shapes ({} frame resources)", config.frames.frame_resources);

    if args.headless || config.render.backend == BackendKind::Software {
        headless::run(&config, args.frames, args.wireframe)?;
        Ok(())
    } else {
        windowed::run(config, args.wireframe)
    }
}
