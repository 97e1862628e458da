//! # Application Entry Point
//!
//! Parse CLI arguments, initialize logging, and hand off to the pipeline
//! matching the inferred mode.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use porepath::{Config, DecodePipeline, Mode, TrainPipeline};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    match config.mode() {
        Mode::Train => TrainPipeline::new(config).run()?,
        Mode::Decode => DecodePipeline::new(config).run()?,
    }
    Ok(())
}
