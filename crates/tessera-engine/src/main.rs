//! # Tessera
//!
//! Headless viewer for an infinite procedurally generated terrain.
//!
//! This crate ties together:
//! - World: noise, chunk generation, streaming into a viewport
//! - Config: TOML settings for the viewport, world and session
//! - Input: pointer drags translated into viewport pans

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod app;
mod config;
mod input;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::EngineConfig;

/// Main entry point.
fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("tessera=info".parse()?))
        .init();

    info!("Tessera starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = EngineConfig::load();
    config.validate();

    app::run(&config)?;

    info!("Tessera shutdown complete");
    Ok(())
}
