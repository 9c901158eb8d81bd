// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Tracing subscriber setup.
//!
//! The library itself only emits `tracing` events. Embedding applications
//! that have no subscriber of their own can call [`init_logging`] once at
//! startup.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{Error, Result};

/// Build the filter for a logging configuration.
///
/// `RUST_LOG` takes precedence over the configured level.
fn build_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Install a global subscriber with the configured level and format.
///
/// Fails if a global subscriber has already been installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(config);
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.format.as_str() {
        "pretty" => registry
            .with(fmt::layer().pretty().with_target(true))
            .try_init(),
        _ => registry
            .with(fmt::layer().json().with_target(true))
            .try_init(),
    };

    installed.map_err(|e| Error::Config(format!("failed to install subscriber: {}", e)))
}
