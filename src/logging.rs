// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Structured logging setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "upro_trainer=debug,info";

/// Initialize structured JSON logging.
///
/// `RUST_LOG` overrides the default filter. Safe to call more than once;
/// later calls leave the first subscriber in place.
pub fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    if tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .try_init()
        .is_err()
    {
        tracing::debug!("Logging already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init_logging();
        init_logging();
        tracing::info!(target: "upro_trainer", "logging initialized");
    }
}
