// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client configuration loaded from environment variables.

use std::env;

const DEFAULT_MEDIA_BUCKET: &str = "videos";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Client configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the hosted backend (auth, rest and storage live below it)
    pub gateway_url: String,
    /// Public (anonymous) API key sent with every request
    pub gateway_anon_key: String,
    /// Storage bucket holding training media
    pub media_bucket: String,
    /// Per-request timeout for gateway calls
    pub request_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            gateway_url: env::var("GATEWAY_URL")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("GATEWAY_URL"))?,
            gateway_anon_key: env::var("GATEWAY_ANON_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GATEWAY_ANON_KEY"))?,
            media_bucket: env::var("MEDIA_BUCKET")
                .unwrap_or_else(|_| DEFAULT_MEDIA_BUCKET.to_string()),
            request_timeout_secs: env::var("GATEWAY_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Offline config for tests.
    pub fn test_default() -> Self {
        Self {
            gateway_url: "http://127.0.0.1:54321".to_string(),
            gateway_anon_key: "test_anon_key".to_string(),
            media_bucket: DEFAULT_MEDIA_BUCKET.to_string(),
            request_timeout_secs: 5,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
