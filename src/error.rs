// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types shared by the gateway, controller and services.

/// Application error type returned to callers of user-initiated operations.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Failed to decode {table} row: {message}")]
    Decode {
        table: &'static str,
        message: String,
    },

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether this is the gateway's "no such row" signal.
    ///
    /// Only this variant may trigger the forced sign-out when an account is
    /// missing; every other failure is treated as transient.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }

    /// Message suitable for a blocking user notification.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Unauthorized => "Please sign in again.".to_string(),
            AppError::NotFound(_) => "The requested item could not be found.".to_string(),
            AppError::BadRequest(msg) | AppError::Gateway(msg) => msg.clone(),
            AppError::Decode { .. } | AppError::Internal(_) => {
                "Something went wrong. Please try again.".to_string()
            }
        }
    }
}

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, AppError>;
