// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session, identity and account models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::SubscriptionTier;

/// Minimal identity record bound to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Gateway user id (UUID)
    pub id: String,
    /// Email address, if the gateway returned one
    #[serde(default)]
    pub email: Option<String>,
}

/// Credential bundle issued by the gateway on sign-in.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Gateway-managed expiry
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub identity: Identity,
}

impl Session {
    /// Whether both sessions belong to the same identity.
    pub fn same_identity(&self, other: &Session) -> bool {
        self.identity.id == other.identity.id
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

// Tokens must never end up in logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("identity", &self.identity)
            .finish()
    }
}

/// Billing-level account, one-to-one with an identity.
///
/// Stored in the `accounts` table, keyed by `auth_user_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    /// Gateway identity id this account belongs to
    pub auth_user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Subscription tier code (1 = free, 2 = premium)
    #[serde(default = "default_subscription_type")]
    pub subscription_type: i64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_subscription_type() -> i64 {
    1
}

impl Account {
    pub fn subscription_tier(&self) -> SubscriptionTier {
        SubscriptionTier::from_code(self.subscription_type)
    }

    /// "First Last", falling back to whichever part is present.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}
