// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile creation and friend lookup.

use crate::error::{AppError, Result};
use crate::gateway::{tables, Filter, Gateway, Query};
use crate::models::{decode_row, decode_rows, Friendship, NewProfile, Profile};
use crate::session::SessionController;
use std::sync::Arc;

pub struct ProfileService<G: Gateway> {
    gateway: Arc<G>,
    session: Arc<SessionController<G>>,
}

impl<G: Gateway> ProfileService<G> {
    pub fn new(gateway: Arc<G>, session: Arc<SessionController<G>>) -> Self {
        Self { gateway, session }
    }

    /// Create a profile under the signed-in account.
    ///
    /// Input is validated before anything is sent. On success the profile
    /// set is refreshed; the current selection is kept.
    pub async fn create_profile(&self, new: &NewProfile) -> Result<Profile> {
        new.check()?;

        let account = self.session.account().ok_or(AppError::Unauthorized)?;
        let row = self
            .gateway
            .insert(tables::PROFILES, new.to_row(account.id))
            .await
            .inspect_err(|e| tracing::error!(account_id = account.id, error = %e, "Failed to create profile"))?;
        let profile: Profile = decode_row(tables::PROFILES, row)?;

        tracing::info!(account_id = account.id, profile_id = profile.id, "Profile created");

        // The row exists now; a failed refresh is only logged.
        if let Err(e) = self.session.refresh_profiles().await {
            tracing::warn!(error = %e, "Profile list refresh after create failed");
        }
        Ok(profile)
    }

    /// Profiles with an accepted friendship to `profile_id`.
    pub async fn list_friends(&self, profile_id: i64) -> Result<Vec<Profile>> {
        let query = Query::new().eq("status", "accepted").any_of(vec![
            Filter::eq("requester_id", profile_id),
            Filter::eq("addressee_id", profile_id),
        ]);
        let rows = self.gateway.query_many(tables::FRIENDSHIPS, &query).await?;
        let friendships: Vec<Friendship> = decode_rows(tables::FRIENDSHIPS, rows)?;

        let friend_ids: Vec<i64> = friendships.iter().map(|f| f.other(profile_id)).collect();
        if friend_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self
            .gateway
            .query_many(tables::PROFILES, &Query::new().in_list("id", friend_ids))
            .await?;
        decode_rows(tables::PROFILES, rows)
    }
}
