// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session & profile controller.
//!
//! Owns the [`SessionState`] and runs the dependent fetch chain
//! session → account → profiles against a [`Gateway`]. Consumers read
//! snapshots and get change notifications through a `watch` channel.

use crate::error::{AppError, Result};
use crate::gateway::{tables, AuthEvent, Gateway, Query, SignUpAttributes};
use crate::models::{decode_row, decode_rows, Account, Identity, Profile, Session};
use crate::session::state::{AccountChange, Phase, SessionChange, SessionState};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Result of [`SessionController::sign_out`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutOutcome {
    /// Local state was cleared; `remote_revoked` reports the gateway call.
    SignedOut { remote_revoked: bool },
    /// There was no session to end.
    NoSession,
    /// Another sign-out was already running; this call did nothing.
    AlreadyInProgress,
}

pub struct SessionController<G: Gateway> {
    gateway: Arc<G>,
    state: watch::Sender<SessionState>,
    signing_out: AtomicBool,
    /// Bumped under the state lock whenever a sign-out clears the session.
    sign_outs: AtomicU64,
}

/// Holds the sign-out flag for the duration of a sign-out.
struct SignOutGuard<'a>(&'a AtomicBool);

impl<'a> SignOutGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for SignOutGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<G: Gateway> SessionController<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            gateway,
            state,
            signing_out: AtomicBool::new(false),
            sign_outs: AtomicU64::new(0),
        }
    }

    // ─── Reads ───────────────────────────────────────────────────

    /// Receiver that is notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn phase(&self) -> Phase {
        self.state.borrow().phase()
    }

    pub fn account(&self) -> Option<Account> {
        self.state.borrow().account().cloned()
    }

    pub fn active_profile(&self) -> Option<Profile> {
        self.state.borrow().active_profile().cloned()
    }

    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    // ─── Startup ─────────────────────────────────────────────────

    /// Resolve the persisted session, then clear the initializing flag.
    pub async fn start(&self) {
        match self.gateway.restore_session().await.map(unexpired) {
            Ok(Some(session)) => {
                tracing::info!(identity = %session.identity.id, "Restoring persisted session");
                self.apply_session(Some(session)).await;
            }
            Ok(None) => tracing::debug!("No usable persisted session"),
            Err(e) => tracing::error!(error = %e, "Failed to restore persisted session"),
        }

        self.state.send_if_modified(|state| state.finish_initializing());
    }

    /// Follow the gateway's session-change notifications.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_event_listener(self: &Arc<Self>) -> JoinHandle<()>
    where
        G: 'static,
    {
        let mut events = self.gateway.subscribe();
        let controller = Arc::clone(self);

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => controller.handle_auth_event(event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Auth event listener lagged, reconciling");
                        controller.reconcile().await;
                    }
                    Err(RecvError::Closed) => {
                        tracing::debug!("Auth event stream closed");
                        break;
                    }
                }
            }
        })
    }

    /// React to a gateway notification.
    ///
    /// Events can arrive after the operation that caused them has already
    /// been applied (or undone), so the event is treated as a hint and the
    /// gateway's current session is what gets applied.
    pub async fn handle_auth_event(&self, event: AuthEvent) {
        let kind = match &event {
            AuthEvent::SignedIn(_) => "signed_in",
            AuthEvent::TokenRefreshed(_) => "token_refreshed",
            AuthEvent::SignedOut => "signed_out",
        };
        tracing::debug!(event = kind, "Auth event");
        self.reconcile().await;
    }

    async fn reconcile(&self) {
        if self.signing_out.load(Ordering::Acquire) {
            tracing::debug!("Sign-out in progress, skipping reconcile");
            return;
        }
        let epoch = self.sign_outs.load(Ordering::Acquire);

        let current = match self.gateway.restore_session().await {
            Ok(current) => unexpired(current),
            Err(e) => {
                tracing::error!(error = %e, "Failed to read gateway session");
                return;
            }
        };

        // A sign-out that started while the gateway was being read wins,
        // even if the gateway still reported the old session.
        let mut change = SessionChange::Unchanged;
        self.state.send_if_modified(|state| {
            if self.signing_out.load(Ordering::Acquire)
                || self.sign_outs.load(Ordering::Acquire) != epoch
            {
                return false;
            }
            change = state.set_session(current);
            change != SessionChange::Unchanged
        });
        self.follow_session_change(change).await;
    }

    // ─── Authentication ──────────────────────────────────────────

    /// Create an account. Never signs the user in.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<Identity> {
        let attrs = SignUpAttributes {
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
        };

        let outcome = self
            .gateway
            .create_account(email.trim(), password, &attrs)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Sign-up failed"))?;

        if let Some(implicit) = outcome.session {
            tracing::debug!(identity = %outcome.identity.id, "Discarding session issued at sign-up");
            if let Err(e) = self.gateway.end_session(&implicit).await {
                tracing::warn!(error = %e, "Failed to revoke session issued at sign-up");
            }
        }

        tracing::info!(identity = %outcome.identity.id, "Account created");
        Ok(outcome.identity)
    }

    /// Sign in and run the account and profile fetches.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<()> {
        let session = self
            .gateway
            .begin_session(email.trim(), password)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Sign-in failed"))?;

        tracing::info!(identity = %session.identity.id, "Signed in");
        self.apply_session(Some(session)).await;
        Ok(())
    }

    /// Clear all local state, then revoke the session remotely.
    ///
    /// A call made while another sign-out is running returns
    /// [`SignOutOutcome::AlreadyInProgress`] without doing anything.
    pub async fn sign_out(&self) -> SignOutOutcome {
        let Some(_guard) = SignOutGuard::acquire(&self.signing_out) else {
            tracing::debug!("Sign-out already in progress, ignoring");
            return SignOutOutcome::AlreadyInProgress;
        };

        let mut ended = None;
        self.state.send_if_modified(|state| {
            ended = state.session().cloned();
            self.sign_outs.fetch_add(1, Ordering::AcqRel);
            state.clear()
        });

        let Some(session) = ended else {
            tracing::debug!("Sign-out without a session");
            return SignOutOutcome::NoSession;
        };

        tracing::info!(identity = %session.identity.id, "Signed out");
        let remote_revoked = match self.gateway.end_session(&session).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Remote sign-out failed, local state already cleared");
                false
            }
        };

        SignOutOutcome::SignedOut { remote_revoked }
    }

    pub async fn reset_password(&self, email: &str) -> Result<()> {
        self.gateway
            .request_password_reset(email.trim())
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Password reset request failed"))
    }

    // ─── Profiles ────────────────────────────────────────────────

    /// Select a profile by id. Unknown ids leave the selection unchanged.
    pub fn switch_profile(&self, profile_id: i64) -> bool {
        let mut found = false;
        self.state.send_if_modified(|state| {
            let before = state.active_profile().map(|p| p.id);
            found = state.select_profile(profile_id);
            found && before != Some(profile_id)
        });

        if !found {
            tracing::warn!(profile_id, "Unknown profile id, keeping current selection");
        }
        found
    }

    /// Set or clear the active profile directly.
    pub fn set_active_profile(&self, profile: Option<&Profile>) -> bool {
        match profile {
            Some(profile) => self.switch_profile(profile.id),
            None => {
                self.state
                    .send_if_modified(|state| state.clear_active_profile());
                true
            }
        }
    }

    /// Re-fetch the profiles of the current account.
    ///
    /// The current selection is kept if the profile still exists.
    pub async fn refresh_profiles(&self) -> Result<()> {
        let account_id = self
            .state
            .borrow()
            .account()
            .map(|a| a.id)
            .ok_or(AppError::Unauthorized)?;

        self.load_profiles(account_id)
            .await
            .inspect_err(|e| tracing::error!(account_id, error = %e, "Failed to refresh profiles"))
    }

    // ─── Fetch chain ─────────────────────────────────────────────

    async fn apply_session(&self, session: Option<Session>) {
        let mut change = SessionChange::Unchanged;
        self.state.send_if_modified(|state| {
            change = state.set_session(session);
            change != SessionChange::Unchanged
        });
        self.follow_session_change(change).await;
    }

    async fn follow_session_change(&self, change: SessionChange) {
        match change {
            SessionChange::SignedIn(identity) => self.load_account(&identity).await,
            SessionChange::Refreshed => tracing::debug!("Session credentials refreshed"),
            SessionChange::SignedOut => tracing::info!("Session ended"),
            SessionChange::Unchanged => {}
        }
    }

    async fn load_account(&self, identity: &Identity) {
        let query = Query::new().eq("auth_user_id", identity.id.as_str());
        let fetched = match self.gateway.query_one(tables::ACCOUNTS, &query).await {
            Ok(row) => decode_row::<Account>(tables::ACCOUNTS, row),
            Err(e) => Err(e),
        };

        let account = match fetched {
            Ok(account) => account,
            Err(e) if e.is_not_found() => {
                self.force_sign_out(identity).await;
                return;
            }
            Err(e) => {
                tracing::error!(identity = %identity.id, error = %e, "Failed to load account");
                return;
            }
        };

        let account_id = account.id;
        let mut change = AccountChange::Stale;
        self.state.send_if_modified(|state| {
            change = state.set_account(&identity.id, account);
            change != AccountChange::Stale
        });

        match change {
            AccountChange::Installed(_) => {
                tracing::debug!(identity = %identity.id, account_id, "Account loaded");
                if let Err(e) = self.load_profiles(account_id).await {
                    tracing::error!(account_id, error = %e, "Failed to load profiles");
                }
            }
            AccountChange::Updated => tracing::debug!(account_id, "Account reloaded"),
            AccountChange::Stale => {
                tracing::debug!(identity = %identity.id, "Discarding account for stale identity")
            }
        }
    }

    async fn load_profiles(&self, account_id: i64) -> Result<()> {
        let query = Query::new().eq("account_id", account_id).order("id", true);
        let rows = self.gateway.query_many(tables::PROFILES, &query).await?;
        let profiles: Vec<Profile> = decode_rows(tables::PROFILES, rows)?;
        let count = profiles.len();

        let mut installed = false;
        self.state.send_if_modified(|state| {
            installed = state.set_profiles(account_id, profiles);
            installed
        });

        if installed {
            tracing::debug!(account_id, count, "Profiles loaded");
        } else {
            tracing::debug!(account_id, "Discarding profiles for stale account");
        }
        Ok(())
    }

    /// The identity has no account: clear everything and end the session.
    async fn force_sign_out(&self, identity: &Identity) {
        let _guard = SignOutGuard::acquire(&self.signing_out);

        let mut ended = None;
        self.state.send_if_modified(|state| {
            if state.identity().map(|i| i.id.as_str()) != Some(identity.id.as_str()) {
                return false;
            }
            ended = state.session().cloned();
            self.sign_outs.fetch_add(1, Ordering::AcqRel);
            state.clear()
        });

        let Some(session) = ended else {
            tracing::debug!(identity = %identity.id, "Identity already gone, nothing to force out");
            return;
        };

        tracing::warn!(identity = %identity.id, "No account for identity, forcing sign-out");
        if let Err(e) = self.gateway.end_session(&session).await {
            tracing::warn!(error = %e, "Remote sign-out failed during forced sign-out");
        }
    }
}

/// Drop a session whose access token has already expired.
fn unexpired(session: Option<Session>) -> Option<Session> {
    session.filter(|s| {
        let expired = s.is_expired(Utc::now());
        if expired {
            tracing::info!(identity = %s.identity.id, "Ignoring expired session");
        }
        !expired
    })
}
