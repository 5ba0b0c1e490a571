// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session state and its pure transitions.
//!
//! Every mutation of the controller's state goes through one of the methods
//! below, so the invariants hold by construction:
//! - an account exists only while a session exists
//! - profiles exist only while an account exists
//! - the active profile is always a member of the current profile set
//!
//! The active profile is stored as an id and resolved against the profile
//! set on read.

use crate::models::{Account, Identity, Profile, Session};

/// Outer state of the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Unauthenticated,
    AuthenticatedNoAccount,
    AuthenticatedNoProfiles,
    AuthenticatedWithProfiles { active_profile: Option<i64> },
}

/// What [`SessionState::set_session`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChange {
    /// Nothing changed.
    Unchanged,
    /// Same identity, new credentials; downstream state is kept.
    Refreshed,
    /// A new identity was installed; the account must be fetched.
    SignedIn(Identity),
    /// The session and everything below it was cleared.
    SignedOut,
}

/// What [`SessionState::set_account`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountChange {
    /// The account belongs to an identity that is no longer installed.
    Stale,
    /// Same account id; fields updated, profiles kept.
    Updated,
    /// A new account was installed; its profiles must be fetched.
    Installed(i64),
}

/// Snapshot of everything the presentation layer may read.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    session: Option<Session>,
    account: Option<Account>,
    profiles: Vec<Profile>,
    active_profile_id: Option<i64>,
    initializing: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            session: None,
            account: None,
            profiles: Vec::new(),
            active_profile_id: None,
            initializing: true,
        }
    }
}

impl SessionState {
    // ─── Reads ───────────────────────────────────────────────────

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.session.as_ref().map(|s| &s.identity)
    }

    pub fn account(&self) -> Option<&Account> {
        self.account.as_ref()
    }

    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn active_profile(&self) -> Option<&Profile> {
        let id = self.active_profile_id?;
        self.profiles.iter().find(|p| p.id == id)
    }

    /// Whether the persisted session is still being resolved at startup.
    pub fn is_initializing(&self) -> bool {
        self.initializing
    }

    pub fn phase(&self) -> Phase {
        match (&self.session, &self.account) {
            (None, _) => Phase::Unauthenticated,
            (Some(_), None) => Phase::AuthenticatedNoAccount,
            (Some(_), Some(_)) if self.profiles.is_empty() => Phase::AuthenticatedNoProfiles,
            (Some(_), Some(_)) => Phase::AuthenticatedWithProfiles {
                active_profile: self.active_profile().map(|p| p.id),
            },
        }
    }

    // ─── Transitions ─────────────────────────────────────────────

    pub fn finish_initializing(&mut self) -> bool {
        std::mem::replace(&mut self.initializing, false)
    }

    /// Install or clear the session.
    ///
    /// A session for the identity already installed only swaps credentials;
    /// a different identity resets everything downstream.
    pub fn set_session(&mut self, session: Option<Session>) -> SessionChange {
        match (self.session.as_ref(), session) {
            (None, None) => SessionChange::Unchanged,
            (Some(_), None) => {
                self.clear();
                SessionChange::SignedOut
            }
            (Some(current), Some(next)) if current.same_identity(&next) => {
                if *current == next {
                    return SessionChange::Unchanged;
                }
                self.session = Some(next);
                SessionChange::Refreshed
            }
            (_, Some(next)) => {
                self.clear_account();
                let identity = next.identity.clone();
                self.session = Some(next);
                SessionChange::SignedIn(identity)
            }
        }
    }

    /// Clear session, account, profiles and selection in one step.
    ///
    /// Returns `false` when there was nothing to clear.
    pub fn clear(&mut self) -> bool {
        let had_session = self.session.take().is_some();
        let had_account = self.clear_account();
        had_session || had_account
    }

    fn clear_account(&mut self) -> bool {
        let had_account = self.account.take().is_some();
        let had_profiles = !self.profiles.is_empty();
        self.profiles.clear();
        self.active_profile_id = None;
        had_account || had_profiles
    }

    /// Install the account fetched for `identity_id`.
    pub fn set_account(&mut self, identity_id: &str, account: Account) -> AccountChange {
        if self.identity().map(|i| i.id.as_str()) != Some(identity_id) {
            return AccountChange::Stale;
        }

        match &self.account {
            Some(current) if current.id == account.id => {
                self.account = Some(account);
                AccountChange::Updated
            }
            _ => {
                self.clear_account();
                let id = account.id;
                self.account = Some(account);
                AccountChange::Installed(id)
            }
        }
    }

    /// Replace the profile set fetched for `account_id`.
    ///
    /// The current selection survives if the selected profile is still in
    /// the set. Otherwise, and only then, the first profile is selected.
    /// Returns `false` if the result is stale.
    pub fn set_profiles(&mut self, account_id: i64, profiles: Vec<Profile>) -> bool {
        if self.account.as_ref().map(|a| a.id) != Some(account_id) {
            return false;
        }

        self.profiles = profiles;
        let still_present = self
            .active_profile_id
            .is_some_and(|id| self.profiles.iter().any(|p| p.id == id));
        if !still_present {
            self.active_profile_id = self.profiles.first().map(|p| p.id);
        }
        true
    }

    /// Select the profile with `profile_id`; unknown ids are rejected.
    pub fn select_profile(&mut self, profile_id: i64) -> bool {
        if self.profiles.iter().any(|p| p.id == profile_id) {
            self.active_profile_id = Some(profile_id);
            true
        } else {
            false
        }
    }

    /// Drop the selection without touching the profile set.
    pub fn clear_active_profile(&mut self) -> bool {
        self.active_profile_id.take().is_some()
    }
}
