// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session, account and profile state.

pub mod controller;
pub mod state;

pub use controller::{SessionController, SignOutOutcome};
pub use state::{AccountChange, Phase, SessionChange, SessionState};
