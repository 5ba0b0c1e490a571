// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use upro_trainer::config::Config;
use upro_trainer::gateway::{tables, Gateway, MemoryGateway, SignUpAttributes};
use upro_trainer::session::{SessionController, SessionState};
use upro_trainer::AppContext;

pub const PASSWORD: &str = "correct-horse";

/// Registered user seeded into a [`MemoryGateway`].
#[allow(dead_code)]
pub struct SeededUser {
    pub email: String,
    pub identity_id: String,
    pub account_id: i64,
}

/// Create an identity and its account row.
#[allow(dead_code)]
pub async fn seed_user(gateway: &MemoryGateway, email: &str) -> SeededUser {
    let outcome = gateway
        .create_account(
            email,
            PASSWORD,
            &SignUpAttributes {
                first_name: "Test".to_string(),
                last_name: "Parent".to_string(),
            },
        )
        .await
        .expect("Failed to seed user");

    let account_id = gateway
        .rows(tables::ACCOUNTS)
        .iter()
        .find(|row| row["auth_user_id"] == outcome.identity.id.as_str())
        .and_then(|row| row["id"].as_i64())
        .expect("Seeded account row missing");

    SeededUser {
        email: email.to_string(),
        identity_id: outcome.identity.id,
        account_id,
    }
}

/// Seed profile rows `(id, name)` under `account_id`.
#[allow(dead_code)]
pub fn seed_profiles(gateway: &MemoryGateway, account_id: i64, profiles: &[(i64, &str)]) {
    gateway.seed_rows(
        tables::PROFILES,
        profiles.iter().map(|(id, name)| {
            json!({
                "id": id,
                "name": name,
                "account_id": account_id,
                "experience_total": 0,
                "subscription_type": 1,
            })
        }),
    );
}

/// Controller over a fresh gateway, no listener.
#[allow(dead_code)]
pub fn controller() -> (Arc<MemoryGateway>, Arc<SessionController<MemoryGateway>>) {
    let gateway = Arc::new(MemoryGateway::new());
    let controller = Arc::new(SessionController::new(Arc::clone(&gateway)));
    (gateway, controller)
}

/// Full context over a fresh in-memory gateway.
#[allow(dead_code)]
pub fn test_context() -> (Arc<MemoryGateway>, AppContext<MemoryGateway>) {
    let gateway = Arc::new(MemoryGateway::new());
    let ctx = AppContext::new(Config::test_default(), Arc::clone(&gateway));
    (gateway, ctx)
}

/// Wait until the controller state satisfies `predicate`, or panic.
#[allow(dead_code)]
pub async fn wait_for<G, F>(controller: &SessionController<G>, predicate: F) -> SessionState
where
    G: Gateway,
    F: Fn(&SessionState) -> bool,
{
    let mut rx = controller.subscribe();
    let result = tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|s| predicate(s))).await;
    match result {
        Ok(Ok(state)) => state.clone(),
        Ok(Err(_)) => panic!("State channel closed"),
        Err(_) => panic!("Timed out waiting for state; last: {:?}", controller.snapshot()),
    }
}
