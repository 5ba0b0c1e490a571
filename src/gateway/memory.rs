// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process gateway for tests and offline use.
//!
//! Behaves like the hosted backend closely enough to drive the session
//! controller end to end: password identities, tables of JSON rows, storage
//! buckets and session-change notifications. Tests can inject one-shot
//! failures, add latency and count calls per operation.

use crate::error::{AppError, Result};
use crate::gateway::{
    tables, AuthEvent, Gateway, Query, Row, SignUpAttributes, SignUpOutcome, StoredObject,
};
use crate::models::{Identity, Session};
use chrono::{Duration, Utc};
use dashmap::DashMap;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 16;
const SESSION_LIFETIME_HOURS: i64 = 1;

/// Gateway operation, for failure injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    CreateAccount,
    BeginSession,
    EndSession,
    RequestPasswordReset,
    RestoreSession,
    QueryOne,
    QueryMany,
    Insert,
    ListObjects,
}

#[derive(Clone)]
struct Credential {
    identity: Identity,
    password: String,
}

struct Inner {
    /// Keyed by lower-cased email
    credentials: DashMap<String, Credential>,
    tables: DashMap<String, Vec<Row>>,
    buckets: DashMap<String, Vec<StoredObject>>,
    current: Mutex<Option<Session>>,
    failures: DashMap<GatewayOp, String>,
    calls: DashMap<GatewayOp, usize>,
    latency: Mutex<Option<std::time::Duration>>,
    events: broadcast::Sender<AuthEvent>,
    next_token: AtomicU64,
    next_row_id: AtomicI64,
    auto_confirm: AtomicBool,
}

/// In-memory [`Gateway`] implementation.
#[derive(Clone)]
pub struct MemoryGateway {
    inner: Arc<Inner>,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGateway {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                credentials: DashMap::new(),
                tables: DashMap::new(),
                buckets: DashMap::new(),
                current: Mutex::new(None),
                failures: DashMap::new(),
                calls: DashMap::new(),
                latency: Mutex::new(None),
                events,
                next_token: AtomicU64::new(1),
                next_row_id: AtomicI64::new(1000),
                auto_confirm: AtomicBool::new(true),
            }),
        }
    }

    // ─── Seeding ─────────────────────────────────────────────────

    /// Register an identity without creating its account row.
    pub fn add_identity(&self, email: &str, password: &str) -> Identity {
        let n = self.inner.next_token.fetch_add(1, Ordering::Relaxed);
        let identity = Identity {
            id: format!("00000000-0000-4000-8000-{:012}", n),
            email: Some(email.to_string()),
        };
        self.inner.credentials.insert(
            email.to_lowercase(),
            Credential {
                identity: identity.clone(),
                password: password.to_string(),
            },
        );
        identity
    }

    /// Append rows to a table as-is.
    pub fn seed_rows(&self, table: &str, rows: impl IntoIterator<Item = Row>) {
        self.inner
            .tables
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.inner
            .tables
            .get(table)
            .map(|rows| rows.clone())
            .unwrap_or_default()
    }

    /// Remove rows matching the query; returns how many were removed.
    pub fn delete_rows(&self, table: &str, query: &Query) -> usize {
        let Some(mut rows) = self.inner.tables.get_mut(table) else {
            return 0;
        };
        let before = rows.len();
        rows.retain(|row| !query.matches(row));
        before - rows.len()
    }

    pub fn seed_objects(&self, bucket: &str, objects: impl IntoIterator<Item = StoredObject>) {
        self.inner
            .buckets
            .entry(bucket.to_string())
            .or_default()
            .extend(objects);
    }

    /// Whether sign-up issues a session straight away (default: yes).
    pub fn set_auto_confirm(&self, enabled: bool) {
        self.inner.auto_confirm.store(enabled, Ordering::Relaxed);
    }

    // ─── Test Controls ───────────────────────────────────────────

    /// Make the next call of `op` fail with a transient gateway error.
    pub fn fail_next(&self, op: GatewayOp, message: &str) {
        self.inner.failures.insert(op, message.to_string());
    }

    /// Delay every call by `latency` before it is served.
    pub fn set_latency(&self, latency: Option<std::time::Duration>) {
        *lock(&self.inner.latency) = latency;
    }

    pub fn calls(&self, op: GatewayOp) -> usize {
        self.inner.calls.get(&op).map(|c| *c).unwrap_or(0)
    }

    pub fn current_session(&self) -> Option<Session> {
        lock(&self.inner.current).clone()
    }

    /// Install a session as if it had been persisted by a previous run.
    pub fn persist_session(&self, session: Session) {
        *lock(&self.inner.current) = Some(session);
    }

    /// Invalidate the current session from the server side.
    pub fn expire_session(&self) {
        if lock(&self.inner.current).take().is_some() {
            self.announce(AuthEvent::SignedOut);
        }
    }

    // ─── Internals ───────────────────────────────────────────────

    /// Record the call, apply latency and any injected failure.
    async fn enter(&self, op: GatewayOp) -> Result<()> {
        *self.inner.calls.entry(op).or_insert(0) += 1;

        let latency = *lock(&self.inner.latency);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        match self.inner.failures.remove(&op) {
            Some((_, message)) => Err(AppError::Gateway(message)),
            None => Ok(()),
        }
    }

    fn announce(&self, event: AuthEvent) {
        self.inner.events.send(event).ok();
    }

    fn issue_session(&self, identity: Identity) -> Session {
        let n = self.inner.next_token.fetch_add(1, Ordering::Relaxed);
        Session {
            access_token: format!("mem-access-{}", n),
            refresh_token: Some(format!("mem-refresh-{}", n)),
            expires_at: Some(Utc::now() + Duration::hours(SESSION_LIFETIME_HOURS)),
            identity,
        }
    }

    fn next_row_id(&self) -> i64 {
        self.inner.next_row_id.fetch_add(1, Ordering::Relaxed)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl Gateway for MemoryGateway {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        attrs: &SignUpAttributes,
    ) -> Result<SignUpOutcome> {
        self.enter(GatewayOp::CreateAccount).await?;

        if self.inner.credentials.contains_key(&email.to_lowercase()) {
            return Err(AppError::Gateway("User already registered".to_string()));
        }
        if password.len() < 6 {
            return Err(AppError::Gateway(
                "Password should be at least 6 characters".to_string(),
            ));
        }

        let identity = self.add_identity(email, password);

        // Mirrors the backend trigger that creates the account row.
        let now = Utc::now().to_rfc3339();
        let account = json!({
            "id": self.next_row_id(),
            "auth_user_id": identity.id,
            "email": email,
            "first_name": attrs.first_name,
            "last_name": attrs.last_name,
            "subscription_type": 1,
            "created_at": now,
            "updated_at": now,
        });
        self.seed_rows(tables::ACCOUNTS, [account]);

        let session = self
            .inner
            .auto_confirm
            .load(Ordering::Relaxed)
            .then(|| self.issue_session(identity.clone()));

        Ok(SignUpOutcome { identity, session })
    }

    async fn begin_session(&self, email: &str, password: &str) -> Result<Session> {
        self.enter(GatewayOp::BeginSession).await?;

        let credential = self
            .inner
            .credentials
            .get(&email.to_lowercase())
            .map(|c| c.clone())
            .filter(|c| c.password == password)
            .ok_or_else(|| AppError::Gateway("Invalid login credentials".to_string()))?;

        let session = self.issue_session(credential.identity);
        *lock(&self.inner.current) = Some(session.clone());
        self.announce(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn end_session(&self, session: &Session) -> Result<()> {
        let result = self.enter(GatewayOp::EndSession).await;

        let was_current = {
            let mut current = lock(&self.inner.current);
            let matches = current
                .as_ref()
                .is_some_and(|c| c.access_token == session.access_token);
            if matches {
                *current = None;
            }
            matches
        };
        if was_current {
            self.announce(AuthEvent::SignedOut);
        }

        result
    }

    async fn request_password_reset(&self, _email: &str) -> Result<()> {
        // Unknown emails succeed too, so callers cannot probe for accounts.
        self.enter(GatewayOp::RequestPasswordReset).await
    }

    async fn restore_session(&self) -> Result<Option<Session>> {
        self.enter(GatewayOp::RestoreSession).await?;
        Ok(self.current_session())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.inner.events.subscribe()
    }

    async fn query_one(&self, table: &str, query: &Query) -> Result<Row> {
        self.enter(GatewayOp::QueryOne).await?;

        let mut rows = query.apply(self.rows(table));
        match rows.len() {
            1 => Ok(rows.swap_remove(0)),
            0 => Err(AppError::NotFound(format!("No rows in {}", table))),
            n => Err(AppError::Gateway(format!(
                "Expected one row in {}, found {}",
                table, n
            ))),
        }
    }

    async fn query_many(&self, table: &str, query: &Query) -> Result<Vec<Row>> {
        self.enter(GatewayOp::QueryMany).await?;
        Ok(query.apply(self.rows(table)))
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row> {
        self.enter(GatewayOp::Insert).await?;

        let Value::Object(mut fields) = row else {
            return Err(AppError::BadRequest(format!(
                "Insert into {} expects an object",
                table
            )));
        };
        fields
            .entry("id")
            .or_insert_with(|| json!(self.next_row_id()));
        fields
            .entry("created_at")
            .or_insert_with(|| json!(Utc::now().to_rfc3339()));

        let stored = Value::Object(fields);
        self.seed_rows(table, [stored.clone()]);
        Ok(stored)
    }

    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<StoredObject>> {
        self.enter(GatewayOp::ListObjects).await?;

        let mut objects: Vec<StoredObject> = self
            .inner
            .buckets
            .get(bucket)
            .map(|objs| {
                objs.iter()
                    .filter(|o| o.name.starts_with(prefix))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        objects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(objects)
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("memory://{}/{}", bucket, path.trim_start_matches('/'))
    }
}
