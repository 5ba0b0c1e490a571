// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Remote data gateway: the hosted auth, row storage and object storage API.
//!
//! The [`Gateway`] trait is the only seam between the client core and the
//! backend. Two implementations ship with the crate:
//! - [`HttpGateway`] talks to the hosted REST API over `reqwest`
//! - [`MemoryGateway`] keeps everything in-process (tests, offline demos)
//!
//! Rows cross the boundary as loose JSON and are decoded into
//! [`crate::models`] types by the callers.

pub mod http;
pub mod memory;

pub use http::HttpGateway;
pub use memory::{GatewayOp, MemoryGateway};

use crate::error::Result;
use crate::models::{Identity, Session};
use serde::Deserialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::future::Future;
use tokio::sync::broadcast;

/// Loosely-typed row as returned by the gateway.
pub type Row = Value;

/// Table names as constants.
pub mod tables {
    pub const ACCOUNTS: &str = "accounts";
    /// Athlete profiles live in the `users` table.
    pub const PROFILES: &str = "users";
    pub const TRAINING_SESSIONS: &str = "training_sessions";
    pub const TRAINING_EXERCISES: &str = "training_exercises";
    pub const EXERCISES: &str = "exercises";
    pub const VIDEOS: &str = "videos";
    pub const FRIENDSHIPS: &str = "friendships";
}

/// Session-change notification pushed by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(Session),
    TokenRefreshed(Session),
    SignedOut,
}

/// User metadata attached at sign-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpAttributes {
    pub first_name: String,
    pub last_name: String,
}

/// Result of account creation.
///
/// Some backends hand out a session straight away when email confirmation
/// is disabled; it is returned here so the caller can revoke it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpOutcome {
    pub identity: Identity,
    pub session: Option<Session>,
}

/// Entry in an object storage listing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StoredObject {
    pub name: String,
    /// `None` for folder placeholders
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// Contract with the hosted backend.
///
/// `create_account` must not install or announce a session.
/// `end_session` announces [`AuthEvent::SignedOut`] only when it ends the
/// gateway's current session.
pub trait Gateway: Send + Sync {
    fn create_account(
        &self,
        email: &str,
        password: &str,
        attrs: &SignUpAttributes,
    ) -> impl Future<Output = Result<SignUpOutcome>> + Send;

    fn begin_session(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Session>> + Send;

    fn end_session(&self, session: &Session) -> impl Future<Output = Result<()>> + Send;

    fn request_password_reset(&self, email: &str) -> impl Future<Output = Result<()>> + Send;

    /// Session persisted by the gateway client, if any.
    fn restore_session(&self) -> impl Future<Output = Result<Option<Session>>> + Send;

    /// Subscribe to session-change notifications.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;

    /// Exactly one row; zero rows is [`crate::error::AppError::NotFound`].
    fn query_one(&self, table: &str, query: &Query) -> impl Future<Output = Result<Row>> + Send;

    fn query_many(
        &self,
        table: &str,
        query: &Query,
    ) -> impl Future<Output = Result<Vec<Row>>> + Send;

    /// Insert a row and return it as stored (with generated columns).
    fn insert(&self, table: &str, row: Row) -> impl Future<Output = Result<Row>> + Send;

    fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> impl Future<Output = Result<Vec<StoredObject>>> + Send;

    fn public_url(&self, bucket: &str, path: &str) -> String;
}

// ─── Query Model ─────────────────────────────────────────────────────────────

/// Row filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    In(String, Vec<Value>),
    /// Matches when any inner filter matches.
    AnyOf(Vec<Filter>),
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(column.to_string(), value.into())
    }

    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Filter::Eq(col, value) => row.get(col).is_some_and(|v| values_equal(v, value)),
            Filter::In(col, values) => row
                .get(col)
                .is_some_and(|v| values.iter().any(|candidate| values_equal(v, candidate))),
            Filter::AnyOf(filters) => filters.iter().any(|f| f.matches(row)),
        }
    }

    /// Expression form used inside a REST `or=(...)` group.
    fn to_expr(&self) -> String {
        match self {
            Filter::Eq(col, value) => format!("{}.eq.{}", col, encode_value(value)),
            Filter::In(col, values) => format!("{}.in.({})", col, encode_list(values)),
            Filter::AnyOf(filters) => format!("or({})", join_exprs(filters)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Declarative row query, evaluated in memory or encoded as REST params.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    filters: Vec<Filter>,
    order: Option<Order>,
    limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    pub fn in_list<V: Into<Value>>(
        mut self,
        column: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.filters.push(Filter::In(
            column.to_string(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn any_of(mut self, filters: Vec<Filter>) -> Self {
        self.filters.push(Filter::AnyOf(filters));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.filters.iter().all(|f| f.matches(row))
    }

    /// Filter, sort (stable) and truncate rows the way the backend would.
    pub fn apply(&self, rows: impl IntoIterator<Item = Row>) -> Vec<Row> {
        let mut out: Vec<Row> = rows.into_iter().filter(|r| self.matches(r)).collect();

        if let Some(order) = &self.order {
            out.sort_by(|a, b| {
                compare_values(a.get(&order.column), b.get(&order.column), order.ascending)
            });
        }

        if let Some(limit) = self.limit {
            out.truncate(limit);
        }
        out
    }

    /// REST query parameters (`col=eq.v`, `or=(...)`, `order=col.desc`, ...).
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), "*".to_string())];

        for filter in &self.filters {
            match filter {
                Filter::Eq(col, value) => {
                    params.push((col.clone(), format!("eq.{}", encode_value(value))))
                }
                Filter::In(col, values) => {
                    params.push((col.clone(), format!("in.({})", encode_list(values))))
                }
                Filter::AnyOf(filters) => {
                    params.push(("or".to_string(), format!("({})", join_exprs(filters))))
                }
            }
        }

        if let Some(order) = &self.order {
            let direction = if order.ascending { "asc" } else { "desc" };
            params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Missing and null values sort last in either direction.
fn compare_values(a: Option<&Value>, b: Option<&Value>, ascending: bool) -> Ordering {
    let is_null = |v: Option<&Value>| v.map_or(true, Value::is_null);
    match (is_null(a), is_null(b)) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }

    let ord = match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => Ordering::Equal,
    };
    if ascending {
        ord
    } else {
        ord.reverse()
    }
}

fn encode_value(value: &Value) -> String {
    let raw = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if raw.contains([',', '(', ')', '"', ' ']) {
        format!("\"{}\"", raw.replace('"', "\\\""))
    } else {
        raw
    }
}

fn encode_list(values: &[Value]) -> String {
    values.iter().map(encode_value).collect::<Vec<_>>().join(",")
}

fn join_exprs(filters: &[Filter]) -> String {
    filters
        .iter()
        .map(Filter::to_expr)
        .collect::<Vec<_>>()
        .join(",")
}
