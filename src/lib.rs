// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! UPRO Trainer: client core for a youth football training app
//!
//! This crate holds the session & profile controller that sequences
//! sign-in → account → profiles, the gateway contract with the hosted
//! backend, and the catalogue, profile and media services built on it.

pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod models;
pub mod services;
pub mod session;

use config::Config;
use error::Result;
use gateway::{Gateway, HttpGateway};
use services::{CatalogService, MediaLibrary, ProfileService};
use session::SessionController;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Shared application context.
///
/// Built once at startup and handed to the presentation layer.
pub struct AppContext<G: Gateway> {
    pub config: Config,
    pub session: Arc<SessionController<G>>,
    pub catalog: CatalogService<G>,
    pub profiles: ProfileService<G>,
    pub media: MediaLibrary<G>,
}

impl<G: Gateway + 'static> AppContext<G> {
    pub fn new(config: Config, gateway: Arc<G>) -> Self {
        let session = Arc::new(SessionController::new(Arc::clone(&gateway)));
        Self {
            catalog: CatalogService::new(Arc::clone(&gateway)),
            profiles: ProfileService::new(Arc::clone(&gateway), Arc::clone(&session)),
            media: MediaLibrary::new(gateway, config.media_bucket.clone()),
            session,
            config,
        }
    }

    /// Follow gateway auth events and resolve the persisted session.
    ///
    /// Returns the listener task handle; dropping it leaves the task running.
    pub async fn start(&self) -> JoinHandle<()> {
        let listener = self.session.spawn_event_listener();
        self.session.start().await;
        listener
    }
}

impl AppContext<HttpGateway> {
    /// Context backed by the hosted backend.
    pub fn connect(config: Config) -> Result<Self> {
        let gateway = Arc::new(HttpGateway::new(&config)?);
        tracing::info!(url = %config.gateway_url, "Gateway client initialized");
        Ok(Self::new(config, gateway))
    }
}
