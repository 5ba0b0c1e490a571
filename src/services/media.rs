// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Media listing from object storage.

use crate::error::Result;
use crate::gateway::Gateway;
use serde::Serialize;
use std::sync::Arc;

/// Playable media file with its resolved public URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaItem {
    pub name: String,
    pub url: String,
}

pub struct MediaLibrary<G: Gateway> {
    gateway: Arc<G>,
    bucket: String,
}

impl<G: Gateway> MediaLibrary<G> {
    pub fn new(gateway: Arc<G>, bucket: impl Into<String>) -> Self {
        Self {
            gateway,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// List files under `prefix`, skipping folder placeholders.
    pub async fn list(&self, prefix: &str) -> Result<Vec<MediaItem>> {
        let objects = self.gateway.list_objects(&self.bucket, prefix).await?;
        let total = objects.len();

        let items: Vec<MediaItem> = objects
            .into_iter()
            .filter(|o| o.id.is_some())
            .map(|o| {
                let path = join_path(prefix, &o.name);
                MediaItem {
                    url: self.gateway.public_url(&self.bucket, &path),
                    name: o.name,
                }
            })
            .collect();

        tracing::debug!(
            bucket = %self.bucket,
            prefix,
            total,
            files = items.len(),
            "Listed media"
        );
        Ok(items)
    }
}

/// Storage listings return names relative to the listed prefix.
fn join_path(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() || name.starts_with(&format!("{}/", prefix)) {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}
