// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - catalogue, profile and media access.

pub mod catalog;
pub mod media;
pub mod profiles;
pub mod youtube;

pub use catalog::{CatalogService, FeaturedVideo};
pub use media::{MediaItem, MediaLibrary};
pub use profiles::ProfileService;
