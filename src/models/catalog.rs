// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Training catalogue models: trainings, exercises, videos and friendships.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SubscriptionTier;
use crate::services::youtube;

/// Training session (`training_sessions` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSession {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// XP granted on completion
    #[serde(default)]
    pub experience_reward: i64,
    #[serde(default)]
    pub duration_minutes: Option<i32>,
    /// Minimum tier required (1 = free, 2 = premium)
    #[serde(default)]
    pub subscription_type_id: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl TrainingSession {
    pub fn requires_premium(&self) -> bool {
        self.subscription_type_id.map(SubscriptionTier::from_code) == Some(SubscriptionTier::Premium)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Star rating shown next to an exercise (1-3).
    pub fn level(&self) -> u8 {
        match self {
            Difficulty::Easy => 1,
            Difficulty::Medium => 2,
            Difficulty::Hard => 3,
        }
    }
}

/// Single exercise (`exercises` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub experience_reward: i64,
    pub difficulty: Difficulty,
    /// Duration in minutes
    pub duration: i32,
}

/// Join row linking a training session to its exercises.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingExercise {
    pub training_session_id: i64,
    pub exercise_id: i64,
}

/// Instructional video (`videos` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: i64,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Video {
    /// Embeddable player URL, if `url` points at a recognisable YouTube video.
    pub fn embed_url(&self) -> Option<String> {
        let id = youtube::extract_video_id(self.url.as_deref()?)?;
        Some(youtube::embed_url(id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendshipStatus {
    Pending,
    Accepted,
    Rejected,
    Blocked,
}

/// Friendship between two profiles (`friendships` table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Friendship {
    pub requester_id: i64,
    pub addressee_id: i64,
    pub status: FriendshipStatus,
}

impl Friendship {
    /// The other side of the friendship, seen from `profile_id`.
    pub fn other(&self, profile_id: i64) -> i64 {
        if self.requester_id == profile_id {
            self.addressee_id
        } else {
            self.requester_id
        }
    }
}
