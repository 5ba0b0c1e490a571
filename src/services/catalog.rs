// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read-only access to the training catalogue.

use crate::error::{AppError, Result};
use crate::gateway::{tables, Gateway, Query};
use crate::models::{decode_row, decode_rows, Difficulty, Exercise, TrainingExercise, TrainingSession, Video};
use std::sync::Arc;

/// A video paired with its embeddable player URL.
#[derive(Debug, Clone, PartialEq)]
pub struct FeaturedVideo {
    pub video: Video,
    /// `None` when the video URL is not a recognisable YouTube link
    pub embed_url: Option<String>,
}

pub struct CatalogService<G: Gateway> {
    gateway: Arc<G>,
}

impl<G: Gateway> CatalogService<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    // ─── Trainings ───────────────────────────────────────────────

    pub async fn list_trainings(&self) -> Result<Vec<TrainingSession>> {
        let rows = self
            .gateway
            .query_many(tables::TRAINING_SESSIONS, &Query::new())
            .await?;
        decode_rows(tables::TRAINING_SESSIONS, rows)
    }

    /// A missing training is `Ok(None)`, not an error.
    pub async fn get_training(&self, id: i64) -> Result<Option<TrainingSession>> {
        let rows = self
            .gateway
            .query_many(tables::TRAINING_SESSIONS, &Query::new().eq("id", id).limit(1))
            .await?;
        rows.into_iter()
            .next()
            .map(|row| decode_row(tables::TRAINING_SESSIONS, row))
            .transpose()
    }

    // ─── Exercises ───────────────────────────────────────────────

    /// All exercises, newest (highest id) first.
    pub async fn list_exercises(&self) -> Result<Vec<Exercise>> {
        let rows = self
            .gateway
            .query_many(tables::EXERCISES, &Query::new().order("id", false))
            .await?;
        decode_rows(tables::EXERCISES, rows)
    }

    pub async fn get_exercise(&self, id: i64) -> Result<Exercise> {
        let row = self
            .gateway
            .query_one(tables::EXERCISES, &Query::new().eq("id", id))
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => AppError::NotFound(format!("Exercise {}", id)),
                other => other,
            })?;
        decode_row(tables::EXERCISES, row)
    }

    /// Exercises of a training, in join-table order.
    pub async fn exercises_for_training(&self, training_id: i64) -> Result<Vec<Exercise>> {
        let links = self
            .gateway
            .query_many(
                tables::TRAINING_EXERCISES,
                &Query::new().eq("training_session_id", training_id),
            )
            .await?;
        let links: Vec<TrainingExercise> = decode_rows(tables::TRAINING_EXERCISES, links)?;
        if links.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = links.iter().map(|l| l.exercise_id).collect();
        let rows = self
            .gateway
            .query_many(tables::EXERCISES, &Query::new().in_list("id", ids.clone()))
            .await?;
        let mut exercises: Vec<Exercise> = decode_rows(tables::EXERCISES, rows)?;
        exercises.sort_by_key(|e| position_of(&ids, e.id).unwrap_or(usize::MAX));

        tracing::debug!(training_id, count = exercises.len(), "Loaded training exercises");
        Ok(exercises)
    }

    // ─── Videos ──────────────────────────────────────────────────

    pub async fn list_videos(&self) -> Result<Vec<Video>> {
        let rows = self
            .gateway
            .query_many(tables::VIDEOS, &Query::new())
            .await?;
        decode_rows(tables::VIDEOS, rows)
    }

    pub async fn first_video(&self) -> Result<Option<Video>> {
        let videos = self.list_videos().await?;
        if videos.is_empty() {
            tracing::debug!("No videos available");
        }
        Ok(videos.into_iter().next())
    }

    /// The video shown on the daily screen.
    pub async fn daily_video(&self) -> Result<Option<FeaturedVideo>> {
        Ok(self.first_video().await?.map(|video| FeaturedVideo {
            embed_url: video.embed_url(),
            video,
        }))
    }
}

// ─── Helpers ─────────────────────────────────────────────────────

pub fn exercises_by_difficulty(exercises: &[Exercise], difficulty: Difficulty) -> Vec<&Exercise> {
    exercises
        .iter()
        .filter(|e| e.difficulty == difficulty)
        .collect()
}

/// Exercises whose duration lies in `min..=max` minutes.
pub fn exercises_by_duration(exercises: &[Exercise], min: i32, max: i32) -> Vec<&Exercise> {
    exercises
        .iter()
        .filter(|e| (min..=max).contains(&e.duration))
        .collect()
}

pub fn position_of(ids: &[i64], id: i64) -> Option<usize> {
    ids.iter().position(|&candidate| candidate == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(id: i64, difficulty: Difficulty, duration: i32) -> Exercise {
        Exercise {
            id,
            title: format!("Drill {}", id),
            description: String::new(),
            experience_reward: 10,
            difficulty,
            duration,
        }
    }

    #[test]
    fn test_filter_by_difficulty() {
        let all = vec![
            exercise(1, Difficulty::Easy, 5),
            exercise(2, Difficulty::Hard, 20),
            exercise(3, Difficulty::Easy, 10),
        ];
        let easy: Vec<i64> = exercises_by_difficulty(&all, Difficulty::Easy)
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(easy, vec![1, 3]);
        assert!(exercises_by_difficulty(&all, Difficulty::Medium).is_empty());
    }

    #[test]
    fn test_filter_by_duration_is_inclusive() {
        let all = vec![
            exercise(1, Difficulty::Easy, 5),
            exercise(2, Difficulty::Easy, 10),
            exercise(3, Difficulty::Easy, 15),
        ];
        let ids: Vec<i64> = exercises_by_duration(&all, 5, 10)
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(exercises_by_duration(&all, 11, 14).is_empty());
    }

    #[test]
    fn test_position_of() {
        assert_eq!(position_of(&[9, 4, 7], 7), Some(2));
        assert_eq!(position_of(&[9, 4, 7], 1), None);
    }
}
