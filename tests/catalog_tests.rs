// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use serde_json::json;
use upro_trainer::error::AppError;
use upro_trainer::gateway::{tables, GatewayOp, MemoryGateway, StoredObject};
use upro_trainer::models::{Difficulty, Profile};
use upro_trainer::services::catalog::exercises_by_difficulty;

mod common;
use common::test_context;

fn seed_catalog(gateway: &MemoryGateway) {
    gateway.seed_rows(
        tables::TRAINING_SESSIONS,
        vec![
            json!({"id": 1, "title": "Ball Mastery", "experience_reward": 50, "subscription_type_id": 1}),
            json!({"id": 2, "title": "Elite Finishing", "experience_reward": 120, "subscription_type_id": 2}),
        ],
    );
    gateway.seed_rows(
        tables::EXERCISES,
        vec![
            json!({"id": 10, "title": "Toe Taps", "difficulty": "easy", "duration": 5}),
            json!({"id": 11, "title": "Cone Weave", "difficulty": "medium", "duration": 10}),
            json!({"id": 12, "title": "Volleys", "difficulty": "hard", "duration": 15}),
        ],
    );
    gateway.seed_rows(
        tables::TRAINING_EXERCISES,
        vec![
            json!({"training_session_id": 1, "exercise_id": 11}),
            json!({"training_session_id": 1, "exercise_id": 10}),
            json!({"training_session_id": 2, "exercise_id": 12}),
        ],
    );
}

#[tokio::test]
async fn test_list_and_get_trainings() {
    let (gateway, ctx) = test_context();
    seed_catalog(&gateway);

    let trainings = ctx.catalog.list_trainings().await.unwrap();
    assert_eq!(trainings.len(), 2);

    let elite = ctx.catalog.get_training(2).await.unwrap().unwrap();
    assert_eq!(elite.title, "Elite Finishing");
    assert!(elite.requires_premium());

    assert!(ctx.catalog.get_training(99).await.unwrap().is_none());
}

#[tokio::test]
async fn test_premium_training_access() {
    let (gateway, ctx) = test_context();
    seed_catalog(&gateway);
    let elite = ctx.catalog.get_training(2).await.unwrap().unwrap();
    let basic = ctx.catalog.get_training(1).await.unwrap().unwrap();

    let free: Profile =
        serde_json::from_value(json!({"id": 1, "name": "Alex", "account_id": 1})).unwrap();
    let premium: Profile = serde_json::from_value(
        json!({"id": 2, "name": "Bo", "account_id": 1, "subscription_type": 2}),
    )
    .unwrap();

    assert!(free.can_access(&basic));
    assert!(!free.can_access(&elite));
    assert!(premium.can_access(&elite));
}

#[tokio::test]
async fn test_exercises_newest_first() {
    let (gateway, ctx) = test_context();
    seed_catalog(&gateway);

    let exercises = ctx.catalog.list_exercises().await.unwrap();
    let ids: Vec<i64> = exercises.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![12, 11, 10]);

    let hard = exercises_by_difficulty(&exercises, Difficulty::Hard);
    assert_eq!(hard.len(), 1);
    assert_eq!(hard[0].difficulty.level(), 3);
}

#[tokio::test]
async fn test_get_exercise_missing_is_not_found() {
    let (gateway, ctx) = test_context();
    seed_catalog(&gateway);

    assert_eq!(ctx.catalog.get_exercise(11).await.unwrap().title, "Cone Weave");

    let err = ctx.catalog.get_exercise(404).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(ref what) if what == "Exercise 404"));
}

#[tokio::test]
async fn test_exercises_for_training_follow_join_order() {
    let (gateway, ctx) = test_context();
    seed_catalog(&gateway);

    let exercises = ctx.catalog.exercises_for_training(1).await.unwrap();
    let ids: Vec<i64> = exercises.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![11, 10]);
}

#[tokio::test]
async fn test_training_without_exercises_skips_second_query() {
    let (gateway, ctx) = test_context();
    seed_catalog(&gateway);

    let exercises = ctx.catalog.exercises_for_training(77).await.unwrap();
    assert!(exercises.is_empty());
    assert_eq!(gateway.calls(GatewayOp::QueryMany), 1);
}

#[tokio::test]
async fn test_malformed_exercise_row_is_decode_error() {
    let (gateway, ctx) = test_context();
    gateway.seed_rows(
        tables::EXERCISES,
        vec![json!({"id": 1, "title": "Broken", "difficulty": "extreme", "duration": 5})],
    );

    let err = ctx.catalog.list_exercises().await.unwrap_err();
    assert!(matches!(err, AppError::Decode { table: "exercises", .. }));
}

#[tokio::test]
async fn test_daily_video_uses_first_video() {
    let (gateway, ctx) = test_context();
    gateway.seed_rows(
        tables::VIDEOS,
        vec![
            json!({"id": 1, "url": "https://youtu.be/dQw4w9WgXcQ", "name": "Warm-up", "created_at": "2026-03-01T08:00:00Z"}),
            json!({"id": 2, "url": "https://example.com/other.mp4", "created_at": "2026-03-02T08:00:00Z"}),
        ],
    );

    let daily = ctx.catalog.daily_video().await.unwrap().unwrap();
    assert_eq!(daily.video.id, 1);
    assert!(daily
        .embed_url
        .unwrap()
        .starts_with("https://www.youtube.com/embed/dQw4w9WgXcQ?"));

    let videos = ctx.catalog.list_videos().await.unwrap();
    assert_eq!(videos[1].embed_url(), None);
}

#[tokio::test]
async fn test_no_videos() {
    let (_gateway, ctx) = test_context();
    assert!(ctx.catalog.first_video().await.unwrap().is_none());
    assert!(ctx.catalog.daily_video().await.unwrap().is_none());
}

#[tokio::test]
async fn test_media_library_skips_folders() {
    let (gateway, ctx) = test_context();
    gateway.seed_objects(
        "videos",
        vec![
            StoredObject {
                name: "drills/".to_string(),
                id: None,
                updated_at: None,
                metadata: None,
            },
            StoredObject {
                name: "drills/juggling.mp4".to_string(),
                id: Some("obj-1".to_string()),
                updated_at: None,
                metadata: Some(json!({"size": 1024})),
            },
        ],
    );

    let items = ctx.media.list("drills").await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].url, "memory://videos/drills/juggling.mp4");
    assert_eq!(ctx.media.bucket(), "videos");
}

#[tokio::test]
async fn test_catalog_failure_is_returned() {
    let (gateway, ctx) = test_context();
    gateway.fail_next(GatewayOp::QueryMany, "service unavailable");

    let err = ctx.catalog.list_trainings().await.unwrap_err();
    assert_eq!(err.user_message(), "service unavailable");
}
