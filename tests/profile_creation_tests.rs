// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use serde_json::json;
use upro_trainer::error::AppError;
use upro_trainer::gateway::{tables, GatewayOp};
use upro_trainer::models::{decode_row, DominantFoot, Friendship, Gender, NewProfile, PlayingPosition};

mod common;
use common::{seed_profiles, seed_user, test_context, PASSWORD};

#[tokio::test]
async fn test_create_profile_refreshes_and_keeps_selection() {
    let (gateway, ctx) = test_context();
    let user = seed_user(&gateway, "parent@example.com").await;
    seed_profiles(&gateway, user.account_id, &[(1, "Alex")]);
    ctx.session.sign_in(&user.email, PASSWORD).await.unwrap();

    let mut new = NewProfile::new("  Jamie Lee ", Gender::Female, 11);
    new.weight_kg = Some(38.5);
    new.height_cm = Some(145.0);
    new.dominant_foot = Some(DominantFoot::Left);
    new.playing_position = Some(PlayingPosition::Midfielder);

    let created = ctx.profiles.create_profile(&new).await.unwrap();
    assert_eq!(created.name, "Jamie Lee");
    assert_eq!(created.account_id, user.account_id);
    assert_eq!(created.gender.as_deref(), Some("female"));
    assert_eq!(created.dominant_foot, Some(false));
    assert_eq!(created.initials(), "JL");

    let state = ctx.session.snapshot();
    assert_eq!(state.profiles().len(), 2);
    assert_eq!(state.active_profile().unwrap().id, 1);
}

#[tokio::test]
async fn test_first_profile_becomes_active() {
    let (gateway, ctx) = test_context();
    let user = seed_user(&gateway, "parent@example.com").await;
    ctx.session.sign_in(&user.email, PASSWORD).await.unwrap();
    assert!(ctx.session.active_profile().is_none());

    let created = ctx
        .profiles
        .create_profile(&NewProfile::new("Robin", Gender::Male, 9))
        .await
        .unwrap();

    assert_eq!(ctx.session.active_profile().unwrap().id, created.id);
}

#[tokio::test]
async fn test_invalid_input_never_reaches_gateway() {
    let (gateway, ctx) = test_context();
    let user = seed_user(&gateway, "parent@example.com").await;
    ctx.session.sign_in(&user.email, PASSWORD).await.unwrap();

    let mut new = NewProfile::new("   ", Gender::Male, 3);
    new.height_cm = Some(400.0);

    let err = ctx.profiles.create_profile(&new).await.unwrap_err();
    let AppError::BadRequest(message) = err else {
        panic!("expected BadRequest, got {:?}", err);
    };
    assert!(message.contains("Name is required"), "{}", message);
    assert!(message.contains("Age must be between 5 and 100"), "{}", message);
    assert!(message.contains("Height must be between 100 and 250 cm"), "{}", message);
    assert_eq!(gateway.calls(GatewayOp::Insert), 0);
}

#[tokio::test]
async fn test_create_profile_requires_account() {
    let (gateway, ctx) = test_context();

    let err = ctx
        .profiles
        .create_profile(&NewProfile::new("Robin", Gender::Male, 9))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Unauthorized));
    assert_eq!(gateway.calls(GatewayOp::Insert), 0);
}

#[tokio::test]
async fn test_insert_failure_leaves_profiles_unchanged() {
    let (gateway, ctx) = test_context();
    let user = seed_user(&gateway, "parent@example.com").await;
    seed_profiles(&gateway, user.account_id, &[(1, "Alex")]);
    ctx.session.sign_in(&user.email, PASSWORD).await.unwrap();

    gateway.fail_next(GatewayOp::Insert, "duplicate key value");
    let err = ctx
        .profiles
        .create_profile(&NewProfile::new("Robin", Gender::Male, 9))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Gateway(_)));
    assert_eq!(ctx.session.snapshot().profiles().len(), 1);
}

#[tokio::test]
async fn test_list_friends() {
    let (gateway, ctx) = test_context();
    seed_profiles(&gateway, 1, &[(1, "Alex"), (2, "Bo"), (3, "Cy"), (4, "Dee")]);
    gateway.seed_rows(
        tables::FRIENDSHIPS,
        vec![
            json!({"requester_id": 1, "addressee_id": 2, "status": "accepted"}),
            json!({"requester_id": 3, "addressee_id": 1, "status": "accepted"}),
            json!({"requester_id": 1, "addressee_id": 4, "status": "pending"}),
            json!({"requester_id": 2, "addressee_id": 3, "status": "accepted"}),
        ],
    );

    let mut ids: Vec<i64> = ctx
        .profiles
        .list_friends(1)
        .await
        .unwrap()
        .iter()
        .map(|p| p.id)
        .collect();
    ids.sort();
    assert_eq!(ids, vec![2, 3]);
}

#[tokio::test]
async fn test_no_friends_skips_profile_query() {
    let (gateway, ctx) = test_context();

    let friends = ctx.profiles.list_friends(1).await.unwrap();
    assert!(friends.is_empty());
    assert_eq!(gateway.calls(GatewayOp::QueryMany), 1);
}

#[test]
fn test_friendship_without_status_is_rejected() {
    let err = decode_row::<Friendship>(
        tables::FRIENDSHIPS,
        json!({"requester_id": 1, "addressee_id": 2}),
    )
    .unwrap_err();
    assert!(matches!(err, AppError::Decode { table: "friendships", .. }));
}
