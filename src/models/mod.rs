// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models decoded from gateway rows.

pub mod account;
pub mod catalog;
pub mod profile;

pub use account::{Account, Identity, Session};
pub use catalog::{
    Difficulty, Exercise, Friendship, FriendshipStatus, TrainingExercise, TrainingSession, Video,
};
pub use profile::{
    DominantFoot, Gender, NewProfile, PlayingPosition, Profile, SubscriptionTier,
};

use crate::error::AppError;
use serde::de::DeserializeOwned;

/// Decode a single gateway row into a typed model.
pub fn decode_row<T: DeserializeOwned>(
    table: &'static str,
    row: serde_json::Value,
) -> Result<T, AppError> {
    serde_json::from_value(row).map_err(|e| AppError::Decode {
        table,
        message: e.to_string(),
    })
}

/// Decode a list of rows; the first malformed row fails the whole batch.
pub fn decode_rows<T: DeserializeOwned>(
    table: &'static str,
    rows: Vec<serde_json::Value>,
) -> Result<Vec<T>, AppError> {
    rows.into_iter().map(|row| decode_row(table, row)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_rejects_wrong_shape() {
        let err = decode_row::<Profile>("users", json!({"id": "not-a-number", "name": "A"}))
            .unwrap_err();
        assert!(matches!(err, AppError::Decode { table: "users", .. }));
    }

    #[test]
    fn test_decode_rows_minimal_profile() {
        let profiles: Vec<Profile> = decode_rows(
            "users",
            vec![json!({"id": 1, "name": "Alex", "account_id": 3})],
        )
        .unwrap();
        assert_eq!(profiles[0].name, "Alex");
        assert_eq!(profiles[0].subscription_type, 1);
        assert_eq!(profiles[0].experience_total, 0);
    }
}
