// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Athlete profile model and profile-creation input.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::borrow::Cow;
use validator::{Validate, ValidationError, ValidationErrors};

use super::TrainingSession;
use crate::error::AppError;

/// Subscription tier, shared by accounts, profiles and trainings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionTier {
    Free,
    Premium,
    Unknown(i64),
}

impl SubscriptionTier {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => SubscriptionTier::Free,
            2 => SubscriptionTier::Premium,
            other => SubscriptionTier::Unknown(other),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "Free",
            SubscriptionTier::Premium => "Premium",
            SubscriptionTier::Unknown(_) => "Unknown",
        }
    }
}

/// Individual athlete record owned by an account (`users` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,
    pub name: String,
    pub account_id: i64,
    #[serde(default)]
    pub gender: Option<String>,
    /// Age in years
    #[serde(default)]
    pub age_group: Option<i32>,
    /// Weight in kg
    #[serde(default)]
    pub weight: Option<f64>,
    /// Height in cm
    #[serde(default)]
    pub height: Option<f64>,
    /// `true` = right-footed, `false` = left-footed
    #[serde(default)]
    pub dominant_foot: Option<bool>,
    #[serde(default)]
    pub playing_position: Option<String>,
    #[serde(default)]
    pub experience_total: i64,
    /// Tier override for this profile (1 = free, 2 = premium)
    #[serde(default = "default_subscription_type")]
    pub subscription_type: i64,
    /// In-app currency balance
    #[serde(default)]
    pub upro_gold: i64,
    #[serde(default)]
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub equipped_avatar_id: Option<i64>,
    #[serde(default)]
    pub equipped_profile_banner_id: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_subscription_type() -> i64 {
    1
}

impl Profile {
    pub fn subscription_tier(&self) -> SubscriptionTier {
        SubscriptionTier::from_code(self.subscription_type)
    }

    pub fn is_premium(&self) -> bool {
        self.subscription_tier() == SubscriptionTier::Premium
    }

    /// Whether this profile may open the given training.
    pub fn can_access(&self, training: &TrainingSession) -> bool {
        !training.requires_premium() || self.is_premium()
    }

    pub fn initials(&self) -> String {
        initials(&self.name)
    }
}

/// Two-letter initials for an avatar placeholder.
///
/// Multiple words use the first letter of the first two words; a single word
/// uses its first two characters. Always upper-cased.
pub fn initials(name: &str) -> String {
    let mut words = name.split_whitespace();
    let Some(first) = words.next() else {
        return String::new();
    };

    let letters: String = match words.next() {
        Some(second) => first.chars().take(1).chain(second.chars().take(1)).collect(),
        None => first.chars().take(2).collect(),
    };
    letters.to_uppercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DominantFoot {
    Right,
    Left,
}

impl DominantFoot {
    /// Stored as a boolean column: right-footed is `true`.
    pub fn as_column(&self) -> bool {
        matches!(self, DominantFoot::Right)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayingPosition {
    Forward,
    Midfielder,
    Defender,
    Goalkeeper,
}

impl PlayingPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayingPosition::Forward => "Forward",
            PlayingPosition::Midfielder => "Midfielder",
            PlayingPosition::Defender => "Defender",
            PlayingPosition::Goalkeeper => "Goalkeeper",
        }
    }
}

/// Input for creating a new profile under the current account.
#[derive(Debug, Clone, Validate)]
pub struct NewProfile {
    #[validate(custom(function = "validate_name"))]
    pub name: String,
    pub gender: Gender,
    #[validate(range(min = 5, max = 100, message = "Age must be between 5 and 100"))]
    pub age: i32,
    #[validate(range(
        min = 20.0,
        max = 200.0,
        message = "Weight must be between 20 and 200 kg"
    ))]
    pub weight_kg: Option<f64>,
    #[validate(range(
        min = 100.0,
        max = 250.0,
        message = "Height must be between 100 and 250 cm"
    ))]
    pub height_cm: Option<f64>,
    pub dominant_foot: Option<DominantFoot>,
    pub playing_position: Option<PlayingPosition>,
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new("required").with_message(Cow::Borrowed("Name is required")));
    }
    Ok(())
}

impl NewProfile {
    pub fn new(name: impl Into<String>, gender: Gender, age: i32) -> Self {
        Self {
            name: name.into(),
            gender,
            age,
            weight_kg: None,
            height_cm: None,
            dominant_foot: None,
            playing_position: None,
        }
    }

    /// Validate the input, collecting every field message into one error.
    pub fn check(&self) -> Result<(), AppError> {
        let non_finite = [self.weight_kg, self.height_cm]
            .into_iter()
            .flatten()
            .any(|v| !v.is_finite());
        if non_finite {
            return Err(AppError::BadRequest(
                "Weight and height must be numbers".to_string(),
            ));
        }

        self.validate()
            .map_err(|errors| AppError::BadRequest(describe_errors(&errors)))
    }

    /// Row payload for the profiles table.
    pub fn to_row(&self, account_id: i64) -> serde_json::Value {
        json!({
            "name": self.name.trim(),
            "account_id": account_id,
            "gender": self.gender.as_str(),
            "age_group": self.age,
            "weight": self.weight_kg,
            "height": self.height_cm,
            "dominant_foot": self.dominant_foot.map(|f| f.as_column()),
            "playing_position": self.playing_position.map(|p| p.as_str()),
        })
    }
}

fn describe_errors(errors: &ValidationErrors) -> String {
    let mut messages: Vec<(String, String)> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            let field = field.to_string();
            errs.iter().map(move |e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field));
                (field.clone(), message)
            })
        })
        .collect();
    messages.sort();
    messages
        .into_iter()
        .map(|(_, message)| message)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initials() {
        assert_eq!(initials("alex morgan"), "AM");
        assert_eq!(initials("  word1 word2 word3 "), "WW");
        assert_eq!(initials("single"), "SI");
        assert_eq!(initials("x"), "X");
        assert_eq!(initials("   "), "");
    }

    #[test]
    fn test_subscription_tier_labels() {
        assert_eq!(SubscriptionTier::from_code(1).label(), "Free");
        assert_eq!(SubscriptionTier::from_code(2).label(), "Premium");
        assert_eq!(SubscriptionTier::from_code(9), SubscriptionTier::Unknown(9));
        assert_eq!(SubscriptionTier::from_code(9).label(), "Unknown");
    }

    #[test]
    fn test_valid_profile_passes() {
        let mut profile = NewProfile::new("Alex", Gender::Male, 14);
        profile.weight_kg = Some(55.0);
        profile.height_cm = Some(160.0);
        assert!(profile.check().is_ok());
    }

    #[test]
    fn test_blank_name_rejected() {
        let profile = NewProfile::new("   ", Gender::Female, 20);
        let err = profile.check().unwrap_err();
        assert!(err.to_string().contains("Name is required"));
    }

    #[test]
    fn test_out_of_range_fields_reported_together() {
        let mut profile = NewProfile::new("Alex", Gender::Other, 4);
        profile.weight_kg = Some(250.0);
        profile.height_cm = Some(99.0);

        let msg = profile.check().unwrap_err().to_string();
        assert!(msg.contains("Age must be between 5 and 100"));
        assert!(msg.contains("Weight must be between 20 and 200 kg"));
        assert!(msg.contains("Height must be between 100 and 250 cm"));
    }

    #[test]
    fn test_nan_weight_rejected() {
        let mut profile = NewProfile::new("Alex", Gender::Male, 30);
        profile.weight_kg = Some(f64::NAN);
        assert!(profile.check().is_err());
    }

    #[test]
    fn test_row_payload() {
        let mut profile = NewProfile::new("  Alex Morgan ", Gender::Female, 16);
        profile.dominant_foot = Some(DominantFoot::Left);
        profile.playing_position = Some(PlayingPosition::Goalkeeper);

        let row = profile.to_row(42);
        assert_eq!(row["name"], "Alex Morgan");
        assert_eq!(row["account_id"], 42);
        assert_eq!(row["gender"], "female");
        assert_eq!(row["dominant_foot"], false);
        assert_eq!(row["playing_position"], "Goalkeeper");
        assert!(row["weight"].is_null());
    }
}
