//! Rating — one user's star rating of one rated item.
//!
//! A rating is identified by its own store-assigned `id`, and points at the
//! item it rates through `rating_id`. At most one rating ever exists per
//! `(rating_id, user.id)` pair, whether or not it has been blocked.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, lifecycle::RatingState};

// ─── Stars ───────────────────────────────────────────────────────────────────

/// A star value in `1..=5`.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "i64", into = "i64")]
pub struct Stars(u8);

impl Stars {
  pub const MIN: u8 = 1;
  pub const MAX: u8 = 5;

  pub fn new(value: i64) -> Result<Self> {
    if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
      Ok(Self(value as u8))
    } else {
      Err(Error::StarsOutOfRange(value))
    }
  }

  pub fn get(self) -> u8 { self.0 }

  /// The value as it contributes to an aggregate `total`.
  pub fn points(self) -> i64 { i64::from(self.0) }
}

impl TryFrom<i64> for Stars {
  type Error = Error;

  fn try_from(value: i64) -> Result<Self> { Self::new(value) }
}

impl From<Stars> for i64 {
  fn from(s: Stars) -> Self { s.points() }
}

impl fmt::Display for Stars {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

// ─── User snapshot ───────────────────────────────────────────────────────────

/// The author of a rating as they appeared when the rating was submitted.
/// Never re-synced with the user directory afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSnapshot {
  pub id:           String,
  #[serde(default)]
  pub display_name: String,
  #[serde(default)]
  pub image_url:    String,
}

impl UserSnapshot {
  /// Whether this snapshot names a logged-in user.
  pub fn is_resolved(&self) -> bool { !self.id.trim().is_empty() }
}

// ─── Rating ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
  /// Store-assigned; `None` until the rating has been persisted.
  pub id:              Option<Uuid>,
  /// `false` once the rating has been blocked. Never flips back.
  pub is_active:       bool,
  pub created_on:      DateTime<Utc>,
  pub created_by:      Option<String>,
  pub last_updated_on: Option<DateTime<Utc>>,
  pub last_updated_by: Option<String>,
  pub deleted_on:      Option<DateTime<Utc>>,
  pub deleted_by:      Option<String>,
  pub user:            UserSnapshot,
  /// The item being rated, not this record's identity.
  pub rating_id:       String,
  pub rating:          Stars,
  pub comment:         String,
  pub images:          Vec<String>,
}

impl Rating {
  pub fn state(&self) -> RatingState { RatingState::from_active(self.is_active) }

  /// The persisted id, or [`Error::Invalid`] for a rating that was never
  /// stored.
  pub fn require_id(&self) -> Result<Uuid> {
    self
      .id
      .ok_or_else(|| Error::Invalid("rating has not been persisted".into()))
  }
}

// ─── NewRating ───────────────────────────────────────────────────────────────

/// Input to [`crate::coordinator::AggregationCoordinator::add_rating`].
/// `id`, `is_active` and `created_on` are always set by the coordinator.
#[derive(Debug, Clone)]
pub struct NewRating {
  pub user:       UserSnapshot,
  pub rating_id:  String,
  pub rating:     Stars,
  pub comment:    String,
  pub images:     Vec<String>,
  pub created_by: Option<String>,
}

impl NewRating {
  /// Convenience constructor with an empty comment and no images.
  pub fn new(user: UserSnapshot, rating_id: impl Into<String>, rating: Stars) -> Self {
    Self {
      created_by: Some(user.id.clone()),
      user,
      rating_id: rating_id.into(),
      rating,
      comment: String::new(),
      images: Vec::new(),
    }
  }

  /// Build the unpersisted [`Rating`] recorded at `now`.
  pub fn into_rating(self, now: DateTime<Utc>) -> Rating {
    Rating {
      id:              None,
      is_active:       true,
      created_on:      now,
      created_by:      self.created_by,
      last_updated_on: None,
      last_updated_by: None,
      deleted_on:      None,
      deleted_by:      None,
      user:            self.user,
      rating_id:       self.rating_id,
      rating:          self.rating,
      comment:         self.comment,
      images:          self.images,
    }
  }
}
