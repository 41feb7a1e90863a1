//! Rating lifecycle and its effect on the aggregate.
//!
//! A rating is either Active (counted in its item's summary) or Blocked (kept,
//! but not counted). Hard deletion removes it altogether. Every event a rating
//! can undergo is resolved through [`transition`], which yields the next state
//! and the exact delta to apply to the summary. A rating is excluded from the
//! aggregate at most once.

use serde::{Deserialize, Serialize};

use crate::rating::Stars;

// ─── Aggregate delta ─────────────────────────────────────────────────────────

/// A change to a summary's `(count, total)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateDelta {
  pub count: i64,
  pub total: i64,
}

impl AggregateDelta {
  pub const NONE: Self = Self { count: 0, total: 0 };

  /// Start counting a rating.
  pub fn include(stars: Stars) -> Self { Self { count: 1, total: stars.points() } }

  /// Stop counting a rating.
  pub fn exclude(stars: Stars) -> Self { Self { count: -1, total: -stars.points() } }

  /// Replace a counted rating's value.
  pub fn rescore(from: Stars, to: Stars) -> Self {
    Self { count: 0, total: to.points() - from.points() }
  }

  pub fn is_none(&self) -> bool { *self == Self::NONE }
}

// ─── State ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingState {
  Active,
  Blocked,
}

impl RatingState {
  pub fn from_active(is_active: bool) -> Self {
    if is_active { Self::Active } else { Self::Blocked }
  }

  pub fn is_active(&self) -> bool { matches!(self, Self::Active) }

  /// Whether a rating in this state contributes to its summary.
  pub fn is_counted(&self) -> bool { self.is_active() }
}

/// Something that happens to an existing rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingEvent {
  /// The star value changes to the given one.
  Edit(Stars),
  /// Soft delete.
  Block,
  /// Hard delete.
  Delete,
}

/// The outcome of applying a [`RatingEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
  /// `None` once the rating has been removed.
  pub next:  Option<RatingState>,
  pub delta: AggregateDelta,
}

/// The transition table.
///
/// | state   | event  | next    | delta            |
/// |---------|--------|---------|------------------|
/// | Active  | Edit   | Active  | rescore          |
/// | Blocked | Edit   | Blocked | none             |
/// | Active  | Block  | Blocked | exclude          |
/// | Blocked | Block  | Blocked | none             |
/// | Active  | Delete | removed | exclude          |
/// | Blocked | Delete | removed | none             |
pub fn transition(state: RatingState, stars: Stars, event: RatingEvent) -> Transition {
  use RatingEvent::*;
  use RatingState::*;

  let (next, delta) = match (state, event) {
    (Active, Edit(to)) => (Some(Active), AggregateDelta::rescore(stars, to)),
    (Blocked, Edit(_)) => (Some(Blocked), AggregateDelta::NONE),
    (Active, Block) => (Some(Blocked), AggregateDelta::exclude(stars)),
    (Blocked, Block) => (Some(Blocked), AggregateDelta::NONE),
    (Active, Delete) => (None, AggregateDelta::exclude(stars)),
    (Blocked, Delete) => (None, AggregateDelta::NONE),
  };
  Transition { next, delta }
}
