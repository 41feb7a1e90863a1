//! Index projections and search filters.
//!
//! Every record carries a small fixed set of queryable slots next to its JSON
//! document: a boolean flag, a date, an array of scalars and a string. The
//! coordinator's lookups only ever filter on these slots, so they must be
//! derived the same way on every write. [`project_rating`] and
//! [`project_summary`] are that derivation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{rating::Rating, summary::Summary};

// ─── Values ──────────────────────────────────────────────────────────────────

/// A scalar stored in (or compared against) an index slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum IndexValue {
  Bool(bool),
  Int(i64),
  Text(String),
  Date(DateTime<Utc>),
}

impl From<bool> for IndexValue {
  fn from(v: bool) -> Self { Self::Bool(v) }
}

impl From<i64> for IndexValue {
  fn from(v: i64) -> Self { Self::Int(v) }
}

impl From<&str> for IndexValue {
  fn from(v: &str) -> Self { Self::Text(v.to_owned()) }
}

impl From<String> for IndexValue {
  fn from(v: String) -> Self { Self::Text(v) }
}

impl From<DateTime<Utc>> for IndexValue {
  fn from(v: DateTime<Utc>) -> Self { Self::Date(v) }
}

// ─── Projection ──────────────────────────────────────────────────────────────

/// The queryable slots of one record. Unused slots stay empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexProjection {
  pub flag:   Option<bool>,
  pub date:   Option<DateTime<Utc>>,
  pub array:  Vec<IndexValue>,
  pub string: Option<String>,
}

/// Rating slots: `is_active → flag`, `created_on → date`,
/// `[rating, user.id] → array`, `rating_id → string`.
pub fn project_rating(rating: &Rating) -> IndexProjection {
  IndexProjection {
    flag:   Some(rating.is_active),
    date:   Some(rating.created_on),
    array:  vec![
      IndexValue::Int(rating.rating.points()),
      IndexValue::Text(rating.user.id.clone()),
    ],
    string: Some(rating.rating_id.clone()),
  }
}

/// Summary slots: `rating_id → string`.
pub fn project_summary(summary: &Summary) -> IndexProjection {
  IndexProjection {
    string: Some(summary.rating_id.clone()),
    ..Default::default()
  }
}

// ─── Filter ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
  Flag,
  Date,
  Array,
  String,
}

/// A single condition on one slot.
///
/// On [`Slot::Array`], `Eq` matches when the array contains the value and `In`
/// matches when it contains any of the values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
  Eq(Slot, IndexValue),
  In(Slot, Vec<IndexValue>),
}

impl Predicate {
  pub fn matches(&self, index: &IndexProjection) -> bool {
    match self {
      Self::Eq(slot, value) => slot_contains(index, *slot, value),
      Self::In(slot, values) => values.iter().any(|v| slot_contains(index, *slot, v)),
    }
  }
}

fn slot_contains(index: &IndexProjection, slot: Slot, value: &IndexValue) -> bool {
  match (slot, value) {
    (Slot::Flag, IndexValue::Bool(b)) => index.flag == Some(*b),
    (Slot::Date, IndexValue::Date(d)) => index.date == Some(*d),
    (Slot::String, IndexValue::Text(s)) => index.string.as_deref() == Some(s.as_str()),
    (Slot::Array, v) => index.array.contains(v),
    _ => false,
  }
}

/// A conjunction of predicates. The empty filter matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
  pub predicates: Vec<Predicate>,
}

impl Filter {
  pub fn new() -> Self { Self::default() }

  pub fn where_eq(mut self, slot: Slot, value: impl Into<IndexValue>) -> Self {
    self.predicates.push(Predicate::Eq(slot, value.into()));
    self
  }

  pub fn where_in<I, V>(mut self, slot: Slot, values: I) -> Self
  where
    I: IntoIterator<Item = V>,
    V: Into<IndexValue>,
  {
    self
      .predicates
      .push(Predicate::In(slot, values.into_iter().map(Into::into).collect()));
    self
  }

  pub fn matches(&self, index: &IndexProjection) -> bool {
    self.predicates.iter().all(|p| p.matches(index))
  }
}
