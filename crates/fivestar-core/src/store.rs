//! The `RecordStore` trait and supporting record types.
//!
//! A record store holds tagged collections of JSON documents, each carrying an
//! [`IndexProjection`] that filters are evaluated against. It offers per-record
//! CRUD and filtered search only: no multi-record transactions and no atomic
//! increments. The one conditional primitive is [`InsertMode::UnlessExists`].
//!
//! The trait is implemented by storage backends (e.g. `fivestar-store-sqlite`
//! and [`crate::memory::MemoryStore`]). The typed [`RatingStore`] and
//! [`SummaryStore`] wrappers sit on top of it.
//!
//! [`RatingStore`]: crate::ratings::RatingStore
//! [`SummaryStore`]: crate::summaries::SummaryStore

use std::future::Future;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::index::{Filter, IndexProjection};

// ─── Records ─────────────────────────────────────────────────────────────────

/// The collection a record lives in.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumString,
)]
pub enum Collection {
  #[strum(serialize = "rating")]
  Ratings,
  #[strum(serialize = "fivestarsummary")]
  Summaries,
}

/// A persisted record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
  pub id:    Uuid,
  pub data:  serde_json::Value,
  pub index: IndexProjection,
}

/// A record body before the store has assigned it an id.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDraft {
  pub data:  serde_json::Value,
  pub index: IndexProjection,
}

impl RecordDraft {
  pub fn with_id(self, id: Uuid) -> Record {
    Record { id, data: self.data, index: self.index }
  }
}

// ─── Insert ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum InsertMode {
  /// Insert unconditionally.
  Always,
  /// Insert only if no record in the collection matches the filter. The check
  /// and the write happen atomically.
  UnlessExists(Filter),
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome<T> {
  Created(T),
  /// The insert was skipped; carries the first record that matched.
  Existing(T),
}

impl<T> InsertOutcome<T> {
  pub fn map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<InsertOutcome<U>, E> {
    Ok(match self {
      Self::Created(t) => InsertOutcome::Created(f(t)?),
      Self::Existing(t) => InsertOutcome::Existing(f(t)?),
    })
  }

  pub fn is_created(&self) -> bool { matches!(self, Self::Created(_)) }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a record store backend.
///
/// No ordering is guaranteed for search results. All methods return `Send`
/// futures so the trait can be used in multi-threaded async runtimes.
pub trait RecordStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// All records of `collection` matching every predicate of `filter`.
  fn search<'a>(
    &'a self,
    collection: Collection,
    filter: &'a Filter,
  ) -> impl Future<Output = Result<Vec<Record>, Self::Error>> + Send + 'a;

  /// Retrieve a record by id. Returns `None` if not found.
  fn get(
    &self,
    collection: Collection,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Record>, Self::Error>> + Send + '_;

  /// Persist a new record and assign it an id.
  fn insert(
    &self,
    collection: Collection,
    draft: RecordDraft,
    mode: InsertMode,
  ) -> impl Future<Output = Result<InsertOutcome<Record>, Self::Error>> + Send + '_;

  /// Replace the body of an existing record. Returns `None` if `id` does not
  /// exist.
  fn update(
    &self,
    collection: Collection,
    id: Uuid,
    draft: RecordDraft,
  ) -> impl Future<Output = Result<Option<Record>, Self::Error>> + Send + '_;

  /// Remove a record. Returns whether anything was removed.
  fn delete(
    &self,
    collection: Collection,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
