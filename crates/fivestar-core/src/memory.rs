//! [`MemoryStore`] — an in-process [`RecordStore`].
//!
//! Used by tests and by embedders that do not need persistence. Writes to a
//! collection can be made to fail on demand, which is how partial failures of
//! multi-step operations are exercised.

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
  index::Filter,
  store::{Collection, InsertMode, InsertOutcome, Record, RecordDraft, RecordStore},
};

#[derive(Debug, Error)]
pub enum MemoryError {
  #[error("injected write failure on collection {0}")]
  Injected(Collection),
}

#[derive(Default)]
pub struct MemoryStore {
  records: Mutex<HashMap<Collection, Vec<Record>>>,
  failing: Mutex<HashSet<Collection>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  /// Make every subsequent insert, update and delete on `collection` fail
  /// until [`MemoryStore::heal`] is called.
  pub async fn fail_writes(&self, collection: Collection) {
    self.failing.lock().await.insert(collection);
  }

  pub async fn heal(&self) { self.failing.lock().await.clear(); }

  /// Number of records in `collection`.
  pub async fn len(&self, collection: Collection) -> usize {
    self
      .records
      .lock()
      .await
      .get(&collection)
      .map_or(0, Vec::len)
  }

  async fn check_writable(&self, collection: Collection) -> Result<(), MemoryError> {
    if self.failing.lock().await.contains(&collection) {
      return Err(MemoryError::Injected(collection));
    }
    Ok(())
  }
}

impl RecordStore for MemoryStore {
  type Error = MemoryError;

  async fn search(&self, collection: Collection, filter: &Filter) -> Result<Vec<Record>, MemoryError> {
    let records = self.records.lock().await;
    Ok(
      records
        .get(&collection)
        .into_iter()
        .flatten()
        .filter(|r| filter.matches(&r.index))
        .cloned()
        .collect(),
    )
  }

  async fn get(&self, collection: Collection, id: Uuid) -> Result<Option<Record>, MemoryError> {
    let records = self.records.lock().await;
    Ok(
      records
        .get(&collection)
        .and_then(|rs| rs.iter().find(|r| r.id == id))
        .cloned(),
    )
  }

  async fn insert(
    &self,
    collection: Collection,
    draft: RecordDraft,
    mode: InsertMode,
  ) -> Result<InsertOutcome<Record>, MemoryError> {
    self.check_writable(collection).await?;
    let mut records = self.records.lock().await;
    let rows = records.entry(collection).or_default();

    if let InsertMode::UnlessExists(guard) = &mode
      && let Some(existing) = rows.iter().find(|r| guard.matches(&r.index))
    {
      return Ok(InsertOutcome::Existing(existing.clone()));
    }

    let record = draft.with_id(Uuid::new_v4());
    rows.push(record.clone());
    Ok(InsertOutcome::Created(record))
  }

  async fn update(
    &self,
    collection: Collection,
    id: Uuid,
    draft: RecordDraft,
  ) -> Result<Option<Record>, MemoryError> {
    self.check_writable(collection).await?;
    let mut records = self.records.lock().await;
    let slot = records
      .get_mut(&collection)
      .and_then(|rs| rs.iter_mut().find(|r| r.id == id));

    Ok(slot.map(|r| {
      *r = draft.with_id(id);
      r.clone()
    }))
  }

  async fn delete(&self, collection: Collection, id: Uuid) -> Result<bool, MemoryError> {
    self.check_writable(collection).await?;
    let mut records = self.records.lock().await;
    let Some(rows) = records.get_mut(&collection) else {
      return Ok(false);
    };
    let before = rows.len();
    rows.retain(|r| r.id != id);
    Ok(rows.len() != before)
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::index::{IndexProjection, Slot};

  fn draft(key: &str) -> RecordDraft {
    RecordDraft {
      data:  json!({ "key": key }),
      index: IndexProjection { string: Some(key.into()), ..Default::default() },
    }
  }

  #[tokio::test]
  async fn conditional_insert_returns_existing_match() {
    let store = MemoryStore::new();
    let guard = Filter::new().where_eq(Slot::String, "a");

    let first = store
      .insert(Collection::Summaries, draft("a"), InsertMode::UnlessExists(guard.clone()))
      .await
      .unwrap();
    assert!(first.is_created());

    let second = store
      .insert(Collection::Summaries, draft("a"), InsertMode::UnlessExists(guard))
      .await
      .unwrap();
    assert!(matches!(second, InsertOutcome::Existing(r) if r.data["key"] == "a"));
    assert_eq!(store.len(Collection::Summaries).await, 1);
  }

  #[tokio::test]
  async fn collections_are_isolated() {
    let store = MemoryStore::new();
    store
      .insert(Collection::Ratings, draft("a"), InsertMode::Always)
      .await
      .unwrap();

    let hits = store
      .search(Collection::Summaries, &Filter::new())
      .await
      .unwrap();
    assert!(hits.is_empty());
  }

  #[tokio::test]
  async fn update_and_delete_missing_record() {
    let store = MemoryStore::new();
    let id = Uuid::new_v4();
    assert!(store.update(Collection::Ratings, id, draft("a")).await.unwrap().is_none());
    assert!(!store.delete(Collection::Ratings, id).await.unwrap());
  }

  #[tokio::test]
  async fn injected_failures_only_hit_writes() {
    let store = MemoryStore::new();
    store.fail_writes(Collection::Ratings).await;

    let err = store
      .insert(Collection::Ratings, draft("a"), InsertMode::Always)
      .await
      .unwrap_err();
    assert!(matches!(err, MemoryError::Injected(Collection::Ratings)));
    assert!(store.search(Collection::Ratings, &Filter::new()).await.is_ok());

    store.heal().await;
    assert!(
      store
        .insert(Collection::Ratings, draft("a"), InsertMode::Always)
        .await
        .is_ok()
    );
  }
}
