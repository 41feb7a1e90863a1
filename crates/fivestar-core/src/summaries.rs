//! [`SummaryStore`] — typed CRUD and search over the `fivestarsummary`
//! collection, keyed functionally by `rating_id`.

use std::sync::Arc;

use crate::{
  Error, Result,
  encode::{decode_summary, encode_summary},
  index::{Filter, Slot},
  store::{Collection, InsertMode, InsertOutcome, RecordStore},
  summary::Summary,
};

const COLLECTION: Collection = Collection::Summaries;

pub struct SummaryStore<S> {
  store: Arc<S>,
}

impl<S> Clone for SummaryStore<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: RecordStore> SummaryStore<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  pub async fn search(&self, filter: &Filter) -> Result<Vec<Summary>> {
    self
      .store
      .search(COLLECTION, filter)
      .await
      .map_err(Error::store)?
      .into_iter()
      .map(decode_summary)
      .collect()
  }

  pub async fn insert(&self, summary: &Summary) -> Result<Summary> {
    let draft = encode_summary(summary)?;
    match self
      .store
      .insert(COLLECTION, draft, InsertMode::Always)
      .await
      .map_err(Error::store)?
    {
      InsertOutcome::Created(r) | InsertOutcome::Existing(r) => decode_summary(r),
    }
  }

  /// Persist `summary` unless one already exists for its `rating_id`.
  pub async fn insert_unique(&self, summary: &Summary) -> Result<InsertOutcome<Summary>> {
    let draft = encode_summary(summary)?;
    let guard = Filter::new().where_eq(Slot::String, summary.rating_id.as_str());
    self
      .store
      .insert(COLLECTION, draft, InsertMode::UnlessExists(guard))
      .await
      .map_err(Error::store)?
      .map(decode_summary)
  }

  /// Replace a persisted summary. Fails with [`Error::SummaryNotFound`] if it
  /// has no id or has disappeared from the store.
  pub async fn update(&self, summary: &Summary) -> Result<Summary> {
    let not_found = || Error::SummaryNotFound(summary.rating_id.clone());
    let id = summary.id.ok_or_else(not_found)?;
    let draft = encode_summary(summary)?;
    let record = self
      .store
      .update(COLLECTION, id, draft)
      .await
      .map_err(Error::store)?
      .ok_or_else(not_found)?;
    decode_summary(record)
  }

  pub async fn find_by_rating_id(&self, rating_id: &str) -> Result<Option<Summary>> {
    let filter = Filter::new().where_eq(Slot::String, rating_id);
    Ok(self.search(&filter).await?.into_iter().next())
  }

  /// Summaries for several items in one `$in` search. Items that were never
  /// rated are absent from the result.
  pub async fn find_many(&self, rating_ids: &[String]) -> Result<Vec<Summary>> {
    if rating_ids.is_empty() {
      return Ok(Vec::new());
    }
    let filter = Filter::new().where_in(Slot::String, rating_ids.iter().cloned());
    self.search(&filter).await
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::SummaryStore;
  use crate::{memory::MemoryStore, summary::Summary};

  #[tokio::test]
  async fn insert_assigns_id_and_is_found_by_rating_id() {
    let summaries = SummaryStore::new(Arc::new(MemoryStore::new()));
    let summary = Summary { id: None, rating_id: "item".into(), count: 2, total: 7 };

    let stored = summaries.insert(&summary).await.unwrap();
    assert!(stored.id.is_some());
    assert_eq!((stored.count, stored.total), (2, 7));

    let found = summaries.find_by_rating_id("item").await.unwrap().unwrap();
    assert_eq!(found, stored);
    assert!(summaries.find_by_rating_id("other").await.unwrap().is_none());
  }
}
