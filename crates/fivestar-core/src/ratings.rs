//! [`RatingStore`] — typed CRUD and search over the `rating` collection.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{decode_rating, encode_rating},
  index::{Filter, Slot},
  rating::Rating,
  store::{Collection, InsertMode, InsertOutcome, RecordStore},
};

const COLLECTION: Collection = Collection::Ratings;

/// Ratings stored in a [`RecordStore`].
///
/// Cloning is cheap; the backend is reference-counted.
pub struct RatingStore<S> {
  store: Arc<S>,
}

impl<S> Clone for RatingStore<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

/// Matches the rating of `user_id` for `rating_id`, whatever its state.
pub fn existing_filter(rating_id: &str, user_id: &str) -> Filter {
  Filter::new()
    .where_eq(Slot::String, rating_id)
    .where_eq(Slot::Array, user_id)
}

impl<S: RecordStore> RatingStore<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  pub async fn search(&self, filter: &Filter) -> Result<Vec<Rating>> {
    self
      .store
      .search(COLLECTION, filter)
      .await
      .map_err(Error::store)?
      .into_iter()
      .map(decode_rating)
      .collect()
  }

  pub async fn get(&self, id: Uuid) -> Result<Option<Rating>> {
    self
      .store
      .get(COLLECTION, id)
      .await
      .map_err(Error::store)?
      .map(decode_rating)
      .transpose()
  }

  /// Persist `rating` and return it with its assigned id.
  pub async fn insert(&self, rating: &Rating) -> Result<Rating> {
    match self.insert_with(rating, InsertMode::Always).await? {
      InsertOutcome::Created(r) | InsertOutcome::Existing(r) => Ok(r),
    }
  }

  /// Persist `rating` unless the same user already rated the same item, as a
  /// single conditional write.
  pub async fn insert_unique(&self, rating: &Rating) -> Result<InsertOutcome<Rating>> {
    let guard = existing_filter(&rating.rating_id, &rating.user.id);
    self.insert_with(rating, InsertMode::UnlessExists(guard)).await
  }

  async fn insert_with(
    &self,
    rating: &Rating,
    mode: InsertMode,
  ) -> Result<InsertOutcome<Rating>> {
    let draft = encode_rating(rating)?;
    self
      .store
      .insert(COLLECTION, draft, mode)
      .await
      .map_err(Error::store)?
      .map(decode_rating)
  }

  /// Replace the stored rating `id` with `rating`.
  pub async fn update(&self, id: Uuid, rating: &Rating) -> Result<Rating> {
    let draft = encode_rating(rating)?;
    let record = self
      .store
      .update(COLLECTION, id, draft)
      .await
      .map_err(Error::store)?
      .ok_or(Error::RatingNotFound(id))?;
    decode_rating(record)
  }

  pub async fn delete(&self, id: Uuid) -> Result<()> {
    let removed = self
      .store
      .delete(COLLECTION, id)
      .await
      .map_err(Error::store)?;
    if removed { Ok(()) } else { Err(Error::RatingNotFound(id)) }
  }

  /// The rating `user_id` left on `rating_id`, active or blocked.
  pub async fn find_existing(&self, rating_id: &str, user_id: &str) -> Result<Option<Rating>> {
    let filter = existing_filter(rating_id, user_id);
    Ok(self.search(&filter).await?.into_iter().next())
  }

  /// All ratings of one item; blocked ones only when `include_blocked`.
  pub async fn list_for_item(&self, rating_id: &str, include_blocked: bool) -> Result<Vec<Rating>> {
    let mut filter = Filter::new().where_eq(Slot::String, rating_id);
    if !include_blocked {
      filter = filter.where_eq(Slot::Flag, true);
    }
    self.search(&filter).await
  }
}
