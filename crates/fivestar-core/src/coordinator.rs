//! [`AggregationCoordinator`] — the only write path for ratings and summaries.
//!
//! The record store offers no transactions, so every operation here is a
//! sequence of independent round trips. Two things keep ratings and their
//! summary in agreement:
//!
//! - all mutations (and reconciliation) for one `rating_id` run under a
//!   per-key lock, so the summary read-modify-write and the duplicate check
//!   are never interleaved within a process;
//! - every guard (duplicate check, edit delta, whether a rating is still
//!   counted, whether the summary exists) is evaluated against stored state
//!   read under that lock, before anything is written.
//!
//! What remains unprotected is a store failure between the rating write and
//! the summary write. The error is returned as-is, a `warn` event names the
//! affected item, and [`AggregationCoordinator::reconcile`] rebuilds the
//! summary from the ratings.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::{
  Error, Result,
  lifecycle::{AggregateDelta, RatingEvent, transition},
  locks::KeyedLocks,
  rating::{NewRating, Rating},
  ratings::RatingStore,
  store::{InsertOutcome, RecordStore},
  summaries::SummaryStore,
  summary::Summary,
};

/// A rating as it stands after an operation, with its item's summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingChange {
  pub rating:  Rating,
  pub summary: Summary,
}

fn already_rated() -> Error { Error::Conflict("user already rated item".into()) }

fn stale_snapshot() -> Error { Error::Conflict("rating changed since it was read".into()) }

/// Log that the rating side of an operation committed but the summary side did
/// not, then hand the error back.
fn summary_write_failed(rating_id: &str, e: Error) -> Error {
  tracing::warn!(
    rating_id,
    error = %e,
    "rating committed but summary update failed; summary is stale until reconciled"
  );
  e
}

pub struct AggregationCoordinator<S> {
  ratings:   RatingStore<S>,
  summaries: SummaryStore<S>,
  locks:     KeyedLocks,
}

impl<S: RecordStore> AggregationCoordinator<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self {
      ratings:   RatingStore::new(Arc::clone(&store)),
      summaries: SummaryStore::new(store),
      locks:     KeyedLocks::new(),
    }
  }

  // ── Mutations ─────────────────────────────────────────────────────────────

  /// Record a user's first rating of an item and count it.
  ///
  /// Fails with [`Error::Unauthenticated`] without a user id and with
  /// [`Error::Conflict`] if the user ever rated the item before, even if that
  /// rating was later blocked.
  #[tracing::instrument(skip_all, fields(rating_id = %input.rating_id, user_id = %input.user.id))]
  pub async fn add_rating(&self, input: NewRating) -> Result<RatingChange> {
    if !input.user.is_resolved() {
      return Err(Error::Unauthenticated);
    }
    if input.rating_id.trim().is_empty() {
      return Err(Error::Invalid("rating id must not be empty".into()));
    }

    let _guard = self.locks.acquire(&input.rating_id).await;

    if let Some(existing) = self
      .ratings
      .find_existing(&input.rating_id, &input.user.id)
      .await?
    {
      tracing::debug!(existing = ?existing.id, "duplicate rating rejected");
      return Err(already_rated());
    }

    let rating = match self
      .ratings
      .insert_unique(&input.into_rating(Utc::now()))
      .await?
    {
      InsertOutcome::Created(rating) => rating,
      InsertOutcome::Existing(existing) => {
        tracing::debug!(existing = ?existing.id, "duplicate rating rejected by store");
        return Err(already_rated());
      }
    };

    let summary = self
      .count_new_rating(&rating)
      .await
      .map_err(|e| summary_write_failed(&rating.rating_id, e))?;

    tracing::info!(id = ?rating.id, stars = %rating.rating, count = summary.count, "rating added");
    Ok(RatingChange { rating, summary })
  }

  /// Replace the fields of a rating. `original` is the snapshot the caller
  /// edited; its star value is the base of the summary delta.
  ///
  /// The edit keeps the original's identity (`id`, `rating_id`, `user.id`);
  /// its active flag and creation stamps come from the stored record, so an
  /// edit can never unblock a rating. If the stored rating no longer matches
  /// `original`, nothing is written and [`Error::Conflict`] is returned.
  #[tracing::instrument(skip_all, fields(rating_id = %original.rating_id, id = ?original.id))]
  pub async fn edit_rating(&self, original: &Rating, updated: Rating) -> Result<RatingChange> {
    let id = original.require_id()?;
    if updated.id != Some(id) {
      return Err(Error::Invalid("an edit cannot change the rating's id".into()));
    }
    if updated.rating_id != original.rating_id {
      return Err(Error::Invalid("an edit cannot move a rating to another item".into()));
    }
    if updated.user.id != original.user.id {
      return Err(Error::Invalid("an edit cannot change the rating's author".into()));
    }

    let _guard = self.locks.acquire(&original.rating_id).await;

    let stored = self.load(id).await?;
    if stored.rating != original.rating || stored.rating_id != original.rating_id {
      return Err(stale_snapshot());
    }
    let current = self.require_summary(&stored.rating_id).await?;
    let step = transition(stored.state(), stored.rating, RatingEvent::Edit(updated.rating));

    let next = Rating {
      is_active: stored.is_active,
      created_on: stored.created_on,
      created_by: stored.created_by,
      deleted_on: stored.deleted_on,
      deleted_by: stored.deleted_by,
      last_updated_on: Some(Utc::now()),
      ..updated
    };
    let rating = self.ratings.update(id, &next).await?;

    let summary = self
      .commit(current, step.delta)
      .await
      .map_err(|e| summary_write_failed(&rating.rating_id, e))?;

    tracing::info!(
      from = %original.rating,
      to = %rating.rating,
      total = summary.total,
      "rating edited"
    );
    Ok(RatingChange { rating, summary })
  }

  /// Permanently remove a rating. It stops being counted only if it still
  /// was: deleting a blocked rating leaves the summary as it is.
  #[tracing::instrument(skip_all, fields(rating_id = %rating.rating_id, id = ?rating.id))]
  pub async fn delete_rating(&self, rating: &Rating) -> Result<RatingChange> {
    let id = rating.require_id()?;
    let _guard = self.locks.acquire(&rating.rating_id).await;

    let stored = self.load(id).await?;
    if stored.rating_id != rating.rating_id {
      return Err(stale_snapshot());
    }
    let current = self.require_summary(&stored.rating_id).await?;
    let step = transition(stored.state(), stored.rating, RatingEvent::Delete);

    self.ratings.delete(id).await?;

    let summary = self
      .commit(current, step.delta)
      .await
      .map_err(|e| summary_write_failed(&stored.rating_id, e))?;

    tracing::info!(counted = !step.delta.is_none(), count = summary.count, "rating deleted");
    Ok(RatingChange { rating: stored, summary })
  }

  /// Soft delete: mark a rating inactive and stop counting it. Blocking an
  /// already-blocked rating changes nothing, even if its item has no summary.
  #[tracing::instrument(skip_all, fields(rating_id = %rating.rating_id, id = ?rating.id))]
  pub async fn block_rating(
    &self,
    rating: &Rating,
    blocked_by: Option<String>,
  ) -> Result<RatingChange> {
    let id = rating.require_id()?;
    let _guard = self.locks.acquire(&rating.rating_id).await;

    let stored = self.load(id).await?;
    if stored.rating_id != rating.rating_id {
      return Err(stale_snapshot());
    }
    if !stored.is_active {
      tracing::debug!("rating already blocked");
      let summary = self
        .summaries
        .find_by_rating_id(&stored.rating_id)
        .await?
        .unwrap_or_else(|| Summary::empty(stored.rating_id.as_str()));
      return Ok(RatingChange { rating: stored, summary });
    }

    let current = self.require_summary(&stored.rating_id).await?;
    let step = transition(stored.state(), stored.rating, RatingEvent::Block);

    let next = Rating {
      is_active: step.next.is_some_and(|s| s.is_active()),
      deleted_on: Some(Utc::now()),
      deleted_by: blocked_by,
      ..stored
    };
    let rating = self.ratings.update(id, &next).await?;

    let summary = self
      .commit(current, step.delta)
      .await
      .map_err(|e| summary_write_failed(&rating.rating_id, e))?;

    tracing::info!(count = summary.count, "rating blocked");
    Ok(RatingChange { rating, summary })
  }

  /// Rebuild the summary of `rating_id` from its active ratings.
  ///
  /// Returns the summary unchanged when it already agrees. An item that was
  /// never rated gets an unpersisted empty summary.
  #[tracing::instrument(skip(self))]
  pub async fn reconcile(&self, rating_id: &str) -> Result<Summary> {
    let _guard = self.locks.acquire(rating_id).await;

    let counted = self.ratings.list_for_item(rating_id, false).await?;
    let expected = counted
      .iter()
      .filter(|r| r.state().is_counted())
      .fold(Summary::empty(rating_id), |acc, r| {
        acc.apply(AggregateDelta::include(r.rating))
      });

    match self.summaries.find_by_rating_id(rating_id).await? {
      Some(current) if (current.count, current.total) == (expected.count, expected.total) => {
        tracing::debug!("summary already consistent");
        Ok(current)
      }
      Some(current) => {
        tracing::info!(
          was_count = current.count,
          was_total = current.total,
          count = expected.count,
          total = expected.total,
          "summary corrected"
        );
        self
          .summaries
          .update(&Summary { id: current.id, ..expected })
          .await
      }
      None if expected.count == 0 => Ok(expected),
      None => match self.summaries.insert_unique(&expected).await? {
        InsertOutcome::Created(summary) => {
          tracing::info!(count = summary.count, total = summary.total, "missing summary created");
          Ok(summary)
        }
        InsertOutcome::Existing(current) => {
          self
            .summaries
            .update(&Summary { id: current.id, ..expected })
            .await
        }
      },
    }
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  pub async fn rating(&self, id: Uuid) -> Result<Option<Rating>> { self.ratings.get(id).await }

  /// The rating `user_id` left on `rating_id`, active or blocked.
  pub async fn existing_rating(&self, rating_id: &str, user_id: &str) -> Result<Option<Rating>> {
    self.ratings.find_existing(rating_id, user_id).await
  }

  pub async fn ratings_for(&self, rating_id: &str, include_blocked: bool) -> Result<Vec<Rating>> {
    self.ratings.list_for_item(rating_id, include_blocked).await
  }

  pub async fn summary(&self, rating_id: &str) -> Result<Option<Summary>> {
    self.summaries.find_by_rating_id(rating_id).await
  }

  pub async fn summaries(&self, rating_ids: &[String]) -> Result<Vec<Summary>> {
    self.summaries.find_many(rating_ids).await
  }

  // ── Helpers ───────────────────────────────────────────────────────────────

  async fn load(&self, id: Uuid) -> Result<Rating> {
    self.ratings.get(id).await?.ok_or(Error::RatingNotFound(id))
  }

  async fn require_summary(&self, rating_id: &str) -> Result<Summary> {
    self
      .summaries
      .find_by_rating_id(rating_id)
      .await?
      .ok_or_else(|| Error::SummaryNotFound(rating_id.to_owned()))
  }

  /// Persist `current + delta`; a zero delta writes nothing.
  async fn commit(&self, current: Summary, delta: AggregateDelta) -> Result<Summary> {
    if delta.is_none() {
      return Ok(current);
    }
    self.summaries.update(&current.apply(delta)).await
  }

  /// Count a freshly inserted rating, creating its item's summary on first
  /// use.
  async fn count_new_rating(&self, rating: &Rating) -> Result<Summary> {
    let delta = AggregateDelta::include(rating.rating);

    if let Some(current) = self.summaries.find_by_rating_id(&rating.rating_id).await? {
      return self.summaries.update(&current.apply(delta)).await;
    }

    let fresh = Summary::empty(rating.rating_id.as_str()).apply(delta);
    match self.summaries.insert_unique(&fresh).await? {
      InsertOutcome::Created(summary) => Ok(summary),
      InsertOutcome::Existing(current) => {
        tracing::debug!("summary created concurrently; applying increment to it");
        self.summaries.update(&current.apply(delta)).await
      }
    }
  }
}
