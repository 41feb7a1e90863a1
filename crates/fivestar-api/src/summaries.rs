//! Handlers for `/summaries` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/summaries?rating_ids=a,b` | One entry per requested id, in order |
//! | `GET`  | `/summaries/{rating_id}` | Not-rated entry if the item has no summary |
//! | `POST` | `/summaries/{rating_id}/reconcile` | Rebuild from active ratings |

use std::{collections::HashMap, sync::Arc};

use axum::{
  Json,
  extract::{Path, Query, State},
};
use fivestar_core::{
  coordinator::AggregationCoordinator, store::RecordStore, summary::Summary,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// A summary as served over HTTP. `average` is `null` for an item nobody has
/// (currently) rated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryView {
  pub rating_id: String,
  pub count:     i64,
  pub total:     i64,
  pub average:   Option<f64>,
}

impl From<Summary> for SummaryView {
  fn from(s: Summary) -> Self {
    Self {
      average:   s.average(),
      rating_id: s.rating_id,
      count:     s.count,
      total:     s.total,
    }
  }
}

impl SummaryView {
  pub fn not_rated(rating_id: impl Into<String>) -> Self {
    Summary::empty(rating_id).into()
  }
}

// ─── Batch ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct BatchParams {
  /// Comma-separated item ids.
  #[serde(default)]
  pub rating_ids: String,
}

/// `GET /summaries?rating_ids=a,b`
pub async fn batch<S: RecordStore + 'static>(
  State(coordinator): State<Arc<AggregationCoordinator<S>>>,
  Query(params): Query<BatchParams>,
) -> Result<Json<Vec<SummaryView>>, ApiError> {
  let requested: Vec<String> = params
    .rating_ids
    .split(',')
    .map(str::trim)
    .filter(|id| !id.is_empty())
    .map(str::to_owned)
    .collect();

  let found: HashMap<String, Summary> = coordinator
    .summaries(&requested)
    .await?
    .into_iter()
    .map(|s| (s.rating_id.clone(), s))
    .collect();

  let views = requested
    .into_iter()
    .map(|id| match found.get(&id).cloned() {
      Some(summary) => summary.into(),
      None => SummaryView::not_rated(id),
    })
    .collect();
  Ok(Json(views))
}

// ─── One ─────────────────────────────────────────────────────────────────────

/// `GET /summaries/{rating_id}`
pub async fn get_one<S: RecordStore + 'static>(
  State(coordinator): State<Arc<AggregationCoordinator<S>>>,
  Path(rating_id): Path<String>,
) -> Result<Json<SummaryView>, ApiError> {
  let view = match coordinator.summary(&rating_id).await? {
    Some(summary) => summary.into(),
    None => SummaryView::not_rated(rating_id),
  };
  Ok(Json(view))
}

/// `POST /summaries/{rating_id}/reconcile`
pub async fn reconcile<S: RecordStore + 'static>(
  State(coordinator): State<Arc<AggregationCoordinator<S>>>,
  Path(rating_id): Path<String>,
) -> Result<Json<SummaryView>, ApiError> {
  let summary = coordinator.reconcile(&rating_id).await?;
  Ok(Json(summary.into()))
}
