//! Handlers for `/ratings` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/ratings` | Body: `{"user":{..},"rating_id":"..","rating":4}` |
//! | `GET`    | `/ratings?rating_id=..` | Optional `&include_blocked=true` |
//! | `GET`    | `/ratings/lookup?rating_id=..&user_id=..` | 404 if the user never rated the item |
//! | `GET`    | `/ratings/{id}` | 404 if not found |
//! | `PUT`    | `/ratings/{id}` | Body: `{"original":{..},"updated":{..}}` |
//! | `DELETE` | `/ratings/{id}` | Hard delete |
//! | `POST`   | `/ratings/{id}/block` | Body: `{"blocked_by":".."}` (optional) |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use fivestar_core::{
  coordinator::{AggregationCoordinator, RatingChange},
  rating::{NewRating, Rating, Stars, UserSnapshot},
  store::RecordStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::ApiError, summaries::SummaryView};

type Coordinator<S> = Arc<AggregationCoordinator<S>>;

/// Response body of every mutation: the rating and its item's summary.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChangeView {
  pub rating:  Rating,
  pub summary: SummaryView,
}

impl From<RatingChange> for ChangeView {
  fn from(c: RatingChange) -> Self {
    Self { rating: c.rating, summary: c.summary.into() }
  }
}

async fn load<S: RecordStore>(
  coordinator: &AggregationCoordinator<S>,
  id: Uuid,
) -> Result<Rating, ApiError> {
  coordinator
    .rating(id)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("rating {id} not found")))
}

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  /// The submitting user, as resolved by the caller. Missing means anonymous.
  #[serde(default)]
  pub user:      UserSnapshot,
  pub rating_id: String,
  pub rating:    i64,
  #[serde(default)]
  pub comment:   String,
  #[serde(default)]
  pub images:    Vec<String>,
}

/// `POST /ratings`
pub async fn create<S: RecordStore + 'static>(
  State(coordinator): State<Coordinator<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  let mut input = NewRating::new(body.user, body.rating_id, Stars::new(body.rating)?);
  input.comment = body.comment;
  input.images = body.images;

  let change = coordinator.add_rating(input).await?;
  Ok((StatusCode::CREATED, Json(ChangeView::from(change))))
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub rating_id:       String,
  #[serde(default)]
  pub include_blocked: bool,
}

/// `GET /ratings?rating_id=<id>[&include_blocked=true]`
pub async fn list<S: RecordStore + 'static>(
  State(coordinator): State<Coordinator<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Rating>>, ApiError> {
  let ratings = coordinator
    .ratings_for(&params.rating_id, params.include_blocked)
    .await?;
  Ok(Json(ratings))
}

#[derive(Debug, Deserialize)]
pub struct LookupParams {
  pub rating_id: String,
  pub user_id:   String,
}

/// `GET /ratings/lookup?rating_id=<id>&user_id=<user>`
pub async fn lookup<S: RecordStore + 'static>(
  State(coordinator): State<Coordinator<S>>,
  Query(params): Query<LookupParams>,
) -> Result<Json<Rating>, ApiError> {
  let rating = coordinator
    .existing_rating(&params.rating_id, &params.user_id)
    .await?
    .ok_or_else(|| {
      ApiError::NotFound(format!(
        "user {} has not rated {}",
        params.user_id, params.rating_id
      ))
    })?;
  Ok(Json(rating))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /ratings/{id}`
pub async fn get_one<S: RecordStore + 'static>(
  State(coordinator): State<Coordinator<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Rating>, ApiError> {
  Ok(Json(load(&coordinator, id).await?))
}

// ─── Edit ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct EditBody {
  /// The rating as the client last read it.
  pub original: Rating,
  pub updated:  Rating,
}

/// `PUT /ratings/{id}`
pub async fn edit<S: RecordStore + 'static>(
  State(coordinator): State<Coordinator<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<EditBody>,
) -> Result<Json<ChangeView>, ApiError> {
  if body.original.id != Some(id) {
    return Err(ApiError::BadRequest(format!(
      "body does not describe rating {id}"
    )));
  }
  let change = coordinator.edit_rating(&body.original, body.updated).await?;
  Ok(Json(change.into()))
}

// ─── Delete / block ──────────────────────────────────────────────────────────

/// `DELETE /ratings/{id}`
pub async fn delete_one<S: RecordStore + 'static>(
  State(coordinator): State<Coordinator<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<ChangeView>, ApiError> {
  let rating = load(&coordinator, id).await?;
  let change = coordinator.delete_rating(&rating).await?;
  Ok(Json(change.into()))
}

#[derive(Debug, Default, Deserialize)]
pub struct BlockBody {
  #[serde(default)]
  pub blocked_by: Option<String>,
}

/// `POST /ratings/{id}/block`
pub async fn block_one<S: RecordStore + 'static>(
  State(coordinator): State<Coordinator<S>>,
  Path(id): Path<Uuid>,
  body: Option<Json<BlockBody>>,
) -> Result<Json<ChangeView>, ApiError> {
  let Json(body) = body.unwrap_or_default();
  let rating = load(&coordinator, id).await?;
  let change = coordinator.block_rating(&rating, body.blocked_by).await?;
  Ok(Json(change.into()))
}
