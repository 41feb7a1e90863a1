//! JSON REST API for five-star ratings.
//!
//! Exposes an axum [`Router`] over an [`AggregationCoordinator`] backed by any
//! [`fivestar_core::store::RecordStore`]. Resolving who the user is, TLS and
//! transport are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", fivestar_api::api_router(coordinator.clone()))
//! ```

pub mod error;
pub mod ratings;
pub mod summaries;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use fivestar_core::{coordinator::AggregationCoordinator, store::RecordStore};

pub use error::ApiError;

/// Build a fully-materialised API router for `coordinator`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(coordinator: Arc<AggregationCoordinator<S>>) -> Router<()>
where
  S: RecordStore + 'static,
{
  Router::new()
    // Ratings
    .route("/ratings", get(ratings::list::<S>).post(ratings::create::<S>))
    .route("/ratings/lookup", get(ratings::lookup::<S>))
    .route(
      "/ratings/{id}",
      get(ratings::get_one::<S>)
        .put(ratings::edit::<S>)
        .delete(ratings::delete_one::<S>),
    )
    .route("/ratings/{id}/block", post(ratings::block_one::<S>))
    // Summaries
    .route("/summaries", get(summaries::batch::<S>))
    .route("/summaries/{rating_id}", get(summaries::get_one::<S>))
    .route("/summaries/{rating_id}/reconcile", post(summaries::reconcile::<S>))
    .with_state(coordinator)
}
