//! Star ratings with per-item aggregate summaries.
//!
//! This crate owns the domain types, the record-store contract and the
//! coordinator that keeps each item's summary consistent with its ratings.
//! It has no HTTP or database dependencies; backends implement
//! [`store::RecordStore`].

// Native `async fn` in traits; the trait declarations spell out `Send`.
#![allow(async_fn_in_trait)]

pub mod coordinator;
pub mod encode;
pub mod error;
pub mod index;
pub mod lifecycle;
pub mod locks;
pub mod memory;
pub mod rating;
pub mod ratings;
pub mod store;
pub mod summaries;
pub mod summary;

#[cfg(test)]
mod tests;

pub use error::{Error, Result};
