//! Summary — the derived `(count, total)` aggregate of one rated item.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::lifecycle::AggregateDelta;

/// The aggregate for a single `rating_id`. Created lazily by the first rating
/// ever added for the item and never deleted, even when `count` drops to 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
  pub id:        Option<Uuid>,
  pub rating_id: String,
  /// Number of ratings currently counted.
  pub count:     i64,
  /// Sum of the stars of the counted ratings.
  pub total:     i64,
}

impl Summary {
  /// An unpersisted summary with nothing counted yet.
  pub fn empty(rating_id: impl Into<String>) -> Self {
    Self { id: None, rating_id: rating_id.into(), count: 0, total: 0 }
  }

  /// Mean star value, or `None` when nothing is counted ("not rated").
  pub fn average(&self) -> Option<f64> {
    (self.count > 0).then(|| self.total as f64 / self.count as f64)
  }

  /// A copy of this summary with `delta` applied.
  pub fn apply(&self, delta: AggregateDelta) -> Self {
    Self {
      id:        self.id,
      rating_id: self.rating_id.clone(),
      count:     self.count + delta.count,
      total:     self.total + delta.total,
    }
  }
}
