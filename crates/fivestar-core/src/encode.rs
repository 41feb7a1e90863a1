//! Encoding and decoding between domain entities and store records.
//!
//! Record documents use camelCase keys and tolerate missing optional fields:
//! every default is applied here, on decode, and nowhere else. The index
//! projection is recomputed on every encode so it can never drift from the
//! document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Result,
  index::{project_rating, project_summary},
  rating::{Rating, Stars, UserSnapshot},
  store::{Record, RecordDraft},
  summary::Summary,
};

// ─── Documents ───────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserDocument {
  #[serde(rename = "_id", default)]
  id:           String,
  #[serde(default)]
  display_name: String,
  #[serde(default)]
  image_url:    String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RatingDocument {
  #[serde(default = "active_by_default")]
  is_active:       bool,
  #[serde(default = "Utc::now")]
  created_on:      DateTime<Utc>,
  #[serde(default)]
  created_by:      Option<String>,
  #[serde(default)]
  last_updated_on: Option<DateTime<Utc>>,
  #[serde(default)]
  last_updated_by: Option<String>,
  #[serde(default)]
  deleted_on:      Option<DateTime<Utc>>,
  #[serde(default)]
  deleted_by:      Option<String>,
  #[serde(default)]
  user:            Option<UserDocument>,
  rating_id:       String,
  rating:          Stars,
  #[serde(default)]
  comment:         String,
  #[serde(default)]
  images:          Vec<String>,
}

fn active_by_default() -> bool { true }

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryDocument {
  rating_id: String,
  #[serde(default)]
  count:     i64,
  #[serde(default)]
  total:     i64,
}

// ─── Rating ──────────────────────────────────────────────────────────────────

pub fn encode_rating(rating: &Rating) -> Result<RecordDraft> {
  let doc = RatingDocument {
    is_active:       rating.is_active,
    created_on:      rating.created_on,
    created_by:      rating.created_by.clone(),
    last_updated_on: rating.last_updated_on,
    last_updated_by: rating.last_updated_by.clone(),
    deleted_on:      rating.deleted_on,
    deleted_by:      rating.deleted_by.clone(),
    user:            Some(UserDocument {
      id:           rating.user.id.clone(),
      display_name: rating.user.display_name.clone(),
      image_url:    rating.user.image_url.clone(),
    }),
    rating_id:       rating.rating_id.clone(),
    rating:          rating.rating,
    comment:         rating.comment.clone(),
    images:          rating.images.clone(),
  };

  Ok(RecordDraft {
    data:  serde_json::to_value(doc)?,
    index: project_rating(rating),
  })
}

pub fn decode_rating(record: Record) -> Result<Rating> {
  let doc: RatingDocument = serde_json::from_value(record.data)?;
  let user = doc
    .user
    .map(|u| UserSnapshot {
      id:           u.id,
      display_name: u.display_name,
      image_url:    u.image_url,
    })
    .unwrap_or_default();

  Ok(Rating {
    id: Some(record.id),
    is_active: doc.is_active,
    created_on: doc.created_on,
    created_by: doc.created_by,
    last_updated_on: doc.last_updated_on,
    last_updated_by: doc.last_updated_by,
    deleted_on: doc.deleted_on,
    deleted_by: doc.deleted_by,
    user,
    rating_id: doc.rating_id,
    rating: doc.rating,
    comment: doc.comment,
    images: doc.images,
  })
}

// ─── Summary ─────────────────────────────────────────────────────────────────

pub fn encode_summary(summary: &Summary) -> Result<RecordDraft> {
  let doc = SummaryDocument {
    rating_id: summary.rating_id.clone(),
    count:     summary.count,
    total:     summary.total,
  };

  Ok(RecordDraft {
    data:  serde_json::to_value(doc)?,
    index: project_summary(summary),
  })
}

pub fn decode_summary(record: Record) -> Result<Summary> {
  let doc: SummaryDocument = serde_json::from_value(record.data)?;
  Ok(Summary {
    id:        Some(record.id),
    rating_id: doc.rating_id,
    count:     doc.count,
    total:     doc.total,
  })
}
