//! Encoding and decoding helpers between record types and SQLite columns, and
//! the compiler from [`Filter`] to a SQL `WHERE` fragment.
//!
//! Timestamps are stored as RFC 3339 strings and UUIDs as hyphenated lowercase
//! strings. The array slot is stored as the JSON of its tagged
//! [`IndexValue`]s, so element comparisons go through `json_each`.

use chrono::{DateTime, Utc};
use fivestar_core::{
  index::{Filter, IndexProjection, IndexValue, Predicate, Slot},
  store::{Record, RecordDraft},
};
use rusqlite::types::Value;
use serde_json::Value as Json;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// The column values written for one record body.
pub struct EncodedDraft {
  pub data:   String,
  pub flag:   Option<bool>,
  pub date:   Option<String>,
  pub array:  String,
  pub string: Option<String>,
}

pub fn encode_draft(draft: &RecordDraft) -> Result<EncodedDraft> {
  Ok(EncodedDraft {
    data:   draft.data.to_string(),
    flag:   draft.index.flag,
    date:   draft.index.date.map(encode_dt),
    array:  serde_json::to_string(&draft.index.array)?,
    string: draft.index.string.clone(),
  })
}

/// Raw row from `records`, before any decoding.
pub struct RawRecord {
  pub id:     String,
  pub data:   String,
  pub flag:   Option<bool>,
  pub date:   Option<String>,
  pub array:  String,
  pub string: Option<String>,
}

impl RawRecord {
  /// Column list matching [`RawRecord::from_row`].
  pub const COLUMNS: &'static str =
    "record_id, data_json, idx_flag, idx_date, idx_array, idx_string";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:     row.get(0)?,
      data:   row.get(1)?,
      flag:   row.get(2)?,
      date:   row.get(3)?,
      array:  row.get(4)?,
      string: row.get(5)?,
    })
  }

  pub fn decode(self) -> Result<Record> {
    Ok(Record {
      id:    decode_uuid(&self.id)?,
      data:  serde_json::from_str(&self.data)?,
      index: IndexProjection {
        flag:   self.flag,
        date:   self.date.as_deref().map(decode_dt).transpose()?,
        array:  serde_json::from_str(&self.array)?,
        string: self.string,
      },
    })
  }
}

// ─── Filters ─────────────────────────────────────────────────────────────────

/// A compiled filter: a boolean SQL expression over the `records` columns and
/// its positional parameters, in order.
#[derive(Debug)]
pub struct SqlFilter {
  pub clause: String,
  pub params: Vec<Value>,
}

/// Compile `filter` into SQL. An empty filter compiles to `1`.
pub fn compile_filter(filter: &Filter) -> Result<SqlFilter> {
  let mut params = Vec::new();
  let clauses = filter
    .predicates
    .iter()
    .map(|p| predicate_sql(p, &mut params))
    .collect::<Result<Vec<_>>>()?;

  let clause = if clauses.is_empty() {
    "1".to_owned()
  } else {
    clauses.join(" AND ")
  };
  Ok(SqlFilter { clause, params })
}

fn predicate_sql(predicate: &Predicate, params: &mut Vec<Value>) -> Result<String> {
  match predicate {
    Predicate::Eq(slot, value) => slot_sql(*slot, value, params),
    // `IN` over nothing matches nothing.
    Predicate::In(_, values) if values.is_empty() => Ok("0".to_owned()),
    Predicate::In(slot, values) => {
      let alternatives = values
        .iter()
        .map(|v| slot_sql(*slot, v, params))
        .collect::<Result<Vec<_>>>()?;
      Ok(format!("({})", alternatives.join(" OR ")))
    }
  }
}

fn slot_sql(slot: Slot, value: &IndexValue, params: &mut Vec<Value>) -> Result<String> {
  let sql = match (slot, value) {
    (Slot::Flag, IndexValue::Bool(b)) => {
      params.push(Value::Integer(i64::from(*b)));
      "idx_flag = ?"
    }
    (Slot::Date, IndexValue::Date(d)) => {
      params.push(Value::Text(encode_dt(*d)));
      "idx_date = ?"
    }
    (Slot::String, IndexValue::Text(s)) => {
      params.push(Value::Text(s.clone()));
      "idx_string = ?"
    }
    (Slot::Array, v) => {
      let (kind, scalar) = tagged_params(v)?;
      params.push(kind);
      params.push(scalar);
      "EXISTS (SELECT 1 FROM json_each(records.idx_array) \
       WHERE json_extract(json_each.value, '$.kind') = ? \
       AND json_extract(json_each.value, '$.value') = ?)"
    }
    // A scalar slot never holds a value of another kind.
    _ => "0",
  };
  Ok(sql.to_owned())
}

/// The `kind` tag and SQL form of `value` as they appear inside `idx_array`.
fn tagged_params(value: &IndexValue) -> Result<(Value, Value)> {
  let tagged = serde_json::to_value(value)?;
  let kind = match &tagged["kind"] {
    Json::String(k) => Value::Text(k.clone()),
    _ => Value::Null,
  };
  let scalar = match &tagged["value"] {
    Json::Bool(b) => Value::Integer(i64::from(*b)),
    Json::Number(n) => n.as_i64().map_or(Value::Null, Value::Integer),
    Json::String(s) => Value::Text(s.clone()),
    _ => Value::Null,
  };
  Ok((kind, scalar))
}
