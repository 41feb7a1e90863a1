//! [`SqliteStore`] — the SQLite implementation of [`RecordStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, TransactionBehavior, params, params_from_iter, types::Value};
use uuid::Uuid;

use fivestar_core::{
  index::Filter,
  store::{Collection, InsertMode, InsertOutcome, Record, RecordDraft, RecordStore},
};

use crate::{
  Result,
  encode::{RawRecord, SqlFilter, compile_filter, encode_draft, encode_dt, encode_uuid},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A record store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

fn select_sql(clause: &str) -> String {
  format!(
    "SELECT {} FROM records WHERE collection = ? AND {clause}",
    RawRecord::COLUMNS
  )
}

/// `collection` followed by the filter's own parameters.
fn scoped_params(collection: Collection, params: Vec<Value>) -> Vec<Value> {
  std::iter::once(Value::Text(collection.as_ref().to_owned()))
    .chain(params)
    .collect()
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  type Error = crate::Error;

  async fn search(&self, collection: Collection, filter: &Filter) -> Result<Vec<Record>> {
    let SqlFilter { clause, params } = compile_filter(filter)?;
    let sql = select_sql(&clause);
    let params = scoped_params(collection, params);

    let rows: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params_from_iter(params), RawRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows.into_iter().map(RawRecord::decode).collect()
  }

  async fn get(&self, collection: Collection, id: Uuid) -> Result<Option<Record>> {
    let sql = select_sql("record_id = ?");
    let params = scoped_params(collection, vec![Value::Text(encode_uuid(id))]);

    let row: Option<RawRecord> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, params_from_iter(params), RawRecord::from_row)
            .optional()?,
        )
      })
      .await?;

    row.map(RawRecord::decode).transpose()
  }

  async fn insert(
    &self,
    collection: Collection,
    draft: RecordDraft,
    mode: InsertMode,
  ) -> Result<InsertOutcome<Record>> {
    let id = Uuid::new_v4();
    let cols = encode_draft(&draft)?;
    let guard = match &mode {
      InsertMode::Always => None,
      InsertMode::UnlessExists(filter) => {
        let SqlFilter { clause, params } = compile_filter(filter)?;
        Some((
          format!("{} LIMIT 1", select_sql(&clause)),
          scoped_params(collection, params),
        ))
      }
    };
    let id_str = encode_uuid(id);
    let collection_str = collection.as_ref().to_owned();
    let now = encode_dt(Utc::now());

    // The existence check and the insert share one immediate transaction, so
    // no other writer can slip a matching row in between.
    let existing: Option<RawRecord> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if let Some((sql, params)) = guard {
          let found = tx
            .query_row(&sql, params_from_iter(params), RawRecord::from_row)
            .optional()?;
          if found.is_some() {
            return Ok(found);
          }
        }

        tx.execute(
          "INSERT INTO records
               (record_id, collection, data_json, idx_flag, idx_date,
                idx_array, idx_string, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
          params![
            id_str,
            collection_str,
            cols.data,
            cols.flag,
            cols.date,
            cols.array,
            cols.string,
            now,
          ],
        )?;
        tx.commit()?;
        Ok(None)
      })
      .await?;

    match existing {
      Some(raw) => Ok(InsertOutcome::Existing(raw.decode()?)),
      None => Ok(InsertOutcome::Created(draft.with_id(id))),
    }
  }

  async fn update(
    &self,
    collection: Collection,
    id: Uuid,
    draft: RecordDraft,
  ) -> Result<Option<Record>> {
    let cols = encode_draft(&draft)?;
    let id_str = encode_uuid(id);
    let collection_str = collection.as_ref().to_owned();
    let now = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE records
              SET data_json = ?1, idx_flag = ?2, idx_date = ?3,
                  idx_array = ?4, idx_string = ?5, updated_at = ?6
            WHERE collection = ?7 AND record_id = ?8",
          params![
            cols.data,
            cols.flag,
            cols.date,
            cols.array,
            cols.string,
            now,
            collection_str,
            id_str,
          ],
        )?)
      })
      .await?;

    Ok((changed > 0).then(|| draft.with_id(id)))
  }

  async fn delete(&self, collection: Collection, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let collection_str = collection.as_ref().to_owned();

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM records WHERE collection = ?1 AND record_id = ?2",
          params![collection_str, id_str],
        )?)
      })
      .await?;

    Ok(removed > 0)
  }
}
