//! SQL schema for the five-star SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per record of any collection. The JSON document is opaque to SQL;
-- filters only ever touch the idx_* columns.
CREATE TABLE IF NOT EXISTS records (
    record_id   TEXT PRIMARY KEY,
    collection  TEXT NOT NULL,              -- 'rating' | 'fivestarsummary'
    data_json   TEXT NOT NULL,
    idx_flag    INTEGER,                    -- 0 / 1 / NULL
    idx_date    TEXT,                       -- RFC 3339 UTC or NULL
    idx_array   TEXT NOT NULL DEFAULT '[]', -- JSON array of tagged scalars
    idx_string  TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS records_string_idx ON records(collection, idx_string);
CREATE INDEX IF NOT EXISTS records_flag_idx   ON records(collection, idx_flag);

PRAGMA user_version = 1;
";
