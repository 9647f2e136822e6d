//! SQLite-backed store implementation
//!
//! Layout: a single `records` table keyed by (collection, id) holding the
//! JSON document, plus a `record_index` table with one row per indexed
//! field. Listing order is insertion order (rowid), which gives FIFO
//! semantics for queue-style collections.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{Connection, params, params_from_iter};
use tracing::debug;

use crate::{Filter, FilterOp, Record, StoreError};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS records (
    collection  TEXT NOT NULL,
    id          TEXT NOT NULL,
    data        TEXT NOT NULL,
    updated_at  INTEGER NOT NULL,
    PRIMARY KEY (collection, id)
);
CREATE TABLE IF NOT EXISTS record_index (
    collection  TEXT NOT NULL,
    record_id   TEXT NOT NULL,
    field       TEXT NOT NULL,
    value       TEXT NOT NULL,
    PRIMARY KEY (collection, record_id, field)
);
CREATE INDEX IF NOT EXISTS idx_record_index_lookup
    ON record_index (collection, field, value);
";

/// An untyped record as stored: id plus the raw JSON document.
///
/// Used when the caller must tolerate documents it cannot deserialize
/// (e.g. task rows written by a newer producer).
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub id: String,
    pub data: serde_json::Value,
}

/// Persistent record store over a single SQLite database
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) a store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        debug!(path = %path.as_ref().display(), "Store::open: called");
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open an in-memory store (tests, throwaway tooling)
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a new record
    pub fn create<R: Record>(&self, record: &R) -> Result<(), StoreError> {
        let collection = R::collection_name();
        debug!(collection, id = %record.id(), "Store::create: called");
        let data = serde_json::to_string(record)?;

        let mut conn = self.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO records (collection, id, data, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![collection, record.id(), data, record.updated_at()],
        )?;
        write_index(&tx, collection, record)?;
        tx.commit()?;
        Ok(())
    }

    /// Fetch a record by id
    pub fn get<R: Record>(&self, id: &str) -> Result<Option<R>, StoreError> {
        let collection = R::collection_name();
        debug!(collection, %id, "Store::get: called");
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT data FROM records WHERE collection = ?1 AND id = ?2")?;
        let mut rows = stmt.query(params![collection, id])?;

        match rows.next()? {
            Some(row) => {
                let data: String = row.get(0)?;
                Ok(Some(serde_json::from_str(&data)?))
            }
            None => Ok(None),
        }
    }

    /// Update an existing record by id
    ///
    /// Errors with [`StoreError::NotFound`] if the record was never created.
    pub fn update<R: Record>(&self, record: &R) -> Result<(), StoreError> {
        let collection = R::collection_name();
        debug!(collection, id = %record.id(), "Store::update: called");
        let data = serde_json::to_string(record)?;

        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let changed = tx.execute(
            "UPDATE records SET data = ?3, updated_at = ?4 WHERE collection = ?1 AND id = ?2",
            params![collection, record.id(), data, record.updated_at()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: record.id().to_string(),
            });
        }
        tx.execute(
            "DELETE FROM record_index WHERE collection = ?1 AND record_id = ?2",
            params![collection, record.id()],
        )?;
        write_index(&tx, collection, record)?;
        tx.commit()?;
        Ok(())
    }

    /// List records matching all filters, in insertion (FIFO) order
    pub fn list<R: Record>(&self, filters: &[Filter]) -> Result<Vec<R>, StoreError> {
        let raw = self.list_raw(R::collection_name(), filters)?;
        let mut records = Vec::with_capacity(raw.len());
        for r in raw {
            records.push(serde_json::from_value(r.data)?);
        }
        Ok(records)
    }

    /// First record matching all filters, if any
    pub fn find_one<R: Record>(&self, filters: &[Filter]) -> Result<Option<R>, StoreError> {
        Ok(self.list(filters)?.into_iter().next())
    }

    /// List matching records without deserializing into a concrete type
    pub fn list_raw(&self, collection: &str, filters: &[Filter]) -> Result<Vec<RawRecord>, StoreError> {
        debug!(collection, filter_count = filters.len(), "Store::list_raw: called");
        let (clauses, args) = build_filter_sql(filters);
        let sql = format!(
            "SELECT r.id, r.data FROM records r WHERE r.collection = ?1{} ORDER BY r.rowid ASC",
            clauses
        );

        let mut params: Vec<String> = vec![collection.to_string()];
        params.extend(args);

        let conn = self.lock();
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(params.iter()))?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let id: String = row.get(0)?;
            let data: String = row.get(1)?;
            out.push(RawRecord {
                id,
                data: serde_json::from_str(&data)?,
            });
        }
        Ok(out)
    }

    /// Count records matching all filters
    pub fn count(&self, collection: &str, filters: &[Filter]) -> Result<u64, StoreError> {
        Ok(self.list_raw(collection, filters)?.len() as u64)
    }
}

fn write_index<R: Record>(tx: &rusqlite::Transaction<'_>, collection: &str, record: &R) -> Result<(), StoreError> {
    for (field, value) in record.indexed_fields() {
        tx.execute(
            "INSERT INTO record_index (collection, record_id, field, value) VALUES (?1, ?2, ?3, ?4)",
            params![collection, record.id(), field, value.as_text()],
        )?;
    }
    Ok(())
}

/// Build the WHERE fragment for a filter set.
///
/// Every filter becomes an EXISTS / NOT EXISTS subquery against the index
/// table, so `Ne`/`NotIn` also match records that never indexed the field.
/// Returns the SQL fragment plus positional arguments starting at ?2
/// (?1 is the collection).
fn build_filter_sql(filters: &[Filter]) -> (String, Vec<String>) {
    let mut sql = String::new();
    let mut args: Vec<String> = Vec::new();
    // ?1 is taken by the collection name
    let mut n = 2;

    for filter in filters {
        let (negated, values) = match &filter.op {
            FilterOp::Eq(v) => (false, vec![v.clone()]),
            FilterOp::Ne(v) => (true, vec![v.clone()]),
            FilterOp::In(vs) => (false, vs.clone()),
            FilterOp::NotIn(vs) => (true, vs.clone()),
        };

        let field_param = format!("?{}", n);
        args.push(filter.field.clone());
        n += 1;

        let mut placeholders = Vec::with_capacity(values.len());
        for v in &values {
            placeholders.push(format!("?{}", n));
            args.push(v.as_text());
            n += 1;
        }

        let keyword = if negated { "NOT EXISTS" } else { "EXISTS" };
        sql.push_str(&format!(
            " AND {} (SELECT 1 FROM record_index i WHERE i.collection = r.collection \
             AND i.record_id = r.id AND i.field = {} AND i.value IN ({}))",
            keyword,
            field_param,
            placeholders.join(", ")
        ));
    }

    (sql, args)
}
