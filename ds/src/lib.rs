//! docstore - generic persistent record storage
//!
//! Stores serde-serializable records as JSON documents in SQLite, with a
//! side table of indexed fields for filtered queries. Each record type
//! implements [`Record`] to declare its collection and which fields are
//! filterable.
//!
//! The store is deliberately small: insert, get-by-id, update-by-id and
//! filtered listing. There are no cross-document transactions; callers that
//! need ordering guarantees across writes sequence them explicitly.

use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

mod store;

pub use store::{RawRecord, Store};

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no record with id '{id}' in collection '{collection}'")]
    NotFound { collection: String, id: String },
}

/// Current time as Unix milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A value that can be stored in the field index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexValue {
    String(String),
    Int(i64),
    Bool(bool),
}

impl IndexValue {
    /// Canonical text form used in the index table
    pub fn as_text(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Int(i) => i.to_string(),
            Self::Bool(b) => b.to_string(),
        }
    }
}

impl From<&str> for IndexValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for IndexValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for IndexValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

/// Filter operation against an indexed field
#[derive(Debug, Clone)]
pub enum FilterOp {
    Eq(IndexValue),
    Ne(IndexValue),
    In(Vec<IndexValue>),
    /// Matches records whose field is absent or outside the given set
    NotIn(Vec<IndexValue>),
}

/// A single filter clause; multiple filters are ANDed together
#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<IndexValue>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Eq(value.into()),
        }
    }

    pub fn ne(field: impl Into<String>, value: impl Into<IndexValue>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Ne(value.into()),
        }
    }

    pub fn is_in(field: impl Into<String>, values: Vec<IndexValue>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::In(values),
        }
    }

    pub fn not_in(field: impl Into<String>, values: Vec<IndexValue>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::NotIn(values),
        }
    }
}

/// A record that can be persisted in the store
pub trait Record: Serialize + DeserializeOwned {
    /// Unique identifier within the collection
    fn id(&self) -> &str;

    /// Last update timestamp (Unix milliseconds)
    fn updated_at(&self) -> i64;

    /// Collection this record type lives in
    fn collection_name() -> &'static str;

    /// Fields exposed to filtered queries
    fn indexed_fields(&self) -> HashMap<String, IndexValue>;
}
