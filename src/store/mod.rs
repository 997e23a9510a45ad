//! Document store interface.
//!
//! The pipeline only needs four primitives from a store collection:
//! `find`, `distinct`, `delete_many`, and `insert_many`. Nothing here assumes
//! transactional atomicity across calls.
//!
//! Two implementations ship with the crate:
//! - `MemoryCollection`: in-process, used by tests and as a fake
//! - `FileStore` / `FileCollection`: JSON-lines files on disk, used by the binary

use serde_json::{Map, Value};

pub mod file;
pub mod memory;
pub mod records;

pub use file::*;
pub use memory::*;
pub use records::*;

/// A stored document: a JSON object.
pub type Document = Map<String, Value>;

/// Errors raised by store implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt document at {path}:{line}: {source}")]
    Corrupt {
        path: String,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode document: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("malformed document: {0}")]
    Malformed(String),
    #[error("store lock poisoned")]
    Poisoned,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A conjunction of field-equality clauses. The empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(String, Value)>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            clauses: vec![(field.into(), value.into())],
        }
    }

    pub fn is_all(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.clauses
            .iter()
            .all(|(field, value)| doc.get(field) == Some(value))
    }
}

/// Keep only `fields` of `doc` (all fields when `projection` is `None`).
pub fn project(doc: &Document, projection: Option<&[&str]>) -> Document {
    match projection {
        None => doc.clone(),
        Some(fields) => fields
            .iter()
            .filter_map(|f| doc.get(*f).map(|v| (f.to_string(), v.clone())))
            .collect(),
    }
}

/// Distinct values of `field` across `docs`, in first-seen order.
///
/// Documents without the field (or with `null`) are ignored.
pub fn distinct_values<'a>(docs: impl IntoIterator<Item = &'a Document>, field: &str) -> Vec<Value> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for doc in docs {
        let Some(value) = doc.get(field) else { continue };
        if value.is_null() {
            continue;
        }
        if seen.insert(value.to_string()) {
            out.push(value.clone());
        }
    }
    out
}

/// One named collection of documents.
pub trait Collection {
    fn name(&self) -> &str;

    fn find(&self, filter: &Filter, projection: Option<&[&str]>) -> Result<Vec<Document>, StoreError>;

    fn distinct(&self, field: &str) -> Result<Vec<Value>, StoreError>;

    /// Delete matching documents, returning how many were removed.
    fn delete_many(&self, filter: &Filter) -> Result<u64, StoreError>;

    /// Insert all documents in one call, returning how many were written.
    fn insert_many(&self, docs: &[Document]) -> Result<usize, StoreError>;
}

impl<C: Collection + ?Sized> Collection for &C {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn find(&self, filter: &Filter, projection: Option<&[&str]>) -> Result<Vec<Document>, StoreError> {
        (**self).find(filter, projection)
    }

    fn distinct(&self, field: &str) -> Result<Vec<Value>, StoreError> {
        (**self).distinct(field)
    }

    fn delete_many(&self, filter: &Filter) -> Result<u64, StoreError> {
        (**self).delete_many(filter)
    }

    fn insert_many(&self, docs: &[Document]) -> Result<usize, StoreError> {
        (**self).insert_many(docs)
    }
}
