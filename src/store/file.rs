//! JSON-lines file store.
//!
//! Layout: `<root>/<database>/<collection>.jsonl`, one document per line.
//! Each collection serializes its own operations with a mutex; there is no
//! cross-process locking. An `insert_many` batch is all-or-nothing: a failed
//! append truncates the file back to its previous length.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::Value;

use super::{Collection, Document, Filter, StoreError, distinct_values, project};

/// A directory holding the collections of one database.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) `<root>/<database>`.
    pub fn open(root: &Path, database: &str) -> Result<Self, StoreError> {
        let dir = root.join(database);
        fs::create_dir_all(&dir).map_err(|source| io_err(&dir, source))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn collection(&self, name: &str) -> FileCollection {
        FileCollection {
            name: name.to_string(),
            path: self.dir.join(format!("{name}.jsonl")),
            lock: Mutex::new(()),
        }
    }
}

#[derive(Debug)]
pub struct FileCollection {
    name: String,
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCollection {
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Vec<Document>, StoreError> {
        let mut docs = Vec::new();
        self.scan(|doc| docs.push(doc))?;
        Ok(docs)
    }

    /// Stream every document to `visit`, one line at a time.
    fn scan(&self, mut visit: impl FnMut(Document)) -> Result<(), StoreError> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(io_err(&self.path, e)),
        };

        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| io_err(&self.path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            let doc: Document = serde_json::from_str(&line).map_err(|source| StoreError::Corrupt {
                path: self.path.display().to_string(),
                line: idx + 1,
                source,
            })?;
            visit(doc);
        }
        Ok(())
    }

    fn write_docs<W: Write>(&self, out: W, docs: &[Document]) -> Result<(), StoreError> {
        let mut writer = BufWriter::new(out);
        for doc in docs {
            let line = serde_json::to_string(doc)?;
            writeln!(writer, "{line}").map_err(|e| io_err(&self.path, e))?;
        }
        writer.flush().map_err(|e| io_err(&self.path, e))
    }

    /// Append `docs` through `out`, cutting `file` back to its starting length
    /// if anything fails so no partial batch or torn line survives.
    fn append_or_rollback<W: Write>(&self, file: &File, out: W, docs: &[Document]) -> Result<(), StoreError> {
        let start = file.metadata().map_err(|e| io_err(&self.path, e))?.len();
        if let Err(e) = self.write_docs(out, docs) {
            tracing::warn!(path = %self.path.display(), error = %e, "append failed; rolling back partial batch");
            file.set_len(start).map_err(|e| io_err(&self.path, e))?;
            return Err(e);
        }
        Ok(())
    }
}

impl Collection for FileCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn find(&self, filter: &Filter, projection: Option<&[&str]>) -> Result<Vec<Document>, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut found = Vec::new();
        self.scan(|doc| {
            if filter.matches(&doc) {
                found.push(project(&doc, projection));
            }
        })?;
        Ok(found)
    }

    fn distinct(&self, field: &str) -> Result<Vec<Value>, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let docs = self.read_all()?;
        Ok(distinct_values(docs.iter(), field))
    }

    fn delete_many(&self, filter: &Filter) -> Result<u64, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let docs = self.read_all()?;
        let (removed, kept): (Vec<Document>, Vec<Document>) = docs.into_iter().partition(|d| filter.matches(d));
        if removed.is_empty() && !filter.is_all() {
            return Ok(0);
        }

        // Rewrite through a sibling temp file so a crash never leaves a
        // half-written collection behind.
        let tmp = self.path.with_extension("jsonl.tmp");
        let file = File::create(&tmp).map_err(|e| io_err(&tmp, e))?;
        self.write_docs(file, &kept)?;
        fs::rename(&tmp, &self.path).map_err(|e| io_err(&self.path, e))?;
        Ok(removed.len() as u64)
    }

    fn insert_many(&self, docs: &[Document]) -> Result<usize, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| io_err(&self.path, e))?;
        self.append_or_rollback(&file, &file, docs)?;
        Ok(docs.len())
    }
}

fn io_err(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}
