//! Directory listing synthesis for `index.json`.
//!
//! The document for a directory is the union of that directory across every
//! root that has it. It is always rebuilt from scratch and swapped into place
//! with a rename, so a reader sees either the previous document or the new
//! one. Concurrent writers race and the last rename wins; nothing here gives
//! read-after-write consistency across requests.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sys_unionfs::core::{EntryKind, RootSet, Storage};

pub const INDEX_FILE: &str = "index.json";

/// Prefix of the scratch files an in-flight write leaves next to the index.
const TEMP_PREFIX: &str = ".index.json.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub entries: Vec<IndexEntry>,
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("failed to read directory {}: {source}", .path.display())]
    DirectoryReadFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write index {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize index: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Generated artifacts never list themselves.
fn is_generated(name: &str) -> bool {
    name.eq_ignore_ascii_case(INDEX_FILE) || name.starts_with(TEMP_PREFIX)
}

/// Merge the immediate entries of `relative` across all roots.
pub fn collect_listing<S: Storage>(
    roots: &RootSet,
    storage: &S,
    relative: &Path,
) -> Result<IndexDocument, IndexError> {
    let mut merged: BTreeMap<String, IndexEntry> = BTreeMap::new();
    let mut seen_any = false;

    for root in roots.roots() {
        let dir = root.join(relative);
        if storage.kind(&dir) != Some(EntryKind::Directory) {
            continue;
        }
        seen_any = true;

        let listed = storage
            .list(&dir)
            .map_err(|source| IndexError::DirectoryReadFailure { path: dir.clone(), source })?;

        for entry in listed {
            if is_generated(&entry.name) {
                continue;
            }
            // First root to provide a name keeps it.
            merged.entry(entry.name.clone()).or_insert_with(|| IndexEntry {
                name: entry.name,
                kind: entry.kind,
                size: (entry.kind == EntryKind::File).then_some(entry.size),
            });
        }
    }

    if !seen_any {
        return Err(IndexError::DirectoryReadFailure {
            path: relative.to_path_buf(),
            source: io::Error::from(io::ErrorKind::NotFound),
        });
    }

    Ok(IndexDocument {
        entries: merged.into_values().collect(),
    })
}

/// Write `doc` to `index_path` via a sibling temp file and a rename.
pub fn write_index(index_path: &Path, doc: &IndexDocument) -> Result<(), IndexError> {
    let write_err = |source: io::Error| IndexError::Write {
        path: index_path.to_path_buf(),
        source,
    };

    let dir = index_path
        .parent()
        .ok_or_else(|| write_err(io::Error::from(io::ErrorKind::InvalidInput)))?;
    let mut bytes = serde_json::to_vec_pretty(doc)?;
    bytes.push(b'\n');

    let mut tmp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(write_err)?;
    tmp.write_all(&bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(index_path).map_err(|e| write_err(e.error))?;
    Ok(())
}

/// Rebuild the listing of the directory at `relative` (the same path under
/// every root) and store it at `index_path`.
pub fn synthesize<S: Storage>(
    roots: &RootSet,
    storage: &S,
    index_path: &Path,
    relative: &Path,
) -> Result<IndexDocument, IndexError> {
    let doc = collect_listing(roots, storage, relative)?;
    write_index(index_path, &doc)?;
    Ok(doc)
}
