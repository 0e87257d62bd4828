//! Pure union-filesystem resolution: no Hyper types here.
//!
//! Every lookup goes through a [`Storage`] so the decision logic can be
//! driven from an in-memory fixture as well as from disk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::sys_indexjson::core::INDEX_FILE;

/// What a path points at. Anything else (sockets, broken links) counts as absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// One immediate child of a directory, as reported by a [`Storage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEntry {
    pub name: String,
    pub kind: EntryKind,
    pub size: u64,
}

/// Read-only view of the filesystem the roots live on.
pub trait Storage {
    fn kind(&self, path: &Path) -> Option<EntryKind>;
    fn list(&self, dir: &Path) -> io::Result<Vec<StorageEntry>>;
}

/// The real filesystem. Symlinks are followed.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskStorage;

impl Storage for DiskStorage {
    fn kind(&self, path: &Path) -> Option<EntryKind> {
        let md = fs::metadata(path).ok()?;
        if md.is_dir() {
            Some(EntryKind::Directory)
        } else if md.is_file() {
            Some(EntryKind::File)
        } else {
            None
        }
    }

    fn list(&self, dir: &Path) -> io::Result<Vec<StorageEntry>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            // Non UTF-8 names can't be addressed through a URL path anyway.
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            let Ok(md) = fs::metadata(entry.path()) else {
                continue;
            };
            let kind = if md.is_dir() {
                EntryKind::Directory
            } else if md.is_file() {
                EntryKind::File
            } else {
                continue;
            };
            out.push(StorageEntry { name, kind, size: md.len() });
        }
        Ok(out)
    }
}

/// Ordered union roots. Earlier roots win every tie.
#[derive(Debug, Clone)]
pub struct RootSet {
    roots: Arc<[PathBuf]>,
}

impl RootSet {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots: roots.into() }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// First root where `rel` exists, with what it is there.
    pub fn locate<S: Storage>(&self, storage: &S, rel: &Path) -> Option<(PathBuf, EntryKind)> {
        self.roots.iter().find_map(|root| {
            let candidate = root.join(rel);
            storage.kind(&candidate).map(|kind| (candidate, kind))
        })
    }

    /// First root where `rel` is a directory.
    pub fn locate_dir<S: Storage>(&self, storage: &S, rel: &Path) -> Option<PathBuf> {
        self.roots
            .iter()
            .map(|root| root.join(rel))
            .find(|candidate| storage.kind(candidate) == Some(EntryKind::Directory))
    }
}

/// Outcome of mapping a request path onto the roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedTarget {
    File {
        absolute_path: PathBuf,
    },
    DirectoryIndex {
        index_path: PathBuf,
        /// Highest-precedence copy of the directory.
        source_directory: PathBuf,
        /// The directory relative to every root, for the union listing.
        relative: PathBuf,
    },
    NotFound,
}

/// A request path reduced to something safe to join onto a root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPath {
    /// Normalized, still percent-encoded URL path.
    pub pathname: String,
    /// Decoded segments joined as a relative path; empty for `/`.
    pub relative: PathBuf,
}

/// Parse `url_path` the way a browser would against a placeholder origin,
/// then decode it segment by segment. `None` means "can't be served".
pub fn parse_request_path(url_path: &str) -> Option<RequestPath> {
    let raw = if url_path.starts_with('/') {
        format!("http://local{url_path}")
    } else {
        format!("http://local/{url_path}")
    };
    let parsed = Url::parse(&raw).ok()?;
    if parsed.host_str() != Some("local") {
        return None;
    }

    let mut relative = PathBuf::new();
    for segment in parsed.path_segments()? {
        if segment.is_empty() {
            continue;
        }
        let decoded = percent_decode_str(segment).decode_utf8().ok()?;
        if decoded == "."
            || decoded == ".."
            || decoded.contains(['/', '\\', '\0'])
        {
            return None;
        }
        relative.push(&*decoded);
    }

    Some(RequestPath {
        pathname: parsed.path().to_string(),
        relative,
    })
}

fn names_index_document(pathname: &str) -> bool {
    pathname
        .to_ascii_lowercase()
        .ends_with(&format!("/{INDEX_FILE}"))
}

/// Decide what a request path means across the union.
pub fn resolve<S: Storage>(roots: &RootSet, storage: &S, url_path: &str) -> ResolvedTarget {
    let Some(request) = parse_request_path(url_path) else {
        return ResolvedTarget::NotFound;
    };

    let located = roots.locate(storage, &request.relative);
    if let Some((absolute, EntryKind::Directory)) = located {
        return ResolvedTarget::DirectoryIndex {
            index_path: absolute.join(INDEX_FILE),
            source_directory: absolute,
            relative: request.relative,
        };
    }

    // An index.json asked for directly is rebuilt whether or not it exists yet.
    if names_index_document(&request.pathname) {
        if let (Some(parent), Some(file_name)) =
            (request.relative.parent(), request.relative.file_name())
        {
            if let Some(source_directory) = roots.locate_dir(storage, parent) {
                return ResolvedTarget::DirectoryIndex {
                    index_path: source_directory.join(file_name),
                    source_directory,
                    relative: parent.to_path_buf(),
                };
            }
        }
    }

    match located {
        Some((absolute_path, EntryKind::File)) => ResolvedTarget::File { absolute_path },
        _ => ResolvedTarget::NotFound,
    }
}
