//! Pure path‑mapping logic: any file under the static mounts, plus extension fallback.

use std::path::PathBuf;

use crate::sys_unionfs::core::parse_request_path;

/// A plain directory served ahead of the union.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticMount {
    pub dir: PathBuf,
    /// Tried in order when the exact file is missing: `/page` → `page.html`.
    pub extensions: Vec<String>,
}

impl StaticMount {
    pub fn new(dir: impl Into<PathBuf>, extensions: &[&str]) -> Self {
        Self {
            dir: dir.into(),
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// Given a request path, return the first matching file across the mounts,
/// or `None` if no mount has it.
pub fn map_static_path(mounts: &[StaticMount], uri: &str) -> Option<PathBuf> {
    let rel = parse_request_path(uri)?.relative;

    for mount in mounts {
        // 1) Root → index.html
        if rel.as_os_str().is_empty() {
            let index = mount.dir.join("index.html");
            if index.is_file() {
                return Some(index);
            }
            continue;
        }

        // 2) Try exact file
        let candidate = mount.dir.join(&rel);
        if candidate.is_file() {
            return Some(candidate);
        }

        // 3) Try with this mount's fallback extensions appended
        for ext in &mount.extensions {
            let mut name = candidate.clone().into_os_string();
            name.push(".");
            name.push(ext);
            let with_ext = PathBuf::from(name);
            if with_ext.is_file() {
                return Some(with_ext);
            }
        }
    }

    None
}
