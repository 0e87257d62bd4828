//! HTTP glue: resolve against the union, refresh listings, hand off to the compressor.

use std::path::PathBuf;

use hyper::{Body, Response, StatusCode};
use tracing::{debug, error, warn};

use crate::sys_compress::handlers::handler_compressed;
use crate::sys_indexjson;
use crate::sys_unionfs::core::{self, DiskStorage, ResolvedTarget, RootSet};

/// Serve `uri` out of the union filesystem.
/// Returns `None` when nothing matches, so the caller can fall through.
pub async fn handler_unionfs(roots: &RootSet, uri: &str) -> Option<Response<Body>> {
    let target = {
        let roots = roots.clone();
        let uri = uri.to_string();
        tokio::task::spawn_blocking(move || core::resolve(&roots, &DiskStorage, &uri)).await
    };
    let target = match target {
        Ok(t) => t,
        Err(e) => {
            error!(uri, error = %e, "resolution task failed");
            return Some(internal_error());
        }
    };

    let path = match target {
        ResolvedTarget::File { absolute_path } => absolute_path,
        ResolvedTarget::DirectoryIndex {
            index_path,
            source_directory,
            relative,
        } => refresh_index(roots, index_path, source_directory, relative).await?,
        ResolvedTarget::NotFound => {
            debug!(uri, "no match in any root");
            return None;
        }
    };

    Some(handler_compressed(&path).await)
}

/// Rebuild the listing, then report the index path if something is there to serve.
/// A failed rebuild is logged and otherwise ignored.
async fn refresh_index(
    roots: &RootSet,
    index_path: PathBuf,
    source_directory: PathBuf,
    relative: PathBuf,
) -> Option<PathBuf> {
    let roots = roots.clone();
    let result = tokio::task::spawn_blocking(move || {
        let outcome = sys_indexjson::core::synthesize(
            &roots,
            &DiskStorage,
            &index_path,
            &relative,
        );
        if let Err(e) = &outcome {
            warn!(
                directory = %source_directory.display(),
                error = %e,
                "index synthesis skipped"
            );
        }
        index_path.is_file().then_some(index_path)
    })
    .await;

    match result {
        Ok(Some(path)) => Some(path),
        Ok(None) => {
            debug!("no index document to deliver");
            None
        }
        Err(e) => {
            error!(error = %e, "index task failed");
            None
        }
    }
}

fn internal_error() -> Response<Body> {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .body(Body::from("Internal Server Error"))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sys_indexjson::core::IndexDocument;
    use flate2::read::GzDecoder;
    use std::fs;
    use std::io::Read;

    async fn body_text(resp: Response<Body>) -> String {
        let bytes = hyper::body::to_bytes(resp.into_body()).await.unwrap();
        let mut out = String::new();
        GzDecoder::new(&bytes[..]).read_to_string(&mut out).unwrap();
        out
    }

    #[tokio::test]
    async fn serves_file_from_highest_root() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        fs::write(a.path().join("y.txt"), "from a").unwrap();
        fs::write(b.path().join("y.txt"), "from b").unwrap();
        let roots = RootSet::new(vec![a.path().into(), b.path().into()]);

        let resp = handler_unionfs(&roots, "/y.txt").await.unwrap();
        assert_eq!(body_text(resp).await, "from a");
    }

    #[tokio::test]
    async fn directory_request_generates_listing() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        fs::create_dir(a.path().join("x")).unwrap();
        fs::create_dir(b.path().join("x")).unwrap();
        fs::write(a.path().join("x/a.txt"), "a").unwrap();
        fs::write(b.path().join("x/b.txt"), "b").unwrap();
        let roots = RootSet::new(vec![a.path().into(), b.path().into()]);

        let resp = handler_unionfs(&roots, "/x").await.unwrap();
        let doc: IndexDocument = serde_json::from_str(&body_text(resp).await).unwrap();
        let names: Vec<_> = doc.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
        assert!(a.path().join("x/index.json").is_file());
    }

    #[tokio::test]
    async fn existing_index_request_reflects_new_files() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        fs::create_dir(a.path().join("x")).unwrap();
        fs::create_dir(b.path().join("x")).unwrap();
        fs::write(a.path().join("x/a.txt"), "a").unwrap();
        let roots = RootSet::new(vec![a.path().into(), b.path().into()]);

        handler_unionfs(&roots, "/x").await.unwrap();
        fs::write(b.path().join("x/new.txt"), "new").unwrap();

        let resp = handler_unionfs(&roots, "/x/index.json").await.unwrap();
        let doc: IndexDocument = serde_json::from_str(&body_text(resp).await).unwrap();
        let names: Vec<_> = doc.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "new.txt"]);
    }

    #[tokio::test]
    async fn failed_rebuild_keeps_previous_document() {
        let a = tempfile::tempdir().unwrap();
        fs::create_dir(a.path().join("x")).unwrap();
        let index = a.path().join("x/index.json");
        fs::write(&index, r#"{"entries":[{"name":"old.txt","type":"file","size":1}]}"#).unwrap();
        let roots = RootSet::new(vec![a.path().into()]);

        // The listed directory vanished between resolution and synthesis.
        let served = refresh_index(&roots, index.clone(), a.path().join("gone"), "gone".into())
            .await
            .unwrap();
        assert_eq!(served, index);

        let resp = handler_compressed(&served).await;
        let doc: IndexDocument = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(doc.entries[0].name, "old.txt");
    }

    #[tokio::test]
    async fn failed_rebuild_without_document_falls_through() {
        let a = tempfile::tempdir().unwrap();
        fs::create_dir(a.path().join("x")).unwrap();
        let roots = RootSet::new(vec![a.path().into()]);

        let served = refresh_index(
            &roots,
            a.path().join("x/index.json"),
            a.path().join("gone"),
            "gone".into(),
        )
        .await;
        assert!(served.is_none());
        assert!(!a.path().join("x/index.json").exists());
    }

    #[tokio::test]
    async fn direct_index_request_creates_document() {
        let a = tempfile::tempdir().unwrap();
        fs::create_dir(a.path().join("maps")).unwrap();
        fs::write(a.path().join("maps/q3dm1.bsp"), "bsp").unwrap();
        let roots = RootSet::new(vec![a.path().into()]);

        let resp = handler_unionfs(&roots, "/maps/index.json").await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains("q3dm1.bsp"));
    }

    #[tokio::test]
    async fn unknown_path_falls_through() {
        let a = tempfile::tempdir().unwrap();
        let roots = RootSet::new(vec![a.path().into()]);
        assert!(handler_unionfs(&roots, "/does/not/exist").await.is_none());
    }
}
