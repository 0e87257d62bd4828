//! HTTP glue: serve whatever `core::map_static_path` gives us.

use std::str::FromStr;

use hyper::header::CONTENT_TYPE;
use hyper::{Body, Response, StatusCode};
use mime_guess::{Mime, mime};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use crate::sys_statichost::core::{StaticMount, map_static_path};

/// Try to serve a file for this URI from the static mounts, uncompressed.
/// Returns `Some(response)` if a mount has it, or `None` otherwise.
pub async fn handler_static(mounts: &[StaticMount], uri: &str) -> Option<Response<Body>> {
    let path = map_static_path(mounts, uri)?;
    match File::open(&path).await {
        Ok(file) => {
            debug!(uri, path = %path.display(), "static hit");
            let stream = ReaderStream::new(file);
            let mime = Mime::from_str(
                mime_guess::from_path(&path)
                    .first_or_octet_stream()
                    .essence_str(),
            )
            .unwrap_or(mime::TEXT_PLAIN);
            let resp = Response::builder()
                .header(CONTENT_TYPE, mime.as_ref())
                .body(Body::wrap_stream(stream))
                .unwrap();
            Some(resp)
        }
        Err(e) => {
            warn!(uri, path = %path.display(), error = %e, "static file vanished");
            Some(
                Response::builder()
                    .status(StatusCode::NOT_FOUND)
                    .body(Body::from("Not found"))
                    .unwrap(),
            )
        }
    }
}
