//! HTTP glue: turn a compressed file into a hyper::Response<Body>.

use std::path::Path;

use hyper::header::{CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::{Body, Response, StatusCode};
use tracing::{debug, error};

use crate::sys_compress::core;

/// Deliver `path` gzip-encoded. The path has already been checked to exist;
/// if it is gone by now that is reported as a 500, not retried.
pub async fn handler_compressed(path: &Path) -> Response<Body> {
    match core::compress_file(path).await {
        Ok(file) => {
            debug!(path = %path.display(), bytes = file.body.len(), "delivering compressed");
            Response::builder()
                .header(CONTENT_TYPE, file.content_type)
                .header(CONTENT_ENCODING, core::CONTENT_ENCODING)
                .header(CONTENT_LENGTH, file.body.len())
                .body(Body::from(file.body))
                .unwrap()
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "delivery failed");
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .header(CONTENT_TYPE, "text/plain; charset=utf-8")
                .body(Body::from("Delivery failed"))
                .unwrap()
        }
    }
}
