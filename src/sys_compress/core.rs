//! Gzip every delivered file. No negotiation against `Accept-Encoding`.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use flate2::Compression;
use flate2::write::GzEncoder;
use thiserror::Error;

/// The only content encoding this server produces.
pub const CONTENT_ENCODING: &str = "gzip";

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("{} disappeared before it could be read", .0.display())]
    Vanished(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("compression task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Compressed body plus what the response needs to describe it.
#[derive(Debug, Clone)]
pub struct CompressedFile {
    pub body: Bytes,
    pub content_type: String,
}

pub fn gzip(raw: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(raw.len() / 2), Compression::default());
    encoder.write_all(raw)?;
    encoder.finish()
}

pub fn content_type_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Read `path` and gzip it off the async workers.
pub async fn compress_file(path: &Path) -> Result<CompressedFile, DeliveryError> {
    let raw = tokio::fs::read(path).await.map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            DeliveryError::Vanished(path.to_path_buf())
        } else {
            DeliveryError::Io { path: path.to_path_buf(), source }
        }
    })?;

    let compressed = tokio::task::spawn_blocking(move || gzip(&raw))
        .await?
        .map_err(|source| DeliveryError::Io { path: path.to_path_buf(), source })?;

    Ok(CompressedFile {
        body: Bytes::from(compressed),
        content_type: content_type_for(path),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    fn gunzip(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        GzDecoder::new(data).read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn gzip_round_trips_file_bytes() {
        let raw = b"seta sv_hostname \"quake\"\n".repeat(50);
        let packed = gzip(&raw).unwrap();
        assert!(packed.len() < raw.len());
        assert_eq!(gunzip(&packed), raw);
    }

    #[test]
    fn content_types_follow_extension() {
        assert_eq!(content_type_for(Path::new("x/index.json")), "application/json");
        assert_eq!(content_type_for(Path::new("ioq3.wasm")), "application/wasm");
        assert_eq!(content_type_for(Path::new("pak0.pk3")), "application/octet-stream");
    }

    #[tokio::test]
    async fn compress_file_reads_and_encodes() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("server.cfg");
        std::fs::write(&path, b"map q3dm17\n").unwrap();

        let out = compress_file(&path).await.unwrap();
        assert_eq!(gunzip(&out.body), b"map q3dm17\n");
    }

    #[tokio::test]
    async fn vanished_file_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let err = compress_file(&tmp.path().join("gone.cfg")).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Vanished(_)));
    }
}
