// src/services/export/mod.rs

//! Course and module export.
//!
//! The flow is assemble (entity reads, authorization) → resolve (file
//! existence) → write (ZIP into a spool file) → stream. Entries are streamed
//! as soon as the zip writer has finalized them. Every failure before the
//! first chunk surfaces as a normal error response; later failures abort the
//! body.

use std::io;

use axum::{
    body::{Body, Bytes},
    http::header,
    response::{IntoResponse, Response},
};
use tokio::sync::mpsc;
use tokio_stream::{StreamExt, wrappers::ReceiverStream};
use tokio_util::sync::{CancellationToken, DropGuard};

pub mod archive;
pub mod assembler;
pub mod resolver;
pub mod spool;

pub use archive::{ArchiveSummary, write_archive};
pub use assembler::{ExportManifest, ManifestNode, NodeKind, assemble_course, assemble_module};
pub use resolver::{FileResolver, FileStatus, ResolvedFile};

use spool::{Chunk, Spool};

/// Chunks buffered between the writer and the response body.
const CHANNEL_DEPTH: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("metadata serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("export cancelled")]
    Cancelled,
}

/// An archive being written, ready to be streamed to the client.
///
/// Dropping it, or the response body built from it, cancels the writer.
pub struct ArchiveDownload {
    pub file_name: String,
    head: Bytes,
    rest: mpsc::Receiver<Chunk>,
    guard: DropGuard,
}

/// Starts writing the archive on the blocking pool and waits for its first
/// finalized bytes.
///
/// The spool is an anonymous temporary file, so it is released as soon as
/// the writer stops.
pub async fn spool_archive(
    manifest: ExportManifest<ResolvedFile>,
) -> Result<ArchiveDownload, ExportError> {
    let file_name = format!("{}.zip", manifest.archive_name);
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();
    let (tx, mut rx) = mpsc::channel(CHANNEL_DEPTH);

    tokio::task::spawn_blocking(move || run_writer(manifest, tx, cancel));

    let head = match rx.recv().await {
        Some(Ok(chunk)) => chunk,
        Some(Err(e)) => return Err(ExportError::Io(e)),
        None => {
            return Err(ExportError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "archive writer stopped without output",
            )));
        }
    };

    Ok(ArchiveDownload {
        file_name,
        head,
        rest: rx,
        guard,
    })
}

fn run_writer(
    manifest: ExportManifest<ResolvedFile>,
    tx: mpsc::Sender<Chunk>,
    cancel: CancellationToken,
) {
    let result = tempfile::tempfile()
        .map_err(ExportError::from)
        .and_then(|file| write_archive(&manifest, Spool::new(file, tx.clone()), &cancel))
        .and_then(|(mut spool, summary)| {
            spool.flush_all()?;
            Ok(summary)
        });

    match result {
        Ok(summary) => tracing::info!(
            archive = %manifest.archive_name,
            entries = summary.entries,
            files_written = summary.files_written,
            files_missing = summary.files_missing,
            placeholders = summary.placeholders,
            "Archive written"
        ),
        Err(_) if cancel.is_cancelled() => {
            tracing::info!(archive = %manifest.archive_name, "Export cancelled by client");
        }
        Err(e) => {
            tracing::error!(archive = %manifest.archive_name, error = %e, "Archive writing failed");
            let _ = tx.blocking_send(Err(io::Error::other(e)));
        }
    }
}

impl IntoResponse for ArchiveDownload {
    fn into_response(self) -> Response {
        let disposition = format!("attachment; filename=\"{}\"", self.file_name);
        let guard = self.guard;
        let stream = tokio_stream::once(Ok(self.head))
            .chain(ReceiverStream::new(self.rest))
            .map(move |chunk| {
                let _alive = &guard;
                chunk
            });

        (
            [
                (header::CONTENT_TYPE, "application/zip".to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            Body::from_stream(stream),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::{io::Read, path::Path, time::Duration};

    use serde_json::json;

    use super::*;
    use crate::models::module::StoredFile;

    fn module_manifest(files: Vec<ResolvedFile>) -> ExportManifest<ResolvedFile> {
        ExportManifest {
            archive_name: "Intro_to_CS".to_string(),
            nodes: vec![ManifestNode {
                kind: NodeKind::Module,
                directory: String::new(),
                metadata: json!({ "module_name": "Intro" }),
                task_count: 0,
                files,
            }],
        }
    }

    fn found(name: &str, path: &Path) -> ResolvedFile {
        ResolvedFile {
            file: StoredFile {
                name: name.to_string(),
                path: path.display().to_string(),
                mimetype: None,
                size: None,
            },
            status: FileStatus::Found(path.to_path_buf()),
        }
    }

    #[tokio::test]
    async fn spooled_archive_streams_as_zip_download() {
        let download = spool_archive(module_manifest(Vec::new())).await.unwrap();
        assert_eq!(download.file_name, "Intro_to_CS.zip");

        let response = download.into_response();
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Intro_to_CS.zip\""
        );

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes.to_vec())).unwrap();
        assert_eq!(archive.len(), 2);
        let mut json = String::new();
        archive
            .by_name("module.json")
            .unwrap()
            .read_to_string(&mut json)
            .unwrap();
        assert!(json.contains("Intro"));
    }

    #[tokio::test]
    async fn large_attachments_stream_intact() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("lecture.bin");
        let payload: Vec<u8> = (0..(3 * spool::CHUNK_SIZE as u32)).map(|i| (i * 7 % 251) as u8).collect();
        std::fs::write(&video, &payload).unwrap();

        let download = spool_archive(module_manifest(vec![found("lecture.bin", &video)]))
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(download.into_response().into_body(), usize::MAX)
            .await
            .unwrap();

        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes.to_vec())).unwrap();
        let mut content = Vec::new();
        archive
            .by_name("lecture.bin")
            .unwrap()
            .read_to_end(&mut content)
            .unwrap();
        assert_eq!(content, payload);
    }

    #[cfg(target_os = "linux")]
    fn open_handles_to(path: &Path) -> usize {
        let target = std::fs::canonicalize(path).unwrap();
        std::fs::read_dir("/proc/self/fd")
            .unwrap()
            .filter_map(Result::ok)
            .filter(|fd| std::fs::read_link(fd.path()).is_ok_and(|link| link == target))
            .count()
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn dropped_download_stops_the_writer() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("lecture.mp4");
        std::fs::File::create(&video)
            .unwrap()
            .set_len(256 * 1024 * 1024)
            .unwrap();

        let download = spool_archive(module_manifest(vec![found("lecture.mp4", &video)]))
            .await
            .unwrap();
        drop(download);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(open_handles_to(&video), 0);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn abandoned_export_stops_the_writer() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("lecture.mp4");
        std::fs::File::create(&video)
            .unwrap()
            .set_len(256 * 1024 * 1024)
            .unwrap();

        let manifest = module_manifest(vec![found("lecture.mp4", &video)]);
        let _ = tokio::time::timeout(Duration::from_millis(200), async move {
            let _download = spool_archive(manifest).await.unwrap();
            // Client stalls after the first chunk.
            std::future::pending::<()>().await;
        })
        .await;

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(open_handles_to(&video), 0);
    }
}
