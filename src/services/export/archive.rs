// src/services/export/archive.rs

use std::{
    fs::File,
    io::{self, Read, Seek, Write},
};

use tokio_util::sync::CancellationToken;
use zip::{CompressionMethod, ZipWriter, write::FileOptions};

use crate::utils::sanitize::{UniqueNames, file_name};

use super::{
    ExportError,
    assembler::{ExportManifest, ManifestNode},
    resolver::{FileStatus, ResolvedFile},
    spool::CHUNK_SIZE,
};

const PLACEHOLDER: &str = "README.txt";

/// Counters reported once the archive is finalized.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub entries: usize,
    pub files_written: usize,
    pub files_missing: usize,
    pub placeholders: usize,
}

/// Thin wrapper over `ZipWriter` with the export's compression policy.
struct ArchiveWriter<'a, W: Write + Seek> {
    zip: ZipWriter<W>,
    options: FileOptions,
    summary: ArchiveSummary,
    cancel: &'a CancellationToken,
}

impl<'a, W: Write + Seek> ArchiveWriter<'a, W> {
    fn new(inner: W, cancel: &'a CancellationToken) -> Self {
        Self {
            zip: ZipWriter::new(inner),
            options: FileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(9)),
            summary: ArchiveSummary::default(),
            cancel,
        }
    }

    fn ensure_live(&self) -> Result<(), ExportError> {
        if self.cancel.is_cancelled() {
            return Err(ExportError::Cancelled);
        }
        Ok(())
    }

    /// Copies a source file into the current entry, checking for
    /// cancellation between chunks.
    fn copy_from(&mut self, source: &mut File) -> Result<(), ExportError> {
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            self.ensure_live()?;
            let read = match source.read(&mut buf) {
                Ok(0) => return Ok(()),
                Ok(read) => read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            self.zip.write_all(&buf[..read])?;
        }
    }

    fn write_bytes(&mut self, path: &str, bytes: &[u8]) -> Result<(), ExportError> {
        self.zip.start_file(path, self.options)?;
        self.zip.write_all(bytes)?;
        self.summary.entries += 1;
        Ok(())
    }

    fn write_missing(&mut self, path: &str, original: &str) -> Result<(), ExportError> {
        let note = format!(
            "The file \"{}\" is referenced by this module but could not be found in storage.\n",
            original
        );
        self.write_bytes(path, note.as_bytes())?;
        self.summary.files_missing += 1;
        Ok(())
    }

    fn write_node(&mut self, node: &ManifestNode<ResolvedFile>) -> Result<(), ExportError> {
        let mut names = UniqueNames::new();
        names.reserve(node.kind.metadata_file());
        names.reserve(PLACEHOLDER);

        let metadata = serde_json::to_vec_pretty(&node.metadata)?;
        self.write_bytes(&node.entry_path(node.kind.metadata_file()), &metadata)?;

        for resolved in &node.files {
            self.ensure_live()?;
            let name = names.claim_file(&file_name(&resolved.file.name));

            match &resolved.status {
                FileStatus::Found(path) => match File::open(path) {
                    Ok(mut source) => {
                        self.zip.start_file(node.entry_path(&name), self.options)?;
                        self.copy_from(&mut source)?;
                        self.summary.entries += 1;
                        self.summary.files_written += 1;
                    }
                    // Removed after it was resolved.
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        tracing::warn!(name = %resolved.file.name, "Stored file vanished during export");
                        let missing = names.claim_file(&format!("MISSING_{}.txt", name));
                        self.write_missing(&node.entry_path(&missing), &resolved.file.name)?;
                    }
                    Err(e) => return Err(e.into()),
                },
                FileStatus::Missing => {
                    let missing = names.claim_file(&format!("MISSING_{}.txt", name));
                    self.write_missing(&node.entry_path(&missing), &resolved.file.name)?;
                }
            }
        }

        if node.is_empty_module() {
            self.write_bytes(
                &node.entry_path(PLACEHOLDER),
                b"This module has no tasks or files yet.\n",
            )?;
            self.summary.placeholders += 1;
        }

        Ok(())
    }

    fn finish(mut self) -> Result<(W, ArchiveSummary), ExportError> {
        let inner = self.zip.finish()?;
        Ok((inner, self.summary))
    }
}

/// Writes the whole manifest into `out` and finalizes the archive.
///
/// Missing files are substituted with `MISSING_<name>.txt` notes; any other
/// failure aborts and is returned. A cancelled token stops the writer at the
/// next entry or chunk with `ExportError::Cancelled`.
pub fn write_archive<W: Write + Seek>(
    manifest: &ExportManifest<ResolvedFile>,
    out: W,
    cancel: &CancellationToken,
) -> Result<(W, ArchiveSummary), ExportError> {
    let mut writer = ArchiveWriter::new(out, cancel);
    for node in &manifest.nodes {
        writer.ensure_live()?;
        writer.write_node(node)?;
    }
    writer.finish()
}
