// src/services/export/resolver.rs

use std::path::{Component, Path, PathBuf};

use crate::models::module::StoredFile;

use super::assembler::{ExportManifest, ManifestNode};

/// Outcome of looking up one stored-file reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    /// Regular file at this path.
    Found(PathBuf),
    Missing,
}

#[derive(Debug, Clone)]
pub struct ResolvedFile {
    pub file: StoredFile,
    pub status: FileStatus,
}

/// Maps stored-file references onto the upload directory.
///
/// The file backend is read-only from here: nothing in this type writes,
/// renames or deletes.
#[derive(Debug, Clone)]
pub struct FileResolver {
    root: PathBuf,
}

impl FileResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Joins a stored path onto the root.
    ///
    /// Stored paths may carry the root as a prefix, either as configured
    /// (`/srv/app/uploads/files-1.pdf`) or by its directory name alone
    /// (`uploads/files-1.pdf`), or be relative to it. Anything that would
    /// land outside the root yields `None`.
    pub fn locate(&self, stored_path: &str) -> Option<PathBuf> {
        let path = Path::new(stored_path);
        let relative = path
            .strip_prefix(&self.root)
            .ok()
            .or_else(|| {
                let dir = self.root.file_name()?;
                path.strip_prefix(dir).ok()
            })
            .unwrap_or(path);

        let mut confined = PathBuf::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => confined.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }

        if confined.as_os_str().is_empty() {
            return None;
        }
        Some(self.root.join(confined))
    }

    pub async fn check(&self, file: &StoredFile) -> FileStatus {
        let Some(path) = self.locate(&file.path) else {
            tracing::warn!(name = %file.name, path = %file.path, "Stored path escapes upload root");
            return FileStatus::Missing;
        };

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => FileStatus::Found(path),
            Ok(_) => {
                tracing::warn!(name = %file.name, path = %path.display(), "Stored path is not a file");
                FileStatus::Missing
            }
            Err(e) => {
                tracing::warn!(name = %file.name, path = %path.display(), error = %e, "Stored file missing");
                FileStatus::Missing
            }
        }
    }

    /// Checks every file reference in the manifest, keeping node and file order.
    pub async fn resolve(&self, manifest: ExportManifest) -> ExportManifest<ResolvedFile> {
        let mut nodes = Vec::with_capacity(manifest.nodes.len());

        for node in manifest.nodes {
            let mut files = Vec::with_capacity(node.files.len());
            for file in node.files {
                let status = self.check(&file).await;
                files.push(ResolvedFile { file, status });
            }
            nodes.push(ManifestNode {
                kind: node.kind,
                directory: node.directory,
                metadata: node.metadata,
                task_count: node.task_count,
                files,
            });
        }

        ExportManifest {
            archive_name: manifest.archive_name,
            nodes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(name: &str, path: &str) -> StoredFile {
        StoredFile {
            name: name.to_string(),
            path: path.to_string(),
            mimetype: None,
            size: None,
        }
    }

    #[test]
    fn locate_accepts_root_prefixed_and_relative_paths() {
        let resolver = FileResolver::new("uploads");
        assert_eq!(
            resolver.locate("uploads/files-1.pdf"),
            Some(PathBuf::from("uploads/files-1.pdf"))
        );
        assert_eq!(
            resolver.locate("./modules/a.txt"),
            Some(PathBuf::from("uploads/modules/a.txt"))
        );
    }

    #[test]
    fn locate_rejects_escapes() {
        let resolver = FileResolver::new("/srv/uploads");
        assert_eq!(resolver.locate("../etc/passwd"), None);
        assert_eq!(resolver.locate("a/../../b"), None);
        assert_eq!(resolver.locate("/etc/passwd"), None);
        assert_eq!(resolver.locate(""), None);
        assert_eq!(
            resolver.locate("/srv/uploads/x.bin"),
            Some(PathBuf::from("/srv/uploads/x.bin"))
        );
    }

    #[test]
    fn locate_strips_upload_dir_name_under_absolute_root() {
        let resolver = FileResolver::new("/srv/app/uploads");
        assert_eq!(
            resolver.locate("uploads/files-1.pdf"),
            Some(PathBuf::from("/srv/app/uploads/files-1.pdf"))
        );
        assert_eq!(resolver.locate("uploads/../secret"), None);
        assert_eq!(resolver.locate("/uploads/files-1.pdf"), None);
    }

    #[tokio::test]
    async fn check_finds_upload_relative_paths_under_absolute_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("uploads");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(root.join("files-1.pdf"), b"%PDF").unwrap();
        let resolver = FileResolver::new(&root);

        assert_eq!(
            resolver.check(&stored("notes.pdf", "uploads/files-1.pdf")).await,
            FileStatus::Found(root.join("files-1.pdf"))
        );
    }

    #[tokio::test]
    async fn check_reports_found_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.pdf"), b"%PDF").unwrap();
        std::fs::create_dir(dir.path().join("folder")).unwrap();
        let resolver = FileResolver::new(dir.path());

        assert_eq!(
            resolver.check(&stored("notes.pdf", "notes.pdf")).await,
            FileStatus::Found(dir.path().join("notes.pdf"))
        );
        assert_eq!(
            resolver.check(&stored("gone.pdf", "gone.pdf")).await,
            FileStatus::Missing
        );
        assert_eq!(
            resolver.check(&stored("folder", "folder")).await,
            FileStatus::Missing
        );
    }
}
