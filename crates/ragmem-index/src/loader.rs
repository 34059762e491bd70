//! Loading documents from files and directories

use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use ragmem_core::{Document, Error, Result};

const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "csv", "json"];
const PDF_EXTENSION: &str = "pdf";

/// Reads supported files into documents.
///
/// A file path yields one document. A directory yields one document per
/// supported file in it, sorted by path; unsupported files are skipped.
#[derive(Debug, Clone, Default)]
pub struct DirectoryReader {
    recursive: bool,
}

impl DirectoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Descend into subdirectories as well
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Whether the file extension is one we can read
    pub fn is_supported(path: &Path) -> bool {
        match extension(path) {
            Some(ext) => ext == PDF_EXTENSION || TEXT_EXTENSIONS.contains(&ext.as_str()),
            None => false,
        }
    }

    /// Load every document under `path`
    pub async fn load(&self, path: impl AsRef<Path>) -> Result<Vec<Document>> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            Error::DocumentLoader(format!("cannot read '{}': {}", path.display(), e))
        })?;

        if metadata.is_file() {
            return Ok(vec![self.load_file(path).await?]);
        }

        let files = self.collect_files(path).await?;
        let mut documents = Vec::with_capacity(files.len());
        for file in files {
            match self.load_file(&file).await {
                Ok(document) => documents.push(document),
                Err(e) => warn!(path = %file.display(), error = %e, "skipping unreadable file"),
            }
        }

        debug!(path = %path.display(), count = documents.len(), "loaded documents");
        Ok(documents)
    }

    /// Load a list of paths, files or directories
    pub async fn load_all<P: AsRef<Path>>(&self, paths: &[P]) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        for path in paths {
            documents.extend(self.load(path).await?);
        }
        Ok(documents)
    }

    async fn collect_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let entry_path = entry.path();
                let file_type = entry.file_type().await?;

                if file_type.is_dir() {
                    if self.recursive {
                        pending.push(entry_path);
                    }
                } else if file_type.is_file() && Self::is_supported(&entry_path) {
                    files.push(entry_path);
                }
            }
        }

        files.sort();
        Ok(files)
    }

    /// Load a single file, rejecting unsupported or empty files
    pub async fn load_file(&self, path: &Path) -> Result<Document> {
        let ext = extension(path).ok_or_else(|| {
            Error::DocumentLoader(format!("'{}' has no file extension", path.display()))
        })?;

        let content = if ext == PDF_EXTENSION {
            let pdf_path = path.to_path_buf();
            tokio::task::spawn_blocking(move || pdf_extract::extract_text(&pdf_path))
                .await
                .map_err(|e| Error::Other(e.to_string()))?
                .map_err(|e| {
                    Error::DocumentLoader(format!("failed to extract '{}': {}", path.display(), e))
                })?
        } else if TEXT_EXTENSIONS.contains(&ext.as_str()) {
            tokio::fs::read_to_string(path).await.map_err(|e| {
                Error::DocumentLoader(format!("failed to read '{}': {}", path.display(), e))
            })?
        } else {
            return Err(Error::DocumentLoader(format!(
                "unsupported file format: {}",
                path.display()
            )));
        };

        if content.trim().is_empty() {
            return Err(Error::DocumentLoader(format!(
                "document is empty: {}",
                path.display()
            )));
        }

        let source = path.display().to_string();
        let title = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.clone());

        Ok(Document {
            id: format!("{:x}", md5::compute(source.as_bytes())),
            title,
            content,
            source: Some(source.clone()),
            metadata: json!({
                "source": "file",
                "path": source,
                "file_type": ext,
            }),
        })
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}
