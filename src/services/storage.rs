//! Local filesystem blob store for bitácora attachments.
//!
//! Files are written under a single root with a generated `{uuid}-{name}` file
//! name; only that file name is stored in the database, and reads resolve it
//! against the root so stored paths can never escape it.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

const MAX_NAME_LEN: usize = 120;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("File exceeds the {limit} byte limit")]
    TooLarge { limit: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
    max_bytes: usize,
}

/// Result of a successful write.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    /// Generated name, relative to the storage root.
    pub stored_name: String,
    pub size: u64,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn check_size(&self, size: usize) -> Result<(), StorageError> {
        if size > self.max_bytes {
            return Err(StorageError::TooLarge { limit: self.max_bytes });
        }
        Ok(())
    }

    pub async fn ensure_root(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    pub async fn store(&self, original_name: &str, bytes: &[u8]) -> Result<StoredFile, StorageError> {
        self.check_size(bytes.len())?;
        self.ensure_root().await?;

        let stored_name = format!("{}-{}", Uuid::new_v4(), sanitize_file_name(original_name));
        let path = self.root.join(&stored_name);
        fs::write(&path, bytes).await?;
        debug!("Stored {} bytes at {}", bytes.len(), path.display());

        Ok(StoredFile {
            stored_name,
            size: bytes.len() as u64,
        })
    }

    pub async fn read(&self, stored_name: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(stored_name)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(stored_name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a stored file. A file that is already gone is not an error.
    pub async fn remove(&self, stored_name: &str) -> Result<(), StorageError> {
        let path = self.resolve(stored_name)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Tried to remove missing file {}", path.display());
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn resolve(&self, stored_name: &str) -> Result<PathBuf, StorageError> {
        Path::new(stored_name)
            .file_name()
            .map(|name| self.root.join(name))
            .ok_or_else(|| StorageError::NotFound(stored_name.to_string()))
    }
}

/// Keep ASCII letters, digits, `.`, `-` and `_`; everything else becomes `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        return "archivo".to_string();
    }
    if cleaned.len() <= MAX_NAME_LEN {
        return cleaned.to_string();
    }
    // keep the extension when truncating
    match cleaned.rsplit_once('.') {
        Some((stem, ext)) if ext.len() < 16 => {
            let keep = MAX_NAME_LEN.saturating_sub(ext.len() + 1);
            format!("{}.{}", &stem[..keep.min(stem.len())], ext)
        }
        _ => cleaned[..MAX_NAME_LEN].to_string(),
    }
}

/// Content type guessed from the file extension.
pub fn content_type_for(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "txt" | "log" => "text/plain; charset=utf-8",
        "csv" => "text/csv",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("bitacora-storage-{}", Uuid::new_v4()))
    }

    #[test]
    fn sanitizes_names() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\fotos\\válvula 3.JPG"), "v_lvula_3.JPG");
        assert_eq!(sanitize_file_name("...oculto"), "oculto");
        assert_eq!(sanitize_file_name("///"), "archivo");

        let long = format!("{}.pdf", "a".repeat(300));
        let out = sanitize_file_name(&long);
        assert_eq!(out.len(), MAX_NAME_LEN);
        assert!(out.ends_with(".pdf"));
    }

    #[test]
    fn content_types() {
        assert_eq!(content_type_for("x.PNG"), "image/png");
        assert_eq!(content_type_for("x.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("x"), "application/octet-stream");
    }

    #[tokio::test]
    async fn store_read_remove() {
        let storage = FileStorage::new(temp_root(), 1024);
        let stored = storage.store("reporte final.txt", b"hola").await.unwrap();
        assert!(stored.stored_name.ends_with("-reporte_final.txt"));
        assert_eq!(stored.size, 4);

        assert_eq!(storage.read(&stored.stored_name).await.unwrap(), b"hola");
        storage.remove(&stored.stored_name).await.unwrap();
        assert!(matches!(
            storage.read(&stored.stored_name).await,
            Err(StorageError::NotFound(_))
        ));
        // second remove is a no-op
        storage.remove(&stored.stored_name).await.unwrap();

        let _ = std::fs::remove_dir_all(storage.root());
    }

    #[tokio::test]
    async fn rejects_oversized_files() {
        let storage = FileStorage::new(temp_root(), 3);
        let err = storage.store("a.bin", b"1234").await.unwrap_err();
        assert!(matches!(err, StorageError::TooLarge { limit: 3 }));
    }

    #[tokio::test]
    async fn reads_cannot_escape_root() {
        let storage = FileStorage::new(temp_root(), 1024);
        let err = storage.read("../../etc/passwd").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }
}
