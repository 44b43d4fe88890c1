use std::path::{Component, Path, PathBuf};

use axum::extract::Multipart;
use bytes::Bytes;
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use folio_shared::constants::{ALLOWED_IMAGE_EXTENSIONS, UPLOAD_URL_PREFIX};

use crate::error::ApiError;

/// Verify that a resolved path stays within the expected base directory.
/// Prevents path traversal attacks.
fn ensure_within(base: &Path, target: &Path) -> Result<PathBuf, ApiError> {
    // Canonicalize base; target may not exist yet so normalize manually
    let canonical_base = base.canonicalize().unwrap_or_else(|_| base.to_path_buf());
    let mut resolved = canonical_base.clone();
    for component in target
        .strip_prefix(base)
        .or_else(|_| target.strip_prefix(&canonical_base))
        .unwrap_or(target)
        .components()
    {
        match component {
            Component::Normal(c) => resolved.push(c),
            Component::ParentDir => {
                return Err(ApiError::Validation("Path traversal detected".to_string()));
            }
            _ => {} // RootDir, CurDir, Prefix — skip
        }
    }
    if !resolved.starts_with(&canonical_base) {
        return Err(ApiError::Validation("Path traversal detected".to_string()));
    }
    Ok(resolved)
}

/// One file part pulled out of a multipart form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Read the file part called `name`, skipping every other part.
pub async fn read_file_field(
    multipart: &mut Multipart,
    name: &str,
) -> Result<Option<UploadedFile>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(name) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await?;
        return Ok(Some(UploadedFile {
            file_name,
            content_type,
            data,
        }));
    }
    Ok(None)
}

/// Flat directory of uploaded images, served under `/uploads`.
#[derive(Debug, Clone)]
pub struct UploadStore {
    base_path: PathBuf,
    max_size: usize,
}

impl UploadStore {
    pub async fn new(base_path: PathBuf, max_size: usize) -> std::io::Result<Self> {
        fs::create_dir_all(&base_path).await?;

        info!(path = %base_path.display(), "Upload store initialized");

        Ok(Self {
            base_path,
            max_size,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Size and type checks for an image part. Returns the extension it will
    /// be stored under.
    pub fn check_image(&self, file: &UploadedFile) -> Result<&'static str, ApiError> {
        if file.data.is_empty() {
            return Err(ApiError::Validation("No file uploaded".to_string()));
        }
        if file.data.len() > self.max_size {
            return Err(ApiError::PayloadTooLarge(format!(
                "File too large: {} bytes (max {})",
                file.data.len(),
                self.max_size
            )));
        }
        image_extension(file.file_name.as_deref(), file.content_type.as_deref())
    }

    /// Check an image part and write it as
    /// `<field>-<unix millis>-<uuid>.<ext>`. Returns the public path.
    pub async fn store_image(&self, field: &str, file: &UploadedFile) -> Result<String, ApiError> {
        let ext = self.check_image(file)?;

        let file_name = format!(
            "{field}-{}-{}.{ext}",
            chrono::Utc::now().timestamp_millis(),
            Uuid::new_v4().simple()
        );
        let path = self.safe_path(&file_name)?;

        fs::write(&path, &file.data)
            .await
            .map_err(|e| ApiError::Internal(format!("Failed to write upload {file_name}: {e}")))?;

        debug!(file = %file_name, size = file.data.len(), "Stored upload");
        Ok(format!("{UPLOAD_URL_PREFIX}/{file_name}"))
    }

    fn safe_path(&self, file_name: &str) -> Result<PathBuf, ApiError> {
        if file_name.contains('/') || file_name.contains('\\') || file_name.contains("..") {
            return Err(ApiError::Validation("Path traversal detected".to_string()));
        }
        ensure_within(&self.base_path, &self.base_path.join(file_name))
    }
}

/// The stored extension for an upload, or a validation error when the part
/// is not an accepted image type.
fn image_extension(
    file_name: Option<&str>,
    content_type: Option<&str>,
) -> Result<&'static str, ApiError> {
    let not_image = || ApiError::Validation("Only image files are allowed".to_string());

    if content_type.is_some_and(|ct| !ct.starts_with("image/")) {
        return Err(not_image());
    }

    let ext = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .ok_or_else(not_image)?;

    ALLOWED_IMAGE_EXTENSIONS
        .iter()
        .copied()
        .find(|allowed| *allowed == ext)
        .ok_or_else(not_image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn test_store() -> (UploadStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = UploadStore::new(dir.path().join("uploads"), 1024)
            .await
            .unwrap();
        (store, dir)
    }

    fn file(name: &str, content_type: &str, data: &'static [u8]) -> UploadedFile {
        UploadedFile {
            file_name: Some(name.to_string()),
            content_type: Some(content_type.to_string()),
            data: Bytes::from_static(data),
        }
    }

    #[tokio::test]
    async fn test_store_image() {
        let (store, _dir) = test_store().await;

        let public = store
            .store_image("cover", &file("Photo.PNG", "image/png", b"\x89PNG"))
            .await
            .unwrap();
        assert!(public.starts_with("/uploads/cover-"));
        assert!(public.ends_with(".png"));

        let on_disk = store
            .base_path()
            .join(public.trim_start_matches("/uploads/"));
        assert_eq!(fs::read(on_disk).await.unwrap(), b"\x89PNG");
    }

    #[tokio::test]
    async fn test_rejects_non_images() {
        let (store, _dir) = test_store().await;

        for bad in [
            file("notes.txt", "text/plain", b"hello"),
            file("script.png", "application/javascript", b"alert(1)"),
            file("image.svg", "image/svg+xml", b"<svg/>"),
        ] {
            assert!(matches!(
                store.store_image("thumbnail", &bad).await,
                Err(ApiError::Validation(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_size_limit() {
        let (store, _dir) = test_store().await;
        let big = UploadedFile {
            data: Bytes::from(vec![0u8; 2048]),
            ..file("big.jpg", "image/jpeg", b"")
        };
        assert!(matches!(
            store.store_image("avatar", &big).await,
            Err(ApiError::PayloadTooLarge(_))
        ));
        assert!(matches!(
            store.store_image("avatar", &file("empty.jpg", "image/jpeg", b"")).await,
            Err(ApiError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_check_image_writes_nothing() {
        let (store, _dir) = test_store().await;
        assert_eq!(
            store
                .check_image(&file("a.JPEG", "image/jpeg", b"\xff\xd8"))
                .unwrap(),
            "jpeg"
        );
        assert!(store
            .check_image(&file("a.txt", "text/plain", b"x"))
            .is_err());

        let mut entries = fs::read_dir(store.base_path()).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }

    #[test]
    fn test_traversal_rejected() {
        let base = std::env::temp_dir();
        assert!(ensure_within(&base, &base.join("../etc/passwd")).is_err());
        assert!(ensure_within(&base, &base.join("cover-1.png")).is_ok());
    }
}
