//! # 업로드 전송 계층
//!
//! 요청에서 꺼낸 파일 바이트를 실제 저장 위치에 두고 `UploadDescriptor`를 돌려줍니다.
//! 세션 상태는 전혀 건드리지 않습니다. 그 일은 `FileTracker::ingest()`가 합니다.
//!
//! 구현:
//! - `DiskUploads`: `UPLOADS_PATH` 아래에 저장 (위치 힌트 `local`)
//! - `MemoryUploads`: 바이트는 버리고 메타데이터만 만듦 (위치 힌트 `memory`)
//!
//! 저장 키 형식: `<유닉스 밀리초>-<UUIDv4>-<slug 처리된 파일 이름>`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use chrono::Utc;
use tokio::fs;

use crate::{
    config::{Config, UploadBackend},
    error::AppError,
    models::UploadDescriptor,
};

/// multipart 요청에서 꺼낸 파일 하나
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub original_name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

#[async_trait]
pub trait UploadTransport: Send + Sync {
    /// 바이트를 저장하고 디스크립터를 돌려줍니다.
    async fn put(&self, file: IncomingFile) -> Result<UploadDescriptor, AppError>;

    /// 세션에 기록되지 못한 업로드를 지웁니다. 실패는 로그로만 남깁니다.
    async fn discard(&self, storage_key: &str);
}

/// 설정에 맞는 업로드 전송 계층을 만듭니다.
pub fn open_upload_transport(config: &Config) -> Arc<dyn UploadTransport> {
    match config.upload_backend {
        UploadBackend::Disk => Arc::new(DiskUploads::new(&config.uploads_path)),
        UploadBackend::Memory => {
            tracing::warn!("Uploads are kept in memory only; file bytes are discarded");
            Arc::new(MemoryUploads)
        }
    }
}

/// 충돌하지 않는 저장 키를 만듭니다.
///
/// 파일 이름의 확장자는 유지하고, 나머지는 slug로 바꿉니다.
/// 예: `"My Photo (1).PNG"` → `"1760000000000-<uuid>-my-photo-1.png"`
pub fn storage_key(original_name: &str) -> String {
    let path = Path::new(original_name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(slug::slugify)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "file".to_string());
    let name = match path.extension().and_then(|e| e.to_str()).map(slug::slugify) {
        Some(ext) if !ext.is_empty() => format!("{}.{}", stem, ext),
        _ => stem,
    };
    format!(
        "{}-{}-{}",
        Utc::now().timestamp_millis(),
        uuid::Uuid::new_v4(),
        name
    )
}

fn descriptor(file: &IncomingFile, key: String, location_hint: &str) -> UploadDescriptor {
    UploadDescriptor {
        original_name: file.original_name.clone(),
        storage_key: key,
        location_hint: location_hint.to_string(),
        size_bytes: file.bytes.len() as u64,
        mime_type: file.mime_type.clone(),
    }
}

pub struct DiskUploads {
    root: PathBuf,
}

impl DiskUploads {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl UploadTransport for DiskUploads {
    async fn put(&self, file: IncomingFile) -> Result<UploadDescriptor, AppError> {
        let key = storage_key(&file.original_name);
        // 저장 키에는 경로 구분자가 없으므로 루트 밖으로 나갈 수 없습니다.
        fs::create_dir_all(&self.root).await?;
        fs::write(self.root.join(&key), &file.bytes).await?;
        tracing::debug!(key = %key, bytes = file.bytes.len(), "Stored upload on disk");
        Ok(descriptor(&file, key, "local"))
    }

    async fn discard(&self, storage_key: &str) {
        match fs::remove_file(self.root.join(storage_key)).await {
            Ok(()) => tracing::debug!(key = %storage_key, "Discarded unrecorded upload"),
            Err(err) => tracing::warn!(
                key = %storage_key,
                error = %err,
                "Could not discard upload; file is orphaned"
            ),
        }
    }
}

pub struct MemoryUploads;

#[async_trait]
impl UploadTransport for MemoryUploads {
    async fn put(&self, file: IncomingFile) -> Result<UploadDescriptor, AppError> {
        let key = storage_key(&file.original_name);
        Ok(descriptor(&file, key, "memory"))
    }

    // 저장한 바이트가 없으므로 지울 것도 없습니다.
    async fn discard(&self, _storage_key: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incoming(name: &str, body: &'static [u8]) -> IncomingFile {
        IncomingFile {
            original_name: name.to_string(),
            mime_type: "text/plain".to_string(),
            bytes: Bytes::from_static(body),
        }
    }

    #[test]
    fn storage_keys_are_safe_and_unique() {
        let a = storage_key("My Photo (1).PNG");
        let b = storage_key("My Photo (1).PNG");
        assert_ne!(a, b);
        assert!(a.ends_with("-my-photo-1.png"), "{}", a);
        assert!(!a.contains('/'));
        assert!(storage_key("../../etc/passwd").ends_with("-passwd"));
        assert!(storage_key("").ends_with("-file"));
    }

    #[tokio::test]
    async fn memory_uploads_describe_without_storing() {
        let descriptor = MemoryUploads.put(incoming("a.txt", b"hello")).await.unwrap();
        assert_eq!(descriptor.location_hint, "memory");
        assert_eq!(descriptor.size_bytes, 5);
        assert_eq!(descriptor.original_name, "a.txt");
    }

    #[tokio::test]
    async fn disk_uploads_write_under_root() {
        let root = std::env::temp_dir().join(format!("fleetnode-test-{}", uuid::Uuid::new_v4()));
        let uploads = DiskUploads::new(&root);

        let descriptor = uploads.put(incoming("notes.txt", b"abc")).await.unwrap();
        assert_eq!(descriptor.location_hint, "local");
        let written = fs::read(root.join(&descriptor.storage_key)).await.unwrap();
        assert_eq!(written, b"abc");

        fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn discard_removes_stored_bytes() {
        let root = std::env::temp_dir().join(format!("fleetnode-test-{}", uuid::Uuid::new_v4()));
        let uploads = DiskUploads::new(&root);

        let descriptor = uploads.put(incoming("notes.txt", b"abc")).await.unwrap();
        uploads.discard(&descriptor.storage_key).await;
        assert!(!root.join(&descriptor.storage_key).exists());

        // 이미 없는 키는 경고만 남기고 끝남
        uploads.discard(&descriptor.storage_key).await;

        fs::remove_dir_all(&root).await.unwrap();
    }
}
