//! # 파일 메타데이터 추적기 / 업로드 수집 조정자
//!
//! 업로드 전송 계층이 바이트를 저장하고 디스크립터를 만들면,
//! `FileTracker::ingest()`가 그것을 세션의 `files` 목록에 추가합니다.
//! 크기·타입 제한은 전송 계층이 이미 적용했으므로 여기서는 디스크립터를 믿습니다.

use chrono::Utc;

use crate::{
    error::AppError,
    models::{FileMetadata, SessionRecord, UploadDescriptor},
    store::SessionStore,
};

/// 메타데이터를 목록 끝에 추가합니다.
///
/// 원래 파일 이름과 저장 키가 비어 있으면 안 되고, 저장 키는 세션 안에서 고유해야 합니다.
pub fn record_in(record: &mut SessionRecord, metadata: FileMetadata) -> Result<FileMetadata, AppError> {
    if metadata.original_name.trim().is_empty() {
        return Err(AppError::Validation("File name is required".to_string()));
    }
    if metadata.storage_key.trim().is_empty() {
        return Err(AppError::Validation("Storage key is required".to_string()));
    }
    if record.files.iter().any(|f| f.storage_key == metadata.storage_key) {
        return Err(AppError::Validation(format!(
            "Storage key already recorded: {}",
            metadata.storage_key
        )));
    }
    record.files.push(metadata.clone());
    Ok(metadata)
}

pub struct FileTracker<'a> {
    store: &'a SessionStore,
}

impl<'a> FileTracker<'a> {
    pub fn new(store: &'a SessionStore) -> Self {
        Self { store }
    }

    /// 업로드 순서대로 정렬된 파일 목록. 레코드가 없으면 빈 레코드를 만들어 저장합니다.
    pub async fn list(&self, session_id: &str) -> Result<Vec<FileMetadata>, AppError> {
        let record = self.store.load_or_init(session_id).await?;
        self.store.save(&record).await?;
        Ok(record.files)
    }

    pub async fn record(&self, session_id: &str, metadata: FileMetadata) -> Result<FileMetadata, AppError> {
        let mut record = self.store.load_or_init(session_id).await?;
        let metadata = record_in(&mut record, metadata)?;
        self.store.save(&record).await?;
        Ok(metadata)
    }

    /// 업로드 하나를 세션에 반영합니다.
    ///
    /// 전송 계층이 디스크립터를 만들지 못했다면(요청에 파일이 없었다면)
    /// 저장소 상태와 관계없이 `Validation("No file uploaded")`입니다.
    pub async fn ingest(
        &self,
        session_id: &str,
        descriptor: Option<UploadDescriptor>,
    ) -> Result<FileMetadata, AppError> {
        let descriptor =
            descriptor.ok_or_else(|| AppError::Validation("No file uploaded".to_string()))?;
        let metadata = FileMetadata::from_descriptor(descriptor, Utc::now());
        let saved = self.record(session_id, metadata).await?;
        tracing::info!(
            storage_key = %saved.storage_key,
            size_bytes = saved.size_bytes,
            "Upload recorded in session"
        );
        Ok(saved)
    }
}
