//! # 업로드 파일 메타데이터 모델
//!
//! 바이트 자체는 외부 객체 저장소에 있고, 세션에는 메타데이터만 남습니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 업로드 전송 계층이 바이트를 저장한 뒤 돌려주는 디스크립터
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadDescriptor {
    pub original_name: String,
    /// 객체 저장소가 부여한 키
    pub storage_key: String,
    /// 바이트가 실제로 있는 위치 (예: `local`, `memory`, 객체 저장소 URL)
    pub location_hint: String,
    pub size_bytes: u64,
    pub mime_type: String,
}

/// 세션의 `files` 목록에 쌓이는 항목. 추가만 가능하고 수정/삭제는 없습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub original_name: String,
    pub storage_key: String,
    pub location_hint: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub uploaded_at: DateTime<Utc>,
}

impl FileMetadata {
    pub fn from_descriptor(descriptor: UploadDescriptor, uploaded_at: DateTime<Utc>) -> Self {
        Self {
            original_name: descriptor.original_name,
            storage_key: descriptor.storage_key,
            location_hint: descriptor.location_hint,
            size_bytes: descriptor.size_bytes,
            mime_type: descriptor.mime_type,
            uploaded_at,
        }
    }
}
