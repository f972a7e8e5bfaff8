//! # 파일 라우트 핸들러
//!
//! ## 엔드포인트
//! - `GET  /api/files` → `{ files, instance }`
//! - `POST /upload`    → multipart `file` 필드 하나. 201 `{ message, file, instance }`
//!
//! 업로드 흐름:
//! ```text
//! multipart 요청 → read_file_part() → UploadTransport::put() → FileTracker::ingest()
//!                        │ 파일 없음                                  │
//!                        └────────────── None ────────────────────────┘→ 400 "No file uploaded"
//! ```

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State}, // multipart 본문 스트림 추출기
    http::StatusCode,
    Json,
};
use serde_json::{json, Value}; // JSON 값 생성 유틸리티

use crate::{
    error::AppError,
    middleware::session::SessionHandle,
    routes::AppState,
    services::{FileTracker, IncomingFile},
    store::StoreError,
};

/// 업로드 파일이 들어있어야 하는 multipart 필드 이름
const FILE_FIELD: &str = "file";

/// `GET /api/files`: 현재 세션에 기록된 업로드 목록 (업로드 순서)
pub async fn list_files(
    State(state): State<AppState>,
    session: SessionHandle,
) -> Result<Json<Value>, AppError> {
    let files = FileTracker::new(&state.store).list(&session.id).await?;
    Ok(Json(json!({
        "files": files,
        "instance": state.config.instance_id,
    })))
}

/// `POST /upload`: 파일 하나를 받아 저장하고 세션에 메타데이터를 기록합니다.
///
/// # Extractor
/// - `Result<Multipart, MultipartRejection>`: 추출 실패를 직접 처리하려고 Result로 받습니다.
///   Content-Type이 multipart가 아니면 `Err`가 들어옵니다.
pub async fn upload_file(
    State(state): State<AppState>,
    session: SessionHandle,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    // multipart 요청이 아니면 파일이 없는 것과 같습니다.
    let incoming = match multipart {
        Ok(multipart) => read_file_part(multipart, state.config.max_upload_bytes).await?,
        Err(rejection) => {
            tracing::debug!("Upload without multipart body: {}", rejection.body_text());
            None
        }
    };

    let descriptor = match incoming {
        Some(file) => {
            // 저장소가 죽어 있으면 바이트를 올리기 전에 멈춥니다.
            if !state.store.is_available() {
                return Err(AppError::StoreUnavailable(StoreError::Unavailable(
                    "session store is not connected".to_string(),
                )));
            }
            Some(state.uploads.put(file).await?)
        }
        None => None,
    };

    // 세션에 기록하지 못하면 방금 저장한 바이트를 지웁니다.
    let storage_key = descriptor.as_ref().map(|d| d.storage_key.clone());
    let file = match FileTracker::new(&state.store)
        .ingest(&session.id, descriptor)
        .await
    {
        Ok(file) => file,
        Err(err) => {
            if let Some(key) = storage_key {
                state.uploads.discard(&key).await;
            }
            return Err(err);
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "File uploaded successfully",
            "file": file,
            "instance": state.config.instance_id,
        })),
    ))
}

/// `file` 필드의 첫 번째 파일을 꺼냅니다. 다른 필드는 건너뜁니다.
///
/// 파일 이름이 비어 있는 파트(브라우저가 파일 선택 없이 보낸 폼)는 파일로 보지 않습니다.
async fn read_file_part(
    mut multipart: Multipart,
    max_bytes: usize,
) -> Result<Option<IncomingFile>, AppError> {
    // next_field(): 본문에서 다음 파트를 스트리밍으로 읽습니다. 파트가 끝나면 None.
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let is_file = field.name() == Some(FILE_FIELD)
            && field.file_name().is_some_and(|name| !name.is_empty());
        if !is_file {
            continue;
        }

        let original_name = field.file_name().unwrap_or_default().to_string();
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        // bytes(): 파트 본문 전체를 메모리로 모읍니다. 라우트의 DefaultBodyLimit이 상한입니다.
        let bytes = field.bytes().await.map_err(multipart_error)?;
        if bytes.len() > max_bytes {
            return Err(too_large(max_bytes));
        }

        return Ok(Some(IncomingFile {
            original_name,
            mime_type,
            bytes,
        }));
    }
    Ok(None)
}

/// multipart 파싱 에러를 AppError로 바꿉니다. 본문 제한 초과(413)만 따로 구분합니다.
fn multipart_error(err: axum::extract::multipart::MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("File too large".to_string())
    } else {
        AppError::Validation(err.body_text())
    }
}

fn too_large(max_bytes: usize) -> AppError {
    AppError::PayloadTooLarge(format!("File exceeds the {} byte limit", max_bytes))
}
