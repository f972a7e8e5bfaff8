//! # 에러 처리 모듈
//!
//! 애플리케이션에서 발생할 수 있는 모든 에러 타입을 정의합니다.
//!
//! | variant | HTTP | 의미 |
//! |---------|------|------|
//! | `Validation` | 400 | 입력값이 없거나 잘못됨 |
//! | `NotFound` | 404 | 참조한 할 일이 없음 |
//! | `MethodNotAllowed` | 405 | 경로는 있지만 그 HTTP 메서드를 받지 않음 |
//! | `PayloadTooLarge` | 413 | 업로드 크기 초과 |
//! | `StoreUnavailable` | 503 | 공유 저장소에 닿을 수 없음 (응답은 여전히 JSON) |
//! | `Internal`, `Io` | 500 | 예상하지 못한 에러. 상세 내용은 개발 모드에서만 노출 |
//!
//! 에러 응답 본문에는 처리한 인스턴스 식별자가 들어가야 하지만,
//! `IntoResponse`는 `AppState`에 접근할 수 없습니다. 그래서 여기서는
//! `ErrorReport`를 응답 extension에 실어 보내고, `middleware::instance`가
//! 최종 JSON 본문(`instance`, 개발 모드의 `message`)을 완성합니다.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// 애플리케이션에서 발생할 수 있는 모든 에러 종류
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("{0}")]
    PayloadTooLarge(String),

    /// 공유 저장소 연결 문제. 프로세스를 죽이지 않고 503으로 변환됩니다.
    #[error("Session store not available")]
    StoreUnavailable(#[source] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// 레코드 해석 실패는 연결 문제가 아니므로 500으로 보냅니다.
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Codec(e) => AppError::Internal(format!("Corrupt session record: {}", e)),
            other => AppError::StoreUnavailable(other),
        }
    }
}

/// 응답 extension으로 전달되는 에러 정보
///
/// `detail`은 내부 에러 메시지로, 개발 모드에서만 클라이언트에 노출됩니다.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub code: &'static str,
    pub message: String,
    pub detail: Option<String>,
}

impl ErrorReport {
    /// 인스턴스 식별자를 붙여 최종 JSON 본문을 만듭니다.
    pub fn to_body(&self, instance: &str, expose_detail: bool) -> serde_json::Value {
        let mut body = json!({
            "error": self.message,
            "code": self.code,
            "instance": instance,
        });
        if let (true, Some(detail)) = (expose_detail, &self.detail) {
            body["message"] = json!(detail);
        }
        body
    }
}

impl AppError {
    fn report(&self) -> (StatusCode, ErrorReport) {
        let (status, code, message, detail) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg.clone(), None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            AppError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                "method_not_allowed",
                "Method not allowed".to_string(),
                None,
            ),
            AppError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", msg.clone(), None)
            }
            AppError::StoreUnavailable(e) => {
                tracing::warn!("Session store unavailable: {}", e);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "store_unavailable",
                    "Session store not available".to_string(),
                    Some(e.to_string()),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                    Some(msg.clone()),
                )
            }
            AppError::Io(e) => {
                tracing::error!("IO error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                    Some(e.to_string()),
                )
            }
        };
        (status, ErrorReport { code, message, detail })
    }
}

impl IntoResponse for AppError {
    /// 기본 본문은 `{ "error": ..., "code": ... }`입니다.
    /// 인스턴스 스탬프 미들웨어를 거치면 `instance`가 추가됩니다.
    fn into_response(self) -> Response {
        let (status, report) = self.report();
        let body = Json(json!({
            "error": report.message,
            "code": report.code,
        }));

        let mut response = (status, body).into_response();
        response.extensions_mut().insert(report);
        response
    }
}
