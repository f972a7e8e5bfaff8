//! 인스턴스 식별자 스탬프
//!
//! 어떤 인스턴스가 요청을 처리했는지 클라이언트와 운영자가 볼 수 있도록,
//! 성공이든 실패든 모든 응답에 `X-Instance-Id` 헤더를 붙입니다.
//! `ErrorReport` extension이 실린 에러 응답은 `instance`가 들어간 JSON 본문으로
//! 다시 만듭니다. 상세 메시지는 개발 모드에서만 포함됩니다.

use std::any::Any;

use axum::{
    extract::{Request, State},
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE},
        HeaderValue,
    },
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    error::{AppError, ErrorReport},
    routes::AppState,
};

pub const INSTANCE_HEADER: &str = "x-instance-id";

pub async fn stamp_instance(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let response = next.run(req).await;
    let instance = state.config.instance_id.as_str();

    let mut response = match response.extensions().get::<ErrorReport>().cloned() {
        Some(report) => {
            let (mut parts, _) = response.into_parts();
            let body = report.to_body(instance, state.config.is_development());
            let body = Json(body).into_response().into_body();
            parts.headers.remove(CONTENT_LENGTH);
            parts
                .headers
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            parts.extensions.remove::<ErrorReport>();
            Response::from_parts(parts, body)
        }
        None => response,
    };

    if let Ok(value) = HeaderValue::from_str(instance) {
        response.headers_mut().insert(INSTANCE_HEADER, value);
    }
    response
}

/// `CatchPanicLayer`용 핸들러. 패닉도 일반 500 에러 응답으로 바꿉니다.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };
    AppError::Internal(format!("handler panicked: {}", detail)).into_response()
}
