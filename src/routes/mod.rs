//! # 라우트 핸들러 모듈
//!
//! HTTP 요청을 처리하는 핸들러 함수들과 라우터 조립을 담당합니다.
//!
//! ## 엔드포인트
//! | 메서드 | 경로 | 핸들러 | 세션 |
//! |--------|------|--------|------|
//! | GET | /health | `health::health_check` | X |
//! | GET | /api/data | `data::sample_data` | X |
//! | GET, POST | /api/tasks | `tasks::list_tasks`, `tasks::create_task` | O |
//! | PUT | /api/tasks/{id}/toggle | `tasks::toggle_task` | O |
//! | DELETE | /api/tasks/{id} | `tasks::delete_task` | O |
//! | GET | /api/files | `files::list_files` | O |
//! | POST | /upload | `files::upload_file` | O |
//! | GET | /session | `session::session_demo` | O |
//!
//! 세션이 필요한 라우트에만 `resolve_session` 미들웨어를 겁니다.
//! `/health`는 세션 데이터 경로에 의존하지 않으므로 저장소가 죽어도 응답합니다.
//!
//! 등록되지 않은 경로는 404, 등록된 경로에 다른 메서드로 온 요청은 405이며,
//! 둘 다 다른 에러와 같은 JSON 본문(`error`, `code`, `instance`)으로 답합니다.

pub mod data;
pub mod files;
pub mod health;
pub mod session;
pub mod tasks;

use std::sync::Arc;
use std::time::Instant; // 업타임 계산용 단조 시계

use axum::{
    extract::DefaultBodyLimit,            // 라우트별 요청 본문 크기 제한
    middleware::from_fn_with_state,       // async fn을 State에 접근하는 미들웨어로 변환
    routing::{delete, get, post, put},    // HTTP 메서드별 라우팅 함수
    Router,
};
use tower_http::catch_panic::CatchPanicLayer; // 핸들러 패닉을 응답으로 변환하는 레이어

use crate::{
    config::Config,
    error::AppError,
    middleware::{instance, session::resolve_session, session::SessionResolver},
    services::UploadTransport,
    store::SessionStore,
};

// #[derive(Clone)]: Axum의 State Extractor는 요청마다 AppState를 clone합니다.
// 모든 필드가 Arc이거나 내부가 Arc이므로 clone해도 실제 자원은 복제되지 않습니다.

/// 애플리케이션 공유 상태
///
/// 모든 요청 핸들러가 `State(state): State<AppState>`로 접근합니다.
/// 세션 데이터는 여기 없습니다. 저장소 연결 핸들만 공유됩니다.
#[derive(Clone)]
pub struct AppState {
    /// 시작 시 한 번 읽은 설정
    pub config: Arc<Config>,
    /// 공유 세션 저장소 핸들 (연결 상태 머신 포함)
    pub store: SessionStore,
    /// 세션 토큰 발급/검증기
    pub resolver: Arc<SessionResolver>,
    /// 업로드 바이트를 저장하는 전송 계층 (디스크 또는 메모리)
    pub uploads: Arc<dyn UploadTransport>,
    /// 업타임 계산용 프로세스 시작 시각
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Config, store: SessionStore, uploads: Arc<dyn UploadTransport>) -> Self {
        Self {
            // config가 Arc로 옮겨지기 전에 비밀키를 복사해 둡니다.
            resolver: Arc::new(SessionResolver::new(config.session_secret.clone())),
            config: Arc::new(config),
            store,
            uploads,
            started_at: Instant::now(),
        }
    }
}

/// 전체 라우터를 조립합니다.
pub fn router(state: AppState) -> Router {
    // multipart 경계와 헤더를 위해 약간의 여유를 둡니다.
    // 파일 자체의 크기 제한은 `files::upload_file`이 정확히 검사합니다.
    let upload_limit = state.config.max_upload_bytes + 64 * 1024;

    // ── 세션이 필요한 라우트 ──
    // .route_layer(): 매칭된 라우트에만 미들웨어를 적용합니다.
    // (.layer()와 달리 404 fallback에는 적용되지 않으므로 없는 경로에 세션을 발급하지 않습니다.)
    let session_routes = Router::new()
        .route("/api/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route("/api/tasks/{id}/toggle", put(tasks::toggle_task))
        .route("/api/tasks/{id}", delete(tasks::delete_task))
        .route("/api/files", get(files::list_files))
        .route(
            "/upload",
            // 업로드 라우트만 기본 본문 제한(2MB) 대신 설정값을 씁니다.
            post(files::upload_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/session", get(session::session_demo))
        .route_layer(from_fn_with_state(state.clone(), resolve_session));

    // ── 세션 없이 응답하는 라우트 ──
    let routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/api/data", get(data::sample_data))
        // .merge(): 다른 라우터의 라우트들을 현재 라우터에 합칩니다.
        .merge(session_routes);

    with_error_layers(routes, state.clone()).with_state(state)
}

/// 라우트 묶음에 공통 에러 처리와 인스턴스 스탬프를 씌웁니다.
///
/// 레이어 순서 (바깥 → 안):
/// `stamp_instance` → `CatchPanicLayer` → 라우트 (+ 404/405 fallback)
///
/// 패닉 응답도 스탬프 미들웨어를 거치므로 `instance`가 붙습니다.
/// `.method_not_allowed_fallback()`은 호출 시점에 등록된 라우트에만 적용되므로
/// 모든 라우트를 합친 뒤에 호출해야 합니다.
pub fn with_error_layers(routes: Router<AppState>, state: AppState) -> Router<AppState> {
    routes
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(route_not_found)
        .layer(CatchPanicLayer::custom(instance::panic_response))
        .layer(from_fn_with_state(state, instance::stamp_instance))
}

async fn route_not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
