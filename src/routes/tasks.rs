//! # 할 일(Task) 라우트 핸들러
//!
//! ## 엔드포인트
//! - `GET    /api/tasks`             → `{ tasks, instance }`
//! - `POST   /api/tasks`             → 201 `{ message, task, instance }`
//! - `PUT    /api/tasks/{id}/toggle` → `{ message, task, instance }`
//! - `DELETE /api/tasks/{id}`        → `{ message, instance }`
//!
//! 핸들러는 얇게 유지합니다. 세션 ID를 꺼내 `TaskManager`에 넘기고,
//! 결과를 JSON으로 감쌀 뿐입니다. 400/404/503 변환은 `AppError`가 맡습니다.

use axum::{
    extract::{rejection::JsonRejection, Path, State}, // Axum Extractor: 요청에서 데이터 추출
    http::StatusCode,                                   // HTTP 상태 코드 (200, 201 등)
    Json,                                               // JSON 요청/응답 래퍼
};
use serde_json::{json, Value}; // JSON 값 생성 유틸리티

use crate::{
    error::AppError,
    middleware::session::SessionHandle, // 세션 미들웨어가 넣어둔 세션 ID
    models::CreateTaskRequest,
    routes::AppState,
    services::TaskManager,              // 할 일 비즈니스 로직 (load → 수정 → save)
};

/// `GET /api/tasks`: 현재 세션의 할 일 목록을 생성 순서대로 돌려줍니다.
///
/// # Extractor
/// - `State(state)`: AppState (저장소 핸들, 설정)
/// - `session`: `resolve_session` 미들웨어가 해석한 세션
pub async fn list_tasks(
    State(state): State<AppState>,
    session: SessionHandle,
) -> Result<Json<Value>, AppError> {
    // TaskManager::new(&state.store): 저장소 핸들의 참조만 빌립니다. (소유권 이동 없음)
    let tasks = TaskManager::new(&state.store).list(&session.id).await?;
    Ok(Json(json!({
        "tasks": tasks,
        "instance": state.config.instance_id,
    })))
}

/// 본문이 JSON으로 해석되지 않으면 axum 기본 거부 응답 대신 400 검증 에러로 답합니다.
pub async fn create_task(
    State(state): State<AppState>,
    session: SessionHandle,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    // map_err(): JSON 거부 사유(본문 텍스트)를 검증 에러 메시지로 바꿉니다.
    let Json(req) = payload.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    // 제목 검증은 저장소 접근보다 먼저 일어납니다.
    let task = TaskManager::new(&state.store).create(&session.id, req).await?;
    // (StatusCode, Json) 튜플도 IntoResponse를 구현하므로 상태 코드를 함께 돌려줄 수 있습니다.
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Task created",
            "task": task,
            "instance": state.config.instance_id,
        })),
    ))
}

/// `PUT /api/tasks/{id}/toggle`: `completed`를 뒤집습니다.
///
/// # Extractor
/// - `Path(id)`: URL의 `{id}` 부분을 String으로 추출합니다.
pub async fn toggle_task(
    State(state): State<AppState>,
    session: SessionHandle,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let task = TaskManager::new(&state.store).toggle(&session.id, &id).await?;
    Ok(Json(json!({
        "message": "Task updated",
        "task": task,
        "instance": state.config.instance_id,
    })))
}

/// `DELETE /api/tasks/{id}`: 할 일을 지웁니다. 없는 ID면 404.
pub async fn delete_task(
    State(state): State<AppState>,
    session: SessionHandle,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    TaskManager::new(&state.store).remove(&session.id, &id).await?;
    Ok(Json(json!({
        "message": "Task deleted",
        "instance": state.config.instance_id,
    })))
}
