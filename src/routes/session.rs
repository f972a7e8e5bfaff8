//! # 세션 데모 핸들러
//!
//! `GET /session` → `{ message, sessionId, views, firstVisit, instance }`
//!
//! 어느 인스턴스가 응답하든 방문 횟수가 이어서 올라가는 것을 보여주는 데모입니다.
//! 저장소가 없으면 503입니다.

use axum::{extract::State, Json}; // State 추출기와 JSON 응답 래퍼
use serde_json::{json, Value};     // JSON 값 생성 유틸리티

use crate::{error::AppError, middleware::session::SessionHandle, routes::AppState};

pub async fn session_demo(
    State(state): State<AppState>,
    session: SessionHandle,
) -> Result<Json<Value>, AppError> {
    // 1. 레코드를 읽습니다. 처음 보는 세션이면 빈 레코드를 만듭니다.
    let mut record = state.store.load_or_init(&session.id).await?;
    // 2. 방문 카운터를 올립니다. (프로세스 메모리에는 아무것도 남지 않음)
    let views = record.record_view();
    // 3. 전체 레코드를 덮어쓰고 TTL을 다시 시작합니다.
    state.store.save(&record).await?;

    Ok(Json(json!({
        "message": "Session data stored in the shared store (visible to every instance)",
        "sessionId": record.session_id,
        "views": views,
        "firstVisit": record.first_seen_at,
        "instance": state.config.instance_id,
    })))
}
