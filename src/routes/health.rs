//! # 헬스체크(Health Check) 핸들러 (Readiness Reporter)
//!
//! 인스턴스와 공유 저장소의 상태를 보고합니다.
//!
//! ## 엔드포인트
//! - `GET /health` → 200 `{ "status": "UP", ... }` 또는 503 `{ "status": "DEGRADED", ... }`
//!
//! 로드밸런서가 이 응답으로 인스턴스를 트래픽에서 빼거나 넣습니다.
//! 세션 데이터 경로를 전혀 타지 않으므로, 저장소가 죽어도 항상 응답합니다.

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;               // 현재 시각 (UTC)
use serde_json::{json, Value}; // JSON 값 생성 유틸리티

use crate::routes::AppState;

/// 상태 보고서를 만듭니다. 절대 실패하지 않습니다.
///
/// 핸들러와 분리해 두어 라우터 없이도 테스트할 수 있습니다.
pub fn report(state: &AppState) -> (StatusCode, Value) {
    // 저장소에 요청을 보내지 않고 감시자가 유지하는 상태만 읽습니다.
    let store_available = state.store.is_available();
    let (status, label) = if store_available {
        (StatusCode::OK, "UP")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "DEGRADED")
    };

    let body = json!({
        "status": label,
        "timestamp": Utc::now().to_rfc3339(),
        "instance": state.config.instance_id,
        // elapsed(): 시작 시각부터 지금까지의 Duration
        "uptimeSeconds": state.started_at.elapsed().as_secs_f64(),
        "storeAvailable": store_available,
        "store": state.store.status().as_str(),
    });
    (status, body)
}

/// `GET /health`
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let (status, body) = report(&state);
    (status, Json(body))
}
