//! `GET /api/data`: 세션과 무관한 고정 샘플 데이터.
//! 로드밸런서 뒤에서 어느 인스턴스가 응답했는지 확인할 때 씁니다.

use axum::{extract::State, Json};
use chrono::Utc;               // 응답 시각 (RFC 3339)
use serde_json::{json, Value}; // JSON 값 생성 유틸리티

use crate::routes::AppState;

pub async fn sample_data(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "data": [
            { "id": 1, "name": "Item 1", "value": 100 },
            { "id": 2, "name": "Item 2", "value": 200 },
            { "id": 3, "name": "Item 3", "value": 300 },
        ],
        "instance": state.config.instance_id,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
