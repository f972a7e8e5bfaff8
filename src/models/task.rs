//! # 할 일(Task) 모델 정의
//!
//! 할 일은 세션 레코드의 `tasks` 목록에 생성 순서대로 저장됩니다.
//! 선택 항목(설명, 우선순위)의 기본값은 핸들러 곳곳에서 검사하지 않고
//! `Task::new()` 한 곳에서 채웁니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 할 일 우선순위
///
/// JSON에서는 소문자 문자열(`"low"`, `"medium"`, `"high"`)로 표현됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// 클라이언트가 보낸 문자열을 우선순위로 변환합니다.
    ///
    /// 값이 없거나 알 수 없는 값이면 `Medium`을 사용합니다.
    /// 대소문자와 앞뒤 공백은 무시합니다.
    pub fn from_input(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("low") => Priority::Low,
            Some("high") => Priority::High,
            _ => Priority::Medium,
        }
    }
}

/// 할 일 엔티티. 세션 레코드 안에서만 존재합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// 세션 안에서 고유한 식별자 (UUIDv7)
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
    /// 생성 시각. 이후 변경되지 않습니다.
    pub created_at: DateTime<Utc>,
}

/// 할 일 생성 요청. `POST /api/tasks`의 요청 본문에 해당합니다.
///
/// 제목이 빠진 요청도 역직렬화는 성공합니다. 검증 에러(400)는 할 일 관리자가 보고합니다.
#[derive(Debug, Default, Deserialize)]
pub struct CreateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
}

/// 검증을 통과한 할 일 입력값
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<String>,
}

impl Task {
    /// 기본값을 채워 새 할 일을 만듭니다.
    ///
    /// - `description`: 없으면 빈 문자열
    /// - `priority`: 없거나 알 수 없으면 `Medium`
    /// - `completed`: 항상 `false`로 시작
    pub fn new(input: NewTask, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            title: input.title,
            description: input.description.unwrap_or_default(),
            priority: Priority::from_input(input.priority.as_deref()),
            completed: false,
            created_at: now,
        }
    }
}
