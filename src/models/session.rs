//! # 세션 레코드 모델 정의
//!
//! 세션 ID 하나당 레코드 하나가 공유 저장소에 JSON으로 저장됩니다.
//!
//! ## 레코드 라이프사이클
//! ```text
//! [없음] load() → None → SessionRecord::new() → 핸들러가 수정 → save() (TTL 재시작)
//!                                                         ↓
//!                                    TTL 동안 저장이 없으면 저장소가 만료시킴 → [없음]
//! ```
//!
//! 저장소에서 레코드가 사라지는 것은 언제든 일어날 수 있는 정상 상태입니다.
//! 이 경우 다음 요청에서 빈 레코드로 다시 시작합니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{FileMetadata, Task};

/// 한 세션의 역직렬화된 작업 사본
///
/// `tasks`와 `files`는 삽입 순서가 곧 화면 표시 순서입니다.
/// 필드에 `#[serde(default)]`를 붙여, 필드가 빠진 예전 레코드도 읽을 수 있게 합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_id: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub files: Vec<FileMetadata>,
    /// 세션이 살아있는 동안 줄어들지 않는 방문 카운터
    #[serde(default)]
    pub view_count: u64,
    /// 레코드가 처음 만들어진 시각. 이후 변경되지 않습니다.
    pub first_seen_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(session_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.into(),
            tasks: Vec::new(),
            files: Vec::new(),
            view_count: 0,
            first_seen_at: now,
        }
    }

    /// 방문 카운터를 1 올리고 새 값을 돌려줍니다.
    pub fn record_view(&mut self) -> u64 {
        self.view_count = self.view_count.saturating_add(1);
        self.view_count
    }
}
