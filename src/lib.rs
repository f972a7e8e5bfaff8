//! # fleetnode
//!
//! 상태를 갖지 않는 HTTP 애플리케이션 노드입니다.
//! 클라이언트별 상태(할 일, 업로드 파일 메타데이터, 방문 카운터)는 모두
//! 외부 공유 저장소에 있으므로, 인스턴스를 늘리거나 줄여도 상태가 사라지지 않습니다.
//!
//! 요청 흐름:
//! ```text
//! 요청 → 세션 식별자 해석(middleware::session) → 저장소 load(store)
//!      → 할 일/파일 관리자가 수정(services) → 저장소 save → 응답(+ instance)
//! ```
//!
//! 바이너리(`main.rs`)는 이 라이브러리를 조립만 합니다.
//! 통합 테스트는 `routes::router()`를 서버 없이 직접 호출합니다.

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
