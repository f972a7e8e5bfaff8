//! # 데이터 모델 모듈
//!
//! 세션 상태를 구성하는 데이터 구조체들을 정의합니다.
//! - `task`: 할 일(Task)과 우선순위, 생성 요청
//! - `file`: 업로드 파일 메타데이터와 업로드 전송 계층이 만든 디스크립터
//! - `session`: 한 세션의 전체 상태(Session Record)
//!
//! 이 구조체들은 HTTP와 저장소 어느 쪽에도 의존하지 않습니다.
//! 핸들러는 요청 하나를 처리하는 동안만 역직렬화된 사본을 들고 있다가,
//! 저장 후 버립니다.

pub mod file;
pub mod session;
pub mod task;

pub use file::*;
pub use session::*;
pub use task::*;
