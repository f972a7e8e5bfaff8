//! # 서비스 모듈
//!
//! 세션 레코드를 다루는 비즈니스 로직입니다. HTTP를 모릅니다.
//! 세션은 암묵적인 요청 컨텍스트가 아니라 인자로 명시적으로 전달됩니다.
//!
//! - `tasks`: 할 일 목록 관리자 (list/create/toggle/remove)
//! - `files`: 파일 메타데이터 추적기와 업로드 수집 조정자
//! - `upload`: 업로드 바이트를 실제로 저장하는 전송 계층 (디스크/메모리)
//!
//! 모든 변경 작업은 `load → 수정 → save` 순서를 요청 안에서 엄격히 지킵니다.

pub mod files;
pub mod tasks;
pub mod upload;

pub use files::FileTracker;
pub use tasks::TaskManager;
pub use upload::{open_upload_transport, IncomingFile, UploadTransport};
