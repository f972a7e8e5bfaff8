//! # 미들웨어 모듈
//!
//! - `session`: 요청에서 세션 ID를 찾거나 새로 발급하는 세션 식별자 해석기
//! - `instance`: 모든 응답에 인스턴스 식별자를 찍고, 에러/패닉을 JSON으로 완성

pub mod instance;
pub mod session;
