//! 세션 식별자 해석기 (Session Identity Resolver)
//!
//! 토큰 형식: `<세션 ID 64자 hex>.<sha256(secret "." id) hex>`
//!
//! 쿠키(`SESSION_COOKIE`)를 먼저 보고, 없으면 `X-Session-Token` 헤더를 봅니다.
//! 서명이 맞지 않는 토큰은 없는 것으로 취급하고 새 ID를 발급합니다.
//! 이 컴포넌트는 ID를 만들기만 하고 절대 실패하지 않습니다.
//! 저장소 장애는 호출자(핸들러)가 처리합니다.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{
        header::{COOKIE, SET_COOKIE},
        request::Parts,
        HeaderMap, HeaderValue,
    },
    middleware::Next,
    response::Response,
};
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};

use crate::{
    config::{AppEnv, Config},
    error::AppError,
    routes::AppState,
};

pub const SESSION_HEADER: &str = "x-session-token";

/// 한 요청에 대해 해석된 세션
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    pub id: String,
    /// 클라이언트에 돌려줄 서명된 토큰
    pub token: String,
    /// 이번 요청에서 새로 발급되었는지. true면 응답에 토큰을 실어 보냅니다.
    pub fresh: bool,
}

#[derive(Debug, Clone)]
pub struct SessionResolver {
    secret: String,
}

impl SessionResolver {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// 토큰이 있고 서명이 맞으면 그 세션을 그대로, 아니면 새 세션을 돌려줍니다.
    pub fn resolve(&self, token: Option<&str>) -> SessionHandle {
        match token.and_then(|t| self.verify(t)) {
            Some(id) => SessionHandle {
                id,
                token: token.unwrap_or_default().to_string(),
                fresh: false,
            },
            None => self.issue(),
        }
    }

    pub fn issue(&self) -> SessionHandle {
        let id = generate_session_id();
        SessionHandle {
            token: format!("{}.{}", id, self.sign(&id)),
            id,
            fresh: true,
        }
    }

    /// 토큰의 형식과 서명을 검사하고, 맞으면 세션 ID를 돌려줍니다.
    pub fn verify(&self, token: &str) -> Option<String> {
        let (id, signature) = token.split_once('.')?;
        if id.len() != 64 || !id.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        if constant_time_eq(self.sign(id).as_bytes(), signature.as_bytes()) {
            Some(id.to_string())
        } else {
            None
        }
    }

    fn sign(&self, id: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(b".");
        hasher.update(id.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// OS 난수 32바이트 → 64자 hex. 예측할 수 없는 세션 ID입니다.
fn generate_session_id() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

fn request_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    cookie_value(headers, cookie_name).or_else(|| {
        headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    })
}

/// 상태를 다루는 라우트에만 거는 미들웨어
///
/// 해석된 `SessionHandle`을 요청 extension에 넣습니다.
/// 새로 발급된 세션이거나, 기존 세션으로 요청이 성공한 경우(핸들러가 레코드를 저장한 경우)
/// 응답에 `Set-Cookie`와 `X-Session-Token`을 붙입니다.
/// 저장할 때마다 레코드의 만료 시간이 다시 시작되므로 쿠키의 `Max-Age`도 함께 다시 시작합니다.
pub async fn resolve_session(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let config = &state.config;
    let token = request_token(req.headers(), &config.session_cookie);
    let session = state.resolver.resolve(token.as_deref());
    // 핸들러는 `SessionHandle` extractor로 이 값을 꺼냅니다.
    req.extensions_mut().insert(session.clone());

    let mut response = next.run(req).await;

    // 실패한 요청은 레코드를 저장하지 않았으므로 기존 쿠키를 그대로 둡니다.
    if session.fresh || response.status().is_success() {
        let cookie = session_cookie(config, &session.token);
        match (HeaderValue::from_str(&cookie), HeaderValue::from_str(&session.token)) {
            (Ok(cookie), Ok(token)) => {
                response.headers_mut().append(SET_COOKIE, cookie);
                response.headers_mut().insert(SESSION_HEADER, token);
            }
            _ => tracing::warn!("Could not encode session cookie header"),
        }
    }

    response
}

/// `Set-Cookie` 값. `Max-Age`는 세션 레코드 TTL과 같습니다.
fn session_cookie(config: &Config, token: &str) -> String {
    // Secure: HTTPS 연결에서만 쿠키를 보내도록 브라우저에 지시 (프로덕션 전용)
    let secure = if config.env == AppEnv::Production { "; Secure" } else { "" };
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{}",
        config.session_cookie,
        token,
        config.session_ttl.as_secs(),
        secure
    )
}

// 핸들러에서 `session: SessionHandle`로 바로 받을 수 있게 합니다.
impl<S: Send + Sync> FromRequestParts<S> for SessionHandle {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionHandle>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session resolver is not installed".to_string()))
    }
}
