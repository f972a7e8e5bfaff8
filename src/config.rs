//! # 애플리케이션 설정(Configuration) 모듈
//!
//! 환경변수에서 서버 설정값을 읽어오는 모듈입니다.
//! `.env` 파일이나 시스템 환경변수에서 값을 가져옵니다.
//!
//! 설정 항목:
//! - `HOST`, `PORT`: 서버 바인딩 주소
//! - `HOSTNAME`: 인스턴스 식별자 (없으면 무작위 생성)
//! - `APP_ENV`: `development` 또는 `production`
//! - `REDIS_URL`: 공유 세션 저장소 주소 (`memory://`이면 프로세스 내 저장소)
//! - `SESSION_SECRET`, `SESSION_COOKIE`, `SESSION_TTL_SECS`: 세션 토큰/쿠키 설정
//! - `STORE_TIMEOUT_MS`, `STORE_RECONNECT_BASE_MS`, `STORE_RECONNECT_MAX_MS`,
//!   `STORE_PING_INTERVAL_SECS`: 저장소 타임아웃과 재연결 정책
//! - `UPLOAD_BACKEND`, `UPLOADS_PATH`, `MAX_UPLOAD_BYTES`: 업로드 전송 계층 설정
//!
//! 모든 항목에 기본값이 있습니다. 단, `APP_ENV=production`에서는
//! `SESSION_SECRET`이 반드시 있어야 합니다.

use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::store::StoreOptions;

/// 개발용 기본 비밀키. 프로덕션에서는 거부됩니다.
const DEV_SESSION_SECRET: &str = "fleetnode-dev-secret-change-me";

/// 실행 환경
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => AppEnv::Production,
            _ => AppEnv::Development,
        }
    }
}

/// 업로드된 바이트를 어디에 둘지 결정합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadBackend {
    /// `UPLOADS_PATH` 아래 디스크에 저장
    Disk,
    /// 바이트는 버리고 메타데이터만 남김 (로컬 개발용)
    Memory,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("SESSION_SECRET must be set when APP_ENV=production")]
    MissingSessionSecret,
}

/// 애플리케이션 전체 설정을 담는 구조체
///
/// 서버 시작 시 한 번 읽어온 후 `AppState`를 통해 공유됩니다.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// 응답마다 붙는 인스턴스 식별자. 라우팅이 아니라 관측용입니다.
    pub instance_id: String,
    pub env: AppEnv,
    pub store_url: String,
    pub session_secret: String,
    pub session_cookie: String,
    /// 세션 레코드 만료 시간. 저장할 때마다 다시 시작됩니다.
    pub session_ttl: Duration,
    pub store_timeout: Duration,
    pub reconnect_base_delay: Duration,
    pub reconnect_max_delay: Duration,
    pub store_ping_interval: Duration,
    pub upload_backend: UploadBackend,
    pub uploads_path: String,
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            instance_id: generated_instance_id(),
            env: AppEnv::Development,
            store_url: "redis://redis:6379".to_string(),
            session_secret: DEV_SESSION_SECRET.to_string(),
            session_cookie: "sid".to_string(),
            session_ttl: Duration::from_secs(60 * 60 * 24),
            store_timeout: Duration::from_millis(2000),
            reconnect_base_delay: Duration::from_millis(50),
            reconnect_max_delay: Duration::from_millis(500),
            store_ping_interval: Duration::from_secs(5),
            upload_backend: UploadBackend::Disk,
            uploads_path: "data/uploads".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Config {
    /// 환경변수에서 설정값을 읽어 Config 인스턴스를 생성합니다.
    ///
    /// 숫자 값의 파싱에 실패하면 기본값을 사용합니다.
    ///
    /// # 에러
    /// 프로덕션 환경에서 `SESSION_SECRET`이 없으면 `ConfigError::MissingSessionSecret`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let app_env = env::var("APP_ENV")
            .or_else(|_| env::var("NODE_ENV"))
            .map(|raw| AppEnv::parse(&raw))
            .unwrap_or(defaults.env);

        // 프로덕션에서는 개발용 비밀키를 허용하지 않습니다.
        let session_secret = match env::var("SESSION_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ if app_env == AppEnv::Production => return Err(ConfigError::MissingSessionSecret),
            _ => {
                tracing::warn!("SESSION_SECRET not set, using development secret");
                defaults.session_secret
            }
        };

        let upload_backend = match env::var("UPLOAD_BACKEND").as_deref() {
            Ok("memory") => UploadBackend::Memory,
            _ => UploadBackend::Disk,
        };

        Ok(Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parse_var("PORT", defaults.port),
            instance_id: env::var("HOSTNAME")
                .ok()
                .filter(|name| !name.is_empty())
                .unwrap_or(defaults.instance_id),
            env: app_env,
            store_url: env::var("REDIS_URL").unwrap_or(defaults.store_url),
            session_secret,
            session_cookie: env::var("SESSION_COOKIE").unwrap_or(defaults.session_cookie),
            session_ttl: Duration::from_secs(parse_var(
                "SESSION_TTL_SECS",
                defaults.session_ttl.as_secs(),
            )),
            store_timeout: Duration::from_millis(parse_var(
                "STORE_TIMEOUT_MS",
                defaults.store_timeout.as_millis() as u64,
            )),
            reconnect_base_delay: Duration::from_millis(parse_var(
                "STORE_RECONNECT_BASE_MS",
                defaults.reconnect_base_delay.as_millis() as u64,
            )),
            reconnect_max_delay: Duration::from_millis(parse_var(
                "STORE_RECONNECT_MAX_MS",
                defaults.reconnect_max_delay.as_millis() as u64,
            )),
            store_ping_interval: Duration::from_secs(parse_var(
                "STORE_PING_INTERVAL_SECS",
                defaults.store_ping_interval.as_secs(),
            )),
            upload_backend,
            uploads_path: env::var("UPLOADS_PATH").unwrap_or(defaults.uploads_path),
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", defaults.max_upload_bytes),
        })
    }

    pub fn is_development(&self) -> bool {
        self.env == AppEnv::Development
    }

    /// 저장소 어댑터에 넘길 옵션만 추려냅니다.
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            ttl: self.session_ttl,
            op_timeout: self.store_timeout,
            reconnect_base_delay: self.reconnect_base_delay,
            reconnect_max_delay: self.reconnect_max_delay,
            ping_interval: self.store_ping_interval,
        }
    }
}

/// 환경변수를 파싱하고, 없거나 잘못된 값이면 기본값을 돌려줍니다.
fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

/// `HOSTNAME`이 없을 때 쓰는 `instance-xxxxxxxxx` 형태의 식별자
fn generated_instance_id() -> String {
    let simple = uuid::Uuid::new_v4().simple().to_string();
    format!("instance-{}", &simple[..9])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_env_parsing_defaults_to_development() {
        assert_eq!(AppEnv::parse("production"), AppEnv::Production);
        assert_eq!(AppEnv::parse(" PROD "), AppEnv::Production);
        assert_eq!(AppEnv::parse("staging"), AppEnv::Development);
        assert_eq!(AppEnv::parse(""), AppEnv::Development);
    }

    #[test]
    fn generated_instance_ids_have_prefix_and_differ() {
        let a = generated_instance_id();
        let b = generated_instance_id();
        assert!(a.starts_with("instance-"));
        assert_eq!(a.len(), "instance-".len() + 9);
        assert_ne!(a, b);
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.session_ttl, Duration::from_secs(86_400));
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.reconnect_max_delay, Duration::from_millis(500));
        assert!(config.is_development());
    }
}
