//! # 공유 상태 저장소 어댑터 (Shared State Store Adapter)
//!
//! 세션 레코드를 네트워크 너머의 키-값 저장소에 읽고 쓰는 계층입니다.
//! 프로세스는 요청 사이에 세션 데이터를 들고 있지 않습니다.
//!
//! 구성:
//! - `StoreTransport`: get/set/delete만 아는 전송 계층 트레이트
//!   (`RedisTransport`, `MemoryTransport` 두 구현)
//! - `SessionStore`: 연결 상태 머신, 작업 타임아웃, 레코드 직렬화,
//!   백그라운드 재연결 감시자(supervisor)를 담당
//!
//! ## 연결 상태 머신
//! ```text
//! Connecting ──성공──▶ Available ◀──재연결──┐
//!     │                   │                 │
//!     └──실패──▶ Unavailable ◀──작업 실패/타임아웃/ping 실패
//! ```
//! `Unavailable` 상태에서는 `load`/`save`가 전송 계층을 건드리지 않고 즉시
//! `StoreError::Unavailable`로 실패합니다. 요청 경로에서는 재시도하지 않고,
//! 복구는 감시자가 백오프(2배씩 증가, 최대 지연으로 제한)로 끝없이 재시도합니다.
//!
//! 같은 세션에 대한 동시 요청 사이에는 순서 보장이 없습니다. 마지막 `save`가 이깁니다.

pub mod memory;
pub mod redis_transport;

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering}; // 락 없이 공유하는 상태 플래그
use std::sync::{Arc, Weak};                              // Weak: 감시자가 저장소 수명을 붙잡지 않도록
use std::time::Duration;

use async_trait::async_trait; // 트레이트 객체(dyn)로 쓸 수 있는 async 트레이트 메서드
use chrono::Utc;
use thiserror::Error;         // 에러 enum에 Display/Error 구현 자동 생성
use tokio::sync::Notify;      // 요청 경로 → 감시자 깨우기 신호

use crate::models::SessionRecord;

pub use memory::MemoryTransport;
pub use redis_transport::RedisTransport;

/// 저장소 계층에서 발생하는 에러
#[derive(Debug, Error)]
pub enum StoreError {
    /// 연결되어 있지 않거나 작업 중 연결이 끊김
    #[error("session store unavailable: {0}")]
    Unavailable(String),

    #[error("session store operation timed out after {0:?}")]
    Timeout(Duration),

    /// `close()` 이후의 작업
    #[error("session store is closed")]
    Closed,

    /// 저장된 바이트를 세션 레코드로 해석할 수 없음 (연결 문제가 아님)
    #[error("session record codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// 키-값 전송 계층
///
/// 값은 불투명한 바이트입니다. 직렬화는 `SessionStore`가 맡습니다.
/// 하나의 인스턴스를 모든 요청이 동시에 공유하므로 `Send + Sync`여야 합니다.
#[async_trait]
pub trait StoreTransport: Send + Sync {
    /// 연결을 (다시) 맺습니다. 감시자가 호출합니다.
    async fn connect(&self) -> Result<(), StoreError>;
    async fn ping(&self) -> Result<(), StoreError>;
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    /// 값을 덮어쓰고 만료 시간을 `ttl`로 다시 설정합니다.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
    async fn close(&self);
}

/// URL 스킴에 맞는 전송 계층을 만듭니다.
///
/// - `memory://` → 프로세스 내 저장소 (개발/테스트용, 인스턴스 간 공유 안 됨)
/// - 그 외 → Redis
pub fn open_transport(url: &str) -> Result<Arc<dyn StoreTransport>, StoreError> {
    if url.starts_with("memory://") {
        tracing::warn!("Using in-process memory store; state is NOT shared across instances");
        return Ok(Arc::new(MemoryTransport::new()));
    }
    Ok(Arc::new(RedisTransport::open(url)?))
}

/// 저장소 연결 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StoreStatus {
    Connecting = 0,
    Available = 1,
    Unavailable = 2,
}

impl StoreStatus {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => StoreStatus::Connecting,
            1 => StoreStatus::Available,
            _ => StoreStatus::Unavailable,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StoreStatus::Connecting => "connecting",
            StoreStatus::Available => "available",
            StoreStatus::Unavailable => "unavailable",
        }
    }
}

/// 저장소 어댑터 옵션 (`Config::store_options()`에서 만들어짐)
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// 레코드 만료 시간. 저장할 때마다 다시 시작됩니다.
    pub ttl: Duration,
    /// 작업 하나가 이 시간 안에 끝나지 않으면 `Timeout`
    pub op_timeout: Duration,
    pub reconnect_base_delay: Duration,
    pub reconnect_max_delay: Duration,
    /// 연결된 동안 주기적으로 ping을 보내는 간격
    pub ping_interval: Duration,
}

/// `attempt`번째 재연결 실패 후 기다릴 시간
///
/// 기본 지연에서 시작해 2배씩 늘어나고, 최대 지연을 넘지 않습니다.
pub fn backoff_delay(options: &StoreOptions, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    options
        .reconnect_base_delay
        .saturating_mul(1u32 << exponent)
        .min(options.reconnect_max_delay)
}

/// `SessionStore`의 모든 clone과 감시자가 함께 보는 내부 상태
struct Shared {
    transport: Arc<dyn StoreTransport>,
    options: StoreOptions,
    /// `StoreStatus`를 u8로 저장 (Connecting=0, Available=1, Unavailable=2)
    status: AtomicU8,
    /// `close()`가 한 번이라도 호출되었는지
    closed: AtomicBool,
    /// 연결이 끊겼거나 닫혔을 때 감시자를 깨우는 신호
    wake: Notify,
}

impl Shared {
    fn status(&self) -> StoreStatus {
        StoreStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    fn set_status(&self, status: StoreStatus) {
        self.status.store(status as u8, Ordering::Release);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Available → Unavailable 전이. 전이에 성공했을 때만 감시자를 깨웁니다.
    fn mark_unavailable(&self, err: &StoreError) {
        // compare_exchange(): 현재 값이 Available일 때만 Unavailable로 바꿉니다.
        // 여러 요청이 동시에 실패해도 전이와 로그, 알림은 한 번만 일어납니다.
        let swapped = self
            .status
            .compare_exchange(
                StoreStatus::Available as u8,
                StoreStatus::Unavailable as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if swapped {
            tracing::warn!(error = %err, "Lost connection to session store");
            self.wake.notify_one();
        }
    }

    async fn try_connect(&self) -> Result<(), StoreError> {
        match tokio::time::timeout(self.options.op_timeout, self.transport.connect()).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.options.op_timeout)),
        }
    }

    /// 전송 계층 작업을 상태 검사와 타임아웃으로 감쌉니다.
    async fn guard<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        let status = self.status();
        if status != StoreStatus::Available {
            return Err(StoreError::Unavailable(format!(
                "session store is {}",
                status.as_str()
            )));
        }

        // timeout(): 시간 안에 끝나면 Ok(작업 결과), 아니면 Err(Elapsed)
        match tokio::time::timeout(self.options.op_timeout, op).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                self.mark_unavailable(&err);
                Err(err)
            }
            Err(_) => {
                let err = StoreError::Timeout(self.options.op_timeout);
                self.mark_unavailable(&err);
                Err(err)
            }
        }
    }
}

/// 세션 레코드 저장소 핸들
///
/// 내부가 `Arc`이므로 clone해도 같은 연결과 상태를 공유합니다.
/// 프로세스 시작 시 한 번 만들고, 종료 시 `close()`를 한 번 호출합니다.
#[derive(Clone)]
pub struct SessionStore {
    shared: Arc<Shared>,
}

impl SessionStore {
    /// 첫 연결을 시도하고 백그라운드 감시자를 띄웁니다.
    ///
    /// 첫 연결이 실패해도 에러를 반환하지 않습니다. 인스턴스는 degraded 상태로
    /// 시작하고, 감시자가 연결될 때까지 재시도합니다.
    pub async fn connect(transport: Arc<dyn StoreTransport>, options: StoreOptions) -> Self {
        let store = Self {
            shared: Arc::new(Shared {
                transport,
                options,
                status: AtomicU8::new(StoreStatus::Connecting as u8),
                closed: AtomicBool::new(false),
                wake: Notify::new(),
            }),
        };

        match store.shared.try_connect().await {
            Ok(()) => {
                store.shared.set_status(StoreStatus::Available);
                tracing::info!("Connected to session store");
            }
            Err(err) => {
                store.shared.set_status(StoreStatus::Unavailable);
                tracing::warn!(error = %err, "Session store not reachable, running without session support");
            }
        }

        // Arc::downgrade(): 감시자는 Weak만 들고 있으므로 핸들이 모두 drop되면 스스로 끝납니다.
        tokio::spawn(supervise(Arc::downgrade(&store.shared)));
        store
    }

    pub fn status(&self) -> StoreStatus {
        self.shared.status()
    }

    pub fn is_available(&self) -> bool {
        !self.shared.is_closed() && self.status() == StoreStatus::Available
    }

    /// 세션 레코드를 읽습니다. 처음 보는 ID나 만료된 ID는 `Ok(None)`입니다.
    pub async fn load(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError> {
        let key = record_key(session_id);
        // guard(): 상태 검사 → 타임아웃 → 실패 시 Unavailable 전이
        let bytes = self.shared.guard(self.shared.transport.get(&key)).await?;
        // 바이트 → SessionRecord. 실패하면 `StoreError::Codec` (From 변환)
        match bytes {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// 레코드가 없으면 빈 레코드를 만들어 돌려줍니다. (저장은 호출자 몫)
    pub async fn load_or_init(&self, session_id: &str) -> Result<SessionRecord, StoreError> {
        Ok(self
            .load(session_id)
            .await?
            .unwrap_or_else(|| SessionRecord::new(session_id, Utc::now())))
    }

    /// 레코드 전체를 덮어쓰고 만료 시간을 다시 시작합니다.
    pub async fn save(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let key = record_key(&record.session_id);
        let bytes = serde_json::to_vec(record)?;
        let ttl = self.shared.options.ttl;
        self.shared
            .guard(self.shared.transport.set(&key, bytes, ttl))
            .await
    }

    /// 만료와 같은 효과로 레코드를 지웁니다. HTTP로는 노출되지 않습니다.
    pub async fn clear(&self, session_id: &str) -> Result<(), StoreError> {
        let key = record_key(session_id);
        self.shared.guard(self.shared.transport.delete(&key)).await
    }

    /// 감시자를 멈추고 전송 계층을 닫습니다. 두 번째 호출부터는 아무것도 하지 않습니다.
    pub async fn close(&self) {
        // swap(): 이전 값을 돌려주므로, 이미 true였다면 두 번째 호출입니다.
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.shared.wake.notify_one();
        self.shared.transport.close().await;
        tracing::info!("Session store connection closed");
    }
}

fn record_key(session_id: &str) -> String {
    format!("session:{}", session_id)
}

/// 백그라운드 감시자
///
/// - Available: ping 간격마다 살아있는지 확인하고, 요청 경로가 실패를 알리면 깨어남
/// - 그 외: 재연결을 시도하고, 실패하면 백오프만큼 기다림
///
/// 저장소 핸들이 모두 drop되거나 `close()`가 호출되면 끝납니다.
async fn supervise(weak: Weak<Shared>) {
    let mut attempt: u32 = 0;

    loop {
        // upgrade(): 저장소 핸들이 하나라도 살아 있으면 Some(Arc)
        let Some(shared) = weak.upgrade() else {
            break;
        };
        if shared.is_closed() {
            break;
        }

        if shared.status() == StoreStatus::Available {
            attempt = 0;
            // tokio::select!: 둘 중 먼저 끝나는 쪽만 실행합니다.
            tokio::select! {
                _ = shared.wake.notified() => {}
                _ = tokio::time::sleep(shared.options.ping_interval) => {
                    // 실패하면 guard가 Unavailable로 전이시킵니다.
                    let _ = shared.guard(shared.transport.ping()).await;
                }
            }
            continue;
        }

        match shared.try_connect().await {
            Ok(()) if !shared.is_closed() => {
                shared.set_status(StoreStatus::Available);
                tracing::info!(attempts = attempt + 1, "Reconnected to session store");
            }
            Ok(()) => break,
            Err(err) => {
                attempt = attempt.saturating_add(1);
                let delay = backoff_delay(&shared.options, attempt);
                tracing::warn!(
                    error = %err,
                    attempt,
                    retry_in_ms = delay.as_millis() as u64,
                    "Session store reconnect failed"
                );
                tokio::select! {
                    _ = shared.wake.notified() => {}
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }

    tracing::debug!("Session store supervisor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_options() -> StoreOptions {
        StoreOptions {
            ttl: Duration::from_secs(60),
            op_timeout: Duration::from_millis(200),
            reconnect_base_delay: Duration::from_millis(5),
            reconnect_max_delay: Duration::from_millis(20),
            ping_interval: Duration::from_millis(50),
        }
    }

    async fn memory_store() -> (Arc<MemoryTransport>, SessionStore) {
        let transport = Arc::new(MemoryTransport::new());
        let store = SessionStore::connect(transport.clone(), test_options()).await;
        (transport, store)
    }

    async fn wait_for(store: &SessionStore, status: StoreStatus) -> bool {
        for _ in 0..100 {
            if store.status() == status {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[test]
    fn backoff_doubles_and_is_capped() {
        let options = test_options();
        assert_eq!(backoff_delay(&options, 1), Duration::from_millis(5));
        assert_eq!(backoff_delay(&options, 2), Duration::from_millis(10));
        assert_eq!(backoff_delay(&options, 3), Duration::from_millis(20));
        assert_eq!(backoff_delay(&options, 4), Duration::from_millis(20));
        assert_eq!(backoff_delay(&options, u32::MAX), Duration::from_millis(20));
    }

    #[tokio::test]
    async fn unknown_session_loads_as_absent() {
        let (_transport, store) = memory_store().await;
        assert_eq!(store.status(), StoreStatus::Available);
        assert!(store.load("never-seen").await.unwrap().is_none());

        let fresh = store.load_or_init("never-seen").await.unwrap();
        assert_eq!(fresh.session_id, "never-seen");
        assert!(fresh.tasks.is_empty());
    }

    #[tokio::test]
    async fn save_overwrites_whole_record() {
        let (_transport, store) = memory_store().await;
        let mut record = store.load_or_init("s1").await.unwrap();
        record.record_view();
        store.save(&record).await.unwrap();

        record.record_view();
        store.save(&record).await.unwrap();

        let loaded = store.load("s1").await.unwrap().unwrap();
        assert_eq!(loaded.view_count, 2);
        assert_eq!(loaded.first_seen_at, record.first_seen_at);
    }

    #[tokio::test]
    async fn cleared_record_is_absent_not_an_error() {
        let (_transport, store) = memory_store().await;
        let record = store.load_or_init("s1").await.unwrap();
        store.save(&record).await.unwrap();

        store.clear("s1").await.unwrap();
        assert!(store.load("s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn outage_flips_status_and_recovers_in_background() {
        let (transport, store) = memory_store().await;
        transport.set_online(false);

        let err = store.load("s1").await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert_eq!(store.status(), StoreStatus::Unavailable);
        assert!(!store.is_available());

        // 요청 경로는 재시도 없이 바로 실패
        assert!(matches!(
            store.save(&SessionRecord::new("s1", Utc::now())).await,
            Err(StoreError::Unavailable(_))
        ));

        transport.set_online(true);
        assert!(wait_for(&store, StoreStatus::Available).await);
        assert!(store.load("s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn starts_degraded_when_store_is_down() {
        let transport = Arc::new(MemoryTransport::new());
        transport.set_online(false);
        let store = SessionStore::connect(transport.clone(), test_options()).await;
        assert_eq!(store.status(), StoreStatus::Unavailable);

        transport.set_online(true);
        assert!(wait_for(&store, StoreStatus::Available).await);
    }

    #[tokio::test]
    async fn undecodable_record_is_a_codec_error() {
        let (transport, store) = memory_store().await;
        transport
            .set("session:bad", b"not json".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        let err = store.load("bad").await.unwrap_err();
        assert!(matches!(err, StoreError::Codec(_)));
        // 데이터 문제는 연결 문제가 아님
        assert_eq!(store.status(), StoreStatus::Available);
    }

    #[tokio::test]
    async fn closed_store_refuses_operations() {
        let (_transport, store) = memory_store().await;
        store.close().await;
        store.close().await;

        assert!(!store.is_available());
        assert!(matches!(store.load("s1").await, Err(StoreError::Closed)));
    }

    struct StalledTransport;

    #[async_trait]
    impl StoreTransport for StalledTransport {
        async fn connect(&self) -> Result<(), StoreError> {
            Ok(())
        }
        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, StoreError> {
            std::future::pending().await
        }
        async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), StoreError> {
            std::future::pending().await
        }
        async fn delete(&self, _key: &str) -> Result<(), StoreError> {
            Ok(())
        }
        async fn close(&self) {}
    }

    #[tokio::test]
    async fn slow_operation_times_out_as_unavailable() {
        let store = SessionStore::connect(Arc::new(StalledTransport), test_options()).await;
        assert_eq!(store.status(), StoreStatus::Available);

        let err = store.load("s1").await.unwrap_err();
        assert!(matches!(err, StoreError::Timeout(_)));
        assert_ne!(store.status(), StoreStatus::Connecting);
    }
}
