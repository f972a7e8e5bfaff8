//! 프로세스 내 키-값 전송 계층
//!
//! 인스턴스 간에 공유되지 않으므로 로컬 개발과 테스트 전용입니다.
//! 만료된 항목은 읽을 때, 그리고 쓸 때마다 한꺼번에 지워집니다.
//! `set_online(false)`로 저장소 장애를 흉내낼 수 있습니다.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::{StoreError, StoreTransport};

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

pub struct MemoryTransport {
    entries: Mutex<HashMap<String, Entry>>,
    online: AtomicBool,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            online: AtomicBool::new(true),
        }
    }

    /// 저장소 장애(false)와 복구(true)를 흉내냅니다.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Release);
    }

    fn reachable(&self) -> Result<(), StoreError> {
        if self.online.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store is offline".to_string()))
        }
    }

    fn entries(&self) -> Result<MutexGuard<'_, HashMap<String, Entry>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl StoreTransport for MemoryTransport {
    async fn connect(&self) -> Result<(), StoreError> {
        self.reachable()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.reachable()
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.reachable()?;
        let mut entries = self.entries()?;
        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                return Ok(Some(entry.value.clone()));
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), StoreError> {
        self.reachable()?;
        let now = Instant::now();
        let mut entries = self.entries()?;
        // 다시 읽히지 않는 만료 레코드도 쓰기 때마다 정리합니다.
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.reachable()?;
        self.entries()?.remove(key);
        Ok(())
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let transport = MemoryTransport::new();
        transport
            .set("k", b"v".to_vec(), Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(transport.get("k").await.unwrap(), Some(b"v".to_vec()));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(transport.get("k").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn set_resets_expiry_window() {
        let transport = MemoryTransport::new();
        let ttl = Duration::from_secs(10);
        transport.set("k", b"1".to_vec(), ttl).await.unwrap();

        tokio::time::advance(Duration::from_secs(8)).await;
        transport.set("k", b"2".to_vec(), ttl).await.unwrap();

        tokio::time::advance(Duration::from_secs(8)).await;
        assert_eq!(transport.get("k").await.unwrap(), Some(b"2".to_vec()));
    }

    #[tokio::test(start_paused = true)]
    async fn writes_sweep_expired_entries_nobody_reads() {
        let transport = MemoryTransport::new();
        transport
            .set("abandoned", b"old".to_vec(), Duration::from_secs(10))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(11)).await;
        transport
            .set("active", b"new".to_vec(), Duration::from_secs(10))
            .await
            .unwrap();

        let entries = transport.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries.contains_key("active"));
    }

    #[tokio::test]
    async fn offline_transport_fails_every_operation() {
        let transport = MemoryTransport::new();
        transport.set_online(false);
        assert!(transport.connect().await.is_err());
        assert!(transport.get("k").await.is_err());
        assert!(transport
            .set("k", Vec::new(), Duration::from_secs(1))
            .await
            .is_err());
    }
}
