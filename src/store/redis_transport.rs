//! Redis 전송 계층
//!
//! `MultiplexedConnection` 하나를 모든 요청이 공유합니다.
//! 이 연결은 내부적으로 명령을 파이프라이닝하므로 clone해서 동시에 써도 안전합니다.
//! 재연결은 `SessionStore` 감시자가 `connect()`를 다시 호출하는 방식으로 이루어집니다.

use std::time::Duration;

use ::redis::aio::MultiplexedConnection;
use ::redis::{AsyncCommands, Client, RedisError};
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{StoreError, StoreTransport};

pub struct RedisTransport {
    client: Client,
    conn: RwLock<Option<MultiplexedConnection>>,
}

impl RedisTransport {
    /// URL만 검사합니다. 실제 연결은 `connect()`에서 맺습니다.
    pub fn open(url: &str) -> Result<Self, StoreError> {
        let client = Client::open(url).map_err(backend)?;
        Ok(Self {
            client,
            conn: RwLock::new(None),
        })
    }

    async fn handle(&self) -> Result<MultiplexedConnection, StoreError> {
        self.conn
            .read()
            .await
            .clone()
            .ok_or_else(|| StoreError::Unavailable("not connected to redis".to_string()))
    }
}

fn backend(err: RedisError) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

#[async_trait]
impl StoreTransport for RedisTransport {
    async fn connect(&self) -> Result<(), StoreError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(backend)?;
        let _: String = ::redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(backend)?;
        *self.conn.write().await = Some(conn);
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.handle().await?;
        let _: String = ::redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.handle().await?;
        let value: Option<Vec<u8>> = conn.get(key).await.map_err(backend)?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.handle().await?;
        // SET key value EX ttl: 값을 덮어쓰면서 만료 시간도 함께 다시 시작
        let seconds = ttl.as_secs().max(1);
        let _: () = conn.set_ex(key, value, seconds).await.map_err(backend)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.handle().await?;
        let _: () = conn.del(key).await.map_err(backend)?;
        Ok(())
    }

    async fn close(&self) {
        // 마지막 clone이 drop되면 연결이 끊깁니다.
        self.conn.write().await.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_url() {
        assert!(RedisTransport::open("not a url").is_err());
    }

    #[tokio::test]
    async fn operations_fail_before_connect() {
        let transport = RedisTransport::open("redis://127.0.0.1:1").unwrap();
        assert!(matches!(
            transport.get("k").await,
            Err(StoreError::Unavailable(_))
        ));
    }
}
