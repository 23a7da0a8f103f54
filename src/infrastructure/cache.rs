use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use thiserror::Error;
use tokio::sync::Mutex;

/// CacheError はキャッシュ操作のエラー。
/// リポジトリ層で握りつぶされ (ログのみ)、読み書きを失敗させることはない。
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache connection error: {0}")]
    Connection(String),
    #[error("cache operation error: {0}")]
    Operation(String),
}

/// CacheStore はキー・バリューキャッシュのポート。
/// 本番は Redis、dev / テストはインメモリ実装を使う。
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    /// TTL 付き SET。TTL ゼロは期限なしとして扱う。
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;
    /// INCR と EXPIRE をアトミックに実行し、INCR 後のカウントを返す。
    /// レートリミッタの固定ウィンドウで使用する。
    async fn incr_with_expire(&self, key: &str, ttl: Duration) -> Result<i64, CacheError>;
}

fn map_redis_error(err: redis::RedisError) -> CacheError {
    if err.is_connection_refusal() || err.is_io_error() {
        CacheError::Connection(err.to_string())
    } else {
        CacheError::Operation(err.to_string())
    }
}

/// RedisCacheStore は Redis ベースの CacheStore 実装。
/// ConnectionManager は内部で再接続を行い、clone は安価。
#[derive(Clone)]
pub struct RedisCacheStore {
    conn: ConnectionManager,
}

impl RedisCacheStore {
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(map_redis_error)?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(map_redis_error)?;
        Ok(Self { conn })
    }

    pub fn from_connection(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(map_redis_error)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let secs = ttl.as_secs();
        if secs == 0 {
            conn.set::<_, _, ()>(key, value)
                .await
                .map_err(map_redis_error)
        } else {
            conn.set_ex::<_, _, ()>(key, value, secs)
                .await
                .map_err(map_redis_error)
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let count: i64 = conn.del(key).await.map_err(map_redis_error)?;
        Ok(count > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        conn.exists(key).await.map_err(map_redis_error)
    }

    async fn incr_with_expire(&self, key: &str, ttl: Duration) -> Result<i64, CacheError> {
        let mut conn = self.conn.clone();
        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .expire(key, ttl.as_secs() as i64)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(map_redis_error)?;
        Ok(count)
    }
}

/// InMemoryCacheStore は Redis 未設定時のフォールバック実装。
/// TTL は読み取り時に遅延評価される。単一プロセス内でのみ有効。
#[derive(Default)]
pub struct InMemoryCacheStore {
    entries: Mutex<HashMap<String, (String, Option<Instant>)>>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn expires_at(ttl: Duration) -> Option<Instant> {
        if ttl.is_zero() {
            None
        } else {
            Some(Instant::now() + ttl)
        }
    }

    fn is_expired(deadline: &Option<Instant>) -> bool {
        matches!(deadline, Some(d) if *d <= Instant::now())
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some((_, deadline)) if Self::is_expired(deadline) => {
                entries.remove(key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), (value.to_string(), Self::expires_at(ttl)));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut entries = self.entries.lock().await;
        Ok(entries.remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some((_, deadline)) if Self::is_expired(deadline) => {
                entries.remove(key);
                Ok(false)
            }
            Some(_) => Ok(true),
            None => Ok(false),
        }
    }

    async fn incr_with_expire(&self, key: &str, ttl: Duration) -> Result<i64, CacheError> {
        let mut entries = self.entries.lock().await;
        let count = match entries.get(key) {
            Some((_, deadline)) if Self::is_expired(deadline) => 1,
            Some((value, _)) => value.parse::<i64>().unwrap_or(0) + 1,
            None => 1,
        };
        entries.insert(
            key.to_string(),
            (count.to_string(), Self::expires_at(ttl)),
        );
        Ok(count)
    }
}
