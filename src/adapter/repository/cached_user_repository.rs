use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::domain::entity::user::User;
use crate::domain::repository::UserRepository;
use crate::error::AuthError;
use crate::infrastructure::cache::CacheStore;

/// CachedUserRepository は UserRepository を Redis キャッシュでラップする。
///
/// 読み取りは read-through: キャッシュヒットで DB をスキップし、ミスや
/// キャッシュ障害時は永続ストアへフォールバックして非同期に再キャッシュする。
/// 書き込みは write-through-invalidate: 永続ストアへ先に書き、成功後に
/// 派生キーを削除する (上書きはしない)。
///
/// キー設計:
///   - `user:id:{id}`
///   - `user:username:{username}`
pub struct CachedUserRepository {
    inner: Arc<dyn UserRepository>,
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
}

pub const DEFAULT_USER_CACHE_TTL: Duration = Duration::from_secs(300);

fn id_key(id: &str) -> String {
    format!("user:id:{}", id)
}

fn username_key(username: &str) -> String {
    format!("user:username:{}", username)
}

impl CachedUserRepository {
    pub fn new(inner: Arc<dyn UserRepository>, cache: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { inner, cache, ttl }
    }

    /// キャッシュから読み取る。障害・デコード失敗は None として扱い、
    /// 読み取り自体を失敗させない。
    async fn read_cache(&self, key: &str) -> Option<User> {
        let cached = match self.cache.get(key).await {
            Ok(v) => v,
            Err(e) => {
                warn!(key = %key, error = %e, "user cache read failed, falling back to store");
                return None;
            }
        };
        let json = cached?;
        match serde_json::from_str(&json) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(key = %key, error = %e, "failed to decode cached user, falling back to store");
                None
            }
        }
    }

    /// 永続ストアの読み取り結果を非同期でキャッシュに載せる。
    fn populate_cache(&self, key: String, user: &User) {
        let json = match serde_json::to_string(user) {
            Ok(j) => j,
            Err(e) => {
                warn!(key = %key, error = %e, "failed to encode user for cache");
                return;
            }
        };
        let cache = self.cache.clone();
        let ttl = self.ttl;
        tokio::spawn(async move {
            if let Err(e) = cache.set(&key, &json, ttl).await {
                warn!(key = %key, error = %e, "failed to populate user cache");
            }
        });
    }

    /// 派生キーを削除する。失敗はログのみで、書き込みは失敗させない。
    async fn invalidate(&self, id: &str, username: &str) {
        for key in [id_key(id), username_key(username)] {
            if let Err(e) = self.cache.delete(&key).await {
                warn!(key = %key, error = %e, "failed to invalidate user cache");
            }
        }
    }
}

#[async_trait]
impl UserRepository for CachedUserRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AuthError> {
        let key = id_key(id);
        if let Some(user) = self.read_cache(&key).await {
            return Ok(Some(user));
        }

        let user = self.inner.find_by_id(id).await?;
        if let Some(ref user) = user {
            self.populate_cache(key, user);
        }
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError> {
        let key = username_key(username);
        if let Some(user) = self.read_cache(&key).await {
            return Ok(Some(user));
        }

        let user = self.inner.find_by_username(username).await?;
        if let Some(ref user) = user {
            self.populate_cache(key, user);
        }
        Ok(user)
    }

    /// 作成ウィンドウ中の偽陰性を避けるため、キャッシュを一切使わない。
    async fn exists_by_username(&self, username: &str) -> Result<bool, AuthError> {
        self.inner.exists_by_username(username).await
    }

    async fn insert(&self, user: &User) -> Result<(), AuthError> {
        self.inner.insert(user).await
    }

    async fn update(&self, user: &User) -> Result<(), AuthError> {
        self.inner.update(user).await?;
        self.invalidate(&user.id, &user.username).await;
        Ok(())
    }

    /// 削除前にユーザーを読み、username キーの無効化に使う。
    async fn delete(&self, id: &str) -> Result<(), AuthError> {
        let user = self
            .inner
            .find_by_id(id)
            .await?
            .ok_or_else(|| AuthError::UserNotFound(id.to_string()))?;

        self.inner.delete(id).await?;
        self.invalidate(id, &user.username).await;
        Ok(())
    }
}
