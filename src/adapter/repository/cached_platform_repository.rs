use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::domain::entity::platform_account::PlatformAccount;
use crate::domain::repository::PlatformAccountRepository;
use crate::error::AuthError;
use crate::infrastructure::cache::CacheStore;

/// CachedPlatformAccountRepository は PlatformAccountRepository を
/// Redis キャッシュでラップする。プロトコルは CachedUserRepository と同じ
/// read-through / write-through-invalidate。
///
/// キー設計: `platform:id:{id}`
pub struct CachedPlatformAccountRepository {
    inner: Arc<dyn PlatformAccountRepository>,
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
}

fn id_key(id: &str) -> String {
    format!("platform:id:{}", id)
}

impl CachedPlatformAccountRepository {
    pub fn new(
        inner: Arc<dyn PlatformAccountRepository>,
        cache: Arc<dyn CacheStore>,
        ttl: Duration,
    ) -> Self {
        Self { inner, cache, ttl }
    }

    async fn read_cache(&self, key: &str) -> Option<PlatformAccount> {
        let cached = match self.cache.get(key).await {
            Ok(v) => v,
            Err(e) => {
                warn!(key = %key, error = %e, "platform cache read failed, falling back to store");
                return None;
            }
        };
        let json = cached?;
        match serde_json::from_str(&json) {
            Ok(account) => Some(account),
            Err(e) => {
                warn!(key = %key, error = %e, "failed to decode cached platform account");
                None
            }
        }
    }

    fn populate_cache(&self, key: String, account: &PlatformAccount) {
        let json = match serde_json::to_string(account) {
            Ok(j) => j,
            Err(e) => {
                warn!(key = %key, error = %e, "failed to encode platform account for cache");
                return;
            }
        };
        let cache = self.cache.clone();
        let ttl = self.ttl;
        tokio::spawn(async move {
            if let Err(e) = cache.set(&key, &json, ttl).await {
                warn!(key = %key, error = %e, "failed to populate platform cache");
            }
        });
    }

    async fn invalidate(&self, id: &str) {
        let key = id_key(id);
        if let Err(e) = self.cache.delete(&key).await {
            warn!(key = %key, error = %e, "failed to invalidate platform cache");
        }
    }
}

#[async_trait]
impl PlatformAccountRepository for CachedPlatformAccountRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<PlatformAccount>, AuthError> {
        let key = id_key(id);
        if let Some(account) = self.read_cache(&key).await {
            return Ok(Some(account));
        }

        let account = self.inner.find_by_id(id).await?;
        if let Some(ref account) = account {
            self.populate_cache(key, account);
        }
        Ok(account)
    }

    /// 一覧はキャッシュを使わず inner に委譲する。
    async fn find_by_user_id(&self, user_id: &str) -> Result<Vec<PlatformAccount>, AuthError> {
        self.inner.find_by_user_id(user_id).await
    }

    async fn insert(&self, account: &PlatformAccount) -> Result<(), AuthError> {
        self.inner.insert(account).await
    }

    async fn update(&self, account: &PlatformAccount) -> Result<(), AuthError> {
        self.inner.update(account).await?;
        self.invalidate(&account.id).await;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), AuthError> {
        self.inner.delete(id).await?;
        self.invalidate(id).await;
        Ok(())
    }
}
