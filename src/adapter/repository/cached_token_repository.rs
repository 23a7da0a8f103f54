use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::domain::entity::token::TokenBlacklistEntry;
use crate::domain::repository::TokenRepository;
use crate::error::AuthError;
use crate::infrastructure::cache::CacheStore;

/// CachedTokenRepository は TokenRepository を Redis キャッシュでラップする。
///
/// is_blacklisted はキャッシュの EXISTS を先に引き、ミス時のみ永続ストアへ
/// 問い合わせる。永続ストアでヒットした場合は残存期間 (不明なら 24 時間上限)
/// の TTL でキャッシュに載せる。add_to_blacklist は永続ストアの ack 後に
/// トークン残存期間の TTL でキャッシュへ書く。キャッシュ側は TTL で自然
/// 消滅するため cleanup_expired は永続ストアのみを対象にする。
///
/// キー設計: `blacklist:{token_id}`。値はリテラルの `"1"`。
pub struct CachedTokenRepository {
    inner: Arc<dyn TokenRepository>,
    cache: Arc<dyn CacheStore>,
}

/// 永続ストア側でヒットしたが残存期間が分からない場合の TTL 上限。
const UNKNOWN_EXPIRY_CACHE_TTL: Duration = Duration::from_secs(24 * 3600);

const BLACKLIST_VALUE: &str = "1";

fn blacklist_key(token_id: &str) -> String {
    format!("blacklist:{}", token_id)
}

impl CachedTokenRepository {
    pub fn new(inner: Arc<dyn TokenRepository>, cache: Arc<dyn CacheStore>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl TokenRepository for CachedTokenRepository {
    async fn is_blacklisted(&self, token_id: &str) -> Result<bool, AuthError> {
        let key = blacklist_key(token_id);

        match self.cache.exists(&key).await {
            Ok(true) => return Ok(true),
            Ok(false) => {}
            Err(e) => {
                warn!(key = %key, error = %e, "blacklist cache check failed, falling back to store");
                return self.inner.is_blacklisted(token_id).await;
            }
        }

        let blacklisted = self.inner.is_blacklisted(token_id).await?;
        if blacklisted {
            // 残存期間はこの経路では分からないため上限 24 時間で載せる。
            // 実際の失効は永続ストア側の expires_at が規定する。
            if let Err(e) = self
                .cache
                .set(&key, BLACKLIST_VALUE, UNKNOWN_EXPIRY_CACHE_TTL)
                .await
            {
                warn!(key = %key, error = %e, "failed to cache blacklisted token");
            }
        }
        Ok(blacklisted)
    }

    async fn add_to_blacklist(&self, entry: &TokenBlacklistEntry) -> Result<(), AuthError> {
        // 永続ストアが先。ack が返るまでこの呼び出しは戻らない。
        self.inner.add_to_blacklist(entry).await?;

        let ttl_secs = entry.remaining_ttl_secs();
        if ttl_secs > 0 {
            let key = blacklist_key(&entry.token_id);
            if let Err(e) = self
                .cache
                .set(&key, BLACKLIST_VALUE, Duration::from_secs(ttl_secs))
                .await
            {
                warn!(key = %key, error = %e, "failed to cache blacklisted token");
            }
        }
        Ok(())
    }

    async fn remove_from_blacklist(&self, token_id: &str) -> Result<(), AuthError> {
        let key = blacklist_key(token_id);
        if let Err(e) = self.cache.delete(&key).await {
            warn!(key = %key, error = %e, "failed to remove token from blacklist cache");
        }
        self.inner.remove_from_blacklist(token_id).await
    }

    /// キャッシュエントリは TTL で自然消滅するため、永続ストアのみ回収する。
    async fn cleanup_expired(&self) -> Result<u64, AuthError> {
        self.inner.cleanup_expired().await
    }
}
