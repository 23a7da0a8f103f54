use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::cache::CacheStore;
use crate::error::AuthError;

const RATE_LIMIT_KEY_PREFIX: &str = "rate-limit:";

/// RateLimiter はキー単位の固定ウィンドウ制限のポート。
/// キーは呼び出し元識別子と RPC メソッドから導出される
/// (`<username>:<fullMethod>` または `<user_id>:<fullMethod>`)。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// このキーの要求を許可するか。ウィンドウ内で limit を超えたら false。
    async fn allow(&self, key: &str) -> Result<bool, AuthError>;
}

/// FixedWindowRateLimiter はキャッシュの INCR + EXPIRE による固定
/// ウィンドウ実装。2 コマンドはアトミックに実行され、期限切れ後の最初の
/// INCR から新しいウィンドウが始まる。
pub struct FixedWindowRateLimiter {
    store: Arc<dyn CacheStore>,
    limit: i64,
    window: Duration,
}

impl FixedWindowRateLimiter {
    pub fn new(store: Arc<dyn CacheStore>, limit: i64, window: Duration) -> Self {
        Self {
            store,
            limit,
            window,
        }
    }
}

#[async_trait]
impl RateLimiter for FixedWindowRateLimiter {
    async fn allow(&self, key: &str) -> Result<bool, AuthError> {
        let rate_key = format!("{}{}", RATE_LIMIT_KEY_PREFIX, key);
        let count = self
            .store
            .incr_with_expire(&rate_key, self.window)
            .await
            .map_err(|e| AuthError::Internal(format!("rate limit check failed: {}", e)))?;

        if count > self.limit {
            warn!(key = %key, count, limit = self.limit, "rate limit exceeded");
            return Ok(false);
        }
        Ok(true)
    }
}
