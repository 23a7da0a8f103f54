use async_trait::async_trait;

use crate::domain::entity::token::TokenBlacklistEntry;
use crate::error::AuthError;

/// TokenRepository はトークンブラックリストのポート。
/// add_to_blacklist は永続ストアの ack 後にのみ戻るため、リフレッシュ
/// ローテーション直後の検証から必ず見える (キー単位の線形化)。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenRepository: Send + Sync {
    async fn is_blacklisted(&self, token_id: &str) -> Result<bool, AuthError>;
    async fn add_to_blacklist(&self, entry: &TokenBlacklistEntry) -> Result<(), AuthError>;
    async fn remove_from_blacklist(&self, token_id: &str) -> Result<(), AuthError>;
    /// 期限切れ行の回収。削除した行数を返す。キャッシュは TTL で自然消滅する。
    async fn cleanup_expired(&self) -> Result<u64, AuthError>;
}
