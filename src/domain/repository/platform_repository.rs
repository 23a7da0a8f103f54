use async_trait::async_trait;

use crate::domain::entity::platform_account::PlatformAccount;
use crate::error::AuthError;

/// PlatformAccountRepository はプラットフォーム連携アカウント永続化のポート。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlatformAccountRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<PlatformAccount>, AuthError>;
    async fn find_by_user_id(&self, user_id: &str) -> Result<Vec<PlatformAccount>, AuthError>;
    async fn insert(&self, account: &PlatformAccount) -> Result<(), AuthError>;
    async fn update(&self, account: &PlatformAccount) -> Result<(), AuthError>;
    /// 連携解除は物理削除。
    async fn delete(&self, id: &str) -> Result<(), AuthError>;
}
