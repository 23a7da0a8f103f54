use async_trait::async_trait;

use crate::domain::entity::audit_log::AuditLog;
use crate::error::AuthError;

/// AuditLogRepository は監査ログ永続化のポート。追記のみ。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    async fn create(&self, log: &AuditLog) -> Result<(), AuthError>;
    async fn find_by_user_id(&self, user_id: &str, limit: i64) -> Result<Vec<AuditLog>, AuthError>;
}
