use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::entity::token::TokenBlacklistEntry;
use crate::domain::repository::TokenRepository;
use crate::error::AuthError;

/// TokenBlacklistPostgresRepository は token_blacklist テーブルの
/// PostgreSQL 実装。token_id は JTI、または JTI を持たないトークンの
/// トークン文字列そのもの。expires_at には回収用のインデックスがある。
pub struct TokenBlacklistPostgresRepository {
    pool: PgPool,
}

impl TokenBlacklistPostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// TokenBlacklistRow は token_blacklist テーブルの行を表す中間構造体。
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TokenBlacklistRow {
    pub token_id: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
    pub reason: String,
    pub blacklisted_at: DateTime<Utc>,
}

impl From<TokenBlacklistRow> for TokenBlacklistEntry {
    fn from(row: TokenBlacklistRow) -> Self {
        TokenBlacklistEntry {
            token_id: row.token_id,
            user_id: row.user_id,
            expires_at: row.expires_at,
            reason: row.reason,
            blacklisted_at: row.blacklisted_at,
        }
    }
}

#[async_trait]
impl TokenRepository for TokenBlacklistPostgresRepository {
    /// 期限内の行だけをブラックリストとして扱う。
    /// 期限切れ行は回収前でも無効とみなす。
    async fn is_blacklisted(&self, token_id: &str) -> Result<bool, AuthError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM token_blacklist
                WHERE token_id = $1 AND expires_at > NOW()
            )
            "#,
        )
        .bind(token_id)
        .fetch_one(&self.pool)
        .await
        .map_err(AuthError::internal)?;
        Ok(exists)
    }

    async fn add_to_blacklist(&self, entry: &TokenBlacklistEntry) -> Result<(), AuthError> {
        sqlx::query(
            r#"
            INSERT INTO token_blacklist (token_id, user_id, expires_at, reason, blacklisted_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (token_id) DO NOTHING
            "#,
        )
        .bind(&entry.token_id)
        .bind(&entry.user_id)
        .bind(entry.expires_at)
        .bind(&entry.reason)
        .bind(entry.blacklisted_at)
        .execute(&self.pool)
        .await
        .map_err(AuthError::internal)?;
        Ok(())
    }

    async fn remove_from_blacklist(&self, token_id: &str) -> Result<(), AuthError> {
        sqlx::query("DELETE FROM token_blacklist WHERE token_id = $1")
            .bind(token_id)
            .execute(&self.pool)
            .await
            .map_err(AuthError::internal)?;
        Ok(())
    }

    async fn cleanup_expired(&self) -> Result<u64, AuthError> {
        let result = sqlx::query("DELETE FROM token_blacklist WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await
            .map_err(AuthError::internal)?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_row_conversion() {
        let row = TokenBlacklistRow {
            token_id: "jti-1".to_string(),
            user_id: "user-1".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
            reason: "refreshed".to_string(),
            blacklisted_at: Utc::now(),
        };
        let entry: TokenBlacklistEntry = row.into();
        assert_eq!(entry.token_id, "jti-1");
        assert_eq!(entry.reason, "refreshed");
    }
}
