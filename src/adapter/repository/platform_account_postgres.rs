use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entity::platform_account::{PlatformAccount, PlatformType};
use crate::domain::repository::PlatformAccountRepository;
use crate::error::AuthError;

/// PlatformAccountPostgresRepository は platform_accounts テーブルの
/// PostgreSQL 実装。(user_id, platform, platform_user_id) に一意制約がある。
pub struct PlatformAccountPostgresRepository {
    pool: PgPool,
}

impl PlatformAccountPostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// PlatformAccountRow は platform_accounts テーブルの行を表す中間構造体。
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlatformAccountRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub platform: String,
    pub platform_user_id: String,
    pub platform_username: String,
    pub access_token: String,
    pub refresh_token: String,
    pub token_expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PlatformAccountRow> for PlatformAccount {
    type Error = AuthError;

    fn try_from(row: PlatformAccountRow) -> Result<Self, Self::Error> {
        Ok(PlatformAccount {
            id: row.id.to_string(),
            user_id: row.user_id.to_string(),
            platform: PlatformType::parse(&row.platform)?,
            platform_user_id: row.platform_user_id,
            platform_username: row.platform_username,
            access_token: row.access_token,
            refresh_token: row.refresh_token,
            token_expires_at: row.token_expires_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn parse_uuid(id: &str, what: &str) -> Result<Uuid, AuthError> {
    Uuid::parse_str(id).map_err(|e| AuthError::InvalidInput(format!("invalid {}: {}", what, e)))
}

const ACCOUNT_COLUMNS: &str = "id, user_id, platform, platform_user_id, platform_username, access_token, refresh_token, token_expires_at, created_at, updated_at";

#[async_trait]
impl PlatformAccountRepository for PlatformAccountPostgresRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<PlatformAccount>, AuthError> {
        let uuid = parse_uuid(id, "platform account id")?;
        let row = sqlx::query_as::<_, PlatformAccountRow>(&format!(
            "SELECT {} FROM platform_accounts WHERE id = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await
        .map_err(AuthError::internal)?;

        row.map(PlatformAccount::try_from).transpose()
    }

    async fn find_by_user_id(&self, user_id: &str) -> Result<Vec<PlatformAccount>, AuthError> {
        let uuid = parse_uuid(user_id, "user id")?;
        let rows = sqlx::query_as::<_, PlatformAccountRow>(&format!(
            "SELECT {} FROM platform_accounts WHERE user_id = $1 ORDER BY created_at",
            ACCOUNT_COLUMNS
        ))
        .bind(uuid)
        .fetch_all(&self.pool)
        .await
        .map_err(AuthError::internal)?;

        rows.into_iter().map(PlatformAccount::try_from).collect()
    }

    async fn insert(&self, account: &PlatformAccount) -> Result<(), AuthError> {
        let id = parse_uuid(&account.id, "platform account id")?;
        let user_id = parse_uuid(&account.user_id, "user id")?;
        sqlx::query(
            r#"
            INSERT INTO platform_accounts (id, user_id, platform, platform_user_id, platform_username,
                access_token, refresh_token, token_expires_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(account.platform.as_str())
        .bind(&account.platform_user_id)
        .bind(&account.platform_username)
        .bind(&account.access_token)
        .bind(&account.refresh_token)
        .bind(account.token_expires_at)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(AuthError::internal)?;
        Ok(())
    }

    async fn update(&self, account: &PlatformAccount) -> Result<(), AuthError> {
        let id = parse_uuid(&account.id, "platform account id")?;
        let result = sqlx::query(
            r#"
            UPDATE platform_accounts
            SET platform_username = $2, access_token = $3, refresh_token = $4,
                token_expires_at = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&account.platform_username)
        .bind(&account.access_token)
        .bind(&account.refresh_token)
        .bind(account.token_expires_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(AuthError::internal)?;

        if result.rows_affected() == 0 {
            return Err(AuthError::PlatformAccountNotFound(account.id.clone()));
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), AuthError> {
        let uuid = parse_uuid(id, "platform account id")?;
        let result = sqlx::query("DELETE FROM platform_accounts WHERE id = $1")
            .bind(uuid)
            .execute(&self.pool)
            .await
            .map_err(AuthError::internal)?;

        if result.rows_affected() == 0 {
            return Err(AuthError::PlatformAccountNotFound(id.to_string()));
        }
        Ok(())
    }
}
