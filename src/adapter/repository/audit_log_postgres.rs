use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entity::audit_log::AuditLog;
use crate::domain::repository::AuditLogRepository;
use crate::error::AuthError;

/// AuditLogPostgresRepository は audit_logs テーブルの PostgreSQL 実装。
/// 追記専用。old_values / new_values は JSONB。
pub struct AuditLogPostgresRepository {
    pool: PgPool,
}

impl AuditLogPostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// AuditLogRow は audit_logs テーブルの行を表す中間構造体。
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuditLogRow {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AuditLogRow> for AuditLog {
    fn from(row: AuditLogRow) -> Self {
        AuditLog {
            id: row.id.to_string(),
            user_id: row.user_id.map(|u| u.to_string()),
            action: row.action,
            entity_type: row.entity_type,
            entity_id: row.entity_id,
            old_values: row.old_values,
            new_values: row.new_values,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl AuditLogRepository for AuditLogPostgresRepository {
    async fn create(&self, log: &AuditLog) -> Result<(), AuthError> {
        let id = Uuid::parse_str(&log.id)
            .map_err(|e| AuthError::InvalidInput(format!("invalid audit log id: {}", e)))?;
        let user_id = log
            .user_id
            .as_deref()
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|e| AuthError::InvalidInput(format!("invalid user id: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO audit_logs (id, user_id, action, entity_type, entity_id,
                old_values, new_values, ip_address, user_agent, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(&log.action)
        .bind(&log.entity_type)
        .bind(&log.entity_id)
        .bind(&log.old_values)
        .bind(&log.new_values)
        .bind(&log.ip_address)
        .bind(&log.user_agent)
        .bind(log.created_at)
        .execute(&self.pool)
        .await
        .map_err(AuthError::internal)?;
        Ok(())
    }

    async fn find_by_user_id(&self, user_id: &str, limit: i64) -> Result<Vec<AuditLog>, AuthError> {
        let uuid = Uuid::parse_str(user_id)
            .map_err(|e| AuthError::InvalidInput(format!("invalid user id: {}", e)))?;
        let rows = sqlx::query_as::<_, AuditLogRow>(
            r#"
            SELECT id, user_id, action, entity_type, entity_id,
                   old_values, new_values, ip_address, user_agent, created_at
            FROM audit_logs
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(uuid)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(AuthError::internal)?;

        Ok(rows.into_iter().map(AuditLog::from).collect())
    }
}
