use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// AuditLog は監査ログの 1 行を表す。作成後は不変 (追記専用)。
/// old_values / new_values は変更前後のフィールドの JSON マップ。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: String,
    pub user_id: Option<String>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// CreateAuditLogRequest は AuditLog 生成時の入力。
#[derive(Debug, Clone, Default)]
pub struct CreateAuditLogRequest {
    pub user_id: Option<String>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl AuditLog {
    pub fn new(req: CreateAuditLogRequest) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: req.user_id,
            action: req.action,
            entity_type: req.entity_type,
            entity_id: req.entity_id,
            old_values: req.old_values,
            new_values: req.new_values,
            ip_address: req.ip_address,
            user_agent: req.user_agent,
            created_at: Utc::now(),
        }
    }
}
