use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// UserStatus はユーザーアカウントの状態を表す。
/// ACTIVE↔SUSPENDED/INACTIVE は可逆、DELETED への遷移は終端。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserStatus {
    #[serde(rename = "ACTIVE")]
    Active,
    #[serde(rename = "SUSPENDED")]
    Suspended,
    #[serde(rename = "INACTIVE")]
    Inactive,
    #[serde(rename = "DELETED")]
    Deleted,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "ACTIVE",
            UserStatus::Suspended => "SUSPENDED",
            UserStatus::Inactive => "INACTIVE",
            UserStatus::Deleted => "DELETED",
        }
    }

    pub fn parse(s: &str) -> Result<Self, AuthError> {
        match s {
            "ACTIVE" => Ok(UserStatus::Active),
            "SUSPENDED" => Ok(UserStatus::Suspended),
            "INACTIVE" => Ok(UserStatus::Inactive),
            "DELETED" => Ok(UserStatus::Deleted),
            other => Err(AuthError::InvalidInput(format!(
                "unknown user status: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User はユーザーエンティティを表す。
/// 変更は意図を表すメソッド (record_login / update_status など) 経由で行い、
/// updated_at はその中で更新する。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub status: UserStatus,
    pub subscription_tier: String,
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

pub const DEFAULT_SUBSCRIPTION_TIER: &str = "FREE";
pub const DEFAULT_ROLE: &str = "USER";

impl User {
    /// 新規ユーザーを生成する。status=ACTIVE, tier=FREE, roles=["USER"]。
    pub fn new(id: &str, username: &str, email: &str, password_hash: &str) -> Result<Self, AuthError> {
        if id.is_empty() {
            return Err(AuthError::InvalidInput("user id is required".to_string()));
        }
        if username.is_empty() {
            return Err(AuthError::InvalidInput("username is required".to_string()));
        }
        if email.is_empty() {
            return Err(AuthError::InvalidInput("email is required".to_string()));
        }
        if password_hash.is_empty() {
            return Err(AuthError::InvalidInput(
                "password hash is required".to_string(),
            ));
        }

        let now = Utc::now();
        Ok(Self {
            id: id.to_string(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            status: UserStatus::Active,
            subscription_tier: DEFAULT_SUBSCRIPTION_TIER.to_string(),
            roles: vec![DEFAULT_ROLE.to_string()],
            created_at: now,
            updated_at: now,
            last_login_at: None,
        })
    }

    /// 認証やプラットフォーム連携が許可される状態か。
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    /// 最終ログイン時刻を現在時刻で記録する。
    pub fn record_login(&mut self) {
        let now = Utc::now();
        self.last_login_at = Some(now);
        self.updated_at = now;
    }

    pub fn update_email(&mut self, email: &str) -> Result<(), AuthError> {
        if email.is_empty() {
            return Err(AuthError::InvalidInput("email is required".to_string()));
        }
        self.email = email.to_string();
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn update_password(&mut self, password_hash: &str) -> Result<(), AuthError> {
        if password_hash.is_empty() {
            return Err(AuthError::InvalidInput(
                "password hash is required".to_string(),
            ));
        }
        self.password_hash = password_hash.to_string();
        self.updated_at = Utc::now();
        Ok(())
    }

    /// 状態を遷移させる。DELETED からの復帰は許可しない。
    pub fn update_status(&mut self, status: UserStatus) -> Result<(), AuthError> {
        if self.status == UserStatus::Deleted && status != UserStatus::Deleted {
            return Err(AuthError::InvalidInput(
                "deleted user cannot be restored".to_string(),
            ));
        }
        self.status = status;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// 役割を追加する。既に保持している場合は何もしない (集合として扱う)。
    pub fn add_role(&mut self, role: &str) {
        if self.has_role(role) {
            return;
        }
        self.roles.push(role.to_string());
        self.updated_at = Utc::now();
    }

    pub fn remove_role(&mut self, role: &str) {
        self.roles.retain(|r| r != role);
        self.updated_at = Utc::now();
    }

    /// 役割集合を丸ごと置き換える。重複は取り除く。
    pub fn replace_roles(&mut self, roles: &[String]) {
        self.roles.clear();
        for role in roles {
            if !self.has_role(role) {
                self.roles.push(role.clone());
            }
        }
        self.updated_at = Utc::now();
    }
}
