use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// PlatformType は連携可能な外部配信プラットフォームを表す。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlatformType {
    #[serde(rename = "TWITCH")]
    Twitch,
    #[serde(rename = "YOUTUBE")]
    YouTube,
    #[serde(rename = "FACEBOOK")]
    Facebook,
    #[serde(rename = "AFREECA")]
    Afreeca,
}

impl PlatformType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformType::Twitch => "TWITCH",
            PlatformType::YouTube => "YOUTUBE",
            PlatformType::Facebook => "FACEBOOK",
            PlatformType::Afreeca => "AFREECA",
        }
    }

    pub fn parse(s: &str) -> Result<Self, AuthError> {
        match s {
            "TWITCH" => Ok(PlatformType::Twitch),
            "YOUTUBE" => Ok(PlatformType::YouTube),
            "FACEBOOK" => Ok(PlatformType::Facebook),
            "AFREECA" => Ok(PlatformType::Afreeca),
            other => Err(AuthError::InvalidInput(format!(
                "unsupported platform: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for PlatformType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// PlatformAccount は外部プラットフォーム連携アカウントを表すエンティティ。
/// (user_id, platform, platform_user_id) は一意。トークンと有効期限は
/// update_tokens で常に同時に更新される。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformAccount {
    pub id: String,
    pub user_id: String,
    pub platform: PlatformType,
    pub platform_user_id: String,
    pub platform_username: String,
    pub access_token: String,
    pub refresh_token: String,
    pub token_expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PlatformAccount {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: &str,
        user_id: &str,
        platform: PlatformType,
        platform_user_id: &str,
        platform_username: &str,
        access_token: &str,
        refresh_token: &str,
        token_expires_at: DateTime<Utc>,
    ) -> Result<Self, AuthError> {
        if id.is_empty() {
            return Err(AuthError::InvalidInput("account id is required".to_string()));
        }
        if user_id.is_empty() {
            return Err(AuthError::InvalidInput("user id is required".to_string()));
        }
        if platform_user_id.is_empty() {
            return Err(AuthError::InvalidInput(
                "platform user id is required".to_string(),
            ));
        }
        if platform_username.is_empty() {
            return Err(AuthError::InvalidInput(
                "platform username is required".to_string(),
            ));
        }
        if access_token.is_empty() {
            return Err(AuthError::InvalidInput(
                "access token is required".to_string(),
            ));
        }

        let now = Utc::now();
        Ok(Self {
            id: id.to_string(),
            user_id: user_id.to_string(),
            platform,
            platform_user_id: platform_user_id.to_string(),
            platform_username: platform_username.to_string(),
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
            token_expires_at,
            created_at: now,
            updated_at: now,
        })
    }

    /// アクセストークンが期限切れかどうか。
    pub fn is_token_expired(&self) -> bool {
        Utc::now() > self.token_expires_at
    }

    /// トークンと有効期限をまとめて更新する。部分更新は許可しない。
    pub fn update_tokens(
        &mut self,
        access_token: &str,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        if access_token.is_empty() {
            return Err(AuthError::InvalidInput(
                "access token is required".to_string(),
            ));
        }
        self.access_token = access_token.to_string();
        self.refresh_token = refresh_token.to_string();
        self.token_expires_at = expires_at;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// プラットフォーム側の表示名を更新する。
    pub fn update_platform_username(&mut self, username: &str) -> Result<(), AuthError> {
        if username.is_empty() {
            return Err(AuthError::InvalidInput(
                "platform username is required".to_string(),
            ));
        }
        self.platform_username = username.to_string();
        self.updated_at = Utc::now();
        Ok(())
    }
}
