use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// TokenPair はアクセストークンとリフレッシュトークンの組。
/// 発行時に生成されて呼び出し元へ返すだけの一時オブジェクトで、平文のまま
/// 永続化されることはない。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// アクセストークンの有効期限。
    pub expires_at: DateTime<Utc>,
}

impl TokenPair {
    pub fn new(
        access_token: &str,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, AuthError> {
        if access_token.is_empty() {
            return Err(AuthError::InvalidInput(
                "access token is required".to_string(),
            ));
        }
        if refresh_token.is_empty() {
            return Err(AuthError::InvalidInput(
                "refresh token is required".to_string(),
            ));
        }
        Ok(Self {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
            expires_at,
        })
    }
}

/// TokenBlacklistEntry は無効化されたトークンを表す。
/// 識別子は JTI、JTI を持たないトークンはトークン文字列そのもの。
/// expires_at (トークン自身の exp) を過ぎた行は回収対象となる。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenBlacklistEntry {
    pub token_id: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
    pub reason: String,
    pub blacklisted_at: DateTime<Utc>,
}

impl TokenBlacklistEntry {
    pub fn new(
        token_id: &str,
        user_id: &str,
        expires_at: DateTime<Utc>,
        reason: &str,
    ) -> Result<Self, AuthError> {
        if token_id.is_empty() {
            return Err(AuthError::InvalidInput("token id is required".to_string()));
        }
        if user_id.is_empty() {
            return Err(AuthError::InvalidInput("user id is required".to_string()));
        }
        Ok(Self {
            token_id: token_id.to_string(),
            user_id: user_id.to_string(),
            expires_at,
            reason: reason.to_string(),
            blacklisted_at: Utc::now(),
        })
    }

    /// キャッシュ TTL 用の残り有効秒数。既に期限切れなら 0。
    pub fn remaining_ttl_secs(&self) -> u64 {
        let remaining = (self.expires_at - Utc::now()).num_seconds();
        if remaining > 0 {
            remaining as u64
        } else {
            0
        }
    }
}
