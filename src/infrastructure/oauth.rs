use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::domain::entity::platform_account::PlatformType;
use crate::error::AuthError;

/// OAuth トークン交換・更新の結果。
#[derive(Debug, Clone)]
pub struct OAuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

/// プラットフォーム側のユーザー情報。
#[derive(Debug, Clone)]
pub struct PlatformUserInfo {
    pub user_id: String,
    pub username: String,
}

/// OAuthClient は外部プラットフォームの OAuth API のポート。
/// プラットフォームごとの具象 HTTP クライアントはコアの外に置かれ、
/// この境界を通じて注入される。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OAuthClient: Send + Sync {
    /// 認可コードをアクセス/リフレッシュトークンに交換する。
    async fn exchange_code(
        &self,
        platform: PlatformType,
        code: &str,
    ) -> Result<OAuthTokens, AuthError>;

    /// リフレッシュトークンで新しいトークンを取得する。
    async fn refresh_access_token(
        &self,
        platform: PlatformType,
        refresh_token: &str,
    ) -> Result<OAuthTokens, AuthError>;

    /// アクセストークンでプラットフォーム側ユーザー情報を取得する。
    async fn fetch_user_info(
        &self,
        platform: PlatformType,
        access_token: &str,
    ) -> Result<PlatformUserInfo, AuthError>;
}

/// StubOAuthClient は具象クライアント未設定時 (dev / テスト) の決定的スタブ。
pub struct StubOAuthClient;

const STUB_TOKEN_TTL_HOURS: i64 = 4;

#[async_trait]
impl OAuthClient for StubOAuthClient {
    async fn exchange_code(
        &self,
        platform: PlatformType,
        code: &str,
    ) -> Result<OAuthTokens, AuthError> {
        if code.is_empty() {
            return Err(AuthError::InvalidInput("auth code is required".to_string()));
        }
        Ok(OAuthTokens {
            access_token: format!("mock_access_{}_{}", platform.as_str().to_lowercase(), code),
            refresh_token: format!("mock_refresh_{}_{}", platform.as_str().to_lowercase(), code),
            expires_at: Utc::now() + Duration::hours(STUB_TOKEN_TTL_HOURS),
        })
    }

    async fn refresh_access_token(
        &self,
        platform: PlatformType,
        refresh_token: &str,
    ) -> Result<OAuthTokens, AuthError> {
        if refresh_token.is_empty() {
            return Err(AuthError::InvalidInput(
                "refresh token is required".to_string(),
            ));
        }
        Ok(OAuthTokens {
            access_token: format!(
                "mock_access_{}_refreshed_{}",
                platform.as_str().to_lowercase(),
                Utc::now().timestamp_millis()
            ),
            refresh_token: refresh_token.to_string(),
            expires_at: Utc::now() + Duration::hours(STUB_TOKEN_TTL_HOURS),
        })
    }

    async fn fetch_user_info(
        &self,
        platform: PlatformType,
        access_token: &str,
    ) -> Result<PlatformUserInfo, AuthError> {
        if access_token.is_empty() {
            return Err(AuthError::InvalidInput(
                "access token is required".to_string(),
            ));
        }
        let info = match platform {
            PlatformType::Twitch => PlatformUserInfo {
                user_id: "twitch-123".to_string(),
                username: "TwitchUser".to_string(),
            },
            PlatformType::YouTube => PlatformUserInfo {
                user_id: "youtube-456".to_string(),
                username: "YouTubeUser".to_string(),
            },
            PlatformType::Facebook => PlatformUserInfo {
                user_id: "facebook-789".to_string(),
                username: "FacebookUser".to_string(),
            },
            PlatformType::Afreeca => PlatformUserInfo {
                user_id: "afreeca-012".to_string(),
                username: "AfreecaUser".to_string(),
            },
        };
        Ok(info)
    }
}
