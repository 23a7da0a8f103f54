use std::sync::Arc;

use uuid::Uuid;

use crate::domain::entity::event::DomainEvent;
use crate::domain::entity::platform_account::{PlatformAccount, PlatformType};
use crate::domain::repository::{PlatformAccountRepository, UserRepository};
use crate::error::AuthError;
use crate::infrastructure::kafka_producer::EventPublisher;
use crate::infrastructure::oauth::OAuthClient;
use crate::usecase::publish_event;

#[derive(Debug, Clone)]
pub struct ConnectPlatformInput {
    pub user_id: String,
    pub platform: PlatformType,
    pub auth_code: String,
}

#[derive(Debug, Clone)]
pub struct ConnectPlatformOutput {
    pub account: PlatformAccount,
}

/// ConnectPlatformUseCase は外部プラットフォームのアカウントを連携する。
/// [unlinked] → [linked,valid] の遷移。OAuth 側の失敗は
/// PlatformConnectionFailed を発行してからエラーを返す。
pub struct ConnectPlatformUseCase {
    user_repo: Arc<dyn UserRepository>,
    platform_repo: Arc<dyn PlatformAccountRepository>,
    oauth: Arc<dyn OAuthClient>,
    event_pub: Arc<dyn EventPublisher>,
}

impl ConnectPlatformUseCase {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        platform_repo: Arc<dyn PlatformAccountRepository>,
        oauth: Arc<dyn OAuthClient>,
        event_pub: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            user_repo,
            platform_repo,
            oauth,
            event_pub,
        }
    }

    async fn publish_connection_failed(&self, user_id: &str, platform: PlatformType, reason: &str) {
        publish_event(
            self.event_pub.as_ref(),
            DomainEvent::PlatformConnectionFailed {
                user_id: user_id.to_string(),
                platform,
                reason: reason.to_string(),
                occurred_at: chrono::Utc::now(),
            },
        )
        .await;
    }

    pub async fn execute(
        &self,
        input: &ConnectPlatformInput,
    ) -> Result<ConnectPlatformOutput, AuthError> {
        let user = self
            .user_repo
            .find_by_id(&input.user_id)
            .await?
            .ok_or_else(|| AuthError::UserNotFound(input.user_id.clone()))?;
        if !user.is_active() {
            return Err(AuthError::UserNotActive(user.id.clone()));
        }

        let tokens = match self
            .oauth
            .exchange_code(input.platform, &input.auth_code)
            .await
        {
            Ok(tokens) => tokens,
            Err(e) => {
                self.publish_connection_failed(
                    &input.user_id,
                    input.platform,
                    "oauth code exchange failed",
                )
                .await;
                return Err(e);
            }
        };

        let info = match self
            .oauth
            .fetch_user_info(input.platform, &tokens.access_token)
            .await
        {
            Ok(info) => info,
            Err(e) => {
                self.publish_connection_failed(
                    &input.user_id,
                    input.platform,
                    "platform user info fetch failed",
                )
                .await;
                return Err(e);
            }
        };

        let account = PlatformAccount::new(
            &Uuid::new_v4().to_string(),
            &input.user_id,
            input.platform,
            &info.user_id,
            &info.username,
            &tokens.access_token,
            &tokens.refresh_token,
            tokens.expires_at,
        )?;

        self.platform_repo.insert(&account).await?;

        publish_event(
            self.event_pub.as_ref(),
            DomainEvent::PlatformConnected {
                user_id: account.user_id.clone(),
                platform_account_id: account.id.clone(),
                platform: account.platform,
                occurred_at: chrono::Utc::now(),
            },
        )
        .await;

        Ok(ConnectPlatformOutput { account })
    }
}
