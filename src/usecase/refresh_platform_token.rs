use std::sync::Arc;

use crate::domain::entity::event::DomainEvent;
use crate::domain::entity::platform_account::PlatformAccount;
use crate::domain::repository::{PlatformAccountRepository, UserRepository};
use crate::error::AuthError;
use crate::infrastructure::kafka_producer::EventPublisher;
use crate::infrastructure::oauth::OAuthClient;
use crate::usecase::publish_event;

#[derive(Debug, Clone)]
pub struct RefreshPlatformTokenOutput {
    pub account: PlatformAccount,
}

/// RefreshPlatformTokenUseCase は連携アカウントのトークンを更新する。
/// [linked,*] → [linked,valid] の遷移。トークンと有効期限はエンティティ上で
/// 同時に適用され、永続化も 1 回の update で行われる。
pub struct RefreshPlatformTokenUseCase {
    user_repo: Arc<dyn UserRepository>,
    platform_repo: Arc<dyn PlatformAccountRepository>,
    oauth: Arc<dyn OAuthClient>,
    event_pub: Arc<dyn EventPublisher>,
}

impl RefreshPlatformTokenUseCase {
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

    pub async fn execute(
        &self,
        platform_account_id: &str,
    ) -> Result<RefreshPlatformTokenOutput, AuthError> {
        let mut account = self
            .platform_repo
            .find_by_id(platform_account_id)
            .await?
            .ok_or_else(|| AuthError::PlatformAccountNotFound(platform_account_id.to_string()))?;

        let user = self.user_repo.find_by_id(&account.user_id).await?;
        if !user.map(|u| u.is_active()).unwrap_or(false) {
            return Err(AuthError::UserNotActive(account.user_id.clone()));
        }

        let tokens = match self
            .oauth
            .refresh_access_token(account.platform, &account.refresh_token)
            .await
        {
            Ok(tokens) => tokens,
            Err(e) => {
                publish_event(
                    self.event_pub.as_ref(),
                    DomainEvent::PlatformTokenRefreshFailed {
                        user_id: account.user_id.clone(),
                        platform_account_id: account.id.clone(),
                        reason: "token refresh failed".to_string(),
                        occurred_at: chrono::Utc::now(),
                    },
                )
                .await;
                return Err(e);
            }
        };

        account.update_tokens(
            &tokens.access_token,
            &tokens.refresh_token,
            tokens.expires_at,
        )?;
        self.platform_repo.update(&account).await?;

        publish_event(
            self.event_pub.as_ref(),
            DomainEvent::PlatformTokenRefreshed {
                user_id: account.user_id.clone(),
                platform_account_id: account.id.clone(),
                platform: account.platform,
                occurred_at: chrono::Utc::now(),
            },
        )
        .await;

        Ok(RefreshPlatformTokenOutput { account })
    }
}
