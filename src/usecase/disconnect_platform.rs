use std::sync::Arc;

use crate::domain::entity::event::DomainEvent;
use crate::domain::repository::{PlatformAccountRepository, UserRepository};
use crate::error::AuthError;
use crate::infrastructure::kafka_producer::EventPublisher;
use crate::usecase::publish_event;

/// DisconnectPlatformUseCase は連携アカウントを解除する。
/// [linked,*] → [unlinked] の遷移。ユーザーの論理削除と違い物理削除。
pub struct DisconnectPlatformUseCase {
    user_repo: Arc<dyn UserRepository>,
    platform_repo: Arc<dyn PlatformAccountRepository>,
    event_pub: Arc<dyn EventPublisher>,
}

impl DisconnectPlatformUseCase {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        platform_repo: Arc<dyn PlatformAccountRepository>,
        event_pub: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            user_repo,
            platform_repo,
            event_pub,
        }
    }

    pub async fn execute(&self, platform_account_id: &str) -> Result<(), AuthError> {
        let account = self
            .platform_repo
            .find_by_id(platform_account_id)
            .await?
            .ok_or_else(|| AuthError::PlatformAccountNotFound(platform_account_id.to_string()))?;

        let user = self.user_repo.find_by_id(&account.user_id).await?;
        if !user.map(|u| u.is_active()).unwrap_or(false) {
            return Err(AuthError::UserNotActive(account.user_id.clone()));
        }

        self.platform_repo.delete(platform_account_id).await?;

        publish_event(
            self.event_pub.as_ref(),
            DomainEvent::PlatformDisconnected {
                user_id: account.user_id.clone(),
                platform_account_id: account.id.clone(),
                platform: account.platform,
                occurred_at: chrono::Utc::now(),
            },
        )
        .await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::platform_account::{PlatformAccount, PlatformType};
    use crate::domain::entity::user::{User, UserStatus};
    use crate::domain::repository::platform_repository::MockPlatformAccountRepository;
    use crate::domain::repository::user_repository::MockUserRepository;
    use crate::infrastructure::kafka_producer::MockEventPublisher;
    use chrono::Utc;

    fn make_account() -> PlatformAccount {
        PlatformAccount::new(
            "pa-1",
            "user-1",
            PlatformType::Twitch,
            "twitch-123",
            "TwitchUser",
            "access",
            "refresh",
            Utc::now() + chrono::Duration::hours(1),
        )
        .unwrap()
    }

    fn make_user(status: UserStatus) -> User {
        let mut user = User::new(
            "user-1",
            "alice",
            "alice@example.com",
            "$argon2id$v=19$m=65536,t=3,p=1$c2FsdA$aGFzaA",
        )
        .unwrap();
        user.status = status;
        user
    }

    #[tokio::test]
    async fn test_disconnect_deletes_account() {
        let account = make_account();
        let mut platform_repo = MockPlatformAccountRepository::new();
        platform_repo
            .expect_find_by_id()
            .once()
            .returning(move |_| Ok(Some(account.clone())));
        platform_repo
            .expect_delete()
            .withf(|id| id == "pa-1")
            .once()
            .returning(|_| Ok(()));

        let user = make_user(UserStatus::Active);
        let mut user_repo = MockUserRepository::new();
        user_repo
            .expect_find_by_id()
            .once()
            .returning(move |_| Ok(Some(user.clone())));

        let mut event_pub = MockEventPublisher::new();
        event_pub
            .expect_publish()
            .withf(|e| {
                matches!(e, DomainEvent::PlatformDisconnected { platform_account_id, .. }
                    if platform_account_id == "pa-1")
            })
            .once()
            .returning(|_| Ok(()));

        let uc = DisconnectPlatformUseCase::new(
            Arc::new(user_repo),
            Arc::new(platform_repo),
            Arc::new(event_pub),
        );
        uc.execute("pa-1").await.unwrap();
    }

    #[tokio::test]
    async fn test_disconnect_missing_account() {
        let mut platform_repo = MockPlatformAccountRepository::new();
        platform_repo
            .expect_find_by_id()
            .once()
            .returning(|_| Ok(None));

        let uc = DisconnectPlatformUseCase::new(
            Arc::new(MockUserRepository::new()),
            Arc::new(platform_repo),
            Arc::new(MockEventPublisher::new()),
        );
        let result = uc.execute("ghost").await;
        assert!(matches!(result, Err(AuthError::PlatformAccountNotFound(_))));
    }

    #[tokio::test]
    async fn test_disconnect_inactive_owner() {
        let account = make_account();
        let mut platform_repo = MockPlatformAccountRepository::new();
        platform_repo
            .expect_find_by_id()
            .once()
            .returning(move |_| Ok(Some(account.clone())));
        platform_repo.expect_delete().never();

        let user = make_user(UserStatus::Deleted);
        let mut user_repo = MockUserRepository::new();
        user_repo
            .expect_find_by_id()
            .once()
            .returning(move |_| Ok(Some(user.clone())));

        let uc = DisconnectPlatformUseCase::new(
            Arc::new(user_repo),
            Arc::new(platform_repo),
            Arc::new(MockEventPublisher::new()),
        );
        let result = uc.execute("pa-1").await;
        assert!(matches!(result, Err(AuthError::UserNotActive(_))));
    }
}
