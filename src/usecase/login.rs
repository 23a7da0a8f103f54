use std::sync::Arc;

use crate::domain::entity::event::DomainEvent;
use crate::domain::entity::password::Password;
use crate::domain::entity::token::TokenPair;
use crate::domain::repository::UserRepository;
use crate::error::AuthError;
use crate::infrastructure::kafka_producer::EventPublisher;
use crate::infrastructure::token_codec::JwtTokenCodec;
use crate::usecase::publish_event;

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoginOutput {
    pub token_pair: TokenPair,
}

/// LoginUseCase は資格情報を検証してトークンペアを発行する。
/// ユーザー不存在とパスワード不一致は同じ InvalidCredentials を返し、
/// アカウントの存在を漏らさない。
pub struct LoginUseCase {
    user_repo: Arc<dyn UserRepository>,
    codec: Arc<JwtTokenCodec>,
    event_pub: Arc<dyn EventPublisher>,
}

impl LoginUseCase {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        codec: Arc<JwtTokenCodec>,
        event_pub: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            user_repo,
            codec,
            event_pub,
        }
    }

    pub async fn execute(&self, input: &LoginInput) -> Result<LoginOutput, AuthError> {
        if input.username.is_empty() || input.password.is_empty() {
            publish_event(
                self.event_pub.as_ref(),
                DomainEvent::login_failed("", &input.username, "empty username or password"),
            )
            .await;
            return Err(AuthError::InvalidCredentials);
        }

        let user = self.user_repo.find_by_username(&input.username).await?;
        let Some(mut user) = user else {
            publish_event(
                self.event_pub.as_ref(),
                DomainEvent::login_failed("", &input.username, "user not found"),
            )
            .await;
            return Err(AuthError::InvalidCredentials);
        };

        if !user.is_active() {
            publish_event(
                self.event_pub.as_ref(),
                DomainEvent::login_failed(&user.id, &input.username, "user not active"),
            )
            .await;
            return Err(AuthError::UserNotActive(user.id.clone()));
        }

        // 保存済みハッシュが壊れているのはデータ不整合であり内部エラー
        let password = Password::from_hash(&user.password_hash)
            .map_err(|e| AuthError::Internal(format!("stored password hash invalid: {}", e)))?;
        if !password.verify(&input.password)? {
            publish_event(
                self.event_pub.as_ref(),
                DomainEvent::login_failed(&user.id, &input.username, "invalid password"),
            )
            .await;
            return Err(AuthError::InvalidCredentials);
        }

        let token_pair = self.codec.issue_pair(&user.id, &user.roles)?;

        user.record_login();
        self.user_repo.update(&user).await?;

        publish_event(
            self.event_pub.as_ref(),
            DomainEvent::login_succeeded(&user.id, &user.username),
        )
        .await;

        Ok(LoginOutput { token_pair })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::user::{User, UserStatus};
    use crate::domain::repository::user_repository::MockUserRepository;
    use crate::infrastructure::kafka_producer::MockEventPublisher;
    use crate::infrastructure::token_codec::{DEFAULT_ACCESS_TTL, DEFAULT_REFRESH_TTL};

    const TEST_PRIVATE_PEM: &str = include_str!("../../tests/fixtures/test_rsa_private.pem");
    const TEST_PUBLIC_PEM: &str = include_str!("../../tests/fixtures/test_rsa_public.pem");

    fn make_codec() -> Arc<JwtTokenCodec> {
        Arc::new(
            JwtTokenCodec::from_pem(
                TEST_PRIVATE_PEM.as_bytes(),
                TEST_PUBLIC_PEM.as_bytes(),
                DEFAULT_ACCESS_TTL,
                DEFAULT_REFRESH_TTL,
            )
            .unwrap(),
        )
    }

    fn make_user(status: UserStatus) -> User {
        let hash = Password::hash("StrongP@ssw0rd!").unwrap();
        let mut user = User::new(
            "user-uuid-1",
            "alice",
            "alice@example.com",
            hash.as_str(),
        )
        .unwrap();
        user.status = status;
        user
    }

    fn expect_login_failed(mock: &mut MockEventPublisher, expected_reason: &'static str) {
        mock.expect_publish()
            .withf(move |e| {
                matches!(e, DomainEvent::LoginFailed { reason, .. } if reason == expected_reason)
            })
            .once()
            .returning(|_| Ok(()));
    }

    #[tokio::test]
    async fn test_login_success() {
        let user = make_user(UserStatus::Active);
        let returned = user.clone();

        let mut user_repo = MockUserRepository::new();
        user_repo
            .expect_find_by_username()
            .withf(|u| u == "alice")
            .once()
            .returning(move |_| Ok(Some(returned.clone())));
        // last_login_at が記録されて更新される
        user_repo
            .expect_update()
            .withf(|u| u.last_login_at.is_some())
            .once()
            .returning(|_| Ok(()));

        let mut event_pub = MockEventPublisher::new();
        event_pub
            .expect_publish()
            .withf(|e| matches!(e, DomainEvent::LoginSucceeded { user_id, .. } if user_id == "user-uuid-1"))
            .once()
            .returning(|_| Ok(()));

        let uc = LoginUseCase::new(Arc::new(user_repo), make_codec(), Arc::new(event_pub));
        let output = uc
            .execute(&LoginInput {
                username: "alice".to_string(),
                password: "StrongP@ssw0rd!".to_string(),
            })
            .await
            .unwrap();

        assert!(!output.token_pair.access_token.is_empty());
        assert!(!output.token_pair.refresh_token.is_empty());
        assert!(output.token_pair.expires_at > chrono::Utc::now());
    }

    #[tokio::test]
    async fn test_login_empty_credentials() {
        let user_repo = MockUserRepository::new();
        let mut event_pub = MockEventPublisher::new();
        expect_login_failed(&mut event_pub, "empty username or password");

        let uc = LoginUseCase::new(Arc::new(user_repo), make_codec(), Arc::new(event_pub));
        let result = uc
            .execute(&LoginInput {
                username: "alice".to_string(),
                password: String::new(),
            })
            .await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_unknown_user_is_indistinguishable() {
        let mut user_repo = MockUserRepository::new();
        user_repo
            .expect_find_by_username()
            .once()
            .returning(|_| Ok(None));

        let mut event_pub = MockEventPublisher::new();
        expect_login_failed(&mut event_pub, "user not found");

        let uc = LoginUseCase::new(Arc::new(user_repo), make_codec(), Arc::new(event_pub));
        let result = uc
            .execute(&LoginInput {
                username: "ghost".to_string(),
                password: "whatever-password".to_string(),
            })
            .await;
        // 不正パスワードと同じエラーコード
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_suspended_user_blocked() {
        let user = make_user(UserStatus::Suspended);
        let returned = user.clone();

        let mut user_repo = MockUserRepository::new();
        user_repo
            .expect_find_by_username()
            .once()
            .returning(move |_| Ok(Some(returned.clone())));

        let mut event_pub = MockEventPublisher::new();
        expect_login_failed(&mut event_pub, "user not active");

        let uc = LoginUseCase::new(Arc::new(user_repo), make_codec(), Arc::new(event_pub));
        let result = uc
            .execute(&LoginInput {
                username: "alice".to_string(),
                password: "StrongP@ssw0rd!".to_string(),
            })
            .await;
        assert!(matches!(result, Err(AuthError::UserNotActive(_))));
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let user = make_user(UserStatus::Active);
        let returned = user.clone();

        let mut user_repo = MockUserRepository::new();
        user_repo
            .expect_find_by_username()
            .once()
            .returning(move |_| Ok(Some(returned.clone())));
        user_repo.expect_update().never();

        let mut event_pub = MockEventPublisher::new();
        expect_login_failed(&mut event_pub, "invalid password");

        let uc = LoginUseCase::new(Arc::new(user_repo), make_codec(), Arc::new(event_pub));
        let result = uc
            .execute(&LoginInput {
                username: "alice".to_string(),
                password: "wrong-password!".to_string(),
            })
            .await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_event_failure_does_not_fail_login() {
        let user = make_user(UserStatus::Active);
        let returned = user.clone();

        let mut user_repo = MockUserRepository::new();
        user_repo
            .expect_find_by_username()
            .once()
            .returning(move |_| Ok(Some(returned.clone())));
        user_repo.expect_update().once().returning(|_| Ok(()));

        let mut event_pub = MockEventPublisher::new();
        event_pub
            .expect_publish()
            .once()
            .returning(|_| Err(anyhow::anyhow!("broker down")));

        let uc = LoginUseCase::new(Arc::new(user_repo), make_codec(), Arc::new(event_pub));
        let result = uc
            .execute(&LoginInput {
                username: "alice".to_string(),
                password: "StrongP@ssw0rd!".to_string(),
            })
            .await;
        assert!(result.is_ok());
    }
}
