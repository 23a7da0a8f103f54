use std::sync::Arc;

use uuid::Uuid;

use crate::domain::entity::email::Email;
use crate::domain::entity::event::DomainEvent;
use crate::domain::entity::password::Password;
use crate::domain::entity::user::User;
use crate::domain::repository::UserRepository;
use crate::error::AuthError;
use crate::infrastructure::kafka_producer::EventPublisher;
use crate::usecase::publish_event;

#[derive(Debug, Clone)]
pub struct CreateUserInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct CreateUserOutput {
    pub user: User,
}

/// CreateUserUseCase は新規ユーザーを登録する。
/// ユーザー名の重複確認はキャッシュを迂回して永続ストアに問い合わせる。
/// 論理削除済みのユーザー名も再利用できない。
pub struct CreateUserUseCase {
    user_repo: Arc<dyn UserRepository>,
    event_pub: Arc<dyn EventPublisher>,
}

impl CreateUserUseCase {
    pub fn new(user_repo: Arc<dyn UserRepository>, event_pub: Arc<dyn EventPublisher>) -> Self {
        Self {
            user_repo,
            event_pub,
        }
    }

    pub async fn execute(&self, input: &CreateUserInput) -> Result<CreateUserOutput, AuthError> {
        if input.username.is_empty() {
            return Err(AuthError::InvalidInput("username is required".to_string()));
        }
        let email = Email::new(&input.email)?;

        if self.user_repo.exists_by_username(&input.username).await? {
            return Err(AuthError::UserAlreadyExists(input.username.clone()));
        }

        let password = Password::hash(&input.password)?;
        let user = User::new(
            &Uuid::new_v4().to_string(),
            &input.username,
            email.address(),
            password.as_str(),
        )?;

        self.user_repo.insert(&user).await?;

        publish_event(
            self.event_pub.as_ref(),
            DomainEvent::UserCreated {
                user_id: user.id.clone(),
                username: user.username.clone(),
                occurred_at: chrono::Utc::now(),
            },
        )
        .await;

        Ok(CreateUserOutput { user })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::user::UserStatus;
    use crate::domain::repository::user_repository::MockUserRepository;
    use crate::infrastructure::kafka_producer::MockEventPublisher;

    fn make_input() -> CreateUserInput {
        CreateUserInput {
            username: "alice".to_string(),
            email: "Alice@Example.com".to_string(),
            password: "StrongP@ssw0rd!".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_user_success() {
        let mut user_repo = MockUserRepository::new();
        user_repo
            .expect_exists_by_username()
            .withf(|u| u == "alice")
            .once()
            .returning(|_| Ok(false));
        user_repo
            .expect_insert()
            .withf(|u| {
                u.username == "alice"
                    && u.email == "alice@example.com"
                    && u.status == UserStatus::Active
                    && u.subscription_tier == "FREE"
                    && u.roles == vec!["USER".to_string()]
                    && u.password_hash.starts_with("$argon2id$")
            })
            .once()
            .returning(|_| Ok(()));

        let mut event_pub = MockEventPublisher::new();
        event_pub
            .expect_publish()
            .withf(|e| matches!(e, DomainEvent::UserCreated { username, .. } if username == "alice"))
            .once()
            .returning(|_| Ok(()));

        let uc = CreateUserUseCase::new(Arc::new(user_repo), Arc::new(event_pub));
        let output = uc.execute(&make_input()).await.unwrap();

        assert!(!output.user.id.is_empty());
        // メールは小文字に正規化される
        assert_eq!(output.user.email, "alice@example.com");
        // 平文パスワードは保存されない
        assert_ne!(output.user.password_hash, "StrongP@ssw0rd!");
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let mut user_repo = MockUserRepository::new();
        user_repo
            .expect_exists_by_username()
            .once()
            .returning(|_| Ok(true));
        user_repo.expect_insert().never();

        let uc = CreateUserUseCase::new(Arc::new(user_repo), Arc::new(MockEventPublisher::new()));
        let result = uc.execute(&make_input()).await;
        assert!(matches!(result, Err(AuthError::UserAlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_invalid_email_rejected() {
        let uc = CreateUserUseCase::new(
            Arc::new(MockUserRepository::new()),
            Arc::new(MockEventPublisher::new()),
        );
        let result = uc
            .execute(&CreateUserInput {
                email: "not-an-email".to_string(),
                ..make_input()
            })
            .await;
        assert!(matches!(result, Err(AuthError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_weak_password_rejected() {
        let mut user_repo = MockUserRepository::new();
        user_repo
            .expect_exists_by_username()
            .once()
            .returning(|_| Ok(false));
        user_repo.expect_insert().never();

        let uc = CreateUserUseCase::new(Arc::new(user_repo), Arc::new(MockEventPublisher::new()));
        let result = uc
            .execute(&CreateUserInput {
                password: "short".to_string(),
                ..make_input()
            })
            .await;
        assert!(matches!(result, Err(AuthError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_empty_username_rejected() {
        let uc = CreateUserUseCase::new(
            Arc::new(MockUserRepository::new()),
            Arc::new(MockEventPublisher::new()),
        );
        let result = uc
            .execute(&CreateUserInput {
                username: String::new(),
                ..make_input()
            })
            .await;
        assert!(matches!(result, Err(AuthError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_insert_failure_publishes_nothing() {
        let mut user_repo = MockUserRepository::new();
        user_repo
            .expect_exists_by_username()
            .once()
            .returning(|_| Ok(false));
        user_repo
            .expect_insert()
            .once()
            .returning(|_| Err(AuthError::Internal("db down".to_string())));

        let mut event_pub = MockEventPublisher::new();
        event_pub.expect_publish().never();

        let uc = CreateUserUseCase::new(Arc::new(user_repo), Arc::new(event_pub));
        assert!(uc.execute(&make_input()).await.is_err());
    }
}
