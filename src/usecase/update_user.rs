use std::sync::Arc;

use crate::domain::entity::email::Email;
use crate::domain::entity::event::DomainEvent;
use crate::domain::entity::password::Password;
use crate::domain::entity::user::{User, UserStatus};
use crate::domain::repository::UserRepository;
use crate::error::AuthError;
use crate::infrastructure::kafka_producer::EventPublisher;
use crate::usecase::publish_event;

#[derive(Debug, Clone, Default)]
pub struct UpdateUserInput {
    pub id: String,
    pub email: Option<String>,
    pub password: Option<String>,
    pub status: Option<String>,
    /// 指定された場合は役割集合を丸ごと置き換える。
    pub roles: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct UpdateUserOutput {
    pub user: User,
}

/// UpdateUserUseCase はユーザー属性を更新する。
/// 変更前後の {email, status, roles} スナップショットを UserUpdated
/// イベントに載せる (監査差分)。
pub struct UpdateUserUseCase {
    user_repo: Arc<dyn UserRepository>,
    event_pub: Arc<dyn EventPublisher>,
}

fn snapshot(user: &User) -> serde_json::Value {
    serde_json::json!({
        "email": user.email,
        "status": user.status.as_str(),
        "roles": user.roles,
    })
}

impl UpdateUserUseCase {
    pub fn new(user_repo: Arc<dyn UserRepository>, event_pub: Arc<dyn EventPublisher>) -> Self {
        Self {
            user_repo,
            event_pub,
        }
    }

    pub async fn execute(&self, input: &UpdateUserInput) -> Result<UpdateUserOutput, AuthError> {
        if input.id.is_empty() {
            return Err(AuthError::InvalidInput("user id is required".to_string()));
        }

        let mut user = self
            .user_repo
            .find_by_id(&input.id)
            .await?
            .ok_or_else(|| AuthError::UserNotFound(input.id.clone()))?;

        let old_values = snapshot(&user);

        if let Some(ref email) = input.email {
            let email = Email::new(email)?;
            user.update_email(email.address())?;
        }
        if let Some(ref password) = input.password {
            let password = Password::hash(password)?;
            user.update_password(password.as_str())?;
        }
        if let Some(ref status) = input.status {
            let status = UserStatus::parse(status)?;
            user.update_status(status)?;
        }
        if let Some(ref roles) = input.roles {
            user.replace_roles(roles);
        }

        self.user_repo.update(&user).await?;

        publish_event(
            self.event_pub.as_ref(),
            DomainEvent::UserUpdated {
                user_id: user.id.clone(),
                old_values,
                new_values: snapshot(&user),
                occurred_at: chrono::Utc::now(),
            },
        )
        .await;

        Ok(UpdateUserOutput { user })
    }
}
