use std::sync::Arc;

use crate::domain::entity::event::DomainEvent;
use crate::domain::entity::user::UserStatus;
use crate::domain::repository::UserRepository;
use crate::error::AuthError;
use crate::infrastructure::kafka_producer::EventPublisher;
use crate::usecase::publish_event;

/// DeleteUserUseCase はユーザーを論理削除する (status → DELETED)。
/// 行は残るため、同じユーザー名での再作成は以後も失敗する。
pub struct DeleteUserUseCase {
    user_repo: Arc<dyn UserRepository>,
    event_pub: Arc<dyn EventPublisher>,
}

impl DeleteUserUseCase {
    pub fn new(user_repo: Arc<dyn UserRepository>, event_pub: Arc<dyn EventPublisher>) -> Self {
        Self {
            user_repo,
            event_pub,
        }
    }

    pub async fn execute(&self, id: &str) -> Result<(), AuthError> {
        if id.is_empty() {
            return Err(AuthError::InvalidInput("user id is required".to_string()));
        }

        let mut user = self
            .user_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AuthError::UserNotFound(id.to_string()))?;

        user.update_status(UserStatus::Deleted)?;
        self.user_repo.update(&user).await?;

        publish_event(
            self.event_pub.as_ref(),
            DomainEvent::UserDeleted {
                user_id: user.id.clone(),
                occurred_at: chrono::Utc::now(),
            },
        )
        .await;

        Ok(())
    }
}
