use std::sync::Arc;

use crate::domain::entity::user::User;
use crate::domain::repository::UserRepository;
use crate::error::AuthError;

#[derive(Debug, Clone)]
pub struct GetUserInput {
    pub id: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GetUserOutput {
    pub user: User,
}

/// GetUserUseCase はユーザーを ID またはユーザー名で取得する (read-through)。
pub struct GetUserUseCase {
    user_repo: Arc<dyn UserRepository>,
}

impl GetUserUseCase {
    pub fn new(user_repo: Arc<dyn UserRepository>) -> Self {
        Self { user_repo }
    }

    pub async fn execute(&self, input: &GetUserInput) -> Result<GetUserOutput, AuthError> {
        let user = match (&input.id, &input.username) {
            (Some(id), _) if !id.is_empty() => self
                .user_repo
                .find_by_id(id)
                .await?
                .ok_or_else(|| AuthError::UserNotFound(id.clone()))?,
            (_, Some(username)) if !username.is_empty() => self
                .user_repo
                .find_by_username(username)
                .await?
                .ok_or_else(|| AuthError::UserNotFound(username.clone()))?,
            _ => {
                return Err(AuthError::InvalidInput(
                    "user id or username is required".to_string(),
                ))
            }
        };

        Ok(GetUserOutput { user })
    }
}
