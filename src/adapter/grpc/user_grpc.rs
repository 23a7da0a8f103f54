use std::sync::Arc;

use super::interceptor::RpcRequest;
use super::GrpcError;
use crate::domain::entity::user::User;
use crate::usecase::create_user::{CreateUserInput, CreateUserUseCase};
use crate::usecase::delete_user::DeleteUserUseCase;
use crate::usecase::get_user::{GetUserInput, GetUserUseCase};
use crate::usecase::update_user::{UpdateUserInput, UpdateUserUseCase};

// --- Request/Response 型 ---

#[derive(Debug, Clone, serde::Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RpcRequest for CreateUserRequest {
    fn validate(&self) -> Result<(), String> {
        if self.username.is_empty() || self.email.is_empty() || self.password.is_empty() {
            return Err("username, email, and password are required".to_string());
        }
        Ok(())
    }

    /// 認証前サーフェスなので username でレートリミットする。
    fn pre_auth_identity(&self) -> Option<&str> {
        Some(&self.username)
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct GetUserByIdRequest {
    pub user_id: String,
}

impl RpcRequest for GetUserByIdRequest {
    fn validate(&self) -> Result<(), String> {
        if self.user_id.is_empty() {
            return Err("user_id is required".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct GetUserByUsernameRequest {
    pub username: String,
}

impl RpcRequest for GetUserByUsernameRequest {
    fn validate(&self) -> Result<(), String> {
        if self.username.is_empty() {
            return Err("username is required".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct UpdateUserRequest {
    pub user_id: String,
    pub email: Option<String>,
    pub password: Option<String>,
    pub status: Option<String>,
    pub roles: Option<Vec<String>>,
}

impl RpcRequest for UpdateUserRequest {
    fn validate(&self) -> Result<(), String> {
        if self.user_id.is_empty() {
            return Err("user_id is required".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct DeleteUserRequest {
    pub user_id: String,
}

impl RpcRequest for DeleteUserRequest {
    fn validate(&self) -> Result<(), String> {
        if self.user_id.is_empty() {
            return Err("user_id is required".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DeleteUserResponse {
    pub success: bool,
}

/// PbUser はワイヤ上のユーザー表現。パスワードハッシュは載せない。
#[derive(Debug, Clone, serde::Serialize)]
pub struct PbUser {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub status: String,
    pub subscription_tier: String,
    pub roles: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
    pub last_login_at: Option<String>,
}

impl From<&User> for PbUser {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            status: user.status.as_str().to_string(),
            subscription_tier: user.subscription_tier.clone(),
            roles: user.roles.clone(),
            created_at: user.created_at.to_rfc3339(),
            updated_at: user.updated_at.to_rfc3339(),
            last_login_at: user.last_login_at.map(|t| t.to_rfc3339()),
        }
    }
}

// --- UserGrpcService ---

/// UserGrpcService はユーザー管理 RPC のアダプタ。
pub struct UserGrpcService {
    create_uc: Arc<CreateUserUseCase>,
    get_uc: Arc<GetUserUseCase>,
    update_uc: Arc<UpdateUserUseCase>,
    delete_uc: Arc<DeleteUserUseCase>,
}

impl UserGrpcService {
    pub fn new(
        create_uc: Arc<CreateUserUseCase>,
        get_uc: Arc<GetUserUseCase>,
        update_uc: Arc<UpdateUserUseCase>,
        delete_uc: Arc<DeleteUserUseCase>,
    ) -> Self {
        Self {
            create_uc,
            get_uc,
            update_uc,
            delete_uc,
        }
    }

    pub async fn create_user(&self, req: CreateUserRequest) -> Result<PbUser, GrpcError> {
        let input = CreateUserInput {
            username: req.username,
            email: req.email,
            password: req.password,
        };
        let output = self.create_uc.execute(&input).await?;
        Ok(PbUser::from(&output.user))
    }

    pub async fn get_user_by_id(&self, req: GetUserByIdRequest) -> Result<PbUser, GrpcError> {
        let input = GetUserInput {
            id: Some(req.user_id),
            username: None,
        };
        let output = self.get_uc.execute(&input).await?;
        Ok(PbUser::from(&output.user))
    }

    pub async fn get_user_by_username(
        &self,
        req: GetUserByUsernameRequest,
    ) -> Result<PbUser, GrpcError> {
        let input = GetUserInput {
            id: None,
            username: Some(req.username),
        };
        let output = self.get_uc.execute(&input).await?;
        Ok(PbUser::from(&output.user))
    }

    pub async fn update_user(&self, req: UpdateUserRequest) -> Result<PbUser, GrpcError> {
        let input = UpdateUserInput {
            id: req.user_id,
            email: req.email,
            password: req.password,
            status: req.status,
            roles: req.roles,
        };
        let output = self.update_uc.execute(&input).await?;
        Ok(PbUser::from(&output.user))
    }

    pub async fn delete_user(&self, req: DeleteUserRequest) -> Result<DeleteUserResponse, GrpcError> {
        self.delete_uc.execute(&req.user_id).await?;
        Ok(DeleteUserResponse { success: true })
    }
}
