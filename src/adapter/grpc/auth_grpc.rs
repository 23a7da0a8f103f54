use std::sync::Arc;

use super::interceptor::RpcRequest;
use super::GrpcError;
use crate::usecase::blacklist_token::{BlacklistTokenInput, BlacklistTokenUseCase};
use crate::usecase::login::{LoginInput, LoginUseCase};
use crate::usecase::refresh_token::RefreshTokenUseCase;
use crate::usecase::validate_token::ValidateTokenUseCase;

// --- Request/Response 型 ---

#[derive(Debug, Clone, serde::Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl RpcRequest for LoginRequest {
    fn validate(&self) -> Result<(), String> {
        if self.username.is_empty() || self.password.is_empty() {
            return Err("username and password are required".to_string());
        }
        Ok(())
    }

    /// 認証前サーフェスなので username でレートリミットする。
    fn pre_auth_identity(&self) -> Option<&str> {
        Some(&self.username)
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ValidateTokenRequest {
    pub access_token: String,
}

impl RpcRequest for ValidateTokenRequest {
    fn validate(&self) -> Result<(), String> {
        if self.access_token.is_empty() {
            return Err("access_token is required".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ValidateTokenResponse {
    pub valid: bool,
    pub user_id: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

impl RpcRequest for RefreshTokenRequest {
    fn validate(&self) -> Result<(), String> {
        if self.refresh_token.is_empty() {
            return Err("refresh_token is required".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RefreshTokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct BlacklistTokenRequest {
    pub token: String,
    pub user_id: String,
    pub reason: String,
}

impl RpcRequest for BlacklistTokenRequest {
    fn validate(&self) -> Result<(), String> {
        if self.token.is_empty() {
            return Err("token is required".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct BlacklistTokenResponse {
    pub success: bool,
}

// --- AuthGrpcService ---

/// AuthGrpcService は認証系 RPC のアダプタ。
/// ドメイン要求への変換・ユースケースへの委譲・エラーのステータス変換を行う。
pub struct AuthGrpcService {
    login_uc: Arc<LoginUseCase>,
    validate_uc: Arc<ValidateTokenUseCase>,
    refresh_uc: Arc<RefreshTokenUseCase>,
    blacklist_uc: Arc<BlacklistTokenUseCase>,
}

impl AuthGrpcService {
    pub fn new(
        login_uc: Arc<LoginUseCase>,
        validate_uc: Arc<ValidateTokenUseCase>,
        refresh_uc: Arc<RefreshTokenUseCase>,
        blacklist_uc: Arc<BlacklistTokenUseCase>,
    ) -> Self {
        Self {
            login_uc,
            validate_uc,
            refresh_uc,
            blacklist_uc,
        }
    }

    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse, GrpcError> {
        let input = LoginInput {
            username: req.username,
            password: req.password,
        };
        let output = self.login_uc.execute(&input).await?;
        Ok(LoginResponse {
            access_token: output.token_pair.access_token,
            refresh_token: output.token_pair.refresh_token,
            expires_at: output.token_pair.expires_at.to_rfc3339(),
        })
    }

    pub async fn validate_token(
        &self,
        req: ValidateTokenRequest,
    ) -> Result<ValidateTokenResponse, GrpcError> {
        let output = self.validate_uc.execute(&req.access_token).await?;
        Ok(ValidateTokenResponse {
            valid: true,
            user_id: output.user_id,
            roles: output.roles,
        })
    }

    pub async fn refresh_token(
        &self,
        req: RefreshTokenRequest,
    ) -> Result<RefreshTokenResponse, GrpcError> {
        let output = self.refresh_uc.execute(&req.refresh_token).await?;
        Ok(RefreshTokenResponse {
            access_token: output.token_pair.access_token,
            refresh_token: output.token_pair.refresh_token,
            expires_at: output.token_pair.expires_at.to_rfc3339(),
        })
    }

    pub async fn blacklist_token(
        &self,
        req: BlacklistTokenRequest,
    ) -> Result<BlacklistTokenResponse, GrpcError> {
        let input = BlacklistTokenInput {
            token: req.token,
            user_id: req.user_id,
            reason: req.reason,
        };
        self.blacklist_uc.execute(&input).await?;
        Ok(BlacklistTokenResponse { success: true })
    }
}
