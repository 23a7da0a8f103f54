pub mod auth_grpc;
pub mod interceptor;
pub mod platform_grpc;
pub mod user_grpc;

pub use auth_grpc::AuthGrpcService;
pub use interceptor::{CallContext, CallMetadata, InterceptorChain, RpcRequest};
pub use platform_grpc::PlatformGrpcService;
pub use user_grpc::UserGrpcService;

use crate::error::AuthError;

/// GrpcError は gRPC ステータスコードと 1:1 に対応するアダプタ層のエラー。
/// ドメインエラーはここで一度だけワイヤ上の表現に変換される。
#[derive(Debug, thiserror::Error)]
pub enum GrpcError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("internal: {0}")]
    Internal(String),
}

impl GrpcError {
    /// ロギングインターセプタ用のコード名。
    pub fn code_str(&self) -> &'static str {
        match self {
            GrpcError::InvalidArgument(_) => "InvalidArgument",
            GrpcError::Unauthenticated(_) => "Unauthenticated",
            GrpcError::PermissionDenied(_) => "PermissionDenied",
            GrpcError::NotFound(_) => "NotFound",
            GrpcError::AlreadyExists(_) => "AlreadyExists",
            GrpcError::ResourceExhausted(_) => "ResourceExhausted",
            GrpcError::Internal(_) => "Internal",
        }
    }
}

impl From<AuthError> for GrpcError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidInput(msg) => GrpcError::InvalidArgument(msg),
            AuthError::InvalidCredentials => {
                GrpcError::Unauthenticated("invalid credentials".to_string())
            }
            AuthError::InvalidToken(msg) => GrpcError::Unauthenticated(msg),
            AuthError::TokenBlacklisted => {
                GrpcError::PermissionDenied("token blacklisted".to_string())
            }
            AuthError::UserNotActive(id) => {
                GrpcError::PermissionDenied(format!("user not active: {}", id))
            }
            AuthError::UserNotFound(id) => GrpcError::NotFound(format!("user not found: {}", id)),
            AuthError::UserAlreadyExists(name) => {
                GrpcError::AlreadyExists(format!("user already exists: {}", name))
            }
            AuthError::PlatformAccountNotFound(id) => {
                GrpcError::NotFound(format!("platform account not found: {}", id))
            }
            AuthError::RateLimited(msg) => GrpcError::ResourceExhausted(msg),
            AuthError::Internal(msg) => GrpcError::Internal(msg),
        }
    }
}

impl From<GrpcError> for tonic::Status {
    fn from(e: GrpcError) -> Self {
        match e {
            GrpcError::InvalidArgument(msg) => tonic::Status::invalid_argument(msg),
            GrpcError::Unauthenticated(msg) => tonic::Status::unauthenticated(msg),
            GrpcError::PermissionDenied(msg) => tonic::Status::permission_denied(msg),
            GrpcError::NotFound(msg) => tonic::Status::not_found(msg),
            GrpcError::AlreadyExists(msg) => tonic::Status::already_exists(msg),
            GrpcError::ResourceExhausted(msg) => tonic::Status::resource_exhausted(msg),
            GrpcError::Internal(msg) => tonic::Status::internal(msg),
        }
    }
}
