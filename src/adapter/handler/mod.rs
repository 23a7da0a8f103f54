pub mod auth_handler;
pub mod health;
pub mod platform_handler;
pub mod user_handler;

use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};

use super::grpc::interceptor::{CallMetadata, InterceptorChain};
use super::grpc::{AuthGrpcService, GrpcError, PlatformGrpcService, UserGrpcService};

/// AppState は REST ハンドラが共有するアプリケーション状態。
#[derive(Clone)]
pub struct AppState {
    pub auth_svc: Arc<AuthGrpcService>,
    pub user_svc: Arc<UserGrpcService>,
    pub platform_svc: Arc<PlatformGrpcService>,
    pub chain: Arc<InterceptorChain>,
}

/// リクエストヘッダからインターセプタ用の CallMetadata を組み立てる。
pub(crate) fn call_metadata(full_method: &str, headers: &HeaderMap) -> CallMetadata {
    let mut meta = CallMetadata::new(
        full_method,
        headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string()),
    );
    meta.ip_address = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    meta.user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    meta
}

/// GrpcError を HTTP ステータスと JSON エラーボディへ変換する。
pub(crate) fn error_response(err: GrpcError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match &err {
        GrpcError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        GrpcError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
        GrpcError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        GrpcError::NotFound(_) => StatusCode::NOT_FOUND,
        GrpcError::AlreadyExists(_) => StatusCode::CONFLICT,
        GrpcError::ResourceExhausted(_) => StatusCode::TOO_MANY_REQUESTS,
        GrpcError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(serde_json::json!({
            "error": {
                "code": err.code_str(),
                "message": err.to_string(),
            }
        })),
    )
}

/// REST ルーター。すべての API ルートがインターセプタチェーンを通る。
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/api/v1/auth/login", post(auth_handler::login))
        .route("/api/v1/auth/validate", post(auth_handler::validate_token))
        .route("/api/v1/auth/refresh", post(auth_handler::refresh_token))
        .route("/api/v1/auth/blacklist", post(auth_handler::blacklist_token))
        .route("/api/v1/users", post(user_handler::create_user))
        .route(
            "/api/v1/users/:id",
            get(user_handler::get_user_by_id)
                .put(user_handler::update_user)
                .delete(user_handler::delete_user),
        )
        .route(
            "/api/v1/users/username/:username",
            get(user_handler::get_user_by_username),
        )
        .route(
            "/api/v1/platforms/connect",
            post(platform_handler::connect_platform),
        )
        .route(
            "/api/v1/platforms/:id/refresh",
            post(platform_handler::refresh_platform_token),
        )
        .route(
            "/api/v1/platforms/:id",
            axum::routing::delete(platform_handler::disconnect_platform),
        )
        .with_state(state)
}
