use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

use super::{call_metadata, error_response, AppState};
use crate::adapter::grpc::auth_grpc::{
    BlacklistTokenRequest, LoginRequest, RefreshTokenRequest, ValidateTokenRequest,
};
use crate::adapter::grpc::interceptor::methods;

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    let meta = call_metadata(methods::AUTH_LOGIN, &headers);
    let svc = state.auth_svc.clone();
    match state
        .chain
        .call(&meta, req, |req, _ctx| async move { svc.login(req).await })
        .await
    {
        Ok(resp) => (StatusCode::OK, Json(serde_json::to_value(resp).unwrap())).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

pub async fn validate_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ValidateTokenRequest>,
) -> impl IntoResponse {
    let meta = call_metadata(methods::AUTH_VALIDATE_TOKEN, &headers);
    let svc = state.auth_svc.clone();
    match state
        .chain
        .call(&meta, req, |req, _ctx| async move {
            svc.validate_token(req).await
        })
        .await
    {
        Ok(resp) => (StatusCode::OK, Json(serde_json::to_value(resp).unwrap())).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

pub async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RefreshTokenRequest>,
) -> impl IntoResponse {
    let meta = call_metadata(methods::AUTH_REFRESH_TOKEN, &headers);
    let svc = state.auth_svc.clone();
    match state
        .chain
        .call(&meta, req, |req, _ctx| async move {
            svc.refresh_token(req).await
        })
        .await
    {
        Ok(resp) => (StatusCode::OK, Json(serde_json::to_value(resp).unwrap())).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

pub async fn blacklist_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<BlacklistTokenRequest>,
) -> impl IntoResponse {
    let meta = call_metadata(methods::AUTH_BLACKLIST_TOKEN, &headers);
    let svc = state.auth_svc.clone();
    match state
        .chain
        .call(&meta, req, |req, _ctx| async move {
            svc.blacklist_token(req).await
        })
        .await
    {
        Ok(resp) => (StatusCode::OK, Json(serde_json::to_value(resp).unwrap())).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}
