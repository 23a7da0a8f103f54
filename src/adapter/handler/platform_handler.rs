use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

use super::{call_metadata, error_response, AppState};
use crate::adapter::grpc::interceptor::methods;
use crate::adapter::grpc::platform_grpc::{
    ConnectPlatformRequest, DisconnectPlatformRequest, RefreshPlatformTokenRequest,
};

pub async fn connect_platform(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ConnectPlatformRequest>,
) -> impl IntoResponse {
    let meta = call_metadata(methods::PLATFORM_CONNECT, &headers);
    let svc = state.platform_svc.clone();
    match state
        .chain
        .call(&meta, req, |req, _ctx| async move {
            svc.connect_platform(req).await
        })
        .await
    {
        Ok(account) => (
            StatusCode::CREATED,
            Json(serde_json::to_value(account).unwrap()),
        )
            .into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

pub async fn refresh_platform_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let meta = call_metadata(methods::PLATFORM_REFRESH, &headers);
    let svc = state.platform_svc.clone();
    let req = RefreshPlatformTokenRequest {
        platform_account_id: id,
    };
    match state
        .chain
        .call(&meta, req, |req, _ctx| async move {
            svc.refresh_platform_token(req).await
        })
        .await
    {
        Ok(account) => {
            (StatusCode::OK, Json(serde_json::to_value(account).unwrap())).into_response()
        }
        Err(e) => error_response(e).into_response(),
    }
}

pub async fn disconnect_platform(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let meta = call_metadata(methods::PLATFORM_DISCONNECT, &headers);
    let svc = state.platform_svc.clone();
    let req = DisconnectPlatformRequest {
        platform_account_id: id,
    };
    match state
        .chain
        .call(&meta, req, |req, _ctx| async move {
            svc.disconnect_platform(req).await
        })
        .await
    {
        Ok(resp) => (StatusCode::OK, Json(serde_json::to_value(resp).unwrap())).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}
