use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

use super::{call_metadata, error_response, AppState};
use crate::adapter::grpc::interceptor::methods;
use crate::adapter::grpc::user_grpc::{
    CreateUserRequest, DeleteUserRequest, GetUserByIdRequest, GetUserByUsernameRequest,
    UpdateUserRequest,
};

pub async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateUserRequest>,
) -> impl IntoResponse {
    let meta = call_metadata(methods::USER_CREATE, &headers);
    let svc = state.user_svc.clone();
    match state
        .chain
        .call(&meta, req, |req, _ctx| async move {
            svc.create_user(req).await
        })
        .await
    {
        Ok(user) => (
            StatusCode::CREATED,
            Json(serde_json::to_value(user).unwrap()),
        )
            .into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

pub async fn get_user_by_id(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let meta = call_metadata(methods::USER_GET_BY_ID, &headers);
    let svc = state.user_svc.clone();
    let req = GetUserByIdRequest { user_id: id };
    match state
        .chain
        .call(&meta, req, |req, _ctx| async move {
            svc.get_user_by_id(req).await
        })
        .await
    {
        Ok(user) => (StatusCode::OK, Json(serde_json::to_value(user).unwrap())).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

pub async fn get_user_by_username(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> impl IntoResponse {
    let meta = call_metadata(methods::USER_GET_BY_USERNAME, &headers);
    let svc = state.user_svc.clone();
    let req = GetUserByUsernameRequest { username };
    match state
        .chain
        .call(&meta, req, |req, _ctx| async move {
            svc.get_user_by_username(req).await
        })
        .await
    {
        Ok(user) => (StatusCode::OK, Json(serde_json::to_value(user).unwrap())).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

/// ボディの user_id はパスパラメータで上書きされる。
pub async fn update_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(mut req): Json<UpdateUserRequest>,
) -> impl IntoResponse {
    req.user_id = id;
    let meta = call_metadata(methods::USER_UPDATE, &headers);
    let svc = state.user_svc.clone();
    match state
        .chain
        .call(&meta, req, |req, _ctx| async move {
            svc.update_user(req).await
        })
        .await
    {
        Ok(user) => (StatusCode::OK, Json(serde_json::to_value(user).unwrap())).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

pub async fn delete_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let meta = call_metadata(methods::USER_DELETE, &headers);
    let svc = state.user_svc.clone();
    let req = DeleteUserRequest { user_id: id };
    match state
        .chain
        .call(&meta, req, |req, _ctx| async move {
            svc.delete_user(req).await
        })
        .await
    {
        Ok(resp) => (StatusCode::OK, Json(serde_json::to_value(resp).unwrap())).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}
