//! User handlers
//!
//! Passwords arrive in plaintext and are hashed before storage. Responses
//! never include the hash.

use super::{json_object, require, ApiResult, Attrs};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use hbnb_core::Kind;
use serde_json::Value;

const PROTECTED: &[&str] = &["email"];

pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Attrs>>> {
    super::list(&state, Kind::User).await
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Attrs>> {
    super::show(&state, Kind::User, &id).await
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    super::remove(&state, Kind::User, &id).await
}

pub async fn create(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Attrs>)> {
    let attrs = json_object(&body)?;
    require(&attrs, "email")?;
    require(&attrs, "password")?;
    super::create(&state, Kind::User, attrs).await
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Attrs>> {
    super::update(&state, Kind::User, &id, &body, PROTECTED).await
}
