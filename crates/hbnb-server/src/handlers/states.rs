//! State handlers

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

pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Attrs>>> {
    super::list(&state, Kind::State).await
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Attrs>> {
    super::show(&state, Kind::State, &id).await
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    super::remove(&state, Kind::State, &id).await
}

pub async fn create(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Attrs>)> {
    let attrs = json_object(&body)?;
    require(&attrs, "name")?;
    super::create(&state, Kind::State, attrs).await
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Attrs>> {
    super::update(&state, Kind::State, &id, &body, &[]).await
}
