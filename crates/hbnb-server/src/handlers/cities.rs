//! City handlers, nested under their state for listing and creation

use super::{dicts, fetch, json_object, require, ApiResult, Attrs};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use hbnb_core::Kind;
use serde_json::Value;

const PROTECTED: &[&str] = &["state_id"];

pub async fn list_in_state(
    State(state): State<AppState>,
    Path(state_id): Path<String>,
) -> ApiResult<Json<Vec<Attrs>>> {
    fetch(state.storage.as_ref(), Kind::State, &state_id).await?;
    let cities = state.storage.cities_of(&state_id).await?;
    Ok(dicts(cities))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Attrs>> {
    super::show(&state, Kind::City, &id).await
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    super::remove(&state, Kind::City, &id).await
}

pub async fn create(
    State(state): State<AppState>,
    Path(state_id): Path<String>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Attrs>)> {
    fetch(state.storage.as_ref(), Kind::State, &state_id).await?;
    let mut attrs = json_object(&body)?;
    require(&attrs, "name")?;
    attrs.insert("state_id".to_string(), Value::String(state_id));
    super::create(&state, Kind::City, attrs).await
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Attrs>> {
    super::update(&state, Kind::City, &id, &body, PROTECTED).await
}
