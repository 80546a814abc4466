//! Place handlers, nested under their city for listing and creation

use super::{dicts, fetch, json_object, require, ApiError, ApiResult, Attrs};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use hbnb_core::Kind;
use serde_json::Value;

/// Ownership and links only change through their own routes
const PROTECTED: &[&str] = &["user_id", "city_id", "amenity_ids"];

pub async fn list_in_city(
    State(state): State<AppState>,
    Path(city_id): Path<String>,
) -> ApiResult<Json<Vec<Attrs>>> {
    fetch(state.storage.as_ref(), Kind::City, &city_id).await?;
    let places = state.storage.places_of(&city_id).await?;
    Ok(dicts(places))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Attrs>> {
    super::show(&state, Kind::Place, &id).await
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    super::remove(&state, Kind::Place, &id).await
}

pub async fn create(
    State(state): State<AppState>,
    Path(city_id): Path<String>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Attrs>)> {
    fetch(state.storage.as_ref(), Kind::City, &city_id).await?;
    let mut attrs = json_object(&body)?;
    require(&attrs, "user_id")?;
    let user_id = match attrs.get("user_id") {
        Some(Value::String(id)) => id.clone(),
        _ => return Err(ApiError::NotFound),
    };
    fetch(state.storage.as_ref(), Kind::User, &user_id).await?;
    require(&attrs, "name")?;

    attrs.remove("amenity_ids");
    attrs.insert("city_id".to_string(), Value::String(city_id));
    super::create(&state, Kind::Place, attrs).await
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Attrs>> {
    super::update(&state, Kind::Place, &id, &body, PROTECTED).await
}
