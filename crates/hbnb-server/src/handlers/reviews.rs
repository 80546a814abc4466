//! Review handlers, nested under their place for listing and creation

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

const PROTECTED: &[&str] = &["user_id", "place_id"];

pub async fn list_for_place(
    State(state): State<AppState>,
    Path(place_id): Path<String>,
) -> ApiResult<Json<Vec<Attrs>>> {
    fetch(state.storage.as_ref(), Kind::Place, &place_id).await?;
    let reviews = state.storage.reviews_of(&place_id).await?;
    Ok(dicts(reviews))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Attrs>> {
    super::show(&state, Kind::Review, &id).await
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    super::remove(&state, Kind::Review, &id).await
}

pub async fn create(
    State(state): State<AppState>,
    Path(place_id): Path<String>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Attrs>)> {
    fetch(state.storage.as_ref(), Kind::Place, &place_id).await?;
    let mut attrs = json_object(&body)?;
    require(&attrs, "user_id")?;
    require(&attrs, "text")?;
    let user_id = match attrs.get("user_id") {
        Some(Value::String(id)) => id.clone(),
        _ => return Err(ApiError::NotFound),
    };
    fetch(state.storage.as_ref(), Kind::User, &user_id).await?;

    attrs.insert("place_id".to_string(), Value::String(place_id));
    super::create(&state, Kind::Review, attrs).await
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Attrs>> {
    super::update(&state, Kind::Review, &id, &body, PROTECTED).await
}
