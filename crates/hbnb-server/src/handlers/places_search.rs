//! Place search

use super::{json_object, ApiError, ApiResult, Attrs};
use crate::AppState;
use axum::{body::Bytes, extract::State, Json};
use hbnb_core::{search_places, PlaceFilter};
use serde_json::Value;

/// `{"states": [...], "cities": [...], "amenities": [...]}`, every key optional
pub async fn search(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<Vec<Attrs>>> {
    let attrs = json_object(&body)?;
    let filter: PlaceFilter = serde_json::from_value(Value::Object(attrs))
        .map_err(|e| ApiError::Invalid(format!("Invalid search filter: {}", e)))?;

    let places = search_places(state.storage.as_ref(), &filter).await?;
    Ok(Json(
        places
            .into_iter()
            .map(|p| hbnb_core::Entity::from(p).to_dict())
            .collect(),
    ))
}
