//! Links between places and amenities

use super::{dicts, fetch, ApiResult, Attrs};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use hbnb_core::Kind;
use serde_json::{json, Value};

pub async fn list(
    State(state): State<AppState>,
    Path(place_id): Path<String>,
) -> ApiResult<Json<Vec<Attrs>>> {
    fetch(state.storage.as_ref(), Kind::Place, &place_id).await?;
    let amenities = state.storage.amenities_of(&place_id).await?;
    Ok(dicts(amenities))
}

/// 201 for a new link, 200 when the amenity was already linked
pub async fn link(
    State(state): State<AppState>,
    Path((place_id, amenity_id)): Path<(String, String)>,
) -> ApiResult<(StatusCode, Json<Attrs>)> {
    fetch(state.storage.as_ref(), Kind::Place, &place_id).await?;
    let amenity = fetch(state.storage.as_ref(), Kind::Amenity, &amenity_id).await?;

    let linked = state.storage.link_amenity(&place_id, &amenity_id).await?;
    if !linked {
        return Ok((StatusCode::OK, Json(amenity.to_dict())));
    }
    state.storage.save().await?;
    tracing::info!("Linked amenity {} to place {}", amenity_id, place_id);
    Ok((StatusCode::CREATED, Json(amenity.to_dict())))
}

/// Always 200 once both ends exist, linked or not
pub async fn unlink(
    State(state): State<AppState>,
    Path((place_id, amenity_id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    fetch(state.storage.as_ref(), Kind::Place, &place_id).await?;
    fetch(state.storage.as_ref(), Kind::Amenity, &amenity_id).await?;

    if state.storage.unlink_amenity(&place_id, &amenity_id).await? {
        state.storage.save().await?;
        tracing::info!("Unlinked amenity {} from place {}", amenity_id, place_id);
    }
    Ok(Json(json!({})))
}
