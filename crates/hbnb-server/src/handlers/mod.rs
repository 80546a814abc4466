//! HTTP handlers
//!
//! Every resource follows the same shape, so the list/show/create/update/
//! delete plumbing lives here and the per-resource modules only add their
//! validation and parent lookups.

pub mod amenities;
pub mod cities;
pub mod index;
pub mod places;
pub mod places_amenities;
pub mod places_search;
pub mod reviews;
pub mod states;
pub mod users;

use crate::AppState;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hbnb_core::model::{self, IDENTITY_KEYS};
use hbnb_core::{Entity, HbnbError, Kind, Storage};
use serde_json::{json, Map, Value};

pub type ApiResult<T> = Result<T, ApiError>;
pub type Attrs = Map<String, Value>;

#[derive(Debug)]
pub enum ApiError {
    NotFound,
    NotAJson,
    /// A required attribute is absent
    Missing(&'static str),
    Invalid(String),
    Internal(HbnbError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, json!({ "error": "Not found" })),
            ApiError::NotAJson => (StatusCode::BAD_REQUEST, json!({ "message": "Not a JSON" })),
            ApiError::Missing(field) => (
                StatusCode::BAD_REQUEST,
                json!({ "message": format!("Missing {}", field) }),
            ),
            ApiError::Invalid(reason) => (StatusCode::BAD_REQUEST, json!({ "message": reason })),
            ApiError::Internal(e) => {
                tracing::error!("Request failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<HbnbError> for ApiError {
    fn from(e: HbnbError) -> Self {
        match e {
            HbnbError::ReferentialIntegrity(_) => ApiError::NotFound,
            HbnbError::InvalidAttributes { .. } => ApiError::Invalid(e.to_string()),
            other => ApiError::Internal(other),
        }
    }
}

/// Parse a request body that must be a JSON object
pub fn json_object(body: &[u8]) -> ApiResult<Attrs> {
    match serde_json::from_slice(body) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(ApiError::NotAJson),
    }
}

/// Fail unless `field` is present and not null
pub fn require(attrs: &Attrs, field: &'static str) -> ApiResult<()> {
    match attrs.get(field) {
        None | Some(Value::Null) => Err(ApiError::Missing(field)),
        Some(_) => Ok(()),
    }
}

/// Client-facing mappings, oldest first
pub fn dicts<I>(entities: I) -> Json<Vec<Attrs>>
where
    I: IntoIterator,
    I::Item: Into<Entity>,
{
    let mut entities: Vec<Entity> = entities.into_iter().map(Into::into).collect();
    entities.sort_by(|a, b| {
        (a.base().created_at.as_str(), a.id()).cmp(&(b.base().created_at.as_str(), b.id()))
    });
    Json(entities.iter().map(Entity::to_dict).collect())
}

pub async fn fetch(storage: &dyn Storage, kind: Kind, id: &str) -> ApiResult<Entity> {
    storage.get(kind, id).await?.ok_or(ApiError::NotFound)
}

pub async fn list(state: &AppState, kind: Kind) -> ApiResult<Json<Vec<Attrs>>> {
    let all = state.storage.get_all(Some(kind)).await?;
    Ok(dicts(all.into_values()))
}

pub async fn show(state: &AppState, kind: Kind, id: &str) -> ApiResult<Json<Attrs>> {
    let entity = fetch(state.storage.as_ref(), kind, id).await?;
    Ok(Json(entity.to_dict()))
}

pub async fn remove(state: &AppState, kind: Kind, id: &str) -> ApiResult<Json<Value>> {
    let entity = fetch(state.storage.as_ref(), kind, id).await?;
    state.storage.delete(&entity).await?;
    state.storage.save().await?;
    tracing::info!("Deleted {}", entity.key());
    Ok(Json(json!({})))
}

/// Build, stage and save a new entity. Identity keys in `attrs` are ignored.
pub async fn create(
    state: &AppState,
    kind: Kind,
    mut attrs: Attrs,
) -> ApiResult<(StatusCode, Json<Attrs>)> {
    for key in IDENTITY_KEYS {
        attrs.remove(*key);
    }
    let entity = model::build(kind, attrs)?;
    state.storage.new(entity.clone()).await?;
    state.storage.save().await?;
    tracing::info!("Created {}", entity.key());
    Ok((StatusCode::CREATED, Json(entity.to_dict())))
}

/// Merge the body into an existing entity, skipping `protected` keys
pub async fn update(
    state: &AppState,
    kind: Kind,
    id: &str,
    body: &[u8],
    protected: &[&str],
) -> ApiResult<Json<Attrs>> {
    let mut entity = fetch(state.storage.as_ref(), kind, id).await?;
    let attrs = json_object(body)?;
    model::apply_update(&mut entity, &attrs, protected)?;
    state.storage.new(entity.clone()).await?;
    state.storage.save().await?;
    Ok(Json(entity.to_dict()))
}
