//! Service status and object counts

use super::ApiResult;
use crate::AppState;
use axum::{extract::State, Json};
use serde_json::{json, Map, Value};

pub async fn status() -> Json<Value> {
    Json(json!({ "status": "OK" }))
}

/// Object count per kind, keyed by collection name
pub async fn stats(State(state): State<AppState>) -> ApiResult<Json<Map<String, Value>>> {
    let mut stats = Map::new();
    for (kind, count) in state.storage.counts().await? {
        stats.insert(kind.collection().to_string(), json!(count));
    }
    Ok(Json(stats))
}
