//! JSON endpoints for entity collections

use crate::{ApiError, AppState};
use axum::extract::State;
use axum::{Extension, Json};
use fintrack_core::{Entity, EntityKind, Filter, Notice};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityListResponse {
    pub kind: EntityKind,
    pub count: usize,
    pub entities: Vec<Entity>,
    pub filter: Filter,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
}

/// GET /api/{slug} - current collection with the filter that produced it
pub async fn api_entities(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
) -> Result<Json<EntityListResponse>, ApiError> {
    let page = state.page(kind)?;
    if !page.is_mounted() {
        page.mount().await?;
    }

    let entities = page.entities();
    Ok(Json(EntityListResponse {
        kind,
        count: entities.len(),
        entities,
        filter: page.filter_state().to_filter(),
        notice: page.notice(),
    }))
}
