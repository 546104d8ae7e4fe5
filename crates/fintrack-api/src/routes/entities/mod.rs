//! Entity routes - one list page per record kind
//!
//! Every enabled kind is mounted under its slug (`/accounts`, `/expenses`...):
//! - GET    /{slug}                          full page
//! - GET    /{slug}/list                     refetch, section partial
//! - POST   /{slug}                          create
//! - PUT    /{slug}/{uuid}                   update the row being edited
//! - DELETE /{slug}/{uuid}                   delete a row
//! - GET    /{slug}/{uuid}/edit|cancel       toggle row edit mode
//! - POST   /{slug}/filter                   set one filter criterion
//! - POST   /{slug}/options/{name}/refresh   reload a lookup list
//! - GET    /api/{slug}                      JSON collection
//!
//! Structure:
//! - api.rs: JSON endpoints
//! - page.rs: HTMX page rendering and mutations

pub mod api;
pub mod page;

use crate::AppState;
use axum::routing::{get, post, put};
use axum::{Extension, Router};
use fintrack_core::EntityKind;

pub use api::{api_entities, EntityListResponse};
pub use page::{
    htmx_cancel_edit, htmx_create, htmx_delete, htmx_edit, htmx_filter, htmx_list, htmx_refresh_options,
    htmx_update, page_entities, render_section,
};

/// Routes of one kind, to be nested under `/{slug}`
pub fn router(kind: EntityKind) -> Router<AppState> {
    Router::new()
        .route("/", get(page_entities).post(htmx_create))
        .route("/list", get(htmx_list))
        .route("/filter", post(htmx_filter))
        .route("/options/:name/refresh", post(htmx_refresh_options))
        .route("/:uuid", put(htmx_update).delete(htmx_delete))
        .route("/:uuid/edit", get(htmx_edit))
        .route("/:uuid/cancel", get(htmx_cancel_edit))
        .layer(Extension(kind))
}
