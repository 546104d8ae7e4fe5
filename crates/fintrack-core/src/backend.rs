//! Backend seam of the engine

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::CoreResult;
use crate::filter::Filter;
use crate::form::FormValues;
use crate::models::Entity;
use crate::options::OptionSourceRef;
use crate::types::EntityKind;

/// Record store for one entity kind
#[async_trait]
pub trait EntityBackend: Send + Sync {
    /// Records matching `filter`; an empty filter lists everything
    async fn get_entities(&self, filter: &Filter) -> CoreResult<Vec<Entity>>;

    /// Create a record; `values` carry no identifier
    async fn create_entity(&self, values: FormValues) -> CoreResult<Entity>;

    /// Replace a record; `values` carry its identifier
    async fn update_entity(&self, values: FormValues) -> CoreResult<Entity>;

    async fn delete_entity(&self, uuid: &str) -> CoreResult<()>;
}

/// Backend reference type
pub type BackendRef = Arc<dyn EntityBackend>;

/// Hands out backends and lookup sources per kind
pub trait BackendFactory: Send + Sync {
    fn backend(&self, kind: EntityKind) -> BackendRef;

    /// Lookup listing every record of `kind`
    fn option_source(&self, kind: EntityKind) -> OptionSourceRef;
}
