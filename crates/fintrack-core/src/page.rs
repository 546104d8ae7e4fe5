//! Entity page controller
//!
//! An [`EntityPage`] owns the listed collection of one kind together with the
//! per-row edit state, the filter selections, the lookup cache and the last
//! failure notice. Every mutation is a round-trip: submit to the backend,
//! refetch with the current filter, replace the collection.
//!
//! Refetches are numbered when issued. A result only replaces the collection
//! when no later-issued refetch has been applied yet, so a slow response can
//! never overwrite a newer one.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::backend::BackendRef;
use crate::error::{CoreError, CoreResult, DefaultErrorLogger, ErrorContext, ErrorDetails, ErrorLogger};
use crate::filter::{FilterCriterion, FilterState};
use crate::form::{values_from_json, DeriveFormValues, EntityForm, FormSink, FormValues, SubmitTransform};
use crate::models::Entity;
use crate::options::{OptionSourceRef, OptionsCache};
use crate::render::AttributeRenderer;
use crate::row::{EntityRow, RowState, RowView};
use crate::types::EntityKind;

// ==================== Configuration ====================

/// Validated configuration of one page
#[derive(Clone)]
pub struct EntityPageConfig {
    kind: EntityKind,
    entity_name: String,
    entity_plural: String,
    blank_entity: FormValues,
    uses_filters: bool,
    filters: Vec<FilterCriterion>,
    backend: BackendRef,
    option_sources: BTreeMap<String, OptionSourceRef>,
    transform_before_submit: Option<SubmitTransform>,
    derive_form_values: Option<DeriveFormValues>,
}

impl EntityPageConfig {
    pub fn builder(kind: EntityKind, backend: BackendRef) -> EntityPageConfigBuilder {
        EntityPageConfigBuilder {
            kind,
            entity_name: kind.entity_name().to_string(),
            entity_plural: kind.entity_plural().to_string(),
            blank_entity: json!({}),
            uses_filters: false,
            filters: Vec::new(),
            backend,
            option_sources: BTreeMap::new(),
            transform_before_submit: None,
            derive_form_values: None,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    pub fn entity_plural(&self) -> &str {
        &self.entity_plural
    }

    pub fn blank_entity(&self) -> &FormValues {
        &self.blank_entity
    }

    pub fn uses_filters(&self) -> bool {
        self.uses_filters
    }

    pub fn filters(&self) -> &[FilterCriterion] {
        &self.filters
    }
}

impl std::fmt::Debug for EntityPageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityPageConfig")
            .field("kind", &self.kind)
            .field("entity_name", &self.entity_name)
            .field("uses_filters", &self.uses_filters)
            .field("filters", &self.filters)
            .field("option_sources", &self.option_sources.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for [`EntityPageConfig`]; `build` validates the whole configuration
pub struct EntityPageConfigBuilder {
    kind: EntityKind,
    entity_name: String,
    entity_plural: String,
    blank_entity: Value,
    uses_filters: bool,
    filters: Vec<FilterCriterion>,
    backend: BackendRef,
    option_sources: BTreeMap<String, OptionSourceRef>,
    transform_before_submit: Option<SubmitTransform>,
    derive_form_values: Option<DeriveFormValues>,
}

impl EntityPageConfigBuilder {
    pub fn entity_name(mut self, name: impl Into<String>) -> Self {
        self.entity_name = name.into();
        self
    }

    pub fn entity_plural(mut self, plural: impl Into<String>) -> Self {
        self.entity_plural = plural.into();
        self
    }

    /// Initial values of the create form
    pub fn blank_entity(mut self, blank: Value) -> Self {
        self.blank_entity = blank;
        self
    }

    pub fn uses_filters(mut self, uses_filters: bool) -> Self {
        self.uses_filters = uses_filters;
        self
    }

    pub fn filter(mut self, criterion: FilterCriterion) -> Self {
        self.filters.push(criterion);
        self
    }

    pub fn option_source(mut self, name: impl Into<String>, source: OptionSourceRef) -> Self {
        self.option_sources.insert(name.into(), source);
        self
    }

    pub fn transform_before_submit(mut self, transform: SubmitTransform) -> Self {
        self.transform_before_submit = Some(transform);
        self
    }

    pub fn derive_form_values(mut self, derive: DeriveFormValues) -> Self {
        self.derive_form_values = Some(derive);
        self
    }

    pub fn build(self) -> CoreResult<EntityPageConfig> {
        let invalid = |message: String| CoreError::ConfigError { message };

        if self.entity_name.trim().is_empty() {
            return Err(invalid("entity name must not be empty".to_string()));
        }

        let blank_entity = values_from_json(self.blank_entity)
            .map_err(|_| invalid("blank entity must be a JSON object".to_string()))?;
        match blank_entity.get("uuid") {
            None => {}
            Some(Value::String(uuid)) if uuid.is_empty() => {}
            Some(_) => return Err(invalid("blank entity uuid must be empty".to_string())),
        }
        if let Some(field) = blank_entity.keys().find(|f| !self.kind.accepts_field(f)) {
            return Err(invalid(format!("blank entity field '{}' is not a {} field", field, self.kind)));
        }

        let mut names = BTreeSet::new();
        for criterion in &self.filters {
            if !names.insert(criterion.name.as_str()) {
                return Err(invalid(format!("duplicate filter '{}'", criterion.name)));
            }
            if criterion.name == "uuid" || !self.kind.accepts_field(&criterion.name) {
                return Err(invalid(format!(
                    "filter '{}' is not an attribute of {}",
                    criterion.name, self.kind
                )));
            }
            if !self.option_sources.contains_key(&criterion.option_source) {
                return Err(invalid(format!(
                    "filter '{}' uses unregistered option source '{}'",
                    criterion.name, criterion.option_source
                )));
            }
        }
        if self.uses_filters && self.filters.is_empty() {
            return Err(invalid("a page using filters needs at least one filter".to_string()));
        }

        Ok(EntityPageConfig {
            kind: self.kind,
            entity_name: self.entity_name,
            entity_plural: self.entity_plural,
            blank_entity,
            uses_filters: self.uses_filters,
            filters: self.filters,
            backend: self.backend,
            option_sources: self.option_sources,
            transform_before_submit: self.transform_before_submit,
            derive_form_values: self.derive_form_values,
        })
    }
}

// ==================== Notices ====================

/// Page operations that can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Mount,
    Refresh,
    Create,
    Update,
    Delete,
    Filter,
    Edit,
    Options,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Mount => write!(f, "mount"),
            Operation::Refresh => write!(f, "refresh"),
            Operation::Create => write!(f, "create"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
            Operation::Filter => write!(f, "filter"),
            Operation::Edit => write!(f, "edit"),
            Operation::Options => write!(f, "options"),
        }
    }
}

/// Last failure of a page operation, shown inline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub operation: Operation,
    pub details: ErrorDetails,
}

// ==================== Page ====================

#[derive(Default)]
struct CollectionState {
    entities: Vec<Entity>,
    rows: HashMap<String, EntityRow>,
    /// Sequence number of the refetch currently displayed
    applied: u64,
    mounted: bool,
}

/// Controller of one entity list page
pub struct EntityPage {
    config: EntityPageConfig,
    renderer: AttributeRenderer,
    options: OptionsCache,
    filters: RwLock<FilterState>,
    collection: RwLock<CollectionState>,
    notice: RwLock<Option<Notice>>,
    issued: AtomicU64,
    logger: Box<dyn ErrorLogger>,
}

impl EntityPage {
    pub fn new(config: EntityPageConfig, renderer: AttributeRenderer) -> Self {
        Self {
            options: OptionsCache::new(config.option_sources.clone()),
            filters: RwLock::new(FilterState::new(config.filters.clone())),
            collection: RwLock::new(CollectionState::default()),
            notice: RwLock::new(None),
            issued: AtomicU64::new(0),
            logger: Box::new(DefaultErrorLogger),
            config,
            renderer,
        }
    }

    pub fn with_logger(mut self, logger: Box<dyn ErrorLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn kind(&self) -> EntityKind {
        self.config.kind
    }

    pub fn config(&self) -> &EntityPageConfig {
        &self.config
    }

    pub fn renderer(&self) -> &AttributeRenderer {
        &self.renderer
    }

    pub fn options(&self) -> &OptionsCache {
        &self.options
    }

    // ---------- Read access ----------

    pub fn is_mounted(&self) -> bool {
        self.collection.read().unwrap_or_else(PoisonError::into_inner).mounted
    }

    pub fn entities(&self) -> Vec<Entity> {
        self.collection
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entities
            .clone()
    }

    pub fn entity(&self, uuid: &str) -> Option<Entity> {
        self.collection
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entities
            .iter()
            .find(|e| e.uuid() == uuid)
            .cloned()
    }

    pub fn row_state(&self, uuid: &str) -> Option<RowState> {
        self.collection
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .rows
            .get(uuid)
            .map(EntityRow::state)
    }

    /// One view per listed record, in collection order
    pub fn rows(&self) -> CoreResult<Vec<RowView>> {
        let state = self.collection.read().unwrap_or_else(PoisonError::into_inner);
        state
            .entities
            .iter()
            .map(|entity| {
                let row = state
                    .rows
                    .get(entity.uuid())
                    .cloned()
                    .unwrap_or_else(|| EntityRow::new(entity.uuid()));
                RowView::build(&row, entity, &self.renderer, self.config.derive_form_values.as_ref())
            })
            .collect()
    }

    pub fn row(&self, uuid: &str) -> CoreResult<RowView> {
        let state = self.collection.read().unwrap_or_else(PoisonError::into_inner);
        let (row, entity) = Self::lookup(&state, uuid)?;
        RowView::build(row, entity, &self.renderer, self.config.derive_form_values.as_ref())
    }

    pub fn create_form(&self) -> EntityForm {
        EntityForm::create(self.config.kind, &self.config.blank_entity)
    }

    /// Edit form of a row that is being edited
    pub fn edit_form(&self, uuid: &str) -> CoreResult<EntityForm> {
        let state = self.collection.read().unwrap_or_else(PoisonError::into_inner);
        let (row, entity) = Self::lookup(&state, uuid)?;
        row.ensure_editing()?;
        EntityForm::edit(entity, self.config.derive_form_values.as_ref())
    }

    pub fn filter_state(&self) -> FilterState {
        self.filters.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn notice(&self) -> Option<Notice> {
        self.notice.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn lookup<'a>(state: &'a CollectionState, uuid: &str) -> CoreResult<(&'a EntityRow, &'a Entity)> {
        let not_found = || CoreError::EntityNotFound { uuid: uuid.to_string() };
        let row = state.rows.get(uuid).ok_or_else(not_found)?;
        let entity = state.entities.iter().find(|e| e.uuid() == uuid).ok_or_else(not_found)?;
        Ok((row, entity))
    }

    // ---------- Collection operations ----------

    /// Fetch the initial collection and start loading every lookup
    pub async fn mount(&self) -> CoreResult<()> {
        self.options.preload();
        let result = self.refetch().await;
        if result.is_ok() {
            log::info!("Mounted {} page with {} records", self.config.entity_plural, self.entities().len());
        }
        self.track(Operation::Mount, result)
    }

    pub async fn refresh(&self) -> CoreResult<()> {
        let result = self.refetch().await;
        self.track(Operation::Refresh, result)
    }

    pub async fn create(&self, values: FormValues) -> CoreResult<()> {
        let result = self.create_then_refetch(values).await;
        self.track(Operation::Create, result)
    }

    pub async fn update(&self, values: FormValues) -> CoreResult<()> {
        let result = self.update_then_refetch(values).await;
        self.track(Operation::Update, result)
    }

    pub async fn delete(&self, uuid: &str) -> CoreResult<()> {
        let result = self.delete_then_refetch(uuid).await;
        self.track(Operation::Delete, result)
    }

    /// Replace the selection of one filter and refetch if it changed
    pub async fn set_filter_category(&self, name: &str, values: Vec<String>) -> CoreResult<()> {
        let result = self.apply_filter(name, values).await;
        self.track(Operation::Filter, result)
    }

    /// Reload one lookup list, e.g. after its records changed on another page
    pub async fn refresh_options(&self, name: &str) -> CoreResult<()> {
        let result = self.options.refresh(name).await.map(|_| ());
        self.track(Operation::Options, result)
    }

    /// Wait for every lookup list; the first failure becomes the notice
    pub async fn load_options(&self) -> CoreResult<()> {
        let names: Vec<String> = self.options.names().map(str::to_string).collect();
        for name in &names {
            if let Err(error) = self.options.load(name).await {
                return self.track(Operation::Options, Err(error));
            }
        }
        Ok(())
    }

    // ---------- Row operations ----------

    pub fn begin_edit(&self, uuid: &str) -> CoreResult<()> {
        let result = self.with_row(uuid, |row, entity, derive| {
            EntityForm::edit(entity, derive)?;
            row.begin_edit();
            Ok(())
        });
        self.track(Operation::Edit, result)
    }

    /// Leave edit mode; nothing is sent to the backend
    pub fn cancel_edit(&self, uuid: &str) -> CoreResult<()> {
        let result = self.with_row(uuid, |row, _, _| {
            row.cancel();
            Ok(())
        });
        self.track(Operation::Edit, result)
    }

    /// Submit the edit form of a row
    pub async fn submit_row(&self, uuid: &str, input: FormValues) -> CoreResult<()> {
        let result = match self.edit_form(uuid) {
            Ok(form) => {
                form.submit(
                    input,
                    self.config.transform_before_submit.as_ref(),
                    self,
                    |outcome| self.finish_row(uuid, outcome),
                )
                .await
            }
            Err(error) => Err(error),
        };
        self.track(Operation::Update, result)
    }

    /// Delete a row that is not being edited
    pub async fn delete_row(&self, uuid: &str) -> CoreResult<()> {
        let result = match self.with_row(uuid, |row, _, _| row.ensure_deletable()) {
            Ok(()) => self.delete_then_refetch(uuid).await,
            Err(error) => Err(error),
        };
        self.track(Operation::Delete, result)
    }

    /// Submit the create-mode form
    pub async fn submit_create(&self, input: FormValues) -> CoreResult<()> {
        let form = self.create_form();
        let result = form
            .submit(input, self.config.transform_before_submit.as_ref(), self, |_| {})
            .await;
        self.track(Operation::Create, result)
    }

    // ---------- Internals ----------

    fn with_row<F>(&self, uuid: &str, action: F) -> CoreResult<()>
    where
        F: FnOnce(&mut EntityRow, &Entity, Option<&DeriveFormValues>) -> CoreResult<()>,
    {
        let mut guard = self.collection.write().unwrap_or_else(PoisonError::into_inner);
        let state = &mut *guard;
        let entity = state
            .entities
            .iter()
            .find(|e| e.uuid() == uuid)
            .ok_or_else(|| CoreError::EntityNotFound { uuid: uuid.to_string() })?;
        let row = state
            .rows
            .get_mut(uuid)
            .ok_or_else(|| CoreError::EntityNotFound { uuid: uuid.to_string() })?;
        action(row, entity, self.config.derive_form_values.as_ref())
    }

    fn finish_row(&self, uuid: &str, outcome: &CoreResult<()>) {
        let mut state = self.collection.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(row) = state.rows.get_mut(uuid) {
            row.finish(outcome);
        }
    }

    async fn create_then_refetch(&self, values: FormValues) -> CoreResult<()> {
        let created = self.config.backend.create_entity(values).await?;
        log::info!("Created {} {}", self.config.kind, created.uuid());
        self.refetch().await
    }

    async fn update_then_refetch(&self, values: FormValues) -> CoreResult<()> {
        let updated = self.config.backend.update_entity(values).await?;
        log::info!("Updated {} {}", self.config.kind, updated.uuid());
        self.refetch().await
    }

    async fn delete_then_refetch(&self, uuid: &str) -> CoreResult<()> {
        self.config.backend.delete_entity(uuid).await?;
        log::info!("Deleted {} {}", self.config.kind, uuid);
        self.refetch().await
    }

    async fn apply_filter(&self, name: &str, values: Vec<String>) -> CoreResult<()> {
        if !self.config.uses_filters {
            return Err(CoreError::FiltersDisabled {
                entity: self.config.entity_plural.clone(),
            });
        }
        let changed = self
            .filters
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .set_filter_category(name, values)?;
        if changed {
            self.refetch().await
        } else {
            Ok(())
        }
    }

    /// Fetch with the current filter and replace the collection unless a newer result won
    async fn refetch(&self) -> CoreResult<()> {
        let sequence = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let filter = self.filter_state().to_filter();
        let entities = self.config.backend.get_entities(&filter).await?;
        self.replace(sequence, entities);
        Ok(())
    }

    fn replace(&self, sequence: u64, entities: Vec<Entity>) -> bool {
        let mut state = self.collection.write().unwrap_or_else(PoisonError::into_inner);
        if sequence <= state.applied {
            log::debug!(
                "Discarding stale {} refetch #{} (showing #{})",
                self.config.kind,
                sequence,
                state.applied
            );
            return false;
        }
        state.rows = entities
            .iter()
            .map(|e| (e.uuid().to_string(), EntityRow::new(e.uuid())))
            .collect();
        state.entities = entities;
        state.applied = sequence;
        state.mounted = true;
        true
    }

    /// Log a failure and keep it as the notice; success clears the notice
    fn track<T>(&self, operation: Operation, result: CoreResult<T>) -> CoreResult<T> {
        let mut notice = self.notice.write().unwrap_or_else(PoisonError::into_inner);
        match &result {
            Ok(_) => *notice = None,
            Err(error) => {
                let context = ErrorContext::new(operation.to_string())
                    .with_data("kind", json!(self.config.kind.to_string()));
                self.logger.log_error(error, &context);
                *notice = Some(Notice {
                    operation,
                    details: error.to_details(),
                });
            }
        }
        result
    }
}

#[async_trait]
impl FormSink for EntityPage {
    async fn create(&self, values: FormValues) -> CoreResult<()> {
        self.create_then_refetch(values).await
    }

    async fn update(&self, values: FormValues) -> CoreResult<()> {
        self.update_then_refetch(values).await
    }
}
