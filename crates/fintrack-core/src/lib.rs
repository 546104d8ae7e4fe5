//! Entity CRUD engine for fintrack
//!
//! A configuration-driven list+form engine for every record kind:
//! - [`page::EntityPage`]: owns the collection and runs every round-trip
//! - [`row::EntityRow`]: per-row viewing/editing state
//! - [`form::EntityForm`]: create/edit form lifecycle
//! - [`render::AttributeRenderer`]: column selection and formatting
//! - [`filter::FilterState`] and [`options::OptionsCache`]: filters and lookups
//!
//! Backends plug in through [`backend::EntityBackend`]; [`memory`] provides an
//! in-memory implementation for every kind.

pub mod backend;
pub mod error;
pub mod filter;
pub mod form;
pub mod memory;
pub mod models;
pub mod options;
pub mod page;
pub mod render;
pub mod row;
pub mod types;

pub use backend::{BackendFactory, BackendRef, EntityBackend};
pub use error::{CoreError, CoreResult, ErrorCode, ErrorDetails, ErrorSeverity};
pub use filter::{Filter, FilterCriterion, FilterState, OptionField};
pub use form::{DeriveFormValues, EntityForm, FormMode, FormSink, FormValues, SubmitTransform};
pub use memory::{MemoryBackend, MemoryLedger};
pub use models::{Entity, EntityRef};
pub use options::{OptionSource, OptionSourceRef, OptionStatus, OptionsCache, SelectOption};
pub use page::{EntityPage, EntityPageConfig, EntityPageConfigBuilder, Notice, Operation};
pub use render::{AttributeRenderer, Cell, DisplayFormat};
pub use row::{EntityRow, RowState, RowView};
pub use types::{Column, EntityKind};
