//! Create/edit form lifecycle
//!
//! A form starts from initial values (the blank template in create mode, the
//! derived values of a record in edit mode). Submitting overlays the user
//! input, applies the page's submit transformation, fixes up the identifier
//! and hands the result to a [`FormSink`]. The completion callback always
//! sees the outcome.

use async_trait::async_trait;
use fintrack_utils::{consume_date, display_date, parse_decimal};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::error::{CoreError, CoreResult};
use crate::models::Entity;
use crate::types::EntityKind;

/// Field name → value mapping exchanged with forms and backends
pub type FormValues = Map<String, Value>;

/// Transformation applied to values right before submission
pub type SubmitTransform = Arc<dyn Fn(FormValues) -> CoreResult<FormValues> + Send + Sync>;

/// Derivation of edit-form values from an existing record
pub type DeriveFormValues = Arc<dyn Fn(&Entity) -> CoreResult<FormValues> + Send + Sync>;

/// Receiver of submitted forms, normally the page
#[async_trait]
pub trait FormSink: Send + Sync {
    async fn create(&self, values: FormValues) -> CoreResult<()>;
    async fn update(&self, values: FormValues) -> CoreResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit { uuid: String },
}

/// A create-mode or edit-mode form with its initial values
#[derive(Debug, Clone, PartialEq)]
pub struct EntityForm {
    kind: EntityKind,
    mode: FormMode,
    initial: FormValues,
}

impl EntityForm {
    /// Create-mode form starting from the blank template
    pub fn create(kind: EntityKind, blank: &FormValues) -> Self {
        Self {
            kind,
            mode: FormMode::Create,
            initial: blank.clone(),
        }
    }

    /// Edit-mode form for `entity`
    pub fn edit(entity: &Entity, derive: Option<&DeriveFormValues>) -> CoreResult<Self> {
        let initial = match derive {
            Some(derive) => derive(entity)?,
            None => default_form_values(entity)?,
        };
        Ok(Self {
            kind: entity.kind(),
            mode: FormMode::Edit { uuid: entity.uuid().to_string() },
            initial,
        })
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn initial(&self) -> &FormValues {
        &self.initial
    }

    /// Initial value of `field` as shown in an input
    pub fn input_value(&self, field: &str) -> String {
        match self.initial.get(field) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Object(map)) => map
                .get("uuid")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            Some(other) => other.to_string(),
        }
    }

    /// Values that would be submitted for `input`
    pub fn prepare(&self, input: FormValues, transform: Option<&SubmitTransform>) -> CoreResult<FormValues> {
        let mut values = self.initial.clone();
        for (field, value) in input {
            if self.kind.accepts_field(&field) {
                values.insert(field, value);
            } else {
                log::debug!("Ignoring field '{}' not used by {}", field, self.kind);
            }
        }

        let mut values = match transform {
            Some(transform) => transform(values)?,
            None => values,
        };

        match &self.mode {
            FormMode::Create => {
                values.remove("uuid");
            }
            FormMode::Edit { uuid } => {
                values.insert("uuid".to_string(), Value::String(uuid.clone()));
            }
        }
        Ok(values)
    }

    /// Prepare and submit `input`, then call `done` with the outcome
    pub async fn submit<F>(
        &self,
        input: FormValues,
        transform: Option<&SubmitTransform>,
        sink: &dyn FormSink,
        done: F,
    ) -> CoreResult<()>
    where
        F: FnOnce(&CoreResult<()>) + Send,
    {
        let outcome = match self.prepare(input, transform) {
            Ok(values) => match &self.mode {
                FormMode::Create => sink.create(values).await,
                FormMode::Edit { .. } => sink.update(values).await,
            },
            Err(error) => Err(error),
        };
        done(&outcome);
        outcome
    }
}

/// The record's own field mapping with references reduced to their uuid
pub fn default_form_values(entity: &Entity) -> CoreResult<FormValues> {
    let mut values = entity.to_values()?;
    for column in entity.kind().columns() {
        if column.is_reference() {
            reference_to_uuid(&mut values, column.field());
        }
    }
    Ok(values)
}

/// Replace a `{uuid, ...}` reference with its uuid string
pub fn reference_to_uuid(values: &mut FormValues, field: &str) {
    let uuid = match values.get(field) {
        Some(Value::Object(map)) => map.get("uuid").and_then(Value::as_str).map(str::to_string),
        _ => None,
    };
    if let Some(uuid) = uuid {
        values.insert(field.to_string(), Value::String(uuid));
    }
}

/// Expand a submitted uuid (or `{value}` selection) into a `{uuid}` reference
pub fn uuid_to_reference(values: &mut FormValues, field: &str) {
    let uuid = match values.get(field) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Object(map)) if !map.contains_key("uuid") => {
            map.get("value").and_then(Value::as_str).map(str::to_string)
        }
        _ => None,
    };
    if let Some(uuid) = uuid {
        let mut reference = Map::new();
        reference.insert("uuid".to_string(), Value::String(uuid));
        values.insert(field.to_string(), Value::Object(reference));
    }
}

/// Rewrite a stored date field as `MM/DD/YYYY`
pub fn display_date_field(values: &mut FormValues, field: &str) -> CoreResult<()> {
    if let Some(Value::String(date)) = values.get(field) {
        let shown = display_date(date)?;
        values.insert(field.to_string(), Value::String(shown));
    }
    Ok(())
}

/// Rewrite a user-entered date field in canonical submission form
pub fn consume_date_field(values: &mut FormValues, field: &str) -> CoreResult<()> {
    if let Some(Value::String(date)) = values.get(field) {
        let canonical = consume_date(date)?;
        values.insert(field.to_string(), Value::String(canonical));
    }
    Ok(())
}

/// Clean up a user-entered number (`$1,234.50` → `1234.50`)
pub fn consume_number_field(values: &mut FormValues, field: &str) -> CoreResult<()> {
    let cleaned = match values.get(field) {
        Some(Value::String(s)) if s.trim().is_empty() => Some("0".to_string()),
        Some(Value::String(s)) => Some(parse_decimal(s)?.to_string()),
        _ => None,
    };
    if let Some(number) = cleaned {
        values.insert(field.to_string(), Value::String(number));
    }
    Ok(())
}

/// Build form values from a JSON object literal
pub fn values_from_json(value: Value) -> CoreResult<FormValues> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(CoreError::InvalidFormat {
            message: format!("expected an object, got {}", other),
        }),
    }
}
