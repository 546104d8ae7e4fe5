//! Per-row inline edit state

use serde::Serialize;

use crate::error::{CoreError, CoreResult};
use crate::form::{DeriveFormValues, EntityForm};
use crate::models::Entity;
use crate::render::{AttributeRenderer, Cell};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowState {
    #[default]
    Viewing,
    Editing,
}

/// Edit state of one listed record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRow {
    uuid: String,
    state: RowState,
}

impl EntityRow {
    pub fn new(uuid: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            state: RowState::Viewing,
        }
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn state(&self) -> RowState {
        self.state
    }

    /// Viewing → Editing; a row already editing stays so
    pub fn begin_edit(&mut self) {
        self.state = RowState::Editing;
    }

    /// Editing → Viewing without touching the record
    pub fn cancel(&mut self) {
        self.state = RowState::Viewing;
    }

    /// Completion of an update submitted from this row
    pub fn finish(&mut self, outcome: &CoreResult<()>) {
        if outcome.is_ok() {
            self.state = RowState::Viewing;
        }
    }

    pub fn can_delete(&self) -> bool {
        self.state == RowState::Viewing
    }

    pub fn ensure_deletable(&self) -> CoreResult<()> {
        if self.can_delete() {
            Ok(())
        } else {
            Err(CoreError::InvalidState {
                message: format!("row {} is being edited and cannot be deleted", self.uuid),
            })
        }
    }

    pub fn ensure_editing(&self) -> CoreResult<()> {
        if self.state == RowState::Editing {
            Ok(())
        } else {
            Err(CoreError::InvalidState {
                message: format!("row {} is not being edited", self.uuid),
            })
        }
    }
}

/// What a row shows: cells while viewing, the edit form while editing
#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub uuid: String,
    pub state: RowState,
    pub cells: Vec<Cell>,
    pub form: Option<EntityForm>,
}

impl RowView {
    pub fn build(
        row: &EntityRow,
        entity: &Entity,
        renderer: &AttributeRenderer,
        derive: Option<&DeriveFormValues>,
    ) -> CoreResult<Self> {
        let form = match row.state {
            RowState::Viewing => None,
            RowState::Editing => Some(EntityForm::edit(entity, derive)?),
        };
        Ok(Self {
            uuid: row.uuid.clone(),
            state: row.state,
            cells: renderer.cells(entity),
            form,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    fn category() -> Entity {
        Entity::AccountCategory(Category {
            uuid: "c-1".to_string(),
            name: "Retirement".to_string(),
            description: "401k and IRA".to_string(),
        })
    }

    #[test]
    fn test_edit_then_cancel_returns_to_viewing() {
        let mut row = EntityRow::new("c-1");
        assert_eq!(row.state(), RowState::Viewing);
        row.begin_edit();
        assert_eq!(row.state(), RowState::Editing);
        row.cancel();
        assert_eq!(row.state(), RowState::Viewing);
    }

    #[test]
    fn test_failed_update_keeps_editing() {
        let mut row = EntityRow::new("c-1");
        row.begin_edit();
        row.finish(&Err(CoreError::Rejected { message: "nope".to_string() }));
        assert_eq!(row.state(), RowState::Editing);
        row.finish(&Ok(()));
        assert_eq!(row.state(), RowState::Viewing);
    }

    #[test]
    fn test_delete_only_while_viewing() {
        let mut row = EntityRow::new("c-1");
        assert!(row.ensure_deletable().is_ok());
        assert!(row.ensure_editing().is_err());
        row.begin_edit();
        assert!(matches!(row.ensure_deletable(), Err(CoreError::InvalidState { .. })));
        assert!(row.ensure_editing().is_ok());
    }

    #[test]
    fn test_view_shows_form_only_while_editing() {
        let renderer = AttributeRenderer::default();
        let mut row = EntityRow::new("c-1");
        let view = RowView::build(&row, &category(), &renderer, None).unwrap();
        assert!(view.form.is_none());
        assert_eq!(view.cells.len(), 2);

        row.begin_edit();
        let view = RowView::build(&row, &category(), &renderer, None).unwrap();
        let form = view.form.unwrap();
        assert_eq!(form.input_value("name"), "Retirement");
    }
}
