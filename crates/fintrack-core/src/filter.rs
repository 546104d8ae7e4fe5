//! Filter criteria and the filter payload sent to the backend

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{CoreError, CoreResult};
use crate::options::SelectOption;

/// Criterion name → selected values; only non-empty selections appear
pub type Filter = BTreeMap<String, BTreeSet<String>>;

/// Which field of a lookup option a criterion uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionField {
    Value,
    Label,
}

impl OptionField {
    fn pick<'a>(&self, option: &'a SelectOption) -> &'a str {
        match self {
            OptionField::Value => &option.value,
            OptionField::Label => &option.label,
        }
    }
}

/// A named, user-selectable constraint on the listed records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriterion {
    /// Attribute of the kind being filtered
    pub name: String,
    /// Option source listing the selectable values
    pub option_source: String,
    pub option_value: OptionField,
    pub option_display: OptionField,
    /// Selected values; empty means no filtering
    #[serde(default)]
    pub values: BTreeSet<String>,
}

impl FilterCriterion {
    /// Criterion filtering `name` by uuid, labelled with the option label
    pub fn new(name: impl Into<String>, option_source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            option_source: option_source.into(),
            option_value: OptionField::Value,
            option_display: OptionField::Label,
            values: BTreeSet::new(),
        }
    }

    pub fn with_fields(mut self, value: OptionField, display: OptionField) -> Self {
        self.option_value = value;
        self.option_display = display;
        self
    }

    /// Selectable (value, label, selected) triples built from lookup options
    pub fn choices(&self, options: &[SelectOption]) -> Vec<(String, String, bool)> {
        options
            .iter()
            .map(|option| {
                let value = self.option_value.pick(option).to_string();
                let selected = self.values.contains(&value);
                (value, self.option_display.pick(option).to_string(), selected)
            })
            .collect()
    }
}

/// Active selections of a page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    criteria: Vec<FilterCriterion>,
}

impl FilterState {
    pub fn new(criteria: Vec<FilterCriterion>) -> Self {
        Self { criteria }
    }

    pub fn criteria(&self) -> &[FilterCriterion] {
        &self.criteria
    }

    pub fn criterion(&self, name: &str) -> Option<&FilterCriterion> {
        self.criteria.iter().find(|c| c.name == name)
    }

    /// Replace the selection of `name`; returns whether anything changed
    pub fn set_filter_category<I, S>(&mut self, name: &str, values: I) -> CoreResult<bool>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let criterion = self
            .criteria
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| CoreError::UnknownFilter { name: name.to_string() })?;

        let values: BTreeSet<String> = values
            .into_iter()
            .map(Into::into)
            .filter(|v: &String| !v.is_empty())
            .collect();
        if criterion.values == values {
            return Ok(false);
        }
        criterion.values = values;
        Ok(true)
    }

    /// Payload for `get_entities`; criteria without a selection are omitted
    pub fn to_filter(&self) -> Filter {
        self.criteria
            .iter()
            .filter(|c| !c.values.is_empty())
            .map(|c| (c.name.clone(), c.values.clone()))
            .collect()
    }

    pub fn is_active(&self) -> bool {
        self.criteria.iter().any(|c| !c.values.is_empty())
    }
}
