//! Page presets for every entity kind
//!
//! Each preset wires the kind's blank template, its lookups and filters and
//! the value conversions between table records and HTML form fields.

use fintrack_config::Config;
use fintrack_core::form::{
    consume_date_field, consume_number_field, default_form_values, display_date_field, uuid_to_reference,
};
use fintrack_core::{
    AttributeRenderer, BackendFactory, Column, CoreResult, DeriveFormValues, DisplayFormat, Entity,
    EntityKind, EntityPage, EntityPageConfig, FilterCriterion, FormValues, OptionField, SubmitTransform,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Pages keyed by kind
pub type PageMap = BTreeMap<EntityKind, Arc<EntityPage>>;

/// Build one page per enabled kind
pub fn build_pages(config: &Config, factory: &dyn BackendFactory) -> CoreResult<PageMap> {
    let renderer = AttributeRenderer::new(DisplayFormat::from(&config.display));
    let mut pages = PageMap::new();
    for kind in EntityKind::ALL {
        if !config.is_page_enabled(kind.slug()) {
            continue;
        }
        let page_config = page_config(kind, factory, config.pages.filters)?;
        pages.insert(kind, Arc::new(EntityPage::new(page_config, renderer.clone())));
    }
    log::info!("Configured {} entity pages", pages.len());
    Ok(pages)
}

/// Configuration of the page listing `kind`
pub fn page_config(kind: EntityKind, factory: &dyn BackendFactory, filters: bool) -> CoreResult<EntityPageConfig> {
    let builder = EntityPageConfig::builder(kind, factory.backend(kind))
        .transform_before_submit(submit_transform(kind));

    let builder = match kind {
        EntityKind::Account => builder
            .blank_entity(json!({
                "uuid": "", "name": "", "category": "", "description": "", "amount": 0
            }))
            .option_source("category", factory.option_source(EntityKind::AccountCategory))
            .uses_filters(filters)
            .filter(FilterCriterion::new("category", "category")),

        EntityKind::AccountCategory | EntityKind::ExpenseCategory => builder
            .blank_entity(json!({ "uuid": "", "name": "", "description": "" })),

        EntityKind::Expense => builder
            .blank_entity(json!({
                "uuid": "", "name": "", "category": "", "description": "", "date": "", "amount": 0
            }))
            .option_source("category", factory.option_source(EntityKind::ExpenseCategory))
            .uses_filters(filters)
            .filter(
                FilterCriterion::new("category", "category")
                    .with_fields(OptionField::Label, OptionField::Label),
            )
            .derive_form_values(edit_values_with_dates()),

        EntityKind::Contribution => builder
            .blank_entity(json!({
                "uuid": "", "name": "", "account": "", "description": "", "date": "", "amount": 0
            }))
            .option_source("account", factory.option_source(EntityKind::Account))
            .uses_filters(filters)
            .filter(FilterCriterion::new("account", "account"))
            .derive_form_values(edit_values_with_dates()),

        EntityKind::Fund => builder.blank_entity(json!({
            "uuid": "", "name": "", "tickerSymbol": "", "sharePrice": 0, "expenseRatio": 0
        })),

        EntityKind::Holding => builder
            .blank_entity(json!({ "uuid": "", "account": "", "fund": "", "shares": 0 }))
            .option_source("account", factory.option_source(EntityKind::Account))
            .option_source("fund", factory.option_source(EntityKind::Fund))
            .uses_filters(filters)
            .filter(FilterCriterion::new("account", "account"))
            .filter(FilterCriterion::new("fund", "fund")),
    };

    builder.build()
}

/// Turn submitted form strings into the shapes records expect
fn submit_transform(kind: EntityKind) -> SubmitTransform {
    Arc::new(move |mut values: FormValues| -> CoreResult<FormValues> {
        for column in kind.editable_columns() {
            let field = column.field();
            if column.is_reference() {
                uuid_to_reference(&mut values, field);
            } else if column == Column::Date {
                consume_date_field(&mut values, field)?;
            } else if column.is_numeric() {
                consume_number_field(&mut values, field)?;
            }
        }
        Ok(values)
    })
}

/// Edit values showing dates as `MM/DD/YYYY`
fn edit_values_with_dates() -> DeriveFormValues {
    Arc::new(|entity: &Entity| -> CoreResult<FormValues> {
        let mut values = default_form_values(entity)?;
        display_date_field(&mut values, Column::Date.field())?;
        Ok(values)
    })
}
