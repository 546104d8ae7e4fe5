//! Entity page rendering - full page and HTMX section endpoints
//!
//! Every mutation responds with the whole re-rendered section so the list,
//! the filters, the create form and the notice stay consistent. Failures are
//! shown through the page notice, never as an HTTP error.

use crate::{ApiError, AppState};
use axum::extract::{Form, Path, State};
use axum::http::HeaderMap;
use axum::response::Html;
use axum::Extension;
use fintrack_core::{
    Column, EntityForm, EntityKind, EntityPage, FormMode, FormValues, Notice, RowState, RowView,
};
use fintrack_utils::{escape_html, title_case};
use serde_json::Value;
use std::sync::Arc;

type FormPairs = Vec<(String, String)>;

// ==================== Handlers ====================

/// Full page; mounts the page on first visit
pub async fn page_entities(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
    headers: HeaderMap,
) -> Result<Html<String>, ApiError> {
    let page = mounted_page(&state, kind).await?;
    let content = render_section(&page).await;
    Ok(Html(crate::page_response(
        &headers,
        &state.pages,
        page.config().entity_plural(),
        &format!("/{}", kind.slug()),
        &content,
    )))
}

/// Refetch with the current filter
pub async fn htmx_list(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
) -> Result<Html<String>, ApiError> {
    let page = mounted_page(&state, kind).await?;
    let _ = page.refresh().await;
    Ok(Html(render_section(&page).await))
}

/// Submit the create form
pub async fn htmx_create(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
    Form(pairs): Form<FormPairs>,
) -> Result<Html<String>, ApiError> {
    let page = mounted_page(&state, kind).await?;
    let _ = page.submit_create(form_values(pairs)).await;
    Ok(Html(render_section(&page).await))
}

/// Submit the edit form of a row
pub async fn htmx_update(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
    Path(uuid): Path<String>,
    Form(pairs): Form<FormPairs>,
) -> Result<Html<String>, ApiError> {
    let page = mounted_page(&state, kind).await?;
    let _ = page.submit_row(&uuid, form_values(pairs)).await;
    Ok(Html(render_section(&page).await))
}

pub async fn htmx_delete(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
    Path(uuid): Path<String>,
) -> Result<Html<String>, ApiError> {
    let page = mounted_page(&state, kind).await?;
    let _ = page.delete_row(&uuid).await;
    Ok(Html(render_section(&page).await))
}

pub async fn htmx_edit(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
    Path(uuid): Path<String>,
) -> Result<Html<String>, ApiError> {
    let page = mounted_page(&state, kind).await?;
    let _ = page.begin_edit(&uuid);
    Ok(Html(render_section(&page).await))
}

pub async fn htmx_cancel_edit(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
    Path(uuid): Path<String>,
) -> Result<Html<String>, ApiError> {
    let page = mounted_page(&state, kind).await?;
    let _ = page.cancel_edit(&uuid);
    Ok(Html(render_section(&page).await))
}

/// Replace one criterion: `criterion=<name>` plus any number of `values=<v>`
pub async fn htmx_filter(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
    Form(pairs): Form<FormPairs>,
) -> Result<Html<String>, ApiError> {
    let page = mounted_page(&state, kind).await?;
    let criterion = pairs
        .iter()
        .find(|(key, _)| key == "criterion")
        .map(|(_, value)| value.clone())
        .ok_or_else(|| ApiError::BadRequest {
            message: "missing filter criterion".to_string(),
        })?;
    let values: Vec<String> = pairs
        .into_iter()
        .filter(|(key, _)| key == "values")
        .map(|(_, value)| value)
        .collect();

    let _ = page.set_filter_category(&criterion, values).await;
    Ok(Html(render_section(&page).await))
}

pub async fn htmx_refresh_options(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
    Path(name): Path<String>,
) -> Result<Html<String>, ApiError> {
    let page = mounted_page(&state, kind).await?;
    let _ = page.refresh_options(&name).await;
    Ok(Html(render_section(&page).await))
}

/// The page of `kind`, mounted on first use; a failed mount shows as the notice
async fn mounted_page(state: &AppState, kind: EntityKind) -> Result<Arc<EntityPage>, ApiError> {
    let page = state.page(kind)?;
    if !page.is_mounted() {
        let _ = page.mount().await;
    }
    Ok(page)
}

fn form_values(pairs: FormPairs) -> FormValues {
    pairs
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect()
}

// ==================== Rendering ====================

/// The whole page section: header, notice, filters, table and create form
pub async fn render_section(page: &Arc<EntityPage>) -> String {
    // Lookups are rendered into selects; a failed one shows as the notice
    let _ = page.load_options().await;

    let slug = page.kind().slug();
    format!(
        r#"<section id='entity-page-{slug}' class='space-y-6'>
    <div class='flex items-center justify-between'>
        <h2 class='text-2xl font-bold'>{plural}</h2>
        <button class='px-3 py-1 text-sm rounded-lg border hover:bg-gray-100' {target} hx-get='/{slug}/list'>Reload</button>
    </div>
    {notice}
    {filters}
    <div class='bg-white rounded-xl shadow-sm overflow-x-auto'>{table}</div>
    <div class='bg-white rounded-xl shadow-sm p-6'>{create}</div>
</section>"#,
        slug = slug,
        plural = escape_html(page.config().entity_plural()),
        target = hx_target(page.kind()),
        notice = render_notice(page.notice().as_ref()),
        filters = render_filters(page),
        table = render_table(page),
        create = render_create_form(page),
    )
}

fn hx_target(kind: EntityKind) -> String {
    format!("hx-target='#entity-page-{}' hx-swap='outerHTML'", kind.slug())
}

fn render_notice(notice: Option<&Notice>) -> String {
    let Some(notice) = notice else {
        return String::new();
    };
    let suggestions: String = notice
        .details
        .suggestions
        .iter()
        .map(|s| format!("<li>{}</li>", escape_html(s)))
        .collect();
    format!(
        r#"<div class='bg-red-50 border border-red-200 rounded-lg p-4' role='alert'>
        <div class='flex items-center gap-2'><span class='text-red-600'>✗</span><span class='font-medium text-red-800'>{} failed</span></div>
        <p class='text-sm text-red-600 mt-1'>{}</p>
        <ul class='text-xs text-red-500 mt-1 list-disc ml-5'>{}</ul>
    </div>"#,
        title_case(&notice.operation.to_string()),
        escape_html(&notice.details.message),
        suggestions
    )
}

fn render_filters(page: &EntityPage) -> String {
    if !page.config().uses_filters() {
        return String::new();
    }
    let slug = page.kind().slug();
    let state = page.filter_state();

    let mut html = String::from("<div class='flex flex-wrap gap-4'>");
    for criterion in state.criteria() {
        let options = page.options().get(&criterion.option_source).unwrap_or_default();
        let choices: String = criterion
            .choices(&options)
            .into_iter()
            .map(|(value, label, selected)| {
                format!(
                    "<option value='{}'{}>{}</option>",
                    escape_html(&value),
                    if selected { " selected" } else { "" },
                    escape_html(&label)
                )
            })
            .collect();
        html.push_str(&format!(
            r#"<form class='bg-white rounded-lg shadow-sm p-3' hx-post='/{slug}/filter' hx-trigger='change' {target}>
            <input type='hidden' name='criterion' value='{name}'>
            <label class='block text-sm text-gray-500 mb-1'>{label}
                <button type='button' class='text-xs text-indigo-600 ml-2' hx-post='/{slug}/options/{source}/refresh' {target}>↻</button>
            </label>
            <select name='values' multiple class='border rounded px-2 py-1 min-w-[10rem]'>{choices}</select>
        </form>"#,
            slug = slug,
            target = hx_target(page.kind()),
            name = escape_html(&criterion.name),
            label = escape_html(&title_case(&criterion.name)),
            source = escape_html(&criterion.option_source),
            choices = choices,
        ));
    }
    html.push_str("</div>");
    html
}

fn render_table(page: &EntityPage) -> String {
    let kind = page.kind();
    let headers: String = page
        .renderer()
        .headers(kind)
        .iter()
        .map(|h| format!("<th class='px-4 py-2 text-left text-sm font-medium text-gray-600'>{}</th>", h))
        .collect();

    let body = match page.rows() {
        Ok(rows) if rows.is_empty() => format!(
            "<tr><td colspan='{}' class='px-4 py-6 text-center text-gray-400'>No {} yet</td></tr>",
            kind.columns().len() + 1,
            escape_html(&page.config().entity_plural().to_lowercase())
        ),
        Ok(rows) => rows.iter().map(|row| render_row(page, row)).collect(),
        Err(error) => format!(
            "<tr><td colspan='{}' class='px-4 py-6 text-red-600'>{}</td></tr>",
            kind.columns().len() + 1,
            escape_html(&error.to_string())
        ),
    };

    format!(
        r#"<table class='min-w-full divide-y'>
        <thead class='bg-gray-50'><tr>{}<th class='px-4 py-2'></th></tr></thead>
        <tbody class='divide-y'>{}</tbody>
    </table>"#,
        headers, body
    )
}

fn render_row(page: &EntityPage, row: &RowView) -> String {
    let kind = page.kind();
    let slug = kind.slug();
    let uuid = escape_html(&row.uuid);

    match (&row.state, &row.form) {
        (RowState::Editing, Some(form)) => format!(
            r#"<tr id='row-{uuid}' class='bg-indigo-50'><td colspan='{span}' class='px-4 py-3'>
            <form class='flex flex-wrap items-end gap-3' hx-put='/{slug}/{uuid}' {target}>
                {inputs}
                <button type='submit' class='px-3 py-1 rounded-lg bg-indigo-600 text-white'>Save</button>
                <button type='button' class='px-3 py-1 rounded-lg border' hx-get='/{slug}/{uuid}/cancel' {target}>Cancel</button>
            </form>
        </td></tr>"#,
            uuid = uuid,
            span = kind.columns().len() + 1,
            slug = slug,
            target = hx_target(kind),
            inputs = render_inputs(page, form),
        ),
        _ => {
            let cells: String = row
                .cells
                .iter()
                .map(|cell| {
                    let align = if cell.column.is_numeric() { " text-right" } else { "" };
                    format!("<td class='px-4 py-2{}'>{}</td>", align, escape_html(&cell.text))
                })
                .collect();
            format!(
                r#"<tr id='row-{uuid}'>{cells}<td class='px-4 py-2 whitespace-nowrap text-right'>
                <button class='text-indigo-600 hover:underline mr-2' hx-get='/{slug}/{uuid}/edit' {target}>Edit</button>
                <button class='text-red-600 hover:underline' hx-delete='/{slug}/{uuid}' {target}>Delete</button>
            </td></tr>"#,
                uuid = uuid,
                cells = cells,
                slug = slug,
                target = hx_target(kind),
            )
        }
    }
}

fn render_create_form(page: &EntityPage) -> String {
    let form = page.create_form();
    format!(
        r#"<h3 class='text-lg font-semibold mb-4'>New {name}</h3>
    <form class='flex flex-wrap items-end gap-3' hx-post='/{slug}' {target}>
        {inputs}
        <button type='submit' class='px-3 py-1 rounded-lg bg-indigo-600 text-white'>Create</button>
    </form>"#,
        name = escape_html(page.config().entity_name()),
        slug = page.kind().slug(),
        target = hx_target(page.kind()),
        inputs = render_inputs(page, &form),
    )
}

/// One labelled control per editable column of the form's kind
fn render_inputs(page: &EntityPage, form: &EntityForm) -> String {
    let id_prefix = match form.mode() {
        FormMode::Create => "new".to_string(),
        FormMode::Edit { uuid } => escape_html(uuid),
    };

    form.kind()
        .editable_columns()
        .into_iter()
        .map(|column| {
            let field = column.field();
            let value = form.input_value(field);
            let control = if column.is_reference() && page.options().has_source(field) {
                render_select(page, field, &value)
            } else {
                let placeholder = match column {
                    Column::Date => "MM/DD/YYYY",
                    Column::ExpenseRatio => "0.0004",
                    _ => "",
                };
                format!(
                    "<input type='text' name='{}' value='{}' placeholder='{}' class='border rounded px-2 py-1'{}>",
                    field,
                    escape_html(&value),
                    placeholder,
                    if column.is_numeric() { " inputmode='decimal'" } else { "" }
                )
            };
            format!(
                "<label class='text-sm text-gray-600' for='{prefix}-{field}'><span class='block'>{label}</span>{control}</label>",
                prefix = id_prefix,
                field = field,
                label = column.label(),
                control = control,
            )
        })
        .collect()
}

fn render_select(page: &EntityPage, field: &str, selected: &str) -> String {
    let options = page.options().get(field).unwrap_or_default();
    let mut html = format!("<select name='{}' class='border rounded px-2 py-1'><option value=''>Select…</option>", field);
    for option in options.iter() {
        html.push_str(&format!(
            "<option value='{}'{}>{}</option>",
            escape_html(&option.value),
            if option.value == selected { " selected" } else { "" },
            escape_html(&option.label)
        ));
    }
    html.push_str("</select>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::page_config;
    use fintrack_core::{AttributeRenderer, BackendFactory, DisplayFormat, EntityPageConfig, MemoryLedger};
    use serde_json::json;

    fn page(kind: EntityKind, filters: bool) -> Arc<EntityPage> {
        let entities: Vec<fintrack_core::Entity> = serde_json::from_value(json!([
            { "kind": "accountCategory", "uuid": "ac-1", "name": "Retirement" },
            { "kind": "account", "uuid": "a-1", "name": "IRA <Roth>", "category": { "uuid": "ac-1" }, "amount": "1000" },
            { "kind": "fund", "uuid": "f-1", "name": "Total Market", "tickerSymbol": "VTSAX",
              "sharePrice": "100", "expenseRatio": "0.0004" },
            { "kind": "holding", "uuid": "h-1", "account": { "uuid": "a-1" }, "fund": { "uuid": "f-1" }, "shares": "2.5" }
        ]))
        .unwrap();
        let ledger = MemoryLedger::from_entities(entities).unwrap();
        let config = page_config(kind, &ledger, filters).unwrap();
        Arc::new(EntityPage::new(config, AttributeRenderer::new(DisplayFormat::default())))
    }

    #[tokio::test]
    async fn test_section_escapes_cells_and_lists_options() {
        let page = page(EntityKind::Account, true);
        page.mount().await.unwrap();
        let html = render_section(&page).await;
        assert!(html.contains("IRA &lt;Roth&gt;"));
        assert!(html.contains("hx-post='/accounts/filter'"));
        assert!(html.contains("<option value='ac-1'>Retirement</option>"));
        assert!(!html.contains("role='alert'"));
    }

    #[tokio::test]
    async fn test_section_without_filters() {
        let page = page(EntityKind::Holding, false);
        page.mount().await.unwrap();
        let html = render_section(&page).await;
        assert!(!html.contains("/holdings/filter"));
        assert!(html.contains("VTSAX"));
        assert!(html.contains("hx-post='/holdings'"));
    }

    #[tokio::test]
    async fn test_editing_row_preselects_reference() {
        let page = page(EntityKind::Holding, true);
        page.mount().await.unwrap();
        page.begin_edit("h-1").unwrap();
        let html = render_section(&page).await;
        assert!(html.contains("hx-put='/holdings/h-1'"));
        assert!(html.contains("<option value='f-1' selected>VTSAX</option>"));
    }

    struct Offline;

    #[async_trait::async_trait]
    impl fintrack_core::OptionSource for Offline {
        async fn fetch(&self) -> fintrack_core::CoreResult<Vec<fintrack_core::SelectOption>> {
            Err(fintrack_core::CoreError::Transport { message: "lookup service down".to_string() })
        }
    }

    #[tokio::test]
    async fn test_failed_lookup_shows_notice() {
        let ledger = MemoryLedger::new();
        let config = EntityPageConfig::builder(EntityKind::Account, ledger.backend(EntityKind::Account))
            .blank_entity(json!({ "uuid": "", "name": "", "category": "", "amount": 0 }))
            .option_source("category", Arc::new(Offline))
            .build()
            .unwrap();
        let page = Arc::new(EntityPage::new(config, AttributeRenderer::new(DisplayFormat::default())));
        page.mount().await.unwrap();

        let html = render_section(&page).await;
        assert!(html.contains("role='alert'"));
        assert!(html.contains("Options failed"));
        assert!(html.contains("Refresh the &#39;category&#39; options"));
    }

    #[test]
    fn test_notice_banner() {
        assert_eq!(render_notice(None), "");
    }

    #[test]
    fn test_form_values_keep_last_pair() {
        let values = form_values(vec![
            ("name".to_string(), "a".to_string()),
            ("name".to_string(), "b".to_string()),
        ]);
        assert_eq!(values["name"], json!("b"));
    }
}
