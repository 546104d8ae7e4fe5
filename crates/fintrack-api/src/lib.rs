//! HTTP host with HTMX support
//!
//! Every enabled entity page is served under its slug, see [`routes::entities`].
//! The JSON API lives under `/api`.

pub mod error;
pub mod pages;
pub mod routes;

use anyhow::Context;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Html;
use axum::routing::get;
use axum::{Extension, Router};
use fintrack_config::Config;
use fintrack_core::{EntityKind, EntityPage};
use fintrack_utils::escape_html;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

pub use error::ApiError;
pub use pages::{build_pages, PageMap};

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub pages: Arc<PageMap>,
}

impl AppState {
    pub fn new(pages: PageMap) -> Self {
        Self { pages: Arc::new(pages) }
    }

    /// The page listing `kind`, if it is enabled
    pub fn page(&self, kind: EntityKind) -> Result<Arc<EntityPage>, ApiError> {
        self.pages.get(&kind).cloned().ok_or_else(|| ApiError::NotFound {
            resource: kind.slug().to_string(),
        })
    }
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    use routes::entities::{api_entities, router};

    let mut app = Router::new()
        .route("/", get(index_page))
        .route("/api/health", get(health_check));

    for kind in state.pages.keys().copied() {
        app = app
            .nest(&format!("/{}", kind.slug()), router(kind))
            .route(
                &format!("/api/{}", kind.slug()),
                get(api_entities).layer(Extension(kind)),
            );
    }

    app.layer(CorsLayer::permissive()).with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

/// Overview of every enabled page with its record count
async fn index_page(State(state): State<AppState>, headers: HeaderMap) -> Html<String> {
    let cards: String = state
        .pages
        .values()
        .map(|page| {
            let count = if page.is_mounted() {
                page.entities().len().to_string()
            } else {
                "-".to_string()
            };
            format!(
                r#"<a href='/{}' class='block bg-white rounded-xl shadow-sm p-6 hover:shadow-md'>
            <p class='text-sm text-gray-500'>{}</p>
            <p class='text-2xl font-bold text-indigo-600'>{}</p>
        </a>"#,
                page.kind().slug(),
                escape_html(page.config().entity_plural()),
                count
            )
        })
        .collect();

    let inner_content = format!(
        r#"<div class='mb-6'><h2 class='text-2xl font-bold'>Overview</h2></div>
    <div class='grid grid-cols-1 md:grid-cols-2 lg:grid-cols-4 gap-4'>{}</div>"#,
        cards
    );

    Html(page_response(&headers, &state.pages, "Overview", "/", &inner_content))
}

pub fn base_html(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{} - Fintrack</title>
    <script src="https://unpkg.com/htmx.org@1.9.10"></script>
    <script src="https://cdn.tailwindcss.com"></script>
    <style>
        .htmx-indicator {{ opacity: 0; transition: opacity 0.3s; }}
        .htmx-request .htmx-indicator {{ opacity: 1; }}
        .htmx-request.htmx-indicator {{ opacity: 1; }}
    </style>
</head>
<body class="bg-gray-50 text-gray-900">
    {}
</body>
</html>"#,
        escape_html(title),
        content
    )
}

/// Sidebar linking every enabled page
pub fn nav_sidebar(pages: &PageMap, current_path: &str) -> String {
    let mut nav = String::from("<div class='bg-white border-r h-screen flex flex-col'><div class='p-4 border-b'><h1 class='text-xl font-bold text-indigo-600'>Fintrack</h1></div><ul class='flex-1 py-2 space-y-1 px-2'>");

    let mut links = vec![("/".to_string(), "Overview".to_string())];
    links.extend(
        pages
            .values()
            .map(|page| (format!("/{}", page.kind().slug()), page.config().entity_plural().to_string())),
    );

    for (path, label) in &links {
        let is_active = if path == "/" {
            current_path == "/"
        } else {
            current_path == path || current_path.starts_with(&format!("{}/", path))
        };
        let active_class = if is_active { "bg-indigo-50 text-indigo-600" } else { "text-gray-600 hover:bg-gray-50" };
        nav.push_str(&format!(
            r#"<li><a href='{}' class='flex items-center gap-2 px-3 py-2 rounded-lg {}'><span>{}</span></a></li>"#,
            path,
            active_class,
            escape_html(label)
        ));
    }
    nav.push_str("</ul></div>");
    nav
}

pub fn is_htmx_request(headers: &HeaderMap) -> bool {
    headers.get("HX-Request").map(|v| v == "true").unwrap_or(false)
}

/// Partial for HTMX requests, full document otherwise
pub fn page_response(headers: &HeaderMap, pages: &PageMap, title: &str, current_path: &str, inner_content: &str) -> String {
    if is_htmx_request(headers) {
        inner_content.to_string()
    } else {
        base_html(
            title,
            &format!(
                r#"<div class='flex flex-col h-screen'>
    <div class='flex flex-1 overflow-hidden'>
        <aside class='w-64 flex-shrink-0'>{}</aside>
        <main class='flex-1 overflow-auto bg-gray-50 p-6'>{}</main>
    </div>
</div>"#,
                nav_sidebar(pages, current_path),
                inner_content
            ),
        )
    }
}

/// Bind and serve until the server stops
pub async fn start_server(config: Config, pages: PageMap) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let slugs: Vec<&'static str> = pages.keys().map(|kind| kind.slug()).collect();
    let state = AppState::new(pages);
    let router = create_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    log::info!("Starting fintrack server on http://{}", addr);
    for slug in &slugs {
        log::info!("  - /{} (page), /api/{} (JSON)", slug, slug);
    }

    axum::serve(listener, router).await.context("server error")?;
    log::info!("Server stopped gracefully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use fintrack_core::{Entity, MemoryLedger};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn ledger() -> MemoryLedger {
        let entities: Vec<Entity> = serde_json::from_value(json!([
            { "kind": "accountCategory", "uuid": "ac-1", "name": "Retirement" },
            { "kind": "account", "uuid": "a-1", "name": "IRA", "category": { "uuid": "ac-1" }, "amount": "1000" },
            { "kind": "expenseCategory", "uuid": "ec-1", "name": "Food" },
            { "kind": "expenseCategory", "uuid": "ec-2", "name": "Rent" },
            { "kind": "expense", "uuid": "e-1", "name": "Groceries", "category": { "uuid": "ec-1" },
              "date": "2023-01-05T00:00:00Z", "amount": "42.10" },
            { "kind": "expense", "uuid": "e-2", "name": "June rent", "category": { "uuid": "ec-2" },
              "date": "2023-06-01T00:00:00Z", "amount": "1500" }
        ]))
        .unwrap();
        MemoryLedger::from_entities(entities).unwrap()
    }

    fn app() -> Router {
        let config = Config::default();
        let pages = build_pages(&config, &ledger()).unwrap();
        create_router(AppState::new(pages))
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, String) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn form_request(method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/x-www-form-urlencoded")
            .header("HX-Request", "true")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let (status, body) = send(app(), Request::get("/api/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
    }

    #[tokio::test]
    async fn test_full_page_renders_rows_and_sidebar() {
        let (status, body) = send(app(), Request::get("/accounts").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with("<!DOCTYPE html>"));
        assert!(body.contains("href='/holdings'"));
        assert!(body.contains("entity-page-accounts"));
        assert!(body.contains("IRA"));
        assert!(body.contains("$1,000.00"));
    }

    #[tokio::test]
    async fn test_htmx_request_gets_partial() {
        let request = Request::get("/expenses")
            .header("HX-Request", "true")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with("<section id='entity-page-expenses'"));
        assert!(body.contains("01/05/2023"));
    }

    #[tokio::test]
    async fn test_create_then_json_listing() {
        let app = app();
        let (status, body) = send(
            app.clone(),
            form_request("POST", "/expense-categories", "name=Travel&description=Trips"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Travel"));
        assert!(!body.contains("role='alert'"));

        let (status, body) = send(app, Request::get("/api/expense-categories").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["count"], 3);
    }

    #[tokio::test]
    async fn test_failed_create_shows_notice() {
        let (status, body) = send(
            app(),
            form_request("POST", "/expenses", "name=Coffee&category=ec-1&description=&date=&amount=3"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("role='alert'"));
        assert!(body.contains("Create failed"));
    }

    #[tokio::test]
    async fn test_filter_narrows_the_list() {
        let (status, body) = send(app(), form_request("POST", "/expenses/filter", "criterion=category&values=Rent")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("June rent"));
        assert!(!body.contains("Groceries"));
    }

    #[tokio::test]
    async fn test_edit_and_cancel_toggle_row() {
        let app = app();
        let (_, body) = send(app.clone(), form_request("GET", "/accounts/a-1/edit", "")).await;
        assert!(body.contains("hx-put='/accounts/a-1'"));

        let (_, body) = send(app, form_request("GET", "/accounts/a-1/cancel", "")).await;
        assert!(!body.contains("hx-put='/accounts/a-1'"));
        assert!(body.contains("hx-get='/accounts/a-1/edit'"));
    }

    #[tokio::test]
    async fn test_disabled_page_is_not_routed() {
        let mut config = Config::default();
        config.pages.enabled = vec!["funds".to_string()];
        let pages = build_pages(&config, &ledger()).unwrap();
        let app = create_router(AppState::new(pages));

        let (status, _) = send(app.clone(), Request::get("/accounts").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(app, Request::get("/funds").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
    }
}
