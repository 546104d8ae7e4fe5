//! Route modules for the API server
//!
//! - entities: list pages, HTMX mutations and the JSON collection endpoint
//!
//! Each module follows a consistent structure:
//! - mod.rs: Module declaration, exports and the router
//! - api.rs: JSON API endpoints
//! - page.rs: HTMX page rendering

pub mod entities;
