//! HTTP surface over [`CompanySyncService`].
//!
//! Handlers only translate requests; every rule lives in [`crate::sync`].

pub mod error;
pub mod handlers;

use axum::{
    Router,
    routing::{get, patch, put},
};
use tower_http::trace::TraceLayer;

use crate::sync::CompanySyncService;

pub fn build_router(service: CompanySyncService) -> Router {
    Router::new()
        .route("/healthcheck", get(handlers::healthcheck))
        .route("/company/:company_number", get(handlers::get_profile))
        .route(
            "/company/:company_number/internal",
            put(handlers::put_profile).delete(handlers::delete_profile),
        )
        .route("/company/:company_number/links", get(handlers::get_links))
        .route(
            "/company/:company_number/links/:link_type",
            patch(handlers::add_link),
        )
        .route(
            "/company/:company_number/links/:link_type/delete",
            patch(handlers::delete_link),
        )
        .route(
            "/company/:company_number/uk-establishments",
            get(handlers::get_uk_establishments),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}
