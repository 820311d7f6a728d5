//! HTTP host that resolves and renders views per request.

mod middleware;
mod views;

use std::sync::Arc;

use axum::{Router, middleware as axum_middleware, routing::get};

use crate::application::ViewFactory;

pub use middleware::{REQUEST_ID_HEADER, RequestContext, ViewContext};

#[derive(Clone)]
pub struct HttpState {
    pub views: Arc<ViewFactory>,
}

impl HttpState {
    pub fn new(views: ViewFactory) -> Self {
        Self {
            views: Arc::new(views),
        }
    }
}

/// `GET /` renders `home`; `GET /views/{name}` takes render options from the
/// query string and `POST /views/{name}` from a JSON object body.
pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(views::render_index))
        .route(
            "/views/{*name}",
            get(views::render_with_query).post(views::render_with_body),
        )
        .route("/_health", get(views::health))
        .with_state(state)
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}
