use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::{application::error::HttpError, domain::RenderOptions};

use super::{HttpState, middleware::ViewContext};

const INDEX_VIEW: &str = "home";

pub(super) async fn render_index(
    State(state): State<HttpState>,
    Query(query): Query<Vec<(String, String)>>,
) -> Response {
    render(&state, INDEX_VIEW, query.into_iter().collect()).await
}

pub(super) async fn render_with_query(
    State(state): State<HttpState>,
    Path(name): Path<String>,
    Query(query): Query<Vec<(String, String)>>,
) -> Response {
    render(&state, &name, query.into_iter().collect()).await
}

pub(super) async fn render_with_body(
    State(state): State<HttpState>,
    Path(name): Path<String>,
    Json(options): Json<RenderOptions>,
) -> Response {
    render(&state, &name, options).await
}

pub(super) async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn render(state: &HttpState, name: &str, options: RenderOptions) -> Response {
    let (view_name, mut response) = match state.views.create(name) {
        Ok(view) => {
            let response = match view.render(&options).await {
                Ok(html) => (StatusCode::OK, Html(html)).into_response(),
                Err(err) => HttpError::from(err).into_response(),
            };
            (view.name().to_string(), response)
        }
        Err(err) => (name.to_string(), HttpError::from(err).into_response()),
    };

    response.extensions_mut().insert(ViewContext {
        view: view_name,
        backend: state.views.backend_kind(),
    });
    response
}
