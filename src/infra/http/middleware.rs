use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
}

/// Which view a handler tried to render, attached to its response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewContext {
    pub view: String,
    pub backend: &'static str,
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let ctx = RequestContext {
        request_id: request_id.clone(),
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response.extensions_mut().insert(ctx);
    response
}

pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = start.elapsed().as_millis();
    let (view, backend) = response
        .extensions()
        .get::<ViewContext>()
        .map(|ctx| (ctx.view.clone(), ctx.backend))
        .unwrap_or_default();

    if !(status.is_client_error() || status.is_server_error()) {
        if !view.is_empty() {
            info!(
                target = "synthview::http::response",
                status = status.as_u16(),
                view = %view,
                backend,
                elapsed_ms,
                request_id = %request_id,
                "view served",
            );
        }
        return response;
    }

    let (source, messages) = match response.extensions_mut().remove::<ErrorReport>() {
        Some(report) => (report.source, report.messages),
        None => ("unknown", Vec::new()),
    };
    let detail = messages
        .first()
        .cloned()
        .unwrap_or_else(|| "no diagnostic available".to_string());

    if status.is_server_error() {
        error!(
            target = "synthview::http::response",
            status = status.as_u16(),
            method = %method,
            path = %path,
            view = %view,
            backend,
            elapsed_ms,
            source,
            detail = %detail,
            chain = ?messages,
            request_id = %request_id,
            "view request failed",
        );
    } else {
        warn!(
            target = "synthview::http::response",
            status = status.as_u16(),
            method = %method,
            path = %path,
            view = %view,
            backend,
            elapsed_ms,
            source,
            detail = %detail,
            request_id = %request_id,
            "view request rejected",
        );
    }

    response
}
