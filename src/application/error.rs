use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    application::{backend::BackendError, view::ViewError},
    domain::error::DomainError,
    infra::error::InfraError,
};

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

impl From<ViewError> for HttpError {
    fn from(error: ViewError) -> Self {
        const SOURCE: &str = "application::error::view_error_to_http_error";
        match &error {
            ViewError::NotFound { .. } => {
                HttpError::from_error(SOURCE, StatusCode::NOT_FOUND, "View not found", &error)
            }
            ViewError::Backend(BackendError::Transport { .. })
            | ViewError::Backend(BackendError::Remote { .. })
            | ViewError::Backend(BackendError::Store { .. })
            | ViewError::Backend(BackendError::Unavailable { .. }) => HttpError::from_error(
                SOURCE,
                StatusCode::BAD_GATEWAY,
                "View backend unavailable",
                &error,
            ),
            ViewError::Backend(BackendError::Compile { .. }) | ViewError::Template(_) => {
                HttpError::from_error(
                    SOURCE,
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Template rendering failed",
                    &error,
                )
            }
        }
    }
}

impl From<DomainError> for HttpError {
    fn from(error: DomainError) -> Self {
        HttpError::from_error(
            "application::error::domain_error_to_http_error",
            StatusCode::NOT_FOUND,
            "View not found",
            &error,
        )
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    View(#[from] ViewError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_errors_map_to_distinct_statuses() {
        let not_found: HttpError = ViewError::NotFound {
            path: "home".into(),
        }
        .into();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let backend: HttpError = ViewError::Backend(BackendError::unavailable("db down")).into();
        assert_eq!(backend.status(), StatusCode::BAD_GATEWAY);

        let compile: HttpError =
            ViewError::Backend(BackendError::compile("home", "unexpected `}`")).into();
        assert_eq!(compile.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn error_report_attaches_the_message_chain() {
        let error = ViewError::NotFound {
            path: "home".into(),
        };
        let response = HttpError::from(error).into_response();
        let report = response
            .extensions()
            .get::<ErrorReport>()
            .expect("report attached");
        assert_eq!(report.source, "application::error::view_error_to_http_error");
        assert_eq!(report.messages, vec!["failed to lookup view \"home\"".to_string()]);
    }
}
