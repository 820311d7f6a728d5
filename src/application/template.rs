use std::{
    any::Any,
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use thiserror::Error;

use crate::domain::RenderOptions;

type TemplateFn = dyn Fn(&RenderOptions) -> Result<String, TemplateError> + Send + Sync;

/// Failure raised while a compiled template produces its output.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template `{name}` failed: {message}")]
    Render { name: String, message: String },
    #[error("template panicked: {message}")]
    Panicked { message: String },
}

impl TemplateError {
    pub fn render(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Render {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// A callable that turns render options into output text.
///
/// Cloning is cheap; every clone shares the same underlying closure. The
/// producing backend owns whatever state the closure captured, and a view only
/// holds its handle for the duration of one render.
#[derive(Clone)]
pub struct CompiledTemplate {
    inner: Arc<TemplateFn>,
}

impl CompiledTemplate {
    pub fn new<F>(render: F) -> Self
    where
        F: Fn(&RenderOptions) -> Result<String, TemplateError> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(render),
        }
    }

    /// Wrap a template that cannot fail.
    pub fn infallible<F>(render: F) -> Self
    where
        F: Fn(&RenderOptions) -> String + Send + Sync + 'static,
    {
        Self::new(move |options| Ok(render(options)))
    }

    /// Run the template with `options`.
    ///
    /// Panics inside the template are caught and reported as
    /// [`TemplateError::Panicked`] so the outcome always reaches the caller as
    /// a value.
    pub fn invoke(&self, options: &RenderOptions) -> Result<String, TemplateError> {
        let render = AssertUnwindSafe(|| (self.inner)(options));
        match catch_unwind(render) {
            Ok(result) => result,
            Err(payload) => Err(TemplateError::Panicked {
                message: panic_message(payload.as_ref()),
            }),
        }
    }
}

impl fmt::Debug for CompiledTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledTemplate").finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
