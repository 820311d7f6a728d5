//! Compile step for template sources fetched at runtime.

use std::sync::Arc;

use minijinja::{AutoEscape, Environment};
use thiserror::Error;

use crate::application::{CompiledTemplate, TemplateError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("failed to compile template `{name}`: {message}")]
pub struct CompileError {
    pub name: String,
    pub message: String,
}

impl CompileError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Turns template source text into a [`CompiledTemplate`].
pub trait TemplateCompiler: Send + Sync {
    fn compile(&self, name: &str, source: &str) -> Result<CompiledTemplate, CompileError>;
}

/// Jinja-syntax compiler backed by `minijinja`.
///
/// Each compiled template owns a private environment, so templates never see
/// each other and dropping the last handle frees the parsed source.
#[derive(Debug, Clone, Copy)]
pub struct MiniJinjaCompiler {
    escape_html: bool,
}

impl Default for MiniJinjaCompiler {
    fn default() -> Self {
        Self { escape_html: true }
    }
}

impl MiniJinjaCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit values verbatim instead of HTML-escaping them.
    pub fn without_escaping() -> Self {
        Self { escape_html: false }
    }
}

impl TemplateCompiler for MiniJinjaCompiler {
    fn compile(&self, name: &str, source: &str) -> Result<CompiledTemplate, CompileError> {
        let mut env = Environment::new();
        let escape = if self.escape_html {
            AutoEscape::Html
        } else {
            AutoEscape::None
        };
        env.set_auto_escape_callback(move |_| escape.clone());
        env.add_template_owned(name.to_string(), source.to_string())
            .map_err(|err| CompileError::new(name, err.to_string()))?;

        let env = Arc::new(env);
        let name = name.to_string();
        Ok(CompiledTemplate::new(move |options| {
            let template = env
                .get_template(&name)
                .map_err(|err| TemplateError::render(&name, err.to_string()))?;
            template
                .render(options.as_map())
                .map_err(|err| TemplateError::render(&name, err.to_string()))
        }))
    }
}
