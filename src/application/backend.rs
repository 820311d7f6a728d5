//! The seam between a view and wherever its compiled template comes from.

use async_trait::async_trait;
use thiserror::Error;

use super::template::CompiledTemplate;
use crate::domain::RenderOptions;

/// Borrowed description of a single resolution request.
#[derive(Debug, Clone, Copy)]
pub struct Lookup<'a> {
    /// Name of the view being resolved.
    pub name: &'a str,
    /// Base namespace configured on the view, if any.
    pub root: Option<&'a str>,
    /// Render options of the pending render, for context-dependent resolution.
    pub options: &'a RenderOptions,
}

impl<'a> Lookup<'a> {
    pub fn new(name: &'a str, root: Option<&'a str>, options: &'a RenderOptions) -> Self {
        Self {
            name,
            root,
            options,
        }
    }

    /// `root/name`, or just `name` when no root is configured.
    pub fn qualified_name(&self) -> String {
        qualified_name(self.root, self.name)
    }
}

/// Key under which backends store `name` for the given root.
pub fn qualified_name(root: Option<&str>, name: &str) -> String {
    match root.map(|root| root.trim_end_matches('/')) {
        Some(root) if !root.is_empty() => format!("{root}/{name}"),
        _ => name.to_string(),
    }
}

/// Errors reported by a backend. Views propagate these untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("view backend unavailable: {message}")]
    Unavailable { message: String },
    #[error("view store error: {message}")]
    Store { message: String },
    #[error("remote view service returned {status} for {url}")]
    Remote { status: u16, url: String },
    #[error("remote view request failed: {message}")]
    Transport { message: String },
    #[error("failed to compile view `{name}`: {message}")]
    Compile { name: String, message: String },
}

impl BackendError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn compile(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Compile {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Resolves a view name to a compiled template.
///
/// Implementations make a single attempt. `Ok(None)` means the backend
/// answered but has no template under that name.
#[async_trait]
pub trait ViewBackend: Send + Sync {
    async fn resolve(&self, lookup: &Lookup<'_>) -> Result<Option<CompiledTemplate>, BackendError>;

    /// Short identifier used in logs.
    fn kind(&self) -> &'static str;
}
