//! Process-wide registry of compiled templates.
//!
//! The registry is built once at startup (usually from a directory of
//! template sources), installed into a global cell, and only read afterwards.
//! There is no teardown; it lives for the rest of the process.

use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::{
    application::{BackendError, CompiledTemplate, Lookup, ViewBackend},
    infra::compiler::{CompileError, TemplateCompiler},
};

const TEMPLATE_EXTENSIONS: &[&str] = &["html", "jinja", "j2"];

static REGISTRY: OnceCell<Arc<TemplateRegistry>> = OnceCell::new();

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("template registry already installed")]
    AlreadyInstalled,
    #[error("failed to read `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("template path `{path}` is not valid UTF-8")]
    NonUtf8Path { path: PathBuf },
    #[error(transparent)]
    Compile(#[from] CompileError),
}

impl RegistryError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn walk(dir: &Path, err: walkdir::Error) -> Self {
        let path = err.path().unwrap_or(dir).to_path_buf();
        let source = err
            .into_io_error()
            .unwrap_or_else(|| io::Error::other("filesystem loop detected"));
        Self::Io { path, source }
    }
}

/// Immutable `name -> template` map.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, CompiledTemplate>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, name: impl Into<String>, template: CompiledTemplate) -> Self {
        self.templates.insert(name.into(), template);
        self
    }

    /// Compile every template file below `dir`.
    ///
    /// Entries are named by their path relative to `dir`, using `/` as the
    /// separator and without the file extension: `dir/errors/404.html`
    /// becomes `errors/404`. Only `.html`, `.jinja` and `.j2` files are
    /// compiled; everything else is skipped.
    pub fn load_dir(dir: &Path, compiler: &dyn TemplateCompiler) -> Result<Self, RegistryError> {
        let mut registry = Self::new();

        for entry in WalkDir::new(dir).follow_links(true) {
            let entry = entry.map_err(|err| RegistryError::walk(dir, err))?;
            if !entry.file_type().is_file() || !has_template_extension(entry.path()) {
                continue;
            }

            let path = entry.path();
            let name = registry_name(dir, path)?;
            let source = fs::read_to_string(path).map_err(|err| RegistryError::io(path, err))?;
            let template = compiler.compile(&name, &source)?;
            debug!(
                target = "synthview::backend::memory",
                name = %name,
                path = %path.display(),
                "template compiled"
            );
            registry.templates.insert(name, template);
        }

        info!(
            target = "synthview::backend::memory",
            dir = %dir.display(),
            count = registry.len(),
            "template registry loaded"
        );
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<&CompiledTemplate> {
        self.templates.get(name)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }
}

fn has_template_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| TEMPLATE_EXTENSIONS.contains(&ext))
}

fn registry_name(dir: &Path, path: &Path) -> Result<String, RegistryError> {
    let relative = path.strip_prefix(dir).unwrap_or(path).with_extension("");
    let segments = relative
        .components()
        .map(|component| {
            component
                .as_os_str()
                .to_str()
                .ok_or_else(|| RegistryError::NonUtf8Path {
                    path: path.to_path_buf(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(segments.join("/"))
}

/// Install `registry` as the process-wide registry. Succeeds once per process.
pub fn install_registry(registry: TemplateRegistry) -> Result<(), RegistryError> {
    REGISTRY
        .set(Arc::new(registry))
        .map_err(|_| RegistryError::AlreadyInstalled)
}

/// The installed registry, if any.
pub fn installed_registry() -> Option<Arc<TemplateRegistry>> {
    REGISTRY.get().cloned()
}

/// Resolves names against a [`TemplateRegistry`] keyed by `root/name`.
pub struct MemoryBackend {
    registry: Arc<TemplateRegistry>,
}

impl MemoryBackend {
    pub fn new(registry: Arc<TemplateRegistry>) -> Self {
        Self { registry }
    }

    /// Backend over the process-wide registry.
    pub fn global() -> Result<Self, BackendError> {
        installed_registry()
            .map(Self::new)
            .ok_or_else(|| BackendError::unavailable("template registry is not installed"))
    }
}

#[async_trait]
impl ViewBackend for MemoryBackend {
    async fn resolve(&self, lookup: &Lookup<'_>) -> Result<Option<CompiledTemplate>, BackendError> {
        let key = lookup.qualified_name();
        let template = self.registry.get(&key).cloned();
        debug!(
            target = "synthview::backend::memory",
            key = %key,
            hit = template.is_some(),
            "registry lookup"
        );
        Ok(template)
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}
