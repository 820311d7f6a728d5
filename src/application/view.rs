//! Named views resolved through a pluggable backend.
//!
//! A [`View`] is created per render by the hosting router (via
//! [`ViewFactory`]), asks its backend for a compiled template under its own
//! path, and runs that template with the caller's options. It holds no state
//! beyond its name and root, so rendering the same view twice with the same
//! options against a deterministic backend yields the same output.

use std::{sync::Arc, time::Instant};

use metrics::{counter, histogram};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::{
    backend::{BackendError, Lookup, ViewBackend},
    template::{CompiledTemplate, TemplateError},
};
use crate::domain::{RenderOptions, error::DomainError, view_name::normalize_view_name};

pub const METRIC_VIEW_RENDER_TOTAL: &str = "synthview_view_render_total";
pub const METRIC_VIEW_LOOKUP_MS: &str = "synthview_view_lookup_ms";

#[derive(Debug, Error)]
pub enum ViewError {
    /// The backend failed; its error is passed through as-is.
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("failed to lookup view \"{path}\"")]
    NotFound { path: String },
    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl ViewError {
    fn outcome(&self) -> &'static str {
        match self {
            ViewError::Backend(_) => "backend_error",
            ViewError::NotFound { .. } => "not_found",
            ViewError::Template(_) => "template_error",
        }
    }
}

/// Construction options for a [`View`].
#[derive(Clone)]
pub struct ViewOptions {
    /// Base namespace handed to the backend on every lookup.
    pub root: Option<String>,
    pub backend: Arc<dyn ViewBackend>,
}

impl ViewOptions {
    pub fn new(backend: Arc<dyn ViewBackend>) -> Self {
        Self {
            root: None,
            backend,
        }
    }

    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = Some(root.into());
        self
    }
}

pub struct View {
    name: String,
    path: String,
    root: Option<String>,
    backend: Arc<dyn ViewBackend>,
}

impl View {
    /// Create a view for `name`. The name is expected to be non-empty; callers
    /// accepting untrusted input go through [`ViewFactory::create`].
    pub fn new(name: impl Into<String>, options: ViewOptions) -> Self {
        let name = name.into();
        Self {
            path: name.clone(),
            name,
            root: options.root,
            backend: options.backend,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Always equal to [`View::name`]; hosts treat a view without a path as invalid.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    /// Resolve `name` to a compiled template with a single backend call.
    pub async fn lookup(
        &self,
        name: &str,
        options: &RenderOptions,
    ) -> Result<Option<CompiledTemplate>, BackendError> {
        let lookup = Lookup::new(name, self.root.as_deref(), options);
        let started_at = Instant::now();
        let result = self.backend.resolve(&lookup).await;
        histogram!(METRIC_VIEW_LOOKUP_MS, "backend" => self.backend.kind())
            .record(started_at.elapsed().as_secs_f64() * 1000.0);
        result
    }

    /// Look up this view's own path and run the template with `options`.
    #[instrument(
        level = "debug",
        skip_all,
        fields(view = %self.path, backend = self.backend.kind())
    )]
    pub async fn render(&self, options: &RenderOptions) -> Result<String, ViewError> {
        let result = self.render_inner(options).await;
        let outcome = match &result {
            Ok(_) => "ok",
            Err(err) => err.outcome(),
        };
        counter!(METRIC_VIEW_RENDER_TOTAL, "outcome" => outcome).increment(1);

        match &result {
            Ok(output) => debug!(
                target = "synthview::view",
                bytes = output.len(),
                "view rendered"
            ),
            Err(err) => warn!(
                target = "synthview::view",
                outcome,
                error = %err,
                "view render failed"
            ),
        }
        result
    }

    /// Callback-style render: `done` receives the single outcome of the render.
    pub async fn render_with<F>(&self, options: &RenderOptions, done: F)
    where
        F: FnOnce(Result<String, ViewError>),
    {
        done(self.render(options).await);
    }

    async fn render_inner(&self, options: &RenderOptions) -> Result<String, ViewError> {
        let template = self
            .lookup(&self.path, options)
            .await?
            .ok_or_else(|| ViewError::NotFound {
                path: self.path.clone(),
            })?;
        Ok(template.invoke(options)?)
    }
}

/// Creates a fresh [`View`] per request, sharing one root and backend.
#[derive(Clone)]
pub struct ViewFactory {
    root: Option<String>,
    backend: Arc<dyn ViewBackend>,
}

impl ViewFactory {
    pub fn new(root: Option<String>, backend: Arc<dyn ViewBackend>) -> Self {
        Self { root, backend }
    }

    pub fn backend_kind(&self) -> &'static str {
        self.backend.kind()
    }

    /// Validate `name` and build a view for it.
    pub fn create(&self, name: &str) -> Result<View, DomainError> {
        let name = normalize_view_name(name)?;
        let options = ViewOptions {
            root: self.root.clone(),
            backend: Arc::clone(&self.backend),
        };
        Ok(View::new(name, options))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use async_trait::async_trait;

    use super::*;

    /// Backend returning a fixed answer and recording what it was asked.
    struct ScriptedBackend {
        answer: Result<Option<CompiledTemplate>, BackendError>,
        calls: AtomicUsize,
        seen: Mutex<Vec<(String, Option<String>, RenderOptions)>>,
    }

    impl ScriptedBackend {
        fn new(answer: Result<Option<CompiledTemplate>, BackendError>) -> Arc<Self> {
            Arc::new(Self {
                answer,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ViewBackend for ScriptedBackend {
        async fn resolve(
            &self,
            lookup: &Lookup<'_>,
        ) -> Result<Option<CompiledTemplate>, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().expect("lock").push((
                lookup.name.to_string(),
                lookup.root.map(str::to_string),
                lookup.options.clone(),
            ));
            self.answer.clone()
        }

        fn kind(&self) -> &'static str {
            "scripted"
        }
    }

    fn greeting() -> CompiledTemplate {
        CompiledTemplate::infallible(|options| {
            format!("Hello {}", options.str("user").unwrap_or_default())
        })
    }

    fn view(name: &str, backend: Arc<ScriptedBackend>) -> View {
        View::new(name, ViewOptions::new(backend).with_root("views"))
    }

    #[test]
    fn path_equals_name() {
        let backend = ScriptedBackend::new(Ok(None));
        let view = View::new("home", ViewOptions::new(backend));
        assert_eq!(view.path(), "home");
        assert_eq!(view.name(), view.path());
        assert_eq!(view.root(), None);
    }

    #[tokio::test]
    async fn render_forwards_backend_error_without_invoking_template() {
        let backend = ScriptedBackend::new(Err(BackendError::unavailable("db down")));
        let view = view("home", backend.clone());

        let err = view
            .render(&RenderOptions::new())
            .await
            .expect_err("backend failure");

        assert!(matches!(
            &err,
            ViewError::Backend(BackendError::Unavailable { message }) if message == "db down"
        ));
        assert_eq!(err.to_string(), "view backend unavailable: db down");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn render_reports_missing_view_with_its_path() {
        let backend = ScriptedBackend::new(Ok(None));
        let view = view("home", backend);

        let err = view
            .render(&RenderOptions::new())
            .await
            .expect_err("missing view");

        assert!(matches!(&err, ViewError::NotFound { path } if path == "home"));
        assert_eq!(err.to_string(), "failed to lookup view \"home\"");
    }

    #[tokio::test]
    async fn render_invokes_template_with_options() {
        let backend = ScriptedBackend::new(Ok(Some(greeting())));
        let view = view("home", backend.clone());
        let options = RenderOptions::new().with("user", "Ann");

        let output = view.render(&options).await.expect("render");

        assert_eq!(output, "Hello Ann");
        let seen = backend.seen.lock().expect("lock");
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "home");
        assert_eq!(seen[0].1.as_deref(), Some("views"));
        assert_eq!(seen[0].2, options);
    }

    #[tokio::test]
    async fn render_routes_template_panics_through_the_result() {
        let exploding = CompiledTemplate::new(|_| panic!("bad template"));
        let backend = ScriptedBackend::new(Ok(Some(exploding)));
        let view = view("home", backend);

        let err = view
            .render(&RenderOptions::new())
            .await
            .expect_err("template failure");

        assert!(matches!(
            err,
            ViewError::Template(TemplateError::Panicked { ref message }) if message == "bad template"
        ));
    }

    #[tokio::test]
    async fn render_with_calls_back_exactly_once_per_outcome() {
        let answers = [
            Err(BackendError::unavailable("db down")),
            Ok(None),
            Ok(Some(greeting())),
        ];

        for answer in answers {
            let view = view("home", ScriptedBackend::new(answer));
            let calls = AtomicUsize::new(0);
            view.render_with(&RenderOptions::new(), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
            .await;
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn rendering_twice_yields_identical_output() {
        let backend = ScriptedBackend::new(Ok(Some(greeting())));
        let view = view("home", backend.clone());
        let options = RenderOptions::new().with("user", "Ann");

        let first = view.render(&options).await.expect("first render");
        let second = view.render(&options).await.expect("second render");

        assert_eq!(first, second);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn factory_creates_independent_views() {
        let backend = ScriptedBackend::new(Ok(None));
        let factory = ViewFactory::new(Some("views".to_string()), backend);

        let home = factory.create("/home").expect("valid name");
        let about = factory.create("about").expect("valid name");

        assert_eq!(home.path(), "home");
        assert_eq!(about.path(), "about");
        assert_eq!(home.root(), Some("views"));
        assert_eq!(factory.backend_kind(), "scripted");
    }

    #[test]
    fn factory_rejects_invalid_names() {
        let factory = ViewFactory::new(None, ScriptedBackend::new(Ok(None)));
        assert!(matches!(
            factory.create(""),
            Err(DomainError::EmptyViewName)
        ));
        assert!(matches!(
            factory.create("../etc/passwd"),
            Err(DomainError::InvalidViewName { .. })
        ));
    }
}
