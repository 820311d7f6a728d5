use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, warn};

use crate::{
    application::{BackendError, CompiledTemplate, Lookup, ViewBackend},
    infra::compiler::TemplateCompiler,
};

/// Source of raw template text keyed by view name.
#[async_trait]
pub trait ViewSourceStore: Send + Sync {
    async fn fetch_source(&self, name: &str) -> Result<Option<String>, BackendError>;
}

/// Reads view sources from the `views` table.
#[derive(Clone)]
pub struct PostgresViewStore {
    pool: Arc<PgPool>,
}

impl PostgresViewStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(self.pool.as_ref()).await
    }
}

#[async_trait]
impl ViewSourceStore for PostgresViewStore {
    async fn fetch_source(&self, name: &str) -> Result<Option<String>, BackendError> {
        sqlx::query_scalar::<_, String>("SELECT source FROM views WHERE name = $1")
            .bind(name)
            .fetch_optional(self.pool.as_ref())
            .await
            .map_err(map_sqlx_error)
    }
}

fn map_sqlx_error(err: sqlx::Error) -> BackendError {
    match err {
        sqlx::Error::PoolTimedOut => BackendError::unavailable("database pool timed out"),
        sqlx::Error::PoolClosed => BackendError::unavailable("database pool closed"),
        sqlx::Error::Io(io) => BackendError::unavailable(format!("database io error: {io}")),
        other => BackendError::store(other.to_string()),
    }
}

/// Queries a [`ViewSourceStore`] by name and compiles what it returns.
pub struct StoreBackend<S> {
    store: S,
    compiler: Arc<dyn TemplateCompiler>,
}

impl<S: ViewSourceStore> StoreBackend<S> {
    pub fn new(store: S, compiler: Arc<dyn TemplateCompiler>) -> Self {
        Self { store, compiler }
    }
}

#[async_trait]
impl<S: ViewSourceStore> ViewBackend for StoreBackend<S> {
    async fn resolve(&self, lookup: &Lookup<'_>) -> Result<Option<CompiledTemplate>, BackendError> {
        let key = lookup.qualified_name();
        let Some(source) = self.store.fetch_source(&key).await? else {
            debug!(
                target = "synthview::backend::store",
                key = %key,
                "view not present in store"
            );
            return Ok(None);
        };

        self.compiler
            .compile(&key, &source)
            .map(Some)
            .map_err(|err| {
                warn!(
                    target = "synthview::backend::store",
                    key = %key,
                    error = %err,
                    "stored view failed to compile"
                );
                BackendError::compile(err.name, err.message)
            })
    }

    fn kind(&self) -> &'static str {
        "store"
    }
}
