//! Wire the configured backend into a [`ViewFactory`].

use std::sync::Arc;

use tracing::info;

use crate::{
    application::{ViewBackend, ViewFactory},
    config::{BackendSettings, ViewSettings},
    presentation::views::builtin_module_table,
};

use super::{
    backends::{
        MemoryBackend, ModuleTableBackend, PostgresViewStore, RemoteBackend, StoreBackend,
        TemplateRegistry, install_registry,
    },
    compiler::{MiniJinjaCompiler, TemplateCompiler},
    error::InfraError,
};

/// Build the backend selected by `settings` and wrap it in a factory.
///
/// The memory backend installs the process-wide registry, so it can be built
/// at most once per process.
pub async fn build_view_factory(settings: &ViewSettings) -> Result<ViewFactory, InfraError> {
    let backend = build_backend(settings).await?;
    info!(
        target = "synthview::bootstrap",
        backend = backend.kind(),
        root = settings.root.as_deref().unwrap_or(""),
        "view backend ready"
    );
    Ok(ViewFactory::new(settings.root.clone(), backend))
}

async fn build_backend(settings: &ViewSettings) -> Result<Arc<dyn ViewBackend>, InfraError> {
    let compiler: Arc<dyn TemplateCompiler> = Arc::new(MiniJinjaCompiler::new());

    let backend: Arc<dyn ViewBackend> = match &settings.backend {
        BackendSettings::Module => Arc::new(ModuleTableBackend::new(builtin_module_table(
            settings.root.as_deref(),
        ))),
        BackendSettings::Memory { directory } => {
            let directory = directory.clone();
            let registry = tokio::task::spawn_blocking(move || {
                TemplateRegistry::load_dir(&directory, &MiniJinjaCompiler::new())
            })
            .await
            .map_err(|err| InfraError::configuration(format!("registry loader failed: {err}")))??;
            install_registry(registry)?;
            let backend = MemoryBackend::global()
                .map_err(|err| InfraError::configuration(err.to_string()))?;
            Arc::new(backend)
        }
        BackendSettings::Store {
            database_url,
            max_connections,
        } => {
            let pool = PostgresViewStore::connect(database_url, max_connections.get())
                .await
                .map_err(|err| InfraError::database(format!("failed to connect: {err}")))?;
            let store = PostgresViewStore::new(pool);
            store
                .migrate()
                .await
                .map_err(|err| InfraError::database(format!("failed to migrate: {err}")))?;
            Arc::new(StoreBackend::new(store, compiler))
        }
        BackendSettings::Remote { base_url, timeout } => {
            Arc::new(RemoteBackend::new(base_url.clone(), *timeout, compiler)?)
        }
    };

    Ok(backend)
}
