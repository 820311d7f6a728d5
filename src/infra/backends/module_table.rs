use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use crate::application::{BackendError, CompiledTemplate, Lookup, ViewBackend};

/// Templates compiled into the binary, keyed by `root/name`.
#[derive(Debug, Clone, Default)]
pub struct ModuleTable {
    entries: HashMap<String, CompiledTemplate>,
}

impl ModuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `template` under `key`, replacing any previous entry.
    pub fn register(mut self, key: impl Into<String>, template: CompiledTemplate) -> Self {
        self.entries.insert(key.into(), template);
        self
    }

    pub fn get(&self, key: &str) -> Option<&CompiledTemplate> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

pub struct ModuleTableBackend {
    table: ModuleTable,
}

impl ModuleTableBackend {
    pub fn new(table: ModuleTable) -> Self {
        Self { table }
    }
}

#[async_trait]
impl ViewBackend for ModuleTableBackend {
    async fn resolve(&self, lookup: &Lookup<'_>) -> Result<Option<CompiledTemplate>, BackendError> {
        let key = lookup.qualified_name();
        let template = self.table.get(&key).cloned();
        debug!(
            target = "synthview::backend::module",
            key = %key,
            hit = template.is_some(),
            "module table lookup"
        );
        Ok(template)
    }

    fn kind(&self) -> &'static str {
        "module"
    }
}
