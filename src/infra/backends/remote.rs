use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};
use url::Url;

use crate::{
    application::{BackendError, CompiledTemplate, Lookup, ViewBackend},
    infra::{compiler::TemplateCompiler, error::InfraError},
};

/// Fetches template sources from a remote content service with one GET per
/// lookup and compiles the response body.
///
/// `base_url` is treated as a directory: `https://cdn.example/views` and
/// `https://cdn.example/views/` both resolve `home` to
/// `https://cdn.example/views/home`.
pub struct RemoteBackend {
    client: Client,
    base_url: Url,
    compiler: Arc<dyn TemplateCompiler>,
}

impl RemoteBackend {
    pub fn new(
        base_url: Url,
        timeout: Duration,
        compiler: Arc<dyn TemplateCompiler>,
    ) -> Result<Self, InfraError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| InfraError::http_client(format!("failed to build client: {err}")))?;
        Ok(Self::with_client(client, base_url, compiler))
    }

    pub fn with_client(
        client: Client,
        mut base_url: Url,
        compiler: Arc<dyn TemplateCompiler>,
    ) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            client,
            base_url,
            compiler,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append each `/`-separated part of `key` as its own path segment.
    /// Segments are percent-encoded, so `%2e%2e`, `?` and `#` stay inside
    /// the path below `base_url`.
    fn view_url(&self, key: &str) -> Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                BackendError::transport(format!("base url `{}` cannot hold a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(key.split('/'));
        Ok(url)
    }
}

#[async_trait]
impl ViewBackend for RemoteBackend {
    async fn resolve(&self, lookup: &Lookup<'_>) -> Result<Option<CompiledTemplate>, BackendError> {
        let key = lookup.qualified_name();
        let url = self.view_url(&key)?;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| {
                let message = if err.is_timeout() {
                    format!("request to {url} timed out")
                } else {
                    format!("request to {url} failed: {err}")
                };
                warn!(
                    target = "synthview::backend::remote",
                    key = %key,
                    error = %message,
                    "remote view request failed"
                );
                BackendError::transport(message)
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(
                target = "synthview::backend::remote",
                key = %key,
                url = %url,
                "remote service has no such view"
            );
            return Ok(None);
        }
        if !status.is_success() {
            return Err(BackendError::Remote {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let source = response.text().await.map_err(|err| {
            BackendError::transport(format!("failed to read body from {url}: {err}"))
        })?;
        debug!(
            target = "synthview::backend::remote",
            key = %key,
            bytes = source.len(),
            "remote view fetched"
        );

        self.compiler
            .compile(&key, &source)
            .map(Some)
            .map_err(|err| BackendError::compile(err.name, err.message))
    }

    fn kind(&self) -> &'static str {
        "remote"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{domain::view_name::normalize_view_name, infra::compiler::MiniJinjaCompiler};

    fn backend(base: &str) -> RemoteBackend {
        RemoteBackend::with_client(
            Client::new(),
            Url::parse(base).expect("valid url"),
            Arc::new(MiniJinjaCompiler::new()),
        )
    }

    #[test]
    fn base_url_gains_a_trailing_slash() {
        let backend = backend("https://content.example/views");
        assert_eq!(backend.base_url().as_str(), "https://content.example/views/");
    }

    #[test]
    fn view_urls_nest_under_the_base() {
        let backend = backend("https://content.example/views/");
        assert_eq!(
            backend.view_url("site/home").expect("joins").as_str(),
            "https://content.example/views/site/home"
        );
    }

    #[test]
    fn encoded_and_reserved_characters_stay_in_the_path() {
        let backend = backend("https://content.example/views/");
        for raw in ["%2e%2e/admin", "home?debug=1", "home#frag"] {
            let name = normalize_view_name(raw).expect("passes name validation");
            let url = backend.view_url(name).expect("builds");
            assert_eq!(url.host_str(), Some("content.example"), "{raw}");
            assert!(url.path().starts_with("/views/"), "{raw} -> {url}");
            assert_eq!(url.query(), None, "{raw} -> {url}");
            assert_eq!(url.fragment(), None, "{raw} -> {url}");
        }

        let url = backend.view_url("%2e%2e/admin").expect("builds");
        assert_eq!(url.as_str(), "https://content.example/views/%252e%252e/admin");
    }

    #[test]
    fn scheme_like_names_stay_under_the_base() {
        let backend = backend("https://content.example/views/");
        let url = backend.view_url("https:evil.example").expect("joins");
        assert_eq!(url.host_str(), Some("content.example"));
        assert!(url.path().starts_with("/views/"));
    }
}
