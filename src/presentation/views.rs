//! Views compiled into the binary with askama.
//!
//! Each template struct is built from the render options and registered in a
//! [`ModuleTable`] so the module backend can serve it by name.

use askama::Template;

use crate::{
    application::{CompiledTemplate, TemplateError, qualified_name},
    domain::RenderOptions,
    infra::backends::ModuleTable,
};

const DEFAULT_USER: &str = "guest";
const DEFAULT_TITLE: &str = "Welcome";
const DEFAULT_SITE_NAME: &str = "synthview";

/// Names of the views shipped with the binary.
pub const BUILTIN_VIEWS: &[&str] = &["home", "about", "errors/not_found"];

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub title: String,
    pub user: String,
}

impl HomeTemplate {
    pub fn from_options(options: &RenderOptions) -> Self {
        Self {
            title: options.str("title").unwrap_or(DEFAULT_TITLE).to_string(),
            user: options.str("user").unwrap_or(DEFAULT_USER).to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "about.html")]
pub struct AboutTemplate {
    pub site_name: String,
}

impl AboutTemplate {
    pub fn from_options(options: &RenderOptions) -> Self {
        Self {
            site_name: options
                .str("site_name")
                .unwrap_or(DEFAULT_SITE_NAME)
                .to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "errors/not_found.html")]
pub struct NotFoundTemplate {
    pub path: String,
}

impl NotFoundTemplate {
    pub fn from_options(options: &RenderOptions) -> Self {
        Self {
            path: options.str("path").unwrap_or_default().to_string(),
        }
    }
}

fn compiled<T, F>(name: &'static str, build: F) -> CompiledTemplate
where
    T: Template,
    F: Fn(&RenderOptions) -> T + Send + Sync + 'static,
{
    CompiledTemplate::new(move |options| {
        build(options)
            .render()
            .map_err(|err| TemplateError::render(name, err.to_string()))
    })
}

/// Module table holding every built-in view, keyed under `root`.
pub fn builtin_module_table(root: Option<&str>) -> ModuleTable {
    ModuleTable::new()
        .register(
            qualified_name(root, "home"),
            compiled("home", HomeTemplate::from_options),
        )
        .register(
            qualified_name(root, "about"),
            compiled("about", AboutTemplate::from_options),
        )
        .register(
            qualified_name(root, "errors/not_found"),
            compiled("errors/not_found", NotFoundTemplate::from_options),
        )
}
