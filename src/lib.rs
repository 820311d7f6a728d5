//! Pluggable view resolution for web rendering pipelines.
//!
//! A [`View`](application::View) resolves its compiled template through an
//! injected [`ViewBackend`](application::ViewBackend) instead of reading a
//! file from disk, then runs the template with the caller's render options.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
