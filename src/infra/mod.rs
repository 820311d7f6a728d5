//! Infrastructure adapters and runtime bootstrap.

pub mod backends;
pub mod bootstrap;
pub mod compiler;
pub mod error;
pub mod http;
pub mod telemetry;
