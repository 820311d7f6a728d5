//! Domain layer types and invariants.

pub mod error;
pub mod options;
pub mod view_name;

pub use options::RenderOptions;
