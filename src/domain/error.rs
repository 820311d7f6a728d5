use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("view name must not be empty")]
    EmptyViewName,
    #[error("view name `{name}` is not allowed: {reason}")]
    InvalidViewName { name: String, reason: &'static str },
}

impl DomainError {
    pub fn invalid_view_name(name: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidViewName {
            name: name.into(),
            reason,
        }
    }
}
