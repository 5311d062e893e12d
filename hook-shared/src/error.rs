use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HookError {
    #[error("Hook install: {0}")]
    Install(String),
    #[error("Procedure replacement: {0}")]
    Replace(String),
    #[error("Delivery timed out after {0:?}")]
    Timeout(Duration),
    #[error("Window not found: {0}")]
    WindowGone(String),
    #[error("Shared configuration not ready")]
    NotConfigured,
}

pub type HookResult<T> = Result<T, HookError>;
