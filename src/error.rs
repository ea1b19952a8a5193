use thiserror::Error;

/// Application-wide result type alias.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// I/O errors from scene or config file access.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Terminal initialization or rendering errors.
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// Malformed scene snapshot file.
    #[error("Scene error: {0}")]
    Scene(String),

    /// No accessible root could be discovered in a UI context.
    #[error("No visible root in context {0}")]
    RootDiscovery(usize),

    /// Attempt to rebind a property that cannot take a binding.
    #[error("Property '{0}' is read-only and cannot be rebound")]
    ReadOnlyProperty(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Scene(err.to_string())
    }
}
