use thiserror::Error;

// Error message prefixes
const MSG_FAILED_TO_PREFIX: &str = "Failed to";
const MSG_INVALID_PREFIX: &str = "Invalid";

/// Result type for the migration tool
pub type Result<T> = std::result::Result<T, error_stack::Report<Error>>;

/// Stage-level errors. Field-level failures never surface here; they are recorded
/// inline against the field they belong to.
#[derive(Error)]
pub enum Error {
    #[error("Connection to Odoo failed: {0}")]
    Connectivity(String),

    #[error("Missing Odoo configuration: {}", missing.join(", "))]
    Configuration { missing: Vec<String> },

    #[error("Remote call failed: {0}")]
    RemoteCall(String),

    #[error("{0}")]
    PreconditionNotMet(String),

    #[error("File operation failed: {0}")]
    FileOperation(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Storage probe failed: {0}")]
    Storage(String),
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connectivity(s) => f.debug_tuple("Connectivity").field(s).finish(),
            Self::Configuration { missing } => f
                .debug_struct("Configuration")
                .field("missing", missing)
                .finish(),
            Self::RemoteCall(s) => f.debug_tuple("RemoteCall").field(s).finish(),
            Self::PreconditionNotMet(s) => f.debug_tuple("PreconditionNotMet").field(s).finish(),
            Self::FileOperation(s) => f.debug_tuple("FileOperation").field(s).finish(),
            Self::InvalidState(s) => f.debug_tuple("InvalidState").field(s).finish(),
            Self::InvalidArgument(s) => f.debug_tuple("InvalidArgument").field(s).finish(),
            Self::Storage(s) => f.debug_tuple("Storage").field(s).finish(),
        }
    }
}

impl Error {
    /// Create a "Failed to X" remote error
    pub fn remote_failed(action: &str, details: impl std::fmt::Display) -> Self {
        Self::RemoteCall(format!("{MSG_FAILED_TO_PREFIX} {action}: {details}"))
    }

    /// Create an "Invalid X" error
    pub fn invalid(what: &str, details: impl std::fmt::Display) -> Self {
        Self::InvalidArgument(format!("{MSG_INVALID_PREFIX} {what}: {details}"))
    }

    /// Create error for IO operations
    pub fn io_failed(
        operation: &str,
        path: &std::path::Path,
        error: impl std::fmt::Display,
    ) -> Self {
        Self::FileOperation(format!(
            "{MSG_FAILED_TO_PREFIX} {operation} {}: {error}",
            path.display()
        ))
    }

    /// Create error for a stage whose required input is absent
    pub fn precondition(what: impl Into<String>) -> Self {
        Self::PreconditionNotMet(what.into())
    }

    /// Whether this error is a precondition miss rather than a failure
    pub const fn is_precondition(&self) -> bool {
        matches!(self, Self::PreconditionNotMet(_))
    }
}
