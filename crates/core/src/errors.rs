use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("gift option {choice} is out of range 1..={available}")]
    GiftChoiceOutOfRange { choice: i64, available: usize },
    #[error("no gift search results are available to choose from")]
    NoSearchResults,
    #[error("unknown SWAIG function `{0}`")]
    UnknownFunction(String),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

/// Failures a request handler can surface, before they are given a
/// correlation id and an HTTP shape.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("{0}")]
    Integration(String),
    #[error("{0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. } | Self::Internal { message, .. } => message,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. } | Self::Internal { correlation_id, .. } => {
                correlation_id
            }
        }
    }
}

impl ApplicationError {
    /// Domain errors are the caller's fault; upstream and configuration
    /// failures are reported as internal errors.
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        match self {
            Self::Domain(error) => {
                InterfaceError::BadRequest { message: error.to_string(), correlation_id }
            }
            Self::Integration(message) | Self::Configuration(message) => {
                InterfaceError::Internal { message, correlation_id }
            }
        }
    }
}
