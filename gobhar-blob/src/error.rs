use thiserror::Error;

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors that can occur while serving a file
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("File not found: {id}")]
    NotFound { id: String },

    #[error("Invalid range: {message}")]
    InvalidRange { message: String },

    #[error("Range not satisfiable for {total_size} bytes")]
    RangeNotSatisfiable { total_size: u64 },

    #[error("Upstream unavailable after {attempts} attempts: {reason}")]
    UpstreamUnavailable { attempts: u32, reason: String },

    #[error("Upstream timed out after {attempts} attempts")]
    UpstreamTimeout { attempts: u32 },

    #[error("Client disconnected")]
    ClientDisconnected,

    #[error("Invalid configuration: {message}")]
    Config { message: String },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl GatewayError {
    /// Create a not found error
    pub fn not_found<S: Into<String>>(id: S) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Create an invalid range error
    pub fn invalid_range<S: Into<String>>(message: S) -> Self {
        Self::InvalidRange {
            message: message.into(),
        }
    }

    /// Create a range not satisfiable error
    pub fn not_satisfiable(total_size: u64) -> Self {
        Self::RangeNotSatisfiable { total_size }
    }

    /// Create an invalid configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Status classification for transports
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidRange { .. } => ErrorKind::BadRequest,
            Self::RangeNotSatisfiable { .. } => ErrorKind::RangeNotSatisfiable,
            Self::UpstreamUnavailable { .. } => ErrorKind::BadGateway,
            Self::UpstreamTimeout { .. } => ErrorKind::GatewayTimeout,
            Self::ClientDisconnected => ErrorKind::ClientClosedRequest,
            Self::Config { .. } | Self::Io { .. } => ErrorKind::GeneralError,
        }
    }

    /// Whether the failure originated in the remote store
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::UpstreamUnavailable { .. } | Self::UpstreamTimeout { .. }
        )
    }
}

/// Feathers-ish error class names + status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,          // 400
    NotFound,            // 404
    RangeNotSatisfiable, // 416
    ClientClosedRequest, // 499
    GeneralError,        // 500
    BadGateway,          // 502
    GatewayTimeout,      // 504
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::RangeNotSatisfiable => 416,
            ErrorKind::ClientClosedRequest => 499,
            ErrorKind::GeneralError => 500,
            ErrorKind::BadGateway => 502,
            ErrorKind::GatewayTimeout => 504,
        }
    }

    /// Error `name` (e.g. "NotFound")
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::RangeNotSatisfiable => "RangeNotSatisfiable",
            ErrorKind::ClientClosedRequest => "ClientClosedRequest",
            ErrorKind::GeneralError => "GeneralError",
            ErrorKind::BadGateway => "BadGateway",
            ErrorKind::GatewayTimeout => "GatewayTimeout",
        }
    }

    /// Error `className` (kebab-cased)
    pub fn class_name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "bad-request",
            ErrorKind::NotFound => "not-found",
            ErrorKind::RangeNotSatisfiable => "range-not-satisfiable",
            ErrorKind::ClientClosedRequest => "client-closed-request",
            ErrorKind::GeneralError => "general-error",
            ErrorKind::BadGateway => "bad-gateway",
            ErrorKind::GatewayTimeout => "gateway-timeout",
        }
    }
}

/// Failure reported by a single remote read - determines retry behavior
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    /// Network hiccup, flood wait, backend timeout: worth another attempt
    #[error("Transient upstream error: {0}")]
    Transient(String),

    /// The backend will keep failing (expired reference, revoked access)
    #[error("Permanent upstream error: {0}")]
    Permanent(String),
}

impl UpstreamError {
    /// Create a transient error
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    /// Create a permanent error
    pub fn permanent(msg: impl Into<String>) -> Self {
        Self::Permanent(msg.into())
    }

    /// Check if this error is retryable
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        match self {
            Self::Transient(msg) | Self::Permanent(msg) => msg,
        }
    }
}

impl From<std::io::Error> for UpstreamError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind as Io;
        match err.kind() {
            Io::TimedOut | Io::Interrupted | Io::ConnectionReset | Io::ConnectionAborted
            | Io::WouldBlock => Self::Transient(err.to_string()),
            _ => Self::Permanent(err.to_string()),
        }
    }
}
