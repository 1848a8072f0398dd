//! Failure taxonomy shared across the executor boundary
//!
//! Executors talk to remote services and read local files. Whatever goes
//! wrong there is expressed as a [`CommonError`], and every error that can
//! surface from an executor implements [`ErrorClassification`] so the sync
//! core can tell a failure worth retrying from one that never will succeed.
//!
//! Module errors embed `CommonError` and derive their classification from it:
//!
//! ```rust,ignore
//! #[derive(Debug, thiserror::Error)]
//! pub enum ExecutorError {
//!     #[error("permanent failure: {0}")]
//!     Permanent(String),
//!
//!     #[error(transparent)]
//!     Common(#[from] CommonError),
//! }
//!
//! impl_error_conversion!(ExecutorError, Common);
//! impl_error_classification!(ExecutorError, Common,
//!     Self::Permanent(_) => { retryable: false, severity: ErrorSeverity::Error }
//! );
//! ```

use std::fmt;
use std::time::Duration;

/// Standard result type using CommonError
pub type CommonResult<T> = Result<T, CommonError>;

/// Failures an executor can run into while applying a job remotely
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommonError {
    /// The remote call did not answer in time
    Timeout { operation: String, duration: Duration },

    /// The service could not be reached at all
    Network { service: String, message: String },

    /// The service answered with a non-success status
    Remote { service: String, status: u16, message: String },

    /// The service asked the caller to back off
    RateLimited { service: String, retry_after: Duration },

    /// A local file the payload points at could not be read
    Io { message: String },

    /// The payload is unusable for this executor
    Payload { field: String, message: String },

    /// A request or response body could not be encoded or decoded
    Serialization { format: &'static str, message: String },
}

impl CommonError {
    /// No answer within `duration`
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout { operation: operation.into(), duration }
    }

    /// Service unreachable
    pub fn network(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network { service: service.into(), message: message.into() }
    }

    /// Service answered with a failure `status`
    pub fn remote(service: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Remote { service: service.into(), status, message: message.into() }
    }

    /// Service asked for a pause of `retry_after`
    pub fn rate_limited(service: impl Into<String>, retry_after: Duration) -> Self {
        Self::RateLimited { service: service.into(), retry_after }
    }

    /// Payload `field` is missing or malformed
    pub fn payload(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Payload { field: field.into(), message: message.into() }
    }
}

impl fmt::Display for CommonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout { operation, duration } => {
                write!(f, "'{}' timed out after {:?}", operation, duration)
            }
            Self::Network { service, message } => {
                write!(f, "'{}' unreachable: {}", service, message)
            }
            Self::Remote { service, status, message } => {
                write!(f, "'{}' answered {}: {}", service, status, message)
            }
            Self::RateLimited { service, retry_after } => {
                write!(f, "'{}' rate limited; retry after {:?}", service, retry_after)
            }
            Self::Io { message } => write!(f, "Local I/O error: {}", message),
            Self::Payload { field, message } => {
                write!(f, "Invalid payload field '{}': {}", field, message)
            }
            Self::Serialization { format, message } => {
                write!(f, "{} serialization error: {}", format, message)
            }
        }
    }
}

impl std::error::Error for CommonError {}

impl ErrorClassification for CommonError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Network { .. } | Self::RateLimited { .. } => true,
            // Request timeout and server-side failures may clear up
            Self::Remote { status, .. } => *status == 408 || *status >= 500,
            Self::Io { .. } | Self::Payload { .. } | Self::Serialization { .. } => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Timeout { .. } | Self::Network { .. } | Self::RateLimited { .. } => {
                ErrorSeverity::Warning
            }
            Self::Remote { status, .. } if *status >= 500 => ErrorSeverity::Warning,
            Self::Remote { .. }
            | Self::Io { .. }
            | Self::Payload { .. }
            | Self::Serialization { .. } => ErrorSeverity::Error,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }
}

/// Standard interface for classifying errors
///
/// Implemented by every error type that can surface from a job executor.
pub trait ErrorClassification {
    /// Whether attempting the same job again may succeed
    fn is_retryable(&self) -> bool;

    /// Level the failure should be logged at
    fn severity(&self) -> ErrorSeverity;

    /// Minimum wait the failure asks for before the next attempt
    fn retry_after(&self) -> Option<Duration>;
}

/// Error severity levels for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Expected while offline; worth watching, not acting on
    Warning,
    /// Needs a code or data fix
    Error,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => f.write_str("WARN"),
            Self::Error => f.write_str("ERROR"),
        }
    }
}

impl From<serde_json::Error> for CommonError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization { format: "JSON", message: err.to_string() }
    }
}

impl From<std::io::Error> for CommonError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut => Self::timeout("io", Duration::ZERO),
            std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::NotConnected
            | std::io::ErrorKind::BrokenPipe => Self::network("io", err.to_string()),
            _ => Self::Io { message: err.to_string() },
        }
    }
}

/// Routes `serde_json` and `std::io` errors into a module error's
/// `CommonError` variant
///
/// ```rust,ignore
/// impl_error_conversion!(ExecutorError, Common);
/// ```
#[macro_export]
macro_rules! impl_error_conversion {
    ($error_type:ty, $variant:ident) => {
        impl ::core::convert::From<::serde_json::Error> for $error_type {
            fn from(err: ::serde_json::Error) -> Self {
                Self::$variant($crate::error::CommonError::from(err))
            }
        }

        impl ::core::convert::From<::std::io::Error> for $error_type {
            fn from(err: ::std::io::Error) -> Self {
                Self::$variant($crate::error::CommonError::from(err))
            }
        }
    };
}

/// Implements `ErrorClassification` for a module error, delegating its
/// `CommonError` variant and classifying the others inline
///
/// ```rust,ignore
/// impl_error_classification!(ExecutorError, Common,
///     Self::Permanent(_) => { retryable: false, severity: ErrorSeverity::Error }
/// );
/// ```
#[macro_export]
macro_rules! impl_error_classification {
    (
        $error_type:ty,
        $common_variant:ident
        $(,
            $variant:pat => {
                retryable: $retryable:expr,
                severity: $severity:expr
                $(, retry_after: $retry_after:expr)?
                $(,)?
            }
        )*
        $(,)?
    ) => {
        impl $crate::error::ErrorClassification for $error_type {
            fn is_retryable(&self) -> bool {
                match self {
                    Self::$common_variant(e) => $crate::error::ErrorClassification::is_retryable(e),
                    $($variant => $retryable,)*
                }
            }

            fn severity(&self) -> $crate::error::ErrorSeverity {
                match self {
                    Self::$common_variant(e) => $crate::error::ErrorClassification::severity(e),
                    $($variant => $severity,)*
                }
            }

            fn retry_after(&self) -> ::core::option::Option<::std::time::Duration> {
                match self {
                    Self::$common_variant(e) => $crate::error::ErrorClassification::retry_after(e),
                    $($($variant => $retry_after,)?)*
                    #[allow(unreachable_patterns)]
                    _ => ::core::option::Option::None,
                }
            }
        }
    };
}
