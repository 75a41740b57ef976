// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error type shared by every public operation of the crate.

use crate::codec::CodecError;
use crate::specification::ValidationReport;

/// Errors returned by connection manager, message and codec operations.
///
/// Argument checks (empty subject, wrong message kind, foreign handles) are
/// performed synchronously before any transport interaction, so an `Err`
/// always means the operation had no side effect.
///
/// # Example
///
/// ```rust
/// use gmsec::{Config, ConnectionManager, Error, ErrorKind, Message, MessageKind};
///
/// let mgr = ConnectionManager::loopback(Config::new());
/// let msg = Message::new("GMSEC.TEST", MessageKind::Publish);
///
/// match mgr.publish(&msg) {
///     Err(Error::NotInitialized) => println!("call initialize() first"),
///     Err(e) if e.kind() == ErrorKind::Validation => println!("rejected: {}", e),
///     Err(e) => println!("other error: {}", e),
///     Ok(()) => println!("sent"),
/// }
/// ```
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Missing or invalid configuration value.
    Configuration(String),

    // ========================================================================
    // Uninitialized Object / Argument Errors
    // ========================================================================
    /// Operation attempted before `initialize()` (or after `cleanup()`).
    NotInitialized,
    /// Subject string is empty.
    EmptySubject,
    /// A required argument is missing or empty.
    UninitializedObject(String),
    /// Subject contains characters or tokens the transport cannot route.
    InvalidSubject(String),
    /// Field name is empty.
    InvalidFieldName,
    /// Message has the wrong kind for the requested operation.
    InvalidMessage(String),
    /// Callback was never registered (or already cancelled).
    InvalidCallback(String),
    /// Subscription handle was not issued by this manager, or was already released.
    InvalidSubscription(String),
    /// Named field is not present in the message.
    FieldNotFound(String),
    /// Field exists but cannot be read as the requested type.
    FieldTypeMismatch(String),

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Transport-level failure, original message text preserved.
    Connection(String),
    /// I/O error with underlying cause.
    IoError(std::io::Error),

    // ========================================================================
    // Validation Errors
    // ========================================================================
    /// Message failed specification compliance checks.
    Validation(ValidationReport),

    // ========================================================================
    // Service State Errors
    // ========================================================================
    /// Heartbeat service start requested while it is running.
    HeartbeatServiceIsRunning,
    /// Heartbeat service is not running (or did not start in time).
    HeartbeatServiceNotRunning(String),
    /// Resource service start requested while it is running.
    ResourceServiceIsRunning,
    /// Resource service did not start in time.
    ResourceServiceNotRunning(String),
    /// Invalid resource sampling parameters.
    ResourceSampling(String),
    /// Live service field set to a value outside its permitted range.
    ValueOutOfRange(String),

    // ========================================================================
    // Encoding Errors
    // ========================================================================
    /// Binary encode/decode failure.
    Encoding(CodecError),
    /// Malformed XML/JSON/text input.
    Parse(String),
}

/// Coarse error taxonomy used for handling decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    UninitializedObject,
    InvalidArgument,
    Connection,
    Validation,
    ServiceState,
    Encoding,
    Parse,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration(_) => ErrorKind::Configuration,
            Error::NotInitialized | Error::EmptySubject | Error::UninitializedObject(_) => {
                ErrorKind::UninitializedObject
            }
            Error::InvalidSubject(_)
            | Error::InvalidFieldName
            | Error::InvalidMessage(_)
            | Error::InvalidCallback(_)
            | Error::InvalidSubscription(_)
            | Error::FieldNotFound(_)
            | Error::FieldTypeMismatch(_) => ErrorKind::InvalidArgument,
            Error::Connection(_) | Error::IoError(_) => ErrorKind::Connection,
            Error::Validation(_) => ErrorKind::Validation,
            Error::HeartbeatServiceIsRunning
            | Error::HeartbeatServiceNotRunning(_)
            | Error::ResourceServiceIsRunning
            | Error::ResourceServiceNotRunning(_)
            | Error::ResourceSampling(_)
            | Error::ValueOutOfRange(_) => ErrorKind::ServiceState,
            Error::Encoding(_) => ErrorKind::Encoding,
            Error::Parse(_) => ErrorKind::Parse,
        }
    }

    /// Validation report, if this is a validation failure.
    pub fn validation_report(&self) -> Option<&ValidationReport> {
        match self {
            Error::Validation(report) => Some(report),
            _ => None,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // Configuration
            Error::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            // Uninitialized / argument
            Error::NotInitialized => write!(f, "The ConnectionManager has not been initialized!"),
            Error::EmptySubject => write!(f, "The subject string is null, or is empty."),
            Error::UninitializedObject(msg) => write!(f, "{}", msg),
            Error::InvalidSubject(subject) => write!(f, "Invalid subject: '{}'", subject),
            Error::InvalidFieldName => write!(f, "Field name is null, or is empty."),
            Error::InvalidMessage(msg) => write!(f, "Invalid message: {}", msg),
            Error::InvalidCallback(msg) => write!(f, "Invalid callback: {}", msg),
            Error::InvalidSubscription(msg) => write!(f, "Invalid subscription: {}", msg),
            Error::FieldNotFound(name) => write!(f, "Message does not contain field '{}'", name),
            Error::FieldTypeMismatch(msg) => write!(f, "Field type mismatch: {}", msg),
            // Connection
            Error::Connection(msg) => write!(f, "Connection error: {}", msg),
            Error::IoError(e) => write!(f, "I/O error: {}", e),
            // Validation
            Error::Validation(report) => write!(f, "Message validation failed:\n{}", report),
            // Service state
            Error::HeartbeatServiceIsRunning => write!(f, "HeartbeatService is already running."),
            Error::HeartbeatServiceNotRunning(msg) => write!(f, "{}", msg),
            Error::ResourceServiceIsRunning => write!(f, "ResourceService is already running."),
            Error::ResourceServiceNotRunning(msg) => write!(f, "{}", msg),
            Error::ResourceSampling(msg) => write!(f, "Resource sampling error: {}", msg),
            Error::ValueOutOfRange(msg) => write!(f, "Value out of range: {}", msg),
            // Encoding
            Error::Encoding(e) => write!(f, "Encoding error: {}", e),
            Error::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            Error::Encoding(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        Error::Encoding(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::IoError(e)
    }
}

/// Convenient alias for API results using the crate `Error` type.
pub type Result<T> = core::result::Result<T, Error>;
