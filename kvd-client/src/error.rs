//! # Error Taxonomy
//!
//! One error type shared by the wire client and the driver facades, so a
//! caller can tell an absent key (`Ok(None)`) apart from a transport failure.

use std::sync::Arc;

use thiserror::Error;

/// Result type for the client and driver.
pub type DriverResult<T> = Result<T, DriverError>;

/// Errors surfaced by the client and the driver facades.
#[derive(Debug, Clone, Error)]
pub enum DriverError {
    /// Network or IO failure while reading/writing.
    #[error("io error: {0}")]
    Io(Arc<std::io::Error>),
    /// Host/port could not be resolved into a socket address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    /// The store rejected the supplied credentials.
    #[error("authentication failed: {0}")]
    Auth(String),
    /// RESP2 framing or parse error.
    #[error("protocol error")]
    Protocol,
    /// Server returned an error reply.
    #[error("server error: {message}")]
    Server { message: String },
    /// Response type did not match the expected command response.
    #[error("unexpected response")]
    UnexpectedResponse,
    /// Argument rejected before anything was sent to the store.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The session was closed or never opened.
    #[error("not connected")]
    NotConnected,
    /// A driver instance is already alive in this process.
    #[error("driver can only be instantiated once")]
    AlreadyInstantiated,
}

impl DriverError {
    /// Builds a `Server` error from a raw `-ERR ...` payload.
    pub fn server(message: &[u8]) -> Self {
        DriverError::Server {
            message: String::from_utf8_lossy(message).into_owned(),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        DriverError::InvalidArgument(reason.into())
    }

    /// True when the peer closed the connection.
    pub fn is_eof(&self) -> bool {
        matches!(self, DriverError::Io(err) if err.kind() == std::io::ErrorKind::UnexpectedEof)
    }

    /// True for failures that leave the socket in an unknown state.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DriverError::Io(_) | DriverError::Protocol)
    }
}

impl From<std::io::Error> for DriverError {
    fn from(err: std::io::Error) -> Self {
        DriverError::Io(Arc::new(err))
    }
}
