//! Server error types with recovery suggestions.

use std::io;

use thiserror::Error;

/// Result type for server operations.
pub type Result<T, E = ServerError> = std::result::Result<T, E>;

/// Error raised while binding or running the HTTP server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Server configuration is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to bind to the specified address.
    #[error("Failed to bind to {address}: {source}")]
    BindError {
        address: String,
        #[source]
        source: io::Error,
    },

    /// Runtime server error.
    #[error("Runtime error: {0}")]
    Runtime(#[source] io::Error),
}

impl ServerError {
    /// Creates a bind error with address context.
    pub fn bind_error(address: impl ToString, source: io::Error) -> Self {
        Self::BindError {
            address: address.to_string(),
            source,
        }
    }

    /// Returns a unique error code for this error type.
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "E001",
            Self::BindError { .. } => "E002",
            Self::Runtime(_) => "E003",
        }
    }

    /// Returns `true` if retrying, possibly in a changed environment, may succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::InvalidConfig(_) => false,
            Self::BindError { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::PermissionDenied
                    | io::ErrorKind::AddrInUse
                    | io::ErrorKind::AddrNotAvailable
            ),
            Self::Runtime(err) => matches!(
                err.kind(),
                io::ErrorKind::Interrupted
                    | io::ErrorKind::TimedOut
                    | io::ErrorKind::ConnectionRefused
            ),
        }
    }

    /// Provides a human-readable suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::InvalidConfig(_) => Some("Check the arguments and environment variables"),
            Self::BindError { source, .. } => match source.kind() {
                io::ErrorKind::PermissionDenied => {
                    Some("Try using a port above 1024 or run with appropriate privileges")
                }
                io::ErrorKind::AddrInUse => Some(
                    "The port is already in use. Try a different port or stop the conflicting service",
                ),
                io::ErrorKind::AddrNotAvailable => {
                    Some("The address is not available. Check network interface configuration")
                }
                _ => Some("Check network configuration and firewall settings"),
            },
            Self::Runtime(err) => match err.kind() {
                io::ErrorKind::Interrupted => Some("The operation was interrupted, you may retry"),
                io::ErrorKind::TimedOut => {
                    Some("The operation timed out, consider increasing timeout values")
                }
                _ => None,
            },
        }
    }

    /// Returns contextual information about this error as key-value pairs
    /// for structured logging.
    pub fn context(&self) -> Vec<(&'static str, String)> {
        let mut context = vec![("error_code", self.error_code().to_owned())];

        if let Some(suggestion) = self.suggestion() {
            context.push(("suggestion", suggestion.to_owned()));
        }

        context.push(("recoverable", self.is_recoverable().to_string()));

        if let Self::BindError { address, .. } = self {
            context.push(("address", address.clone()));
        }

        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_unique() {
        let codes = [
            ServerError::InvalidConfig("test".to_owned()).error_code(),
            ServerError::bind_error("127.0.0.1:80", io::Error::other("test")).error_code(),
            ServerError::Runtime(io::Error::other("test")).error_code(),
        ];

        assert_ne!(codes[0], codes[1]);
        assert_ne!(codes[1], codes[2]);
        assert_ne!(codes[0], codes[2]);
    }

    #[test]
    fn address_in_use_is_recoverable() {
        let error = ServerError::bind_error(
            "127.0.0.1:3000",
            io::Error::new(io::ErrorKind::AddrInUse, "address in use"),
        );

        assert!(error.is_recoverable());
        assert!(error.suggestion().is_some_and(|s| s.contains("already in use")));
        assert!(error.to_string().contains("127.0.0.1:3000"));
    }

    #[test]
    fn context_survives_anyhow_wrapping() {
        let error = anyhow::Error::from(ServerError::bind_error(
            "0.0.0.0:3000",
            io::Error::new(io::ErrorKind::AddrInUse, "address in use"),
        ))
        .context("HTTP server failed");

        let server_error = error.downcast_ref::<ServerError>().unwrap();
        let context = server_error.context();

        assert!(context.contains(&("error_code", "E002".to_owned())));
        assert!(context.contains(&("recoverable", "true".to_owned())));
        assert!(context.contains(&("address", "0.0.0.0:3000".to_owned())));
        assert!(context.iter().any(|(key, _)| *key == "suggestion"));
    }

    #[test]
    fn invalid_config_is_not_recoverable() {
        let error = ServerError::InvalidConfig("port".to_owned());
        assert!(!error.is_recoverable());
        assert!(error.suggestion().is_some());
    }
}
