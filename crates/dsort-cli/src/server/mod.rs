//! HTTP server startup, graceful shutdown and server errors.

mod error;
mod http_server;
mod shutdown;

pub use self::error::{Result, ServerError};
pub use self::http_server::serve_http;
use self::shutdown::shutdown_signal;
