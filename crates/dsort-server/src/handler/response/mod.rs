//! Response bodies produced by the handlers.

mod error_response;
mod monitors;

pub use self::error_response::ErrorResponse;
pub use self::monitors::MonitorStatus;
