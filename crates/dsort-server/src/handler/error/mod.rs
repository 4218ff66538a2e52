//! Handler errors and their conversion from job lifecycle errors.

mod core_error;
mod http_error;

pub use self::http_error::{Error, ErrorKind, Result};
