//! Request extractors that answer rejections with JSON [`ErrorResponse`] bodies.
//!
//! - [`Json`]: JSON body with descriptive deserialization errors
//! - [`ValidateJson`]: JSON body checked with `validator`
//! - [`Path`]: path parameters with descriptive errors
//! - [`BearerToken`]: bearer token from the `Authorization` header
//!
//! [`ErrorResponse`]: crate::handler::response::ErrorResponse

mod bearer_token;
pub mod reject;

pub use crate::extract::bearer_token::BearerToken;
pub use crate::extract::reject::{Json, Path, ValidateJson};
