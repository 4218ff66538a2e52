//! Request bodies and path parameters accepted by the handlers.

mod paths;
mod signals;

pub use self::paths::SortPathParams;
pub use self::signals::FailSort;
