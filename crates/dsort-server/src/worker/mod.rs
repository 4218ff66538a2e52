//! Background workers that run beside the HTTP server.
//!
//! Both workers stop once their [`CancellationToken`] is cancelled.
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

mod event_pump;
mod retention;

pub use self::event_pump::EventPump;
pub use self::retention::RetentionWorker;
