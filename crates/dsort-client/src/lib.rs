#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod client;
mod config;
mod error;
mod request;

pub use crate::client::{Client, TRACING_TARGET};
pub use crate::config::{ClientConfig, DEFAULT_TIMEOUT};
pub use crate::error::{ApiErrorBody, Error, Result};
pub use crate::request::{AbortSort, SortMetrics, StartSort};
