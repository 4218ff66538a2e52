#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod extract;
pub mod handler;
pub mod middleware;
pub mod service;
pub mod worker;

/// Tracing target for bearer token checks.
pub const TRACING_TARGET_AUTHENTICATION: &str = "dsort_server::authentication";

/// Tracing target for error recovery including middleware errors and request failures.
pub const TRACING_TARGET_RECOVERY_ERROR: &str = "dsort_server::recovery::error";

/// Tracing target for panic recovery in handlers.
pub const TRACING_TARGET_RECOVERY_PANIC: &str = "dsort_server::recovery::panic";

/// Tracing target for request validation failures.
pub const TRACING_TARGET_VALIDATION: &str = "dsort_server::validation";
