//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Request logger: request id, method, path, status, latency
//! 2. Identity extractor: decodes the identity header (protected routes only)

pub mod identity;
pub mod request_log;
