//! HTTP client layer — `CohortlyHttp` with bounded per-call recovery.

pub mod client;
pub mod recovery;

pub use client::{CohortlyHttp, HttpConfig};
pub use recovery::{RecoveryPolicy, DEFAULT_REQUEST_TIMEOUT, REFRESH_MARGIN};
