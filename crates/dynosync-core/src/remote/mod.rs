//! Remote config store.
//!
//! This module provides the `ConfigStore` seam and `HerokuClient`, its
//! production implementation against the platform API. Requests carry a
//! bearer token and a bounded timeout; failures are classified as
//! `RemoteError` and never retried at this layer.

pub mod client;
pub mod error;

pub use client::{ConfigStore, HerokuClient, DEFAULT_API_BASE_URL, REQUEST_TIMEOUT_SECS};
pub use error::RemoteError;
