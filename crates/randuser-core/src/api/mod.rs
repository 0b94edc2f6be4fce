//! Remote user source.
//!
//! This module defines the `RemoteUserSource` seam and provides `ApiClient`,
//! its implementation against the randomuser.me REST API.

pub mod client;
pub mod error;
pub mod source;

pub use client::ApiClient;
pub use error::ApiError;
pub use source::{FetchQuery, RemoteUserSource};
