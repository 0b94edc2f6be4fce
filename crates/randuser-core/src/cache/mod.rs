//! Local user cache.
//!
//! This module defines the `UserStore` contract (keyed upsert, live point
//! query, list, delete) and provides `CacheManager`, which keeps the table
//! as JSON in the cache directory so previously generated users are
//! available offline.

pub mod manager;
pub mod store;

pub use manager::{age_display, CacheManager, CachedData};
pub use store::{Snapshot, Table, UserStore, UserSubscription};
