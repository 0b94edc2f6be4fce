//! Core library for randuser: fetches randomly generated people, caches them
//! locally for offline use, and exposes list and detail state for a UI.
//!
//! - `api`: the remote source seam and the randomuser.me client
//! - `cache`: the local store seam and its JSON-backed implementation
//! - `connectivity`: online checks consulted before fetching
//! - `repository`: write-through fetch and read-through local queries
//! - `sync`: the accumulating list and single-user detail state machines

pub mod api;
pub mod cache;
pub mod config;
pub mod connectivity;
pub mod models;
pub mod repository;
pub mod sync;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

pub use api::{ApiClient, ApiError, FetchQuery, RemoteUserSource};
pub use cache::{CacheManager, UserStore};
pub use config::Config;
pub use connectivity::{ConnectivityProbe, FixedProbe, RouteProbe};
pub use models::{Gender, User, UserFilter};
pub use repository::UserRepository;
pub use sync::{DetailError, DetailResolver, DetailState, ListAccumulator, ListError, ListState};
