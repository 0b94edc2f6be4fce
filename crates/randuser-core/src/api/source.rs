use anyhow::Result;
use async_trait::async_trait;

use crate::models::{UserDto, UserFilter};

/// One request to the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchQuery {
    pub count: u32,
    pub gender: Option<String>,
    pub nationality: Option<String>,
}

impl FetchQuery {
    pub fn new(filter: &UserFilter, count: u32) -> Self {
        Self {
            count,
            gender: filter.gender_param().map(str::to_string),
            nationality: filter.nationality_param().map(str::to_string),
        }
    }
}

/// Source of raw generated users.
///
/// Implementations perform exactly one remote call per `fetch` and return the
/// batch as received; they don't filter, normalize, or persist.
#[async_trait]
pub trait RemoteUserSource: Send + Sync {
    async fn fetch(&self, query: &FetchQuery) -> Result<Vec<UserDto>>;
}
