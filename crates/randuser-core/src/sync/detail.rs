//! Single-user lookup for a detail view.

use tokio::sync::watch;
use tracing::{debug, error, warn};

use crate::models::User;
use crate::repository::UserRepository;

use super::DetailError;

#[derive(Debug, Clone, PartialEq)]
pub enum DetailState {
    Loading,
    Found(User),
    NotFound,
    Error(DetailError),
}

impl DetailState {
    pub fn is_loading(&self) -> bool {
        matches!(self, DetailState::Loading)
    }
}

/// Resolves one uid against the local store. The lookup starts on
/// construction and settles exactly once.
pub struct DetailResolver {
    uid: Option<String>,
    state: watch::Receiver<DetailState>,
}

impl DetailResolver {
    /// A missing or blank uid settles immediately with `IdNotProvided`.
    /// Otherwise must be called within a Tokio runtime.
    pub fn new(repo: UserRepository, uid: Option<&str>) -> Self {
        let uid = uid
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let Some(key) = uid.clone() else {
            debug!("Detail requested without a user id");
            let (_tx, rx) = watch::channel(DetailState::Error(DetailError::IdNotProvided));
            return Self { uid: None, state: rx };
        };

        let (tx, rx) = watch::channel(DetailState::Loading);
        tokio::spawn(async move {
            let lookup_key = key.clone();
            let lookup = tokio::spawn(async move { repo.get_by_key(&lookup_key).await });
            let next = match lookup.await {
                Ok(Ok(Some(user))) => DetailState::Found(user),
                Ok(Ok(None)) => DetailState::NotFound,
                Ok(Err(e)) => {
                    warn!(uid = %key, error = %format!("{:#}", e), "User lookup failed");
                    DetailState::Error(DetailError::LoadFailed)
                }
                Err(e) => {
                    error!(uid = %key, error = %e, "User lookup task failed");
                    DetailState::Error(DetailError::LoadFailed)
                }
            };
            tx.send_replace(next);
        });

        Self { uid, state: rx }
    }

    pub fn uid(&self) -> Option<&str> {
        self.uid.as_deref()
    }

    pub fn state(&self) -> DetailState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DetailState> {
        self.state.clone()
    }

    /// Wait for the lookup to settle.
    pub async fn resolved(&self) -> DetailState {
        let mut rx = self.state.clone();
        if let Ok(state) = rx.wait_for(|s| !s.is_loading()).await {
            return state.clone();
        }
        let current = rx.borrow().clone();
        current
    }
}
