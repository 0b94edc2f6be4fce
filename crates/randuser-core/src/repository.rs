//! Sync repository: the single entry point for user data.
//!
//! Reads are always served from the local store (read-through). The only
//! path that touches the network is `fetch_and_store`, which persists the
//! normalized batch before returning it (write-through).

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use futures::stream::{BoxStream, StreamExt};
use tracing::{debug, info, warn};

use crate::api::{ApiError, FetchQuery, RemoteUserSource};
use crate::cache::UserStore;
use crate::models::{User, UserFilter};

/// Clone is cheap - both collaborators are shared.
#[derive(Clone)]
pub struct UserRepository {
    remote: Arc<dyn RemoteUserSource>,
    store: Arc<dyn UserStore>,
}

impl UserRepository {
    pub fn new(remote: Arc<dyn RemoteUserSource>, store: Arc<dyn UserStore>) -> Self {
        Self { remote, store }
    }

    // ===== Write-through =====

    /// Fetch `count` users, persist them, and return the normalized batch.
    ///
    /// A response with zero usable records is an error, not an empty success.
    /// The store write runs in its own task, so dropping this future after the
    /// response arrived does not abandon a half-finished write.
    pub async fn fetch_and_store(&self, filter: &UserFilter, count: u32) -> Result<Vec<User>> {
        if count == 0 {
            bail!("User count must be at least 1");
        }

        let query = FetchQuery::new(filter, count);
        let raw = self
            .remote
            .fetch(&query)
            .await
            .context("Failed to fetch users")?;

        let received = raw.len();
        let users: Vec<User> = raw.iter().filter_map(|dto| dto.to_user()).collect();
        if users.len() < received {
            warn!(skipped = received - users.len(), "Skipping users without uuid");
        }
        if users.is_empty() {
            return Err(ApiError::EmptyResults.into());
        }

        let store = Arc::clone(&self.store);
        let batch = users.clone();
        tokio::spawn(async move { store.upsert_batch(&batch).await })
            .await
            .context("Store write task failed")?
            .context("Failed to store fetched users")?;

        info!(count = users.len(), filter = %filter.label(), "Fetched and stored users");
        Ok(users)
    }

    // ===== Local reads =====

    /// Current stored value for `uid`. Never touches the network.
    pub async fn get_by_key(&self, uid: &str) -> Result<Option<User>> {
        let subscription = self
            .store
            .subscribe(uid)
            .with_context(|| format!("Failed to query user {}", uid))?;
        Ok(subscription.into_stream().next().await.flatten())
    }

    /// Live view of one user: the current value first, then every change.
    pub fn observe(&self, uid: &str) -> Result<BoxStream<'static, Option<User>>> {
        let subscription = self
            .store
            .subscribe(uid)
            .with_context(|| format!("Failed to observe user {}", uid))?;
        Ok(subscription.into_stream())
    }

    pub async fn list_all(&self) -> Result<Vec<User>> {
        let users = self
            .store
            .list_all()
            .await
            .context("Failed to list cached users")?;
        debug!(count = users.len(), "Listed cached users");
        Ok(users)
    }

    pub async fn delete_by_key(&self, uid: &str) -> Result<()> {
        self.store
            .delete(uid)
            .await
            .with_context(|| format!("Failed to delete user {}", uid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LoginDto;
    use crate::models::UserDto;
    use crate::test_support::{dto, repository, user, FlakyStore, ScriptedSource};
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_fetch_list_delete_scenario() {
        let remote = ScriptedSource::new();
        remote.reply(vec![dto("u1", "Ann"), dto("u2", "Bob")]);
        let store = FlakyStore::new();
        let repo = repository(&remote, &store);

        let batch = repo
            .fetch_and_store(&UserFilter::default(), 2)
            .await
            .expect("fetch succeeds");
        assert_eq!(batch, vec![user("u1", "Ann"), user("u2", "Bob")]);

        let all = repo.list_all().await.expect("list");
        assert_eq!(all.len(), 2);

        repo.delete_by_key("u1").await.expect("delete");
        assert_eq!(repo.list_all().await.expect("list"), vec![user("u2", "Bob")]);
    }

    #[tokio::test]
    async fn test_fetch_returns_batch_not_store() {
        let remote = ScriptedSource::new();
        remote.reply(vec![dto("u1", "Ann")]).reply(vec![dto("u2", "Bob")]);
        let store = FlakyStore::new();
        let repo = repository(&remote, &store);

        repo.fetch_and_store(&UserFilter::default(), 1).await.expect("first");
        let second = repo.fetch_and_store(&UserFilter::default(), 1).await.expect("second");

        assert_eq!(second, vec![user("u2", "Bob")]);
        assert_eq!(repo.list_all().await.expect("list").len(), 2);
    }

    #[tokio::test]
    async fn test_refetch_same_uid_replaces() {
        let remote = ScriptedSource::new();
        remote.reply(vec![dto("u1", "Ann")]).reply(vec![dto("u1", "Anna")]);
        let store = FlakyStore::new();
        let repo = repository(&remote, &store);

        repo.fetch_and_store(&UserFilter::default(), 1).await.expect("first");
        repo.fetch_and_store(&UserFilter::default(), 1).await.expect("second");

        assert_eq!(repo.list_all().await.expect("list"), vec![user("u1", "Anna")]);
    }

    #[tokio::test]
    async fn test_empty_fetch_is_error() {
        let remote = ScriptedSource::new();
        remote.reply(vec![]);
        let store = FlakyStore::new();
        let repo = repository(&remote, &store);

        let err = repo
            .fetch_and_store(&UserFilter::default(), 1)
            .await
            .expect_err("empty result must fail");
        assert!(matches!(err.downcast_ref::<ApiError>(), Some(ApiError::EmptyResults)));
        assert!(repo.list_all().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_records_without_uuid_are_skipped() {
        let remote = ScriptedSource::new();
        let keyless = UserDto {
            login: Some(LoginDto {
                uuid: None,
                username: Some("ghost".to_string()),
            }),
            ..Default::default()
        };
        remote
            .reply(vec![keyless.clone(), dto("u1", "Ann")])
            .reply(vec![keyless]);
        let store = FlakyStore::new();
        let repo = repository(&remote, &store);

        let batch = repo.fetch_and_store(&UserFilter::default(), 2).await.expect("fetch");
        assert_eq!(batch, vec![user("u1", "Ann")]);

        // Nothing usable left at all counts as empty
        assert!(repo.fetch_and_store(&UserFilter::default(), 1).await.is_err());
    }

    #[tokio::test]
    async fn test_remote_failure_stores_nothing() {
        let remote = ScriptedSource::new();
        remote.fail("connection reset");
        let store = FlakyStore::new();
        let repo = repository(&remote, &store);

        assert!(repo.fetch_and_store(&UserFilter::default(), 1).await.is_err());
        assert!(repo.list_all().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_zero_count_rejected_without_remote_call() {
        let remote = ScriptedSource::new();
        let store = FlakyStore::new();
        let repo = repository(&remote, &store);

        assert!(repo.fetch_and_store(&UserFilter::default(), 0).await.is_err());
        assert_eq!(remote.calls(), 0);
    }

    #[tokio::test]
    async fn test_filter_passed_to_remote() {
        let remote = ScriptedSource::new();
        remote.reply(vec![dto("u1", "Ann")]);
        let store = FlakyStore::new();
        let repo = repository(&remote, &store);

        let filter = UserFilter::new(Some("female"), Some("nz"));
        repo.fetch_and_store(&filter, 3).await.expect("fetch");

        let queries = remote.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].count, 3);
        assert_eq!(queries[0].gender.as_deref(), Some("female"));
        assert_eq!(queries[0].nationality.as_deref(), Some("NZ"));
    }

    #[tokio::test]
    async fn test_get_by_key() {
        let remote = ScriptedSource::new();
        remote.reply(vec![dto("u1", "Ann")]);
        let store = FlakyStore::new();
        let repo = repository(&remote, &store);

        assert_eq!(repo.get_by_key("u1").await.expect("lookup"), None);
        repo.fetch_and_store(&UserFilter::default(), 1).await.expect("fetch");
        assert_eq!(repo.get_by_key("u1").await.expect("lookup"), Some(user("u1", "Ann")));
        assert_eq!(repo.get_by_key("missing-key").await.expect("lookup"), None);

        // Local only
        assert_eq!(remote.calls(), 1);
    }

    #[tokio::test]
    async fn test_get_by_key_storage_fault() {
        let remote = ScriptedSource::new();
        let store = FlakyStore::new();
        store.fail_reads.store(true, Ordering::SeqCst);
        let repo = repository(&remote, &store);

        assert!(repo.get_by_key("u1").await.is_err());
        assert!(repo.list_all().await.is_err());
    }

    #[tokio::test]
    async fn test_observe_follows_fetch_and_delete() {
        let remote = ScriptedSource::new();
        remote.reply(vec![dto("u1", "Ann")]).reply(vec![dto("u1", "Anna")]);
        let store = FlakyStore::new();
        let repo = repository(&remote, &store);

        let mut updates = repo.observe("u1").expect("observe");
        assert_eq!(updates.next().await, Some(None));

        repo.fetch_and_store(&UserFilter::default(), 1).await.expect("fetch");
        assert_eq!(updates.next().await, Some(Some(user("u1", "Ann"))));

        repo.fetch_and_store(&UserFilter::default(), 1).await.expect("refetch");
        assert_eq!(updates.next().await, Some(Some(user("u1", "Anna"))));

        repo.delete_by_key("u1").await.expect("delete");
        assert_eq!(updates.next().await, Some(None));

        // A fresh subscription starts from the current state
        let mut fresh = repo.observe("u1").expect("observe");
        assert_eq!(fresh.next().await, Some(None));
    }

    #[tokio::test]
    async fn test_delete_fault_surfaces() {
        let remote = ScriptedSource::new();
        let store = FlakyStore::new();
        store.fail_deletes.store(true, Ordering::SeqCst);
        let repo = repository(&remote, &store);

        assert!(repo.delete_by_key("u1").await.is_err());
    }
}
