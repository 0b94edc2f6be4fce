use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::watch;

use crate::models::User;

/// Keyed, durable table of users.
///
/// Writes are serialized by the implementation and a batch upsert is atomic:
/// either every row of the call is committed or none is. Reads never wait on
/// writers.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert or replace every user by `uid`.
    async fn upsert_batch(&self, users: &[User]) -> Result<()>;

    /// Live query for one key.
    fn subscribe(&self, uid: &str) -> Result<UserSubscription>;

    /// Every stored user, in first-insertion order.
    async fn list_all(&self) -> Result<Vec<User>>;

    /// Remove a row. Deleting an absent key succeeds.
    async fn delete(&self, uid: &str) -> Result<()>;
}

/// Immutable view of the table at one point in time.
pub type Snapshot = Arc<Table>;

#[derive(Debug, Clone)]
struct Row {
    seq: u64,
    user: User,
}

/// Copy-on-write table contents. Writers build a new `Table` and publish it;
/// readers keep whichever snapshot they borrowed.
#[derive(Debug, Clone, Default)]
pub struct Table {
    rows: BTreeMap<String, Row>,
    next_seq: u64,
    updated_at: Option<DateTime<Utc>>,
}

impl Table {
    pub fn from_users(users: Vec<User>, updated_at: Option<DateTime<Utc>>) -> Self {
        let mut table = Self::default();
        table.insert_all(&users);
        table.updated_at = updated_at;
        table
    }

    fn insert_all(&mut self, users: &[User]) {
        for user in users {
            match self.rows.get_mut(&user.uid) {
                // Replace keeps the original position
                Some(row) => row.user = user.clone(),
                None => {
                    self.rows.insert(
                        user.uid.clone(),
                        Row {
                            seq: self.next_seq,
                            user: user.clone(),
                        },
                    );
                    self.next_seq += 1;
                }
            }
        }
    }

    /// New table with `users` upserted.
    pub fn with_upserted(&self, users: &[User]) -> Self {
        let mut next = self.clone();
        next.insert_all(users);
        next.updated_at = Some(Utc::now());
        next
    }

    /// New table without `uid`, or `None` when there is nothing to remove.
    pub fn with_removed(&self, uid: &str) -> Option<Self> {
        if !self.rows.contains_key(uid) {
            return None;
        }
        let mut next = self.clone();
        next.rows.remove(uid);
        next.updated_at = Some(Utc::now());
        Some(next)
    }

    pub fn get(&self, uid: &str) -> Option<&User> {
        self.rows.get(uid).map(|r| &r.user)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Users in first-insertion order.
    pub fn users(&self) -> Vec<User> {
        let mut rows: Vec<&Row> = self.rows.values().collect();
        rows.sort_by_key(|r| r.seq);
        rows.into_iter().map(|r| r.user.clone()).collect()
    }
}

/// Handle on a live query for one key.
///
/// Dropping the handle (or the stream made from it) releases the subscription.
pub struct UserSubscription {
    uid: String,
    rx: watch::Receiver<Snapshot>,
}

struct WatchState {
    uid: String,
    rx: watch::Receiver<Snapshot>,
    initial: Option<Option<User>>,
    last: Option<Option<User>>,
}

impl UserSubscription {
    pub fn new(uid: &str, rx: watch::Receiver<Snapshot>) -> Self {
        Self {
            uid: uid.to_string(),
            rx,
        }
    }

    /// Stream that yields the current value immediately, then one item each
    /// time the row is inserted, replaced with different content, or deleted
    /// (`None`). Ends when the store is dropped.
    pub fn into_stream(self) -> BoxStream<'static, Option<User>> {
        let UserSubscription { uid, mut rx } = self;
        let initial = rx.borrow_and_update().get(&uid).cloned();

        let state = WatchState {
            uid,
            rx,
            initial: Some(initial),
            last: None,
        };

        stream::unfold(state, |mut st| async move {
            if let Some(value) = st.initial.take() {
                st.last = Some(value.clone());
                return Some((value, st));
            }
            loop {
                if st.rx.changed().await.is_err() {
                    return None;
                }
                let current = st.rx.borrow_and_update().get(&st.uid).cloned();
                if st.last.as_ref() != Some(&current) {
                    st.last = Some(current.clone());
                    return Some((current, st));
                }
            }
        })
        .boxed()
    }
}
