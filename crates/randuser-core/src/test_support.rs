//! Scripted fakes for the store, remote, and probe seams.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::api::{FetchQuery, RemoteUserSource};
use crate::cache::{CacheManager, UserStore, UserSubscription};
use crate::connectivity::ConnectivityProbe;
use crate::models::{DobDto, LoginDto, NameDto, User, UserDto};
use crate::repository::UserRepository;

/// Store-resident user with just a uid and a name.
pub fn user(uid: &str, name: &str) -> User {
    User {
        uid: uid.to_string(),
        full_name: name.to_string(),
        dob: "-".to_string(),
        age: None,
        email: None,
        phone: None,
        gender: None,
        nat: None,
        location: None,
        thumbnail: None,
        picture: None,
    }
}

/// Raw record that normalizes to `user(uid, first)`.
pub fn dto(uid: &str, first: &str) -> UserDto {
    UserDto {
        login: Some(LoginDto {
            uuid: Some(uid.to_string()),
            username: None,
        }),
        name: Some(NameDto {
            title: None,
            first: Some(first.to_string()),
            last: None,
        }),
        dob: Some(DobDto {
            date: None,
            age: None,
        }),
        ..Default::default()
    }
}

enum Reply {
    Users(Vec<UserDto>),
    Fail(String),
}

struct Scripted {
    /// Only answers queries for this many users
    count: Option<u32>,
    delay: Duration,
    reply: Reply,
}

/// Remote that answers each call with the next matching scripted reply,
/// optionally after a delay. Calls with no matching reply fail.
#[derive(Default)]
pub struct ScriptedSource {
    replies: Mutex<VecDeque<Scripted>>,
    calls: AtomicUsize,
    queries: Mutex<Vec<FetchQuery>>,
}

impl ScriptedSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, count: Option<u32>, delay: Duration, reply: Reply) {
        self.replies
            .lock()
            .expect("script lock")
            .push_back(Scripted { count, delay, reply });
    }

    pub fn reply(&self, users: Vec<UserDto>) -> &Self {
        self.push(None, Duration::ZERO, Reply::Users(users));
        self
    }

    /// Reply reserved for a query asking for exactly `count` users, so
    /// concurrent callers get their own answer regardless of call order.
    pub fn reply_for_count(&self, count: u32, delay: Duration, users: Vec<UserDto>) -> &Self {
        self.push(Some(count), delay, Reply::Users(users));
        self
    }

    pub fn fail(&self, msg: &str) -> &Self {
        self.push(None, Duration::ZERO, Reply::Fail(msg.to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<FetchQuery> {
        self.queries.lock().expect("queries lock").clone()
    }
}

#[async_trait]
impl RemoteUserSource for ScriptedSource {
    async fn fetch(&self, query: &FetchQuery) -> Result<Vec<UserDto>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().expect("queries lock").push(query.clone());
        let next = {
            let mut replies = self.replies.lock().expect("script lock");
            replies
                .iter()
                .position(|s| s.count.map_or(true, |c| c == query.count))
                .and_then(|i| replies.remove(i))
        };
        match next {
            Some(Scripted { delay, reply, .. }) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                match reply {
                    Reply::Users(users) => Ok(users),
                    Reply::Fail(msg) => Err(anyhow!(msg)),
                }
            }
            None => Err(anyhow!("script exhausted")),
        }
    }
}

/// In-memory store whose operations can be switched to fail.
pub struct FlakyStore {
    inner: CacheManager,
    pub fail_reads: AtomicBool,
    pub fail_deletes: AtomicBool,
    pub panic_reads: AtomicBool,
    reads: AtomicUsize,
    // While set, `list_all` takes its snapshot and then waits for a permit
    hold_lists: AtomicBool,
    list_gate: Semaphore,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: CacheManager::in_memory(),
            fail_reads: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
            panic_reads: AtomicBool::new(false),
            reads: AtomicUsize::new(0),
            hold_lists: AtomicBool::new(false),
            list_gate: Semaphore::new(0),
        })
    }

    /// Make later `list_all` calls return a snapshot taken at call time but
    /// only after `release_lists`.
    pub fn hold_lists(&self) {
        self.hold_lists.store(true, Ordering::SeqCst);
    }

    /// Let one held `list_all` finish and stop holding new ones.
    pub fn release_lists(&self) {
        self.hold_lists.store(false, Ordering::SeqCst);
        self.list_gate.add_permits(1);
    }

    pub async fn seed(&self, users: &[User]) {
        self.inner.upsert_batch(users).await.expect("seed store");
    }

    /// Number of read operations (list, subscribe) issued so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn check_read(&self) -> Result<()> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.panic_reads.load(Ordering::SeqCst) {
            panic!("storage engine crashed");
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(anyhow!("disk read error"));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for FlakyStore {
    async fn upsert_batch(&self, users: &[User]) -> Result<()> {
        self.inner.upsert_batch(users).await
    }

    fn subscribe(&self, uid: &str) -> Result<UserSubscription> {
        self.check_read()?;
        self.inner.subscribe(uid)
    }

    async fn list_all(&self) -> Result<Vec<User>> {
        self.check_read()?;
        let held = self.hold_lists.load(Ordering::SeqCst);
        let users = self.inner.list_all().await?;
        if held {
            self.list_gate.acquire().await.expect("gate open").forget();
        }
        Ok(users)
    }

    async fn delete(&self, uid: &str) -> Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(anyhow!("disk write error"));
        }
        self.inner.delete(uid).await
    }
}

pub struct FlagProbe(pub AtomicBool);

impl FlagProbe {
    pub fn new(online: bool) -> Arc<Self> {
        Arc::new(Self(AtomicBool::new(online)))
    }

    pub fn set(&self, online: bool) {
        self.0.store(online, Ordering::SeqCst);
    }
}

impl ConnectivityProbe for FlagProbe {
    fn is_online(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub fn repository(remote: &Arc<ScriptedSource>, store: &Arc<FlakyStore>) -> UserRepository {
    UserRepository::new(remote.clone(), store.clone())
}
