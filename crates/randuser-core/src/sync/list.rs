//! Accumulating user list.
//!
//! A `ListAccumulator` owns one `ListState` inside an actor task. Callers
//! send intents (load, append, remove) over an MPSC channel; the actor starts
//! the I/O in separate tasks and applies their completions to the state one
//! at a time, publishing every new state through a watch channel. Appends are
//! applied in the order they were requested even when their fetches finish
//! out of order.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use crate::config::DEFAULT_APPEND_COUNT;
use crate::connectivity::ConnectivityProbe;
use crate::models::{User, UserFilter};
use crate::repository::UserRepository;

use super::ListError;

/// Buffer size for the intent and completion channels.
const CHANNEL_BUFFER_SIZE: usize = 32;

/// Snapshot of an accumulated list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListState {
    /// Oldest first
    pub users: Vec<User>,
    pub is_loading_more: bool,
    /// Last failure, until taken with `ListAccumulator::take_error`
    pub error: Option<ListError>,
}

enum Intent {
    Load,
    Append(u32),
    Remove(String),
    TakeError(oneshot::Sender<Option<ListError>>),
}

/// Results sent back to the actor by its I/O tasks.
enum Completion {
    /// `mark` is the op log position when the load was issued
    Loaded { mark: usize, result: Result<Vec<User>> },
    Appended { ticket: u64, result: Result<Vec<User>> },
    Removed { uid: String, result: Result<()> },
}

/// List mutation already applied to the state, kept while loads are in
/// flight so a load that read the store earlier doesn't undo it.
enum AppliedOp {
    Appended(Vec<User>),
    Removed(String),
}

/// Handle to one accumulated list. Dropping it stops the actor; fetches
/// already in flight still finish writing to the store.
pub struct ListAccumulator {
    intents: mpsc::Sender<Intent>,
    state: watch::Receiver<ListState>,
    filter: UserFilter,
}

impl ListAccumulator {
    /// Start the actor, which immediately loads the cached users and appends
    /// one fresh user. Must be called within a Tokio runtime.
    pub fn new(repo: UserRepository, probe: Arc<dyn ConnectivityProbe>, filter: UserFilter) -> Self {
        let (intent_tx, intent_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let (state_tx, state_rx) = watch::channel(ListState::default());
        let (done_tx, done_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        let actor = Actor {
            repo,
            probe,
            filter: filter.clone(),
            state: ListState::default(),
            publish: state_tx,
            done_tx,
            next_ticket: 0,
            next_to_apply: 0,
            finished: BTreeMap::new(),
            ops: Vec::new(),
            ops_base: 0,
            loads_in_flight: 0,
        };
        tokio::spawn(actor.run(intent_rx, done_rx));

        Self {
            intents: intent_tx,
            state: state_rx,
            filter,
        }
    }

    pub fn filter(&self) -> &UserFilter {
        &self.filter
    }

    /// Current state.
    pub fn state(&self) -> ListState {
        self.state.borrow().clone()
    }

    /// Receiver that is notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<ListState> {
        self.state.clone()
    }

    /// Replace the list with the store contents.
    pub async fn load_from_cache(&self) {
        self.send(Intent::Load).await;
    }

    /// Reconcile with the store, e.g. after users were deleted elsewhere.
    pub async fn refresh(&self) {
        self.load_from_cache().await;
    }

    /// Fetch `count` new users and append them to the end of the list.
    pub async fn append_random(&self, count: u32) {
        self.send(Intent::Append(count)).await;
    }

    /// Delete a user from the store and drop it from the list.
    pub async fn remove(&self, uid: &str) {
        self.send(Intent::Remove(uid.to_string())).await;
    }

    /// Return the pending error, clearing it so it is reported only once.
    pub async fn take_error(&self) -> Option<ListError> {
        let (tx, rx) = oneshot::channel();
        self.send(Intent::TakeError(tx)).await;
        rx.await.ok().flatten()
    }

    async fn send(&self, intent: Intent) {
        if self.intents.send(intent).await.is_err() {
            error!("List actor stopped, intent dropped");
        }
    }
}

struct Actor {
    repo: UserRepository,
    probe: Arc<dyn ConnectivityProbe>,
    filter: UserFilter,
    state: ListState,
    publish: watch::Sender<ListState>,
    done_tx: mpsc::Sender<Completion>,

    // Append ordering: tickets are issued in request order and applied in
    // the same order; results that arrive early wait in `finished`.
    next_ticket: u64,
    next_to_apply: u64,
    finished: BTreeMap<u64, Result<Vec<User>>>,

    // Ops applied while at least one load is in flight. `ops_base` is the
    // absolute position of `ops[0]`.
    ops: Vec<AppliedOp>,
    ops_base: usize,
    loads_in_flight: usize,
}

impl Actor {
    async fn run(mut self, mut intents: mpsc::Receiver<Intent>, mut done: mpsc::Receiver<Completion>) {
        debug!(filter = %self.filter.label(), "List actor started");
        self.start_load();
        self.start_append(DEFAULT_APPEND_COUNT);

        loop {
            tokio::select! {
                intent = intents.recv() => match intent {
                    Some(intent) => self.handle_intent(intent),
                    None => break,
                },
                Some(completion) = done.recv() => self.handle_completion(completion),
            }
        }

        debug!("List actor stopped");
    }

    fn publish(&self) {
        self.publish.send_replace(self.state.clone());
    }

    fn handle_intent(&mut self, intent: Intent) {
        match intent {
            Intent::Load => self.start_load(),
            Intent::Append(count) => self.start_append(count),
            Intent::Remove(uid) => self.start_remove(uid),
            Intent::TakeError(reply) => {
                let taken = self.state.error.take();
                if taken.is_some() {
                    self.publish();
                }
                // Caller may have stopped waiting
                let _ = reply.send(taken);
            }
        }
    }

    /// Run `io` in its own task and feed the outcome back to the actor. A
    /// panic inside `io` arrives as an ordinary error.
    fn spawn_io<T, F>(&self, io: F, wrap: impl FnOnce(Result<T>) -> Completion + Send + 'static)
    where
        T: Send + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let tx = self.done_tx.clone();
        tokio::spawn(async move {
            let result = match tokio::spawn(io).await {
                Ok(result) => result,
                Err(e) => Err(anyhow!("I/O task failed: {}", e)),
            };
            if tx.send(wrap(result)).await.is_err() {
                debug!("List actor gone, completion dropped");
            }
        });
    }

    fn start_load(&mut self) {
        let mark = self.ops_base + self.ops.len();
        self.loads_in_flight += 1;

        let repo = self.repo.clone();
        self.spawn_io(async move { repo.list_all().await }, move |result| {
            Completion::Loaded { mark, result }
        });
    }

    fn start_append(&mut self, count: u32) {
        if !self.probe.is_online() {
            info!("Offline, not fetching users");
            self.state.error = Some(ListError::NoInternet);
            self.publish();
            return;
        }

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.state.is_loading_more = true;
        self.publish();

        let repo = self.repo.clone();
        let filter = self.filter.clone();
        self.spawn_io(
            async move { repo.fetch_and_store(&filter, count).await },
            move |result| Completion::Appended { ticket, result },
        );
    }

    fn start_remove(&mut self, uid: String) {
        let repo = self.repo.clone();
        let key = uid.clone();
        self.spawn_io(async move { repo.delete_by_key(&key).await }, move |result| {
            Completion::Removed { uid, result }
        });
    }

    fn record(&mut self, op: AppliedOp) {
        if self.loads_in_flight > 0 {
            self.ops.push(op);
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Loaded { mark, result } => self.apply_load(mark, result),
            Completion::Appended { ticket, result } => {
                self.finished.insert(ticket, result);
                self.apply_ready_appends();
            }
            Completion::Removed { uid, result } => match result {
                Ok(()) => {
                    self.state.users.retain(|u| u.uid != uid);
                    self.record(AppliedOp::Removed(uid));
                }
                Err(e) => {
                    warn!(uid = %uid, error = %format!("{:#}", e), "Delete failed");
                    self.state.error = Some(ListError::DeleteFailed);
                }
            },
        }
        self.publish();
    }

    fn apply_load(&mut self, mark: usize, result: Result<Vec<User>>) {
        self.loads_in_flight = self.loads_in_flight.saturating_sub(1);

        match result {
            Ok(mut users) => {
                // Replay what happened after this load read the store
                let start = mark.saturating_sub(self.ops_base);
                for op in self.ops.iter().skip(start) {
                    match op {
                        AppliedOp::Appended(batch) => {
                            for user in batch {
                                if !users.iter().any(|u| u.uid == user.uid) {
                                    users.push(user.clone());
                                }
                            }
                        }
                        AppliedOp::Removed(uid) => users.retain(|u| &u.uid != uid),
                    }
                }
                debug!(count = users.len(), "List loaded from cache");
                self.state.users = users;
            }
            Err(e) => {
                warn!(error = %format!("{:#}", e), "Load from cache failed");
                self.state.error = Some(ListError::LoadFailed);
            }
        }

        if self.loads_in_flight == 0 {
            self.ops_base += self.ops.len();
            self.ops.clear();
        }
    }

    fn apply_ready_appends(&mut self) {
        while let Some(result) = self.finished.remove(&self.next_to_apply) {
            self.next_to_apply += 1;
            match result {
                Ok(batch) => {
                    debug!(count = batch.len(), "Appending fetched users");
                    self.state.users.extend(batch.iter().cloned());
                    self.record(AppliedOp::Appended(batch));
                }
                Err(e) => {
                    warn!(error = %format!("{:#}", e), "Fetch failed");
                    self.state.error = Some(ListError::FetchFailed);
                }
            }
        }
        self.state.is_loading_more = self.next_to_apply != self.next_ticket;
    }
}
