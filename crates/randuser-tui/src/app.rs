//! Application state management for randuser.
//!
//! `App` owns the core services (store, repository, connectivity probe), the
//! current `ListAccumulator` and the `DetailResolver` for the selected row,
//! plus the UI state the renderer and input handler work on.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{debug, info, warn};

use randuser_core::models::NATIONALITIES;
use randuser_core::{
    ApiClient, CacheManager, Config, ConnectivityProbe, DetailResolver, DetailState, FixedProbe, Gender,
    ListAccumulator, ListState, RemoteUserSource, RouteProbe, User, UserFilter, UserRepository,
    UserStore,
};

// ============================================================================
// Constants
// ============================================================================

/// Number of rows to move on page up/down.
pub const PAGE_SCROLL_SIZE: usize = 10;

/// How long an error toast stays in the status bar.
const TOAST_DURATION: Duration = Duration::from_secs(4);

// ============================================================================
// UI State Types
// ============================================================================

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    EditingFilter,
    ShowingHelp,
    ConfirmingQuit,
    Quitting,
}

/// Filter form focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Gender,
    Nationality,
}

impl FilterField {
    pub fn toggle(self) -> Self {
        match self {
            FilterField::Gender => FilterField::Nationality,
            FilterField::Nationality => FilterField::Gender,
        }
    }
}

/// Pending edits in the filter form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterForm {
    pub gender: Option<Gender>,
    /// Index into `NATIONALITIES`, None for any
    pub nationality: Option<usize>,
    pub focus: FilterField,
}

impl FilterForm {
    pub fn from_filter(filter: &UserFilter) -> Self {
        Self {
            gender: filter.gender,
            nationality: filter
                .nationality_param()
                .and_then(|nat| NATIONALITIES.iter().position(|n| *n == nat)),
            focus: FilterField::Gender,
        }
    }

    pub fn to_filter(&self) -> UserFilter {
        UserFilter {
            gender: self.gender,
            nationality: self.nationality_code().map(str::to_string),
        }
    }

    pub fn nationality_code(&self) -> Option<&'static str> {
        self.nationality.and_then(|i| NATIONALITIES.get(i).copied())
    }

    /// Change the focused field; `forward` picks the cycling direction.
    pub fn cycle(&mut self, forward: bool) {
        match self.focus {
            FilterField::Gender => {
                self.gender = if forward {
                    Gender::cycle(self.gender)
                } else {
                    Gender::cycle(Gender::cycle(self.gender))
                };
            }
            FilterField::Nationality => {
                self.nationality = cycle_nationality(self.nationality, forward);
            }
        }
    }
}

/// Step through "any" followed by every nationality code, wrapping.
pub fn cycle_nationality(current: Option<usize>, forward: bool) -> Option<usize> {
    let last = NATIONALITIES.len() - 1;
    match (current, forward) {
        (None, true) => Some(0),
        (None, false) => Some(last),
        (Some(i), true) if i >= last => None,
        (Some(i), true) => Some(i + 1),
        (Some(0), false) => None,
        (Some(i), false) => Some(i - 1),
    }
}

/// Keep a selection index inside a list of `len` rows.
pub fn clamp_selection(selection: usize, len: usize) -> usize {
    selection.min(len.saturating_sub(1))
}

// ============================================================================
// Main Application Struct
// ============================================================================

pub struct App {
    // Core services
    pub config: Config,
    pub cache: Arc<CacheManager>,
    repo: UserRepository,
    probe: Arc<dyn ConnectivityProbe>,

    // List and detail
    list: ListAccumulator,
    pub list_state: ListState,
    pub detail: Option<DetailResolver>,
    pub detail_state: Option<DetailState>,

    // UI State
    pub state: AppState,
    pub selection: usize,
    pub filter_form: FilterForm,

    // Status bar
    pub status_message: Option<String>,
    toast: Option<(String, Instant)>,
}

impl App {
    /// Create a new application instance. Must run inside the Tokio runtime.
    pub fn new(config: Config, cache_dir: PathBuf) -> Result<Self> {
        debug!(?cache_dir, "App::new() starting");

        let cache = match CacheManager::new(cache_dir) {
            Ok(cache) => Arc::new(cache),
            Err(e) => {
                warn!(error = %e, "Failed to open user cache, keeping users in memory");
                Arc::new(CacheManager::in_memory())
            }
        };

        let api = match config.base_url.as_deref() {
            Some(url) => ApiClient::with_base_url(url)?,
            None => ApiClient::new()?,
        };
        let remote: Arc<dyn RemoteUserSource> = Arc::new(api);
        let store: Arc<dyn UserStore> = cache.clone();
        let repo = UserRepository::new(remote, store);

        let probe: Arc<dyn ConnectivityProbe> = if config.offline_mode {
            info!("Offline mode enabled, fetching disabled");
            Arc::new(FixedProbe(false))
        } else {
            Arc::new(RouteProbe::new())
        };

        let filter = config.default_filter();
        let list = ListAccumulator::new(repo.clone(), probe.clone(), filter.clone());

        Ok(Self {
            config,
            cache,
            repo,
            probe,
            list,
            list_state: ListState::default(),
            detail: None,
            detail_state: None,
            state: AppState::Normal,
            selection: 0,
            filter_form: FilterForm::from_filter(&filter),
            status_message: None,
            toast: None,
        })
    }

    pub fn filter(&self) -> &UserFilter {
        self.list.filter()
    }

    pub fn is_offline(&self) -> bool {
        self.config.offline_mode
    }

    pub fn selected_user(&self) -> Option<&User> {
        self.list_state.users.get(self.selection)
    }

    /// Current error toast, if it hasn't expired.
    pub fn toast(&self) -> Option<&str> {
        self.toast
            .as_ref()
            .filter(|(_, at)| at.elapsed() < TOAST_DURATION)
            .map(|(msg, _)| msg.as_str())
    }

    pub fn dismiss_toast(&mut self) {
        self.toast = None;
    }

    // ===== Actions =====

    pub async fn add_users(&mut self) {
        self.list.append_random(self.config.append_count()).await;
    }

    pub async fn delete_selected(&mut self) {
        let Some(uid) = self.selected_user().map(|u| u.uid.clone()) else {
            return;
        };
        self.list.remove(&uid).await;
        self.status_message = Some(format!("Deleting {}", uid));
    }

    pub async fn refresh(&mut self) {
        self.list.refresh().await;
        self.status_message = Some("Reloaded from cache".to_string());
    }

    pub fn start_filter_edit(&mut self) {
        self.filter_form = FilterForm::from_filter(self.filter());
        self.state = AppState::EditingFilter;
    }

    /// Start a new list with the form's filter and remember it as default.
    pub fn apply_filter(&mut self) {
        let filter = self.filter_form.to_filter();
        info!(filter = %filter.label(), "Starting new list");

        self.list = ListAccumulator::new(self.repo.clone(), self.probe.clone(), filter.clone());
        self.list_state = self.list.state();
        self.selection = 0;
        self.detail = None;
        self.detail_state = None;
        self.state = AppState::Normal;

        self.config.default_gender = filter.gender_param().map(str::to_string);
        self.config.default_nationality = filter.nationality_param().map(str::to_string);
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
        self.status_message = Some(format!("Filter: {}", filter.label()));
    }

    // ===== Selection =====

    pub fn select_next(&mut self, step: usize) {
        self.selection = clamp_selection(self.selection.saturating_add(step), self.list_state.users.len());
    }

    pub fn select_prev(&mut self, step: usize) {
        self.selection = self.selection.saturating_sub(step);
    }

    pub fn select_first(&mut self) {
        self.selection = 0;
    }

    pub fn select_last(&mut self) {
        self.selection = clamp_selection(usize::MAX, self.list_state.users.len());
    }

    // ===== Background state =====

    /// Pull the latest list and detail state and surface new errors.
    pub async fn check_background_tasks(&mut self) {
        self.list_state = self.list.state();
        self.selection = clamp_selection(self.selection, self.list_state.users.len());

        if self.list_state.error.is_some() {
            if let Some(err) = self.list.take_error().await {
                warn!(error = %err, "List error");
                self.toast = Some((err.to_string(), Instant::now()));
            }
        }

        self.sync_detail();
    }

    /// Point the detail panel at the selected row.
    fn sync_detail(&mut self) {
        let selected = self.selected_user().map(|u| u.uid.clone());
        let current = self.detail.as_ref().and_then(|d| d.uid()).map(str::to_string);

        if selected.is_none() {
            self.detail = None;
            self.detail_state = None;
            return;
        }
        if selected != current {
            self.detail = Some(DetailResolver::new(self.repo.clone(), selected.as_deref()));
        }
        self.detail_state = self.detail.as_ref().map(DetailResolver::state);
    }
}
