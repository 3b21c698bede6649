use crate::filter::{FilterEngine, FilterOutcome};
use crate::interactions::InteractionTracker;
use crate::post_store::{LoadReport, PostStore};
use crate::sort::sorted;
use crate::suggestions::SearchSuggestionTracker;
use crate::view::{self, ViewOptions};
use curator_core::{
    AppConfig, CoreError, FeedError, Interaction, Platform, Post, PostId, SortKey, TextFeedback,
    ViewMode,
};
use database::KeyValueStore;
use llm_interface::SemanticExpander;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub user_id: String,
    pub default_suggestions: Vec<String>,
    pub expand_timeout: Duration,
}

impl SessionSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            user_id: config.user_id.clone(),
            default_suggestions: config.search.default_suggestions.clone(),
            expand_timeout: Duration::from_secs(config.search.timeout_secs),
        }
    }
}

/// Hands out search tickets. Only the newest ticket may publish a result.
#[derive(Debug, Default)]
struct SearchGate {
    latest: AtomicU64,
    pending: AtomicU64,
}

impl SearchGate {
    fn issue(&self) -> u64 {
        let ticket = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        self.pending.store(ticket, Ordering::SeqCst);
        ticket
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket
    }

    fn finish(&self, ticket: u64) {
        let _ = self
            .pending
            .compare_exchange(ticket, 0, Ordering::SeqCst, Ordering::SeqCst);
    }

    /// Supersede every outstanding ticket.
    fn invalidate(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
        self.pending.store(0, Ordering::SeqCst);
    }

    fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst) != 0
    }
}

#[derive(Debug, Default)]
struct FeedState {
    posts: PostStore,
    filter: Option<FilterOutcome>,
    sort: SortKey,
    view: ViewOptions,
}

/// Session-scoped feed context.
///
/// Lock order is tracker, then suggestions, then state. No lock is held
/// while a semantic expansion is outstanding, so interactions stay
/// responsive during a slow search.
pub struct FeedSession<S, E> {
    tracker: Mutex<InteractionTracker<Arc<S>>>,
    suggestions: Mutex<SearchSuggestionTracker<Arc<S>>>,
    state: RwLock<FeedState>,
    filter: FilterEngine<E>,
    gate: SearchGate,
}

impl<S: KeyValueStore, E: SemanticExpander> FeedSession<S, E> {
    /// Build a session and restore saved suggestions.
    pub async fn open(store: S, expander: E, settings: SessionSettings) -> Self {
        let store = Arc::new(store);
        let tracker = InteractionTracker::new(store.clone(), settings.user_id.clone());
        let mut suggestions =
            SearchSuggestionTracker::new(store, &settings.user_id, settings.default_suggestions);
        suggestions.restore().await;

        info!("Opened feed session for {}", settings.user_id);
        Self {
            tracker: Mutex::new(tracker),
            suggestions: Mutex::new(suggestions),
            state: RwLock::new(FeedState::default()),
            filter: FilterEngine::new(expander, settings.expand_timeout),
            gate: SearchGate::default(),
        }
    }

    /// Replace the working set with `batch`, reapplying saved interactions.
    /// Any active filter is discarded and in-flight searches are superseded,
    /// since ids may be reassigned between loads.
    pub async fn reload(&self, batch: Value) -> Result<LoadReport, CoreError> {
        let mut staged = PostStore::new();
        let report = staged.load(batch)?;

        let mut tracker = self.tracker.lock().await;
        tracker.restore().await;
        let mut posts = PostStore::new();
        posts.replace(tracker.reconcile(staged.into_posts()));

        let mut state = self.state.write().await;
        self.gate.invalidate();
        state.posts = posts;
        state.filter = None;
        Ok(report)
    }

    /// Record a like, dislike or reset for a post in the working set.
    pub async fn record(&self, post_id: &PostId, interaction: Interaction) -> Result<(), CoreError> {
        let mut tracker = self.tracker.lock().await;
        if !self.state.read().await.posts.contains(post_id) {
            return Err(FeedError::PostNotFound {
                post_id: post_id.to_string(),
            }
            .into());
        }

        tracker.record(post_id, interaction).await;
        self.state
            .write()
            .await
            .posts
            .set_interaction(post_id, interaction);
        Ok(())
    }

    pub async fn record_feedback(
        &self,
        post_id: &PostId,
        text: &str,
    ) -> Result<TextFeedback, CoreError> {
        let tracker = self.tracker.lock().await;
        if !self.state.read().await.posts.contains(post_id) {
            return Err(FeedError::PostNotFound {
                post_id: post_id.to_string(),
            }
            .into());
        }
        tracker.record_feedback(post_id, text).await
    }

    /// Run a filter. Returns `None` when a later search, `clear_search` or
    /// `reload` superseded this one before it finished; its result is then
    /// discarded.
    pub async fn search(&self, query: &str) -> Option<FilterOutcome> {
        let ticket = self.gate.issue();

        if !query.trim().is_empty() {
            let mut suggestions = self.suggestions.lock().await;
            if suggestions.add(query) {
                suggestions.persist().await;
            }
        }

        let snapshot: Vec<Post> = self.state.read().await.posts.all().to_vec();
        let outcome = self.filter.apply(query, &snapshot).await;

        let mut state = self.state.write().await;
        self.gate.finish(ticket);
        if !self.gate.is_current(ticket) {
            debug!("Discarding superseded search for '{}'", outcome.query);
            return None;
        }

        state.filter = if outcome.query.is_empty() {
            None
        } else {
            Some(outcome.clone())
        };
        Some(outcome)
    }

    pub async fn clear_search(&self) {
        let mut state = self.state.write().await;
        self.gate.invalidate();
        state.filter = None;
    }

    /// True while the most recently issued search is still running.
    pub fn is_searching(&self) -> bool {
        self.gate.is_pending()
    }

    /// The active filter result, if any.
    pub async fn active_filter(&self) -> Option<FilterOutcome> {
        self.state.read().await.filter.clone()
    }

    /// Posts to display: the filtered subset (or everything), sorted, then
    /// narrowed by view options.
    pub async fn render(&self) -> Vec<Post> {
        let state = self.state.read().await;
        let selected: Vec<Post> = match &state.filter {
            Some(outcome) => outcome
                .ids
                .iter()
                .filter_map(|id| state.posts.get(id).ok().cloned())
                .collect(),
            None => state.posts.all().to_vec(),
        };

        let ordered = sorted(selected, state.sort);
        view::render(&ordered, &state.view)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn post(&self, post_id: &PostId) -> Result<Post, CoreError> {
        self.state.read().await.posts.get(post_id).cloned()
    }

    pub async fn suggestions(&self) -> Vec<String> {
        self.suggestions.lock().await.render()
    }

    pub async fn set_sort(&self, key: SortKey) {
        self.state.write().await.sort = key;
    }

    pub async fn set_view_mode(&self, mode: ViewMode) {
        self.state.write().await.view.mode = mode;
    }

    pub async fn set_platform(&self, platform: Option<Platform>) {
        self.state.write().await.view.platform = platform;
    }
}
