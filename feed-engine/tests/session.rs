//! End-to-end behaviour of a feed session over an in-memory store.

use curator_core::{
    CoreError, FeedError, Interaction, LlmError, Platform, PostId, SortKey, StoreError, ViewMode,
};
use database::{KeyValueStore, MemoryStore};
use feed_engine::{FeedSession, MatchTier, SessionSettings};
use llm_interface::SemanticExpander;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

struct StaticExpander {
    terms: Vec<String>,
    calls: Arc<AtomicUsize>,
}

impl StaticExpander {
    fn new(terms: &[&str]) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let expander = Self {
            terms: terms.iter().map(|t| t.to_string()).collect(),
            calls: calls.clone(),
        };
        (expander, calls)
    }
}

impl SemanticExpander for StaticExpander {
    async fn expand(&self, _query: &str, _vocabulary: &[String]) -> Result<Vec<String>, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.terms.clone())
    }
}

/// Holds every expansion until released.
struct GatedExpander {
    terms: Vec<String>,
    release: Arc<Notify>,
}

impl SemanticExpander for GatedExpander {
    async fn expand(&self, _query: &str, _vocabulary: &[String]) -> Result<Vec<String>, CoreError> {
        self.release.notified().await;
        Ok(self.terms.clone())
    }
}

struct FailingExpander;

impl SemanticExpander for FailingExpander {
    async fn expand(&self, _query: &str, _vocabulary: &[String]) -> Result<Vec<String>, CoreError> {
        Err(CoreError::Llm(LlmError::RequestTimeout {
            provider: "test".to_string(),
        }))
    }
}

/// Memory store with switchable read and write failures.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

fn offline() -> CoreError {
    CoreError::Store(StoreError::ConnectionFailed {
        reason: "offline".to_string(),
    })
}

impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), CoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(offline());
        }
        self.inner.put(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<bool, CoreError> {
        self.inner.delete(key).await
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, CoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(offline());
        }
        self.inner.scan_prefix(prefix).await
    }
}

fn settings() -> SessionSettings {
    SessionSettings {
        user_id: "tester".to_string(),
        default_suggestions: vec![
            "politics".to_string(),
            "health".to_string(),
            "technology".to_string(),
            "sports".to_string(),
        ],
        expand_timeout: Duration::from_secs(5),
    }
}

fn batch() -> Value {
    json!([
        {
            "id": 1,
            "summary": "Senate passes the budget",
            "keywords": ["politics"],
            "rank": 2,
            "accountUrl": "https://twitter.com/senate",
            "isFriend": true
        },
        {
            "id": 2,
            "post_text": "Night sky photography tips",
            "keywords": "astronomy, photography",
            "rank": 5,
            "post_url": "https://www.instagram.com/p/abc",
            "likes": "1,204"
        },
        {
            "id": 3,
            "summary": "Five habits for better sleep",
            "keywords": ["health"],
            "rank": 2,
            "url": "https://www.facebook.com/post/3",
            "isFriend": true
        },
        { "id": 4, "summary": "" }
    ])
}

fn ids(posts: &[curator_core::Post]) -> Vec<&str> {
    posts.iter().map(|p| p.id.as_str()).collect()
}

#[tokio::test]
async fn reload_reports_dropped_records_and_renders_by_rank() {
    let (expander, _) = StaticExpander::new(&[]);
    let session = FeedSession::open(MemoryStore::new(), expander, settings()).await;

    let report = session.reload(batch()).await.unwrap();
    assert_eq!(report.loaded, 3);
    assert_eq!(report.dropped, 1);

    let feed = session.render().await;
    assert_eq!(ids(&feed), vec!["2", "1", "3"]);
}

#[tokio::test]
async fn non_sequence_batch_fails_fast() {
    let (expander, _) = StaticExpander::new(&[]);
    let session = FeedSession::open(MemoryStore::new(), expander, settings()).await;

    let result = session.reload(json!("posts")).await;
    assert!(matches!(
        result,
        Err(CoreError::Feed(FeedError::NotASequence { .. }))
    ));
}

#[tokio::test]
async fn interactions_survive_reordered_reload_in_a_new_session() {
    let store = Arc::new(MemoryStore::new());

    let (expander, _) = StaticExpander::new(&[]);
    let first = FeedSession::open(store.clone(), expander, settings()).await;
    first.reload(batch()).await.unwrap();
    first
        .record(&PostId::from("2"), Interaction::Liked)
        .await
        .unwrap();

    let reordered = json!([
        { "id": 3, "summary": "Five habits for better sleep" },
        { "id": 1, "summary": "Senate passes the budget" },
        { "id": 2, "summary": "Night sky photography tips" }
    ]);
    let (expander, _) = StaticExpander::new(&[]);
    let second = FeedSession::open(store, expander, settings()).await;
    second.reload(reordered).await.unwrap();

    for (id, expected) in [
        ("3", Interaction::Neutral),
        ("1", Interaction::Neutral),
        ("2", Interaction::Liked),
    ] {
        let post = second.post(&PostId::from(id)).await.unwrap();
        assert_eq!(post.interaction, expected, "post {id}");
    }
}

#[tokio::test]
async fn recording_unknown_post_is_an_error() {
    let (expander, _) = StaticExpander::new(&[]);
    let session = FeedSession::open(MemoryStore::new(), expander, settings()).await;
    session.reload(batch()).await.unwrap();

    let result = session.record(&PostId::from("99"), Interaction::Liked).await;
    assert!(matches!(
        result,
        Err(CoreError::Feed(FeedError::PostNotFound { .. }))
    ));
}

#[tokio::test]
async fn semantic_search_filters_feed_and_records_suggestion() {
    let (expander, calls) = StaticExpander::new(&["astronomy"]);
    let session = FeedSession::open(MemoryStore::new(), expander, settings()).await;
    session.reload(batch()).await.unwrap();

    let outcome = session.search("space").await.unwrap();
    assert_eq!(outcome.tier, MatchTier::Semantic);
    assert_eq!(outcome.related_terms, vec!["astronomy"]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(ids(&session.render().await), vec!["2"]);

    assert_eq!(session.suggestions().await[0], "space");
}

#[tokio::test]
async fn direct_match_never_calls_expansion() {
    let (expander, calls) = StaticExpander::new(&["astronomy"]);
    let session = FeedSession::open(MemoryStore::new(), expander, settings()).await;
    session.reload(batch()).await.unwrap();

    let outcome = session.search("health").await.unwrap();
    assert_eq!(outcome.tier, MatchTier::Keyword);
    assert_eq!(ids(&session.render().await), vec!["3"]);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_expansion_renders_nothing() {
    let session = FeedSession::open(MemoryStore::new(), FailingExpander, settings()).await;
    session.reload(batch()).await.unwrap();

    let outcome = session.search("space").await.unwrap();
    assert_eq!(outcome.tier, MatchTier::NoMatch);
    assert!(session.render().await.is_empty());

    session.clear_search().await;
    assert_eq!(session.render().await.len(), 3);
}

#[tokio::test]
async fn empty_search_shows_everything() {
    let (expander, _) = StaticExpander::new(&[]);
    let session = FeedSession::open(MemoryStore::new(), expander, settings()).await;
    session.reload(batch()).await.unwrap();

    session.search("health").await.unwrap();
    let outcome = session.search("  ").await.unwrap();
    assert_eq!(outcome.tier, MatchTier::All);
    assert_eq!(session.render().await.len(), 3);
    assert_eq!(session.suggestions().await[0], "health");
}

#[tokio::test]
async fn newer_search_supersedes_slow_semantic_search() {
    let release = Arc::new(Notify::new());
    let expander = GatedExpander {
        terms: vec!["astronomy".to_string()],
        release: release.clone(),
    };
    let session = FeedSession::open(MemoryStore::new(), expander, settings()).await;
    session.reload(batch()).await.unwrap();

    let newer = async {
        while !session.is_searching() {
            tokio::task::yield_now().await;
        }
        let outcome = session.search("health").await;
        release.notify_one();
        outcome
    };
    let (slow, fast) = tokio::join!(session.search("space"), newer);

    assert!(slow.is_none());
    assert_eq!(fast.unwrap().tier, MatchTier::Keyword);
    assert_eq!(ids(&session.render().await), vec!["3"]);
    assert!(!session.is_searching());
}

#[tokio::test]
async fn likes_stay_responsive_while_expansion_hangs() {
    let release = Arc::new(Notify::new());
    let expander = GatedExpander {
        terms: vec!["astronomy".to_string()],
        release: release.clone(),
    };
    let session = FeedSession::open(MemoryStore::new(), expander, settings()).await;
    session.reload(batch()).await.unwrap();

    let like = async {
        while !session.is_searching() {
            tokio::task::yield_now().await;
        }
        session
            .record(&PostId::from("3"), Interaction::Liked)
            .await
            .unwrap();
        let still_searching = session.is_searching();
        release.notify_one();
        still_searching
    };
    let (outcome, liked_mid_search) = tokio::join!(session.search("space"), like);

    assert!(liked_mid_search);
    assert_eq!(outcome.unwrap().tier, MatchTier::Semantic);
    let post = session.post(&PostId::from("3")).await.unwrap();
    assert_eq!(post.interaction, Interaction::Liked);
}

#[tokio::test]
async fn reload_discards_active_filter() {
    let (expander, _) = StaticExpander::new(&[]);
    let session = FeedSession::open(MemoryStore::new(), expander, settings()).await;
    session.reload(batch()).await.unwrap();

    session.search("health").await.unwrap();
    assert!(session.active_filter().await.is_some());

    session.reload(batch()).await.unwrap();
    assert!(session.active_filter().await.is_none());
    assert_eq!(session.render().await.len(), 3);
}

#[tokio::test]
async fn sort_and_view_settings_apply_to_render() {
    let (expander, _) = StaticExpander::new(&[]);
    let session = FeedSession::open(MemoryStore::new(), expander, settings()).await;
    session.reload(batch()).await.unwrap();

    session.set_sort(SortKey::Likes).await;
    assert_eq!(ids(&session.render().await), vec!["2", "1", "3"]);

    session.set_view_mode(ViewMode::FollowedOnly).await;
    assert_eq!(ids(&session.render().await), vec!["1", "3"]);

    session.set_platform(Some(Platform::Facebook)).await;
    assert_eq!(ids(&session.render().await), vec!["3"]);

    let first = session.render().await;
    let second = session.render().await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn feedback_is_saved_for_known_posts() {
    let (expander, _) = StaticExpander::new(&[]);
    let session = FeedSession::open(MemoryStore::new(), expander, settings()).await;
    session.reload(batch()).await.unwrap();

    let saved = session
        .record_feedback(&PostId::from("1"), "more like this")
        .await
        .unwrap();
    assert_eq!(saved.text, "more like this");

    assert!(session
        .record_feedback(&PostId::from("42"), "hello")
        .await
        .is_err());
}

#[tokio::test]
async fn suggestions_persist_between_sessions() {
    let store = Arc::new(MemoryStore::new());

    let (expander, _) = StaticExpander::new(&[]);
    let first = FeedSession::open(store.clone(), expander, settings()).await;
    first.reload(batch()).await.unwrap();
    first.search("Budget").await.unwrap();
    first.search("budget").await.unwrap();

    let (expander, _) = StaticExpander::new(&[]);
    let second = FeedSession::open(store, expander, settings()).await;
    assert_eq!(
        second.suggestions().await,
        vec!["Budget", "politics", "health", "technology", "sports"]
    );
}

#[tokio::test]
async fn reload_keeps_likes_when_storage_misbehaves() {
    let store = Arc::new(FlakyStore::default());
    let (expander, _) = StaticExpander::new(&[]);
    let session = FeedSession::open(store.clone(), expander, settings()).await;
    session.reload(batch()).await.unwrap();

    session
        .record(&PostId::from("1"), Interaction::Liked)
        .await
        .unwrap();

    store.fail_writes.store(true, Ordering::SeqCst);
    session
        .record(&PostId::from("2"), Interaction::Disliked)
        .await
        .unwrap();
    session.reload(batch()).await.unwrap();
    assert_eq!(
        session.post(&PostId::from("2")).await.unwrap().interaction,
        Interaction::Disliked
    );

    store.fail_reads.store(true, Ordering::SeqCst);
    session.reload(batch()).await.unwrap();
    for (id, expected) in [("1", Interaction::Liked), ("2", Interaction::Disliked)] {
        let post = session.post(&PostId::from(id)).await.unwrap();
        assert_eq!(post.interaction, expected, "post {id}");
    }
}
