use database::{keys, KeyValueStore};
use tracing::{debug, warn};

/// Maximum number of suggestion chips rendered.
pub const SUGGESTION_LIMIT: usize = 6;

/// Recent queries plus a fixed seed list. Duplicates are detected without
/// regard to case; the first spelling seen is kept.
#[derive(Debug)]
pub struct SearchSuggestionTracker<S> {
    store: S,
    key: String,
    recent: Vec<String>,
    defaults: Vec<String>,
}

impl<S: KeyValueStore> SearchSuggestionTracker<S> {
    pub fn new(store: S, user_id: &str, defaults: Vec<String>) -> Self {
        Self {
            store,
            key: keys::suggestions(user_id),
            recent: Vec::new(),
            defaults,
        }
    }

    /// Returns true if the query was new.
    pub fn add(&mut self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() || contains_folded(&self.recent, query) {
            return false;
        }
        self.recent.push(query.to_string());
        true
    }

    /// Recent queries, newest first, then the defaults.
    pub fn render(&self) -> Vec<String> {
        let mut rendered: Vec<String> = Vec::with_capacity(SUGGESTION_LIMIT);
        for candidate in self.recent.iter().rev().chain(self.defaults.iter()) {
            if rendered.len() == SUGGESTION_LIMIT {
                break;
            }
            if !contains_folded(&rendered, candidate) {
                rendered.push(candidate.clone());
            }
        }
        rendered
    }

    /// Recent queries in insertion order.
    pub fn recent(&self) -> &[String] {
        &self.recent
    }

    pub async fn persist(&self) {
        let value = match serde_json::to_string(&self.recent) {
            Ok(value) => value,
            Err(e) => {
                warn!("Could not encode recent searches: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.put(&self.key, &value).await {
            warn!("Could not persist recent searches: {}", e);
        }
    }

    /// Missing or unreadable saved state leaves the recent list empty.
    pub async fn restore(&mut self) {
        self.recent = match self.store.get(&self.key).await {
            Ok(Some(value)) => match serde_json::from_str::<Vec<String>>(&value) {
                Ok(saved) => {
                    let mut recent: Vec<String> = Vec::with_capacity(saved.len());
                    for query in saved {
                        let query = query.trim();
                        if !query.is_empty() && !contains_folded(&recent, query) {
                            recent.push(query.to_string());
                        }
                    }
                    recent
                }
                Err(e) => {
                    warn!("Ignoring corrupt recent searches: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Could not read recent searches: {}", e);
                Vec::new()
            }
        };
        debug!("Restored {} recent searches", self.recent.len());
    }
}

fn contains_folded(list: &[String], candidate: &str) -> bool {
    let folded = candidate.to_lowercase();
    list.iter().any(|item| item.to_lowercase() == folded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::MemoryStore;
    use std::sync::Arc;

    fn defaults() -> Vec<String> {
        ["politics", "health", "technology", "sports"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn defaults_render_when_nothing_searched() {
        let tracker = SearchSuggestionTracker::new(MemoryStore::new(), "u", defaults());
        assert_eq!(tracker.render(), defaults());
    }

    #[test]
    fn eight_queries_render_six_newest_first() {
        let mut tracker = SearchSuggestionTracker::new(MemoryStore::new(), "u", defaults());
        for query in ["a1", "a2", "a3", "a4", "a5", "a6", "a7", "a8"] {
            assert!(tracker.add(query));
        }

        let rendered = tracker.render();
        assert_eq!(rendered, vec!["a8", "a7", "a6", "a5", "a4", "a3"]);
    }

    #[test]
    fn duplicates_and_empty_queries_are_ignored() {
        let mut tracker = SearchSuggestionTracker::new(MemoryStore::new(), "u", defaults());
        assert!(tracker.add("  Space "));
        assert!(!tracker.add("space"));
        assert!(!tracker.add("   "));
        assert!(!tracker.add(""));
        assert!(tracker.add("Health"));

        assert_eq!(tracker.recent(), &["Space".to_string(), "Health".to_string()]);
        assert_eq!(
            tracker.render(),
            vec!["Health", "Space", "politics", "technology", "sports"]
        );
    }

    #[tokio::test]
    async fn persist_and_restore() {
        let store = Arc::new(MemoryStore::new());
        let mut tracker = SearchSuggestionTracker::new(store.clone(), "u", defaults());
        tracker.add("rust");
        tracker.add("tokio");
        tracker.persist().await;

        let mut restored = SearchSuggestionTracker::new(store, "u", defaults());
        restored.restore().await;
        assert_eq!(restored.recent(), tracker.recent());
    }

    #[tokio::test]
    async fn corrupt_saved_state_yields_empty_recent() {
        let store = Arc::new(MemoryStore::new());
        store.put(&keys::suggestions("u"), "\"oops").await.unwrap();

        let mut tracker = SearchSuggestionTracker::new(store, "u", defaults());
        tracker.restore().await;
        assert!(tracker.recent().is_empty());
        assert_eq!(tracker.render(), defaults());
    }
}
