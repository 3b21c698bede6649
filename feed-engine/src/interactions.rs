use curator_core::{
    CoreError, Interaction, InteractionRecord, Post, PostId, TextFeedback,
};
use database::{keys, KeyValueStore};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Per-user like/dislike state, persisted one record per post.
///
/// Records are keyed by post id only. Reconciling by position would attach
/// a saved decision to whichever post happens to occupy that slot after a
/// resort or refetch.
#[derive(Debug)]
pub struct InteractionTracker<S> {
    store: S,
    user_id: String,
    records: HashMap<PostId, InteractionRecord>,
    unsaved: HashSet<PostId>,
}

impl<S: KeyValueStore> InteractionTracker<S> {
    pub fn new(store: S, user_id: impl Into<String>) -> Self {
        Self {
            store,
            user_id: user_id.into(),
            records: HashMap::new(),
            unsaved: HashSet::new(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Re-read every persisted record for this user. Unreadable entries are
    /// skipped. If the store cannot be scanned the records already in memory
    /// are kept, and decisions whose write failed always survive a restore.
    pub async fn restore(&mut self) -> usize {
        let prefix = keys::interaction_prefix(&self.user_id);
        let rows = match self.store.scan_prefix(&prefix).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(
                    "Could not read saved interactions, keeping {} in memory: {}",
                    self.records.len(),
                    e
                );
                return self.records.len();
            }
        };

        let mut restored = HashMap::new();
        for (key, value) in rows {
            let Some(post_id) = keys::post_id_from_key(&prefix, &key) else {
                continue;
            };
            match serde_json::from_str::<InteractionRecord>(&value) {
                Ok(record) if record.post_id == post_id => {
                    restored.insert(post_id, record);
                }
                Ok(record) => {
                    warn!(
                        "Ignoring interaction stored under {} for post {}",
                        key, record.post_id
                    );
                }
                Err(e) => warn!("Ignoring corrupt interaction at {}: {}", key, e),
            }
        }

        for post_id in &self.unsaved {
            if let Some(record) = self.records.get(post_id) {
                restored.insert(post_id.clone(), record.clone());
            }
        }
        self.records = restored;

        debug!(
            "Restored {} interactions for {} ({} unsaved)",
            self.records.len(),
            self.user_id,
            self.unsaved.len()
        );
        self.records.len()
    }

    /// Apply saved decisions to `posts` by id. Posts without a record are
    /// reset to neutral.
    pub fn reconcile(&self, posts: Vec<Post>) -> Vec<Post> {
        posts
            .into_iter()
            .map(|mut post| {
                post.interaction = self.interaction_for(&post.id);
                post
            })
            .collect()
    }

    pub fn interaction_for(&self, post_id: &PostId) -> Interaction {
        self.records
            .get(post_id)
            .map(|record| record.interaction)
            .unwrap_or_default()
    }

    /// Posts whose latest decision exists only in memory.
    pub fn unsaved(&self) -> usize {
        self.unsaved.len()
    }

    pub fn records(&self) -> impl Iterator<Item = &InteractionRecord> {
        self.records.values()
    }

    /// Overwrite the decision for `post_id`. A failed write is logged and
    /// the in-memory state still changes; the record is then held as unsaved
    /// until a later write for the same post succeeds.
    pub async fn record(&mut self, post_id: &PostId, interaction: Interaction) {
        let record = InteractionRecord::now(post_id.clone(), interaction);
        let key = keys::interaction(&self.user_id, post_id);

        let saved = match serde_json::to_string(&record) {
            Ok(value) => match self.store.put(&key, &value).await {
                Ok(()) => true,
                Err(e) => {
                    warn!("Could not persist interaction for {}: {}", post_id, e);
                    false
                }
            },
            Err(e) => {
                warn!("Could not encode interaction for {}: {}", post_id, e);
                false
            }
        };

        if saved {
            self.unsaved.remove(post_id);
        } else {
            self.unsaved.insert(post_id.clone());
        }

        debug!("Recorded {} for post {}", interaction, post_id);
        self.records.insert(post_id.clone(), record);
    }

    /// Save free-text feedback for a post, replacing earlier feedback.
    pub async fn record_feedback(
        &self,
        post_id: &PostId,
        text: &str,
    ) -> Result<TextFeedback, CoreError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CoreError::InvalidInput {
                message: "feedback text is empty".to_string(),
            });
        }

        let feedback = TextFeedback::now(post_id.clone(), text);
        let value = serde_json::to_string(&feedback)?;
        self.store
            .put(&keys::feedback(&self.user_id, post_id), &value)
            .await?;

        debug!("Saved feedback for post {}", post_id);
        Ok(feedback)
    }

    pub async fn feedback(&self, post_id: &PostId) -> Result<Option<TextFeedback>, CoreError> {
        let Some(value) = self
            .store
            .get(&keys::feedback(&self.user_id, post_id))
            .await?
        else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&value)?))
    }
}
