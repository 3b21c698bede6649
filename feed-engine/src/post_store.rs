use curator_core::{CoreError, FeedError, Interaction, Post, PostId, RawPost, RejectReason};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub dropped: usize,
}

/// The working set of posts for one session, in load order.
#[derive(Debug, Clone, Default)]
pub struct PostStore {
    posts: Vec<Post>,
    index: HashMap<PostId, usize>,
}

impl PostStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the working set with a batch from a post source.
    ///
    /// The batch must be a JSON array. Records that fail validation are
    /// dropped and counted; they never fail the load.
    pub fn load(&mut self, batch: Value) -> Result<LoadReport, CoreError> {
        let records = match batch {
            Value::Array(records) => records,
            other => {
                return Err(FeedError::NotASequence {
                    found: json_kind(&other).to_string(),
                }
                .into())
            }
        };

        let mut posts = Vec::with_capacity(records.len());
        let mut index = HashMap::with_capacity(records.len());
        let mut dropped = 0;

        for (position, record) in records.into_iter().enumerate() {
            let accepted = RawPost::from_value(record)
                .and_then(RawPost::into_post)
                .and_then(|post| {
                    if index.contains_key(&post.id) {
                        Err(RejectReason::DuplicateId(post.id.clone()))
                    } else {
                        Ok(post)
                    }
                });

            match accepted {
                Ok(post) => {
                    index.insert(post.id.clone(), posts.len());
                    posts.push(post);
                }
                Err(reason) => {
                    warn!("Dropping post record #{}: {}", position, reason);
                    dropped += 1;
                }
            }
        }

        let report = LoadReport {
            loaded: posts.len(),
            dropped,
        };
        self.posts = posts;
        self.index = index;

        info!(
            "Loaded {} posts ({} malformed records dropped)",
            report.loaded, report.dropped
        );
        Ok(report)
    }

    /// Replace the working set with already validated posts. Later posts
    /// repeating an earlier id are dropped.
    pub fn replace(&mut self, posts: Vec<Post>) -> LoadReport {
        let total = posts.len();
        self.posts = Vec::with_capacity(total);
        self.index = HashMap::with_capacity(total);

        for post in posts {
            if self.index.contains_key(&post.id) {
                warn!("Dropping post with duplicate id {}", post.id);
                continue;
            }
            self.index.insert(post.id.clone(), self.posts.len());
            self.posts.push(post);
        }

        LoadReport {
            loaded: self.posts.len(),
            dropped: total - self.posts.len(),
        }
    }

    pub fn get(&self, id: &PostId) -> Result<&Post, CoreError> {
        self.index
            .get(id)
            .map(|&position| &self.posts[position])
            .ok_or_else(|| {
                FeedError::PostNotFound {
                    post_id: id.to_string(),
                }
                .into()
            })
    }

    pub fn contains(&self, id: &PostId) -> bool {
        self.index.contains_key(id)
    }

    /// Posts in load order.
    pub fn all(&self) -> &[Post] {
        &self.posts
    }

    pub fn into_posts(self) -> Vec<Post> {
        self.posts
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Returns false when no post has this id.
    pub fn set_interaction(&mut self, id: &PostId, interaction: Interaction) -> bool {
        match self.index.get(id) {
            Some(&position) => {
                self.posts[position].interaction = interaction;
                true
            }
            None => false,
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
