use crate::error::FeedError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a post, unique within one loaded working set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(String);

impl PostId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PostId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PostId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u64> for PostId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitter,
    Instagram,
    Facebook,
    Unknown,
}

impl Platform {
    /// Classify a URL by its host. `x.com` counts as Twitter; subdomains
    /// such as `mobile.twitter.com` match their parent domain.
    pub fn detect(url: &str) -> Self {
        let url = url.trim().to_lowercase();
        let rest = url.split_once("://").map_or(url.as_str(), |(_, rest)| rest);
        let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
        let host = authority.rsplit('@').next().unwrap_or_default();
        let host = host.split(':').next().unwrap_or_default();

        let on = |domain: &str| {
            host == domain
                || host
                    .strip_suffix(domain)
                    .is_some_and(|sub| sub.ends_with('.'))
        };
        if on("twitter.com") || on("x.com") {
            Platform::Twitter
        } else if on("instagram.com") {
            Platform::Instagram
        } else if on("facebook.com") {
            Platform::Facebook
        } else {
            Platform::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Twitter => "twitter",
            Platform::Instagram => "instagram",
            Platform::Facebook => "facebook",
            Platform::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "twitter" | "x" => Ok(Platform::Twitter),
            "instagram" => Ok(Platform::Instagram),
            "facebook" => Ok(Platform::Facebook),
            "unknown" => Ok(Platform::Unknown),
            _ => Err(FeedError::UnknownPlatform {
                value: s.to_string(),
            }),
        }
    }
}

/// Engagement counters. `None` means the source did not report the value,
/// which is distinct from a reported zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    pub views: Option<u64>,
    pub comments: Option<u64>,
    pub shares: Option<u64>,
    pub likes: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interaction {
    #[default]
    Neutral,
    Liked,
    Disliked,
}

impl Interaction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interaction::Neutral => "neutral",
            Interaction::Liked => "liked",
            Interaction::Disliked => "disliked",
        }
    }
}

impl fmt::Display for Interaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interaction {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "neutral" | "none" | "reset" => Ok(Interaction::Neutral),
            "like" | "liked" => Ok(Interaction::Liked),
            "dislike" | "disliked" => Ok(Interaction::Disliked),
            _ => Err(FeedError::UnknownInteraction {
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub source_url: String,
    pub account_url: String,
    pub username: Option<String>,
    pub text: String,
    pub keywords: Vec<String>,
    pub rank_score: f64,
    pub metrics: Metrics,
    pub posted_at: Option<DateTime<Utc>>,
    pub scraped_at: Option<DateTime<Utc>>,
    pub followed: bool,
    pub interaction: Interaction,
}

impl Post {
    pub fn new(id: impl Into<PostId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source_url: String::new(),
            account_url: String::new(),
            username: None,
            text: text.into(),
            keywords: Vec::new(),
            rank_score: 0.0,
            metrics: Metrics::default(),
            posted_at: None,
            scraped_at: None,
            followed: false,
            interaction: Interaction::Neutral,
        }
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_rank(mut self, rank_score: f64) -> Self {
        self.rank_score = rank_score;
        self
    }

    pub fn with_urls(mut self, source_url: impl Into<String>, account_url: impl Into<String>) -> Self {
        self.source_url = source_url.into();
        self.account_url = account_url.into();
        self
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_posted_at(mut self, posted_at: DateTime<Utc>) -> Self {
        self.posted_at = Some(posted_at);
        self
    }

    pub fn followed(mut self, followed: bool) -> Self {
        self.followed = followed;
        self
    }

    /// Derived from the account URL first, then the post URL.
    pub fn platform(&self) -> Platform {
        match Platform::detect(&self.account_url) {
            Platform::Unknown => Platform::detect(&self.source_url),
            platform => platform,
        }
    }

    /// Publication time, falling back to the time the post was scraped.
    pub fn effective_date(&self) -> Option<DateTime<Utc>> {
        self.posted_at.or(self.scraped_at)
    }
}

/// The persisted like/dislike decision for one post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub post_id: PostId,
    pub interaction: Interaction,
    pub timestamp: DateTime<Utc>,
}

impl InteractionRecord {
    pub fn now(post_id: PostId, interaction: Interaction) -> Self {
        Self {
            post_id,
            interaction,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFeedback {
    pub post_id: PostId,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl TextFeedback {
    pub fn now(post_id: PostId, text: impl Into<String>) -> Self {
        Self {
            post_id,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Rank,
    Date,
    Likes,
    Comments,
}

impl FromStr for SortKey {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rank" => Ok(SortKey::Rank),
            "date" => Ok(SortKey::Date),
            "likes" => Ok(SortKey::Likes),
            "comments" => Ok(SortKey::Comments),
            _ => Err(FeedError::UnknownSortKey {
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewMode {
    #[default]
    All,
    FollowedOnly,
}

impl FromStr for ViewMode {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(ViewMode::All),
            "followed" | "followedonly" | "friends" => Ok(ViewMode::FollowedOnly),
            _ => Err(FeedError::UnknownViewMode {
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_prefers_account_url() {
        let post = Post::new("1", "hello").with_urls(
            "https://example.com/p/1",
            "https://www.instagram.com/natgeo/",
        );
        assert_eq!(post.platform(), Platform::Instagram);

        let post = Post::new("2", "hello").with_urls("https://x.com/nasa/status/1", "");
        assert_eq!(post.platform(), Platform::Twitter);

        let post = Post::new("3", "hello");
        assert_eq!(post.platform(), Platform::Unknown);
    }

    #[test]
    fn platform_matches_whole_host_labels() {
        assert_eq!(Platform::detect("https://mobile.twitter.com/a"), Platform::Twitter);
        assert_eq!(Platform::detect("HTTPS://WWW.X.COM/nasa"), Platform::Twitter);
        assert_eq!(Platform::detect("x.com/nasa"), Platform::Twitter);
        assert_eq!(Platform::detect("https://m.facebook.com:443/p"), Platform::Facebook);
        assert_eq!(Platform::detect("https://www.netflix.com/title/1"), Platform::Unknown);
        assert_eq!(Platform::detect("https://dropbox.com/s/x.com"), Platform::Unknown);
        assert_eq!(Platform::detect("https://notinstagram.com/p"), Platform::Unknown);
    }

    #[test]
    fn interaction_parsing_rejects_unknown_values() {
        assert_eq!("like".parse::<Interaction>(), Ok(Interaction::Liked));
        assert_eq!("Disliked".parse::<Interaction>(), Ok(Interaction::Disliked));
        assert_eq!(
            "love".parse::<Interaction>(),
            Err(FeedError::UnknownInteraction {
                value: "love".to_string()
            })
        );
    }

    #[test]
    fn view_mode_accepts_friends_alias() {
        assert_eq!("friends".parse::<ViewMode>(), Ok(ViewMode::FollowedOnly));
        assert!("everyone".parse::<ViewMode>().is_err());
    }

    #[test]
    fn interaction_serializes_lowercase() {
        let record = InteractionRecord::now(PostId::from("7"), Interaction::Liked);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["interaction"], "liked");
        assert_eq!(json["post_id"], "7");
    }
}
