//! Schema for post records arriving from an untrusted post source.
//!
//! Producers disagree on field names and encode numbers loosely (counts with
//! thousands separators, the literal `"None"` for a missing value, keywords
//! as a comma-joined string). [`RawPost`] accepts those shapes and
//! [`RawPost::into_post`] turns a record into a validated [`Post`] or a
//! [`RejectReason`].

use crate::types::{Metrics, Post, PostId};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    Undecodable(String),
    MissingId,
    EmptyText,
    InvalidRank(String),
    DuplicateId(PostId),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Undecodable(details) => write!(f, "record could not be decoded: {details}"),
            RejectReason::MissingId => f.write_str("record has no id"),
            RejectReason::EmptyText => f.write_str("record has no text"),
            RejectReason::InvalidRank(value) => write!(f, "rank '{value}' is not a number"),
            RejectReason::DuplicateId(id) => write!(f, "id {id} already present in batch"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(u64),
    Text(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Integer(u64),
    Float(f64),
    Text(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawKeywords {
    List(Vec<String>),
    Joined(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPost {
    #[serde(default)]
    id: Option<RawId>,
    #[serde(default, alias = "post_url", alias = "url", alias = "sourceUrl")]
    source_url: Option<String>,
    #[serde(default, alias = "accountUrl")]
    account_url: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default, alias = "post_text", alias = "summary")]
    text: Option<String>,
    #[serde(default)]
    keywords: Option<RawKeywords>,
    #[serde(default, alias = "rank", alias = "rankScore")]
    rank_score: Option<RawNumber>,
    #[serde(default)]
    views: Option<RawNumber>,
    #[serde(default)]
    comments: Option<RawNumber>,
    #[serde(default)]
    shares: Option<RawNumber>,
    #[serde(default)]
    retweets: Option<RawNumber>,
    #[serde(default)]
    likes: Option<RawNumber>,
    #[serde(default, alias = "postedAt")]
    posted_at: Option<String>,
    #[serde(default, alias = "scrapedAt")]
    scraped_at: Option<String>,
    #[serde(default, alias = "isFriend", alias = "is_friend")]
    followed: Option<bool>,
}

impl RawPost {
    /// Decode one JSON value. Shape errors become [`RejectReason::Undecodable`].
    pub fn from_value(value: serde_json::Value) -> Result<Self, RejectReason> {
        serde_json::from_value(value).map_err(|e| RejectReason::Undecodable(e.to_string()))
    }

    pub fn into_post(self) -> Result<Post, RejectReason> {
        let id = match self.id {
            Some(RawId::Number(n)) => PostId::from(n),
            Some(RawId::Text(s)) if !s.trim().is_empty() => PostId::new(s.trim()),
            _ => return Err(RejectReason::MissingId),
        };

        let text = self.text.map(|t| t.trim().to_string()).unwrap_or_default();
        if text.is_empty() {
            return Err(RejectReason::EmptyText);
        }

        let rank_score = match self.rank_score {
            None => 0.0,
            Some(raw) => parse_rank(&raw)?,
        };

        Ok(Post {
            id,
            source_url: self.source_url.unwrap_or_default(),
            account_url: self.account_url.unwrap_or_default(),
            username: self.username.filter(|u| !u.trim().is_empty()),
            text,
            keywords: self.keywords.map(parse_keywords).unwrap_or_default(),
            rank_score,
            metrics: Metrics {
                views: self.views.as_ref().and_then(parse_count),
                comments: self.comments.as_ref().and_then(parse_count),
                shares: self
                    .shares
                    .as_ref()
                    .and_then(parse_count)
                    .or_else(|| self.retweets.as_ref().and_then(parse_count)),
                likes: self.likes.as_ref().and_then(parse_count),
            },
            posted_at: self.posted_at.as_deref().and_then(parse_timestamp),
            scraped_at: self.scraped_at.as_deref().and_then(parse_timestamp),
            followed: self.followed.unwrap_or(false),
            interaction: Default::default(),
        })
    }
}

fn parse_rank(raw: &RawNumber) -> Result<f64, RejectReason> {
    match raw {
        RawNumber::Integer(n) => Ok(*n as f64),
        RawNumber::Float(f) if f.is_finite() => Ok(*f),
        RawNumber::Float(f) => Err(RejectReason::InvalidRank(f.to_string())),
        RawNumber::Text(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .ok_or_else(|| RejectReason::InvalidRank(s.clone())),
    }
}

/// Counts the producer could not read come through as `"None"` or garbage;
/// both are treated as unknown rather than zero.
fn parse_count(raw: &RawNumber) -> Option<u64> {
    match raw {
        RawNumber::Integer(n) => Some(*n),
        RawNumber::Float(f) if *f >= 0.0 && f.is_finite() => Some(f.round() as u64),
        RawNumber::Float(_) => None,
        RawNumber::Text(s) => {
            let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
            cleaned.parse::<u64>().ok()
        }
    }
}

fn parse_keywords(raw: RawKeywords) -> Vec<String> {
    let keywords = match raw {
        RawKeywords::List(list) => list,
        RawKeywords::Joined(joined) => {
            let joined = joined.trim();
            if joined.eq_ignore_ascii_case("none") {
                Vec::new()
            } else if let Some(fenced) = strip_code_fence(joined) {
                serde_json::from_str::<Vec<String>>(fenced).unwrap_or_else(|_| split_joined(fenced))
            } else {
                split_joined(joined)
            }
        }
    };

    keywords
        .into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect()
}

fn split_joined(joined: &str) -> Vec<String> {
    joined.split(',').map(|k| k.to_string()).collect()
}

fn strip_code_fence(text: &str) -> Option<&str> {
    let inner = text.strip_prefix("```")?.strip_suffix("```")?;
    Some(inner.trim_start_matches("json").trim())
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("none") {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}
