//! Tiered query matching.
//!
//! 1. An empty query matches everything.
//! 2. Keyword match: a keyword contains the query or the query contains the
//!    keyword, both case-folded.
//! 3. Content match: the post text contains the query.
//!
//! Tiers 2 and 3 are unioned. Only when that union is empty is the query
//! sent for semantic expansion over the corpus vocabulary, and posts are
//! matched against the returned terms with the tier 2 rule. Expansion
//! failures and timeouts end the search with no matches.

use curator_core::{Post, PostId};
use llm_interface::SemanticExpander;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    All,
    Keyword,
    Semantic,
    NoMatch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    pub query: String,
    pub tier: MatchTier,
    /// Matching post ids in working-set order.
    pub ids: Vec<PostId>,
    /// Terms returned by semantic expansion, if it ran.
    pub related_terms: Vec<String>,
}

impl FilterOutcome {
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Bidirectional containment between two case-folded strings.
pub fn terms_overlap(keyword: &str, term: &str) -> bool {
    !keyword.is_empty() && !term.is_empty() && (keyword.contains(term) || term.contains(keyword))
}

fn keywords_match(post: &Post, folded_term: &str) -> bool {
    post.keywords
        .iter()
        .any(|keyword| terms_overlap(&keyword.to_lowercase(), folded_term))
}

/// Tiers 2 and 3 combined.
pub fn direct_matches(folded_query: &str, posts: &[Post]) -> Vec<PostId> {
    posts
        .iter()
        .filter(|post| {
            keywords_match(post, folded_query) || post.text.to_lowercase().contains(folded_query)
        })
        .map(|post| post.id.clone())
        .collect()
}

/// Posts whose keywords overlap any of the folded `terms`.
pub fn semantic_matches(terms: &[String], posts: &[Post]) -> Vec<PostId> {
    posts
        .iter()
        .filter(|post| terms.iter().any(|term| keywords_match(post, term)))
        .map(|post| post.id.clone())
        .collect()
}

/// Distinct case-folded keywords, in first-seen order.
pub fn vocabulary(posts: &[Post]) -> Vec<String> {
    let mut seen = HashSet::new();
    posts
        .iter()
        .flat_map(|post| post.keywords.iter())
        .map(|keyword| keyword.trim().to_lowercase())
        .filter(|keyword| !keyword.is_empty() && seen.insert(keyword.clone()))
        .collect()
}

#[derive(Debug)]
pub struct FilterEngine<E> {
    expander: E,
    timeout: Duration,
}

impl<E: SemanticExpander> FilterEngine<E> {
    pub fn new(expander: E, timeout: Duration) -> Self {
        Self { expander, timeout }
    }

    /// Resolve `query` against `posts`. Never fails; the worst case is an
    /// outcome with no ids.
    pub async fn apply(&self, query: &str, posts: &[Post]) -> FilterOutcome {
        let query = query.trim();
        let outcome = |tier: MatchTier, ids: Vec<PostId>, related_terms: Vec<String>| FilterOutcome {
            query: query.to_string(),
            tier,
            ids,
            related_terms,
        };

        if query.is_empty() {
            let ids = posts.iter().map(|post| post.id.clone()).collect();
            return outcome(MatchTier::All, ids, Vec::new());
        }

        let folded = query.to_lowercase();
        let direct = direct_matches(&folded, posts);
        if !direct.is_empty() {
            debug!("'{}' matched {} posts directly", query, direct.len());
            return outcome(MatchTier::Keyword, direct, Vec::new());
        }

        let vocabulary = vocabulary(posts);
        if vocabulary.is_empty() {
            debug!("No keywords to expand '{}' against", query);
            return outcome(MatchTier::NoMatch, Vec::new(), Vec::new());
        }

        let terms = match tokio::time::timeout(
            self.timeout,
            self.expander.expand(query, &vocabulary),
        )
        .await
        {
            Ok(Ok(terms)) => terms,
            Ok(Err(e)) => {
                warn!("Semantic expansion of '{}' failed: {}", query, e);
                return outcome(MatchTier::NoMatch, Vec::new(), Vec::new());
            }
            Err(_) => {
                warn!(
                    "Semantic expansion of '{}' timed out after {:?}",
                    query, self.timeout
                );
                return outcome(MatchTier::NoMatch, Vec::new(), Vec::new());
            }
        };

        let folded_terms: Vec<String> = terms
            .iter()
            .map(|term| term.trim().to_lowercase())
            .filter(|term| !term.is_empty())
            .collect();
        let ids = semantic_matches(&folded_terms, posts);
        debug!(
            "'{}' expanded to {:?}, matching {} posts",
            query,
            terms,
            ids.len()
        );

        if ids.is_empty() {
            outcome(MatchTier::NoMatch, ids, terms)
        } else {
            outcome(MatchTier::Semantic, ids, terms)
        }
    }
}
