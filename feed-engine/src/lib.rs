//! Feed ranking, filtering and interaction state for one user session.

pub mod filter;
pub mod interactions;
pub mod post_store;
pub mod session;
pub mod sort;
pub mod suggestions;
pub mod view;

pub use filter::{FilterEngine, FilterOutcome, MatchTier};
pub use interactions::InteractionTracker;
pub use post_store::{LoadReport, PostStore};
pub use session::{FeedSession, SessionSettings};
pub use sort::{sort_posts, sorted};
pub use suggestions::{SearchSuggestionTracker, SUGGESTION_LIMIT};
pub use view::ViewOptions;
