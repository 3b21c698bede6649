use curator_core::{Platform, Post, ViewMode};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewOptions {
    pub mode: ViewMode,
    pub platform: Option<Platform>,
}

/// Final render step over an already filtered and sorted sequence: the
/// platform selector first, then the followed-only predicate.
pub fn render<'a>(posts: &'a [Post], options: &ViewOptions) -> Vec<&'a Post> {
    posts
        .iter()
        .filter(|post| options.platform.map_or(true, |p| post.platform() == p))
        .filter(|post| match options.mode {
            ViewMode::All => true,
            ViewMode::FollowedOnly => post.followed,
        })
        .collect()
}
