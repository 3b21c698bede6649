//! Key layout. User ids and post ids are escaped so that neither can
//! introduce a `/` and leak into another user's prefix.

use curator_core::PostId;

fn escape(component: &str) -> String {
    component.replace('%', "%25").replace('/', "%2F")
}

fn unescape(component: &str) -> String {
    component.replace("%2F", "/").replace("%25", "%")
}

pub fn interaction_prefix(user_id: &str) -> String {
    format!("interaction/{}/", escape(user_id))
}

pub fn interaction(user_id: &str, post_id: &PostId) -> String {
    format!("{}{}", interaction_prefix(user_id), escape(post_id.as_str()))
}

pub fn feedback_prefix(user_id: &str) -> String {
    format!("feedback/{}/", escape(user_id))
}

pub fn feedback(user_id: &str, post_id: &PostId) -> String {
    format!("{}{}", feedback_prefix(user_id), escape(post_id.as_str()))
}

pub fn suggestions(user_id: &str) -> String {
    format!("suggestions/{}", escape(user_id))
}

/// Recover the post id from a key produced by [`interaction`] or [`feedback`].
pub fn post_id_from_key(prefix: &str, key: &str) -> Option<PostId> {
    key.strip_prefix(prefix)
        .filter(|rest| !rest.is_empty())
        .map(|rest| PostId::new(unescape(rest)))
}
