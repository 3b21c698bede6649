use curator_core::{Post, SortKey};
use std::cmp::Ordering;

/// Sort descending by `key`. Posts missing the value go last; ties keep
/// their input order.
pub fn sort_posts(posts: &mut [Post], key: SortKey) {
    posts.sort_by(|a, b| compare(a, b, key));
}

pub fn sorted(mut posts: Vec<Post>, key: SortKey) -> Vec<Post> {
    sort_posts(&mut posts, key);
    posts
}

fn compare(a: &Post, b: &Post, key: SortKey) -> Ordering {
    match key {
        SortKey::Rank => b.rank_score.total_cmp(&a.rank_score),
        SortKey::Date => descending_known_first(a.effective_date(), b.effective_date()),
        SortKey::Likes => descending_known_first(a.metrics.likes, b.metrics.likes),
        SortKey::Comments => descending_known_first(a.metrics.comments, b.metrics.comments),
    }
}

fn descending_known_first<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use curator_core::Metrics;

    fn ids(posts: &[Post]) -> Vec<&str> {
        posts.iter().map(|p| p.id.as_str()).collect()
    }

    fn with_likes(id: &str, likes: Option<u64>) -> Post {
        Post::new(id, "text").with_metrics(Metrics {
            likes,
            ..Default::default()
        })
    }

    #[test]
    fn equal_rank_keeps_input_order() {
        let posts = vec![
            Post::new("a", "t").with_rank(1.0),
            Post::new("b", "t").with_rank(3.0),
            Post::new("c", "t").with_rank(1.0),
            Post::new("d", "t").with_rank(3.0),
        ];

        let once = sorted(posts, SortKey::Rank);
        assert_eq!(ids(&once), vec!["b", "d", "a", "c"]);

        let twice = sorted(once.clone(), SortKey::Rank);
        assert_eq!(once, twice);
    }

    #[test]
    fn unknown_counts_sort_after_zero() {
        let posts = vec![
            with_likes("unknown1", None),
            with_likes("zero", Some(0)),
            with_likes("many", Some(1200)),
            with_likes("unknown2", None),
        ];

        let result = sorted(posts, SortKey::Likes);
        assert_eq!(ids(&result), vec!["many", "zero", "unknown1", "unknown2"]);
    }

    #[test]
    fn date_uses_scraped_time_as_fallback() {
        let mut scraped_only = Post::new("scraped", "t");
        scraped_only.scraped_at = Some(Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap());

        let posts = vec![
            Post::new("undated", "t"),
            Post::new("old", "t").with_posted_at(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            scraped_only,
            Post::new("new", "t").with_posted_at(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()),
        ];

        let result = sorted(posts, SortKey::Date);
        assert_eq!(ids(&result), vec!["new", "scraped", "old", "undated"]);
    }

    #[test]
    fn comments_sort_descending() {
        let posts = vec![
            Post::new("few", "t").with_metrics(Metrics {
                comments: Some(2),
                ..Default::default()
            }),
            Post::new("lots", "t").with_metrics(Metrics {
                comments: Some(90),
                ..Default::default()
            }),
        ];

        assert_eq!(ids(&sorted(posts, SortKey::Comments)), vec!["lots", "few"]);
    }
}
