//! Collision-resistant public identifier allocation.
//!
//! The existence probes here are best-effort: true uniqueness comes from
//! the store's unique constraint on the slug field, with the engine
//! retrying on constraint-violation feedback.

use std::future::Future;
use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;

use crate::store::StoreError;

/// Longest slug derived from a title.
pub const DEFAULT_MAX_SLUG_LEN: usize = 60;
/// Length of random slugs for artifacts that are not title-derived.
pub const DEFAULT_RANDOM_SLUG_LEN: usize = 10;

const ALPHABET: [char; 36] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's',
    't', 'u', 'v', 'w', 'x', 'y', 'z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];

static STRIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("strip regex"));
static COLLAPSE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s_]+").expect("collapse regex"));

/// Derive a deterministic base slug from a title: lower-case, strip
/// characters outside word/space/hyphen, collapse whitespace/underscore
/// runs into single hyphens, trim hyphens, truncate to `max_len` without
/// leaving a trailing hyphen.
pub fn slug_from_title(title: &str, max_len: usize) -> String {
    let lower = title.to_lowercase();
    let stripped = STRIP_RE.replace_all(&lower, "");
    let hyphenated = COLLAPSE_RE.replace_all(&stripped, "-");
    let trimmed = hyphenated.trim_matches('-');

    let truncated: String = trimmed.chars().take(max_len).collect();
    truncated.trim_end_matches('-').to_string()
}

/// Allocate a unique slug from a base: try the bare base, then up to 5
/// candidates with a random suffix of growing length (starting at 4),
/// then fall back to a timestamp-plus-random composite.
pub async fn unique_slug<F, Fut>(base: &str, exists: F) -> Result<String, StoreError>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<bool, StoreError>>,
{
    if !base.is_empty() && !exists(base.to_string()).await? {
        return Ok(base.to_string());
    }

    for attempt in 0..5usize {
        let candidate = with_suffix(base, &random_id(4 + attempt));
        if !exists(candidate.clone()).await? {
            return Ok(candidate);
        }
    }

    let composite = format!("{}-{}", Utc::now().timestamp_millis(), random_id(4));
    Ok(with_suffix(base, &composite))
}

fn with_suffix(base: &str, suffix: &str) -> String {
    if base.is_empty() {
        suffix.to_string()
    } else {
        format!("{base}-{suffix}")
    }
}

/// Allocate a fully random lowercase-alphanumeric slug: 10 tries at
/// `length`, 10 more at `length + 4`, then a 21-character identifier.
pub async fn unique_random_slug<F, Fut>(exists: F, length: usize) -> Result<String, StoreError>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<bool, StoreError>>,
{
    for _ in 0..10 {
        let candidate = random_id(length);
        if !exists(candidate.clone()).await? {
            return Ok(candidate);
        }
    }
    for _ in 0..10 {
        let candidate = random_id(length + 4);
        if !exists(candidate.clone()).await? {
            return Ok(candidate);
        }
    }
    Ok(random_id(21))
}

fn random_id(len: usize) -> String {
    nanoid::nanoid!(len, &ALPHABET)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn slug_from_title_is_deterministic() {
        let a = slug_from_title("My Great Form!", DEFAULT_MAX_SLUG_LEN);
        let b = slug_from_title("My Great Form!", DEFAULT_MAX_SLUG_LEN);
        assert_eq!(a, b);
        assert_eq!(a, "my-great-form");
    }

    #[test]
    fn slug_strips_and_collapses() {
        assert_eq!(slug_from_title("Hello,   World?!", 60), "hello-world");
        assert_eq!(slug_from_title("snake_case_title", 60), "snake-case-title");
        assert_eq!(slug_from_title("  --Trimmed--  ", 60), "trimmed");
        assert_eq!(slug_from_title("Üñíçødé & Co", 60), "üñíçødé-co");
    }

    #[test]
    fn slug_truncates_without_trailing_hyphen() {
        let slug = slug_from_title("aaaa bbbb", 5);
        assert_eq!(slug, "aaaa");
        assert!(slug.len() <= 5);
    }

    #[test]
    fn empty_title_yields_empty_base() {
        assert_eq!(slug_from_title("!!!", 60), "");
    }

    #[tokio::test]
    async fn bare_base_used_when_free() {
        let slug = unique_slug("my-form", |_| async { Ok(false) }).await.unwrap();
        assert_eq!(slug, "my-form");
    }

    #[tokio::test]
    async fn collision_appends_growing_suffix() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_probe = Arc::clone(&calls);
        // Base and the first two suffixed candidates collide.
        let slug = unique_slug("taken", move |_| {
            let calls = Arc::clone(&calls_probe);
            async move { Ok(calls.fetch_add(1, Ordering::SeqCst) < 3) }
        })
        .await
        .unwrap();

        assert!(slug.starts_with("taken-"));
        // Third suffixed candidate: 4 + 2 random characters.
        assert_eq!(slug.len(), "taken-".len() + 6);
    }

    #[tokio::test]
    async fn exhaustion_falls_back_to_composite_within_bound() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_probe = Arc::clone(&calls);
        let slug = unique_slug("taken", move |_| {
            let calls = Arc::clone(&calls_probe);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            }
        })
        .await
        .unwrap();

        // 1 bare check + 5 suffixed checks, then the unchecked fallback.
        assert_eq!(calls.load(Ordering::SeqCst), 6);
        assert!(slug.starts_with("taken-"));
        assert!(slug.len() > "taken-".len());
    }

    #[tokio::test]
    async fn random_slug_has_requested_length() {
        let slug = unique_random_slug(|_| async { Ok(false) }, 10).await.unwrap();
        assert_eq!(slug.len(), 10);
        assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn random_slug_widens_then_falls_back() {
        let calls = Arc::new(AtomicUsize::new(0));

        // First 10 candidates collide, the 11th (wider) is free.
        let calls_probe = Arc::clone(&calls);
        let slug = unique_random_slug(
            move |_| {
                let calls = Arc::clone(&calls_probe);
                async move { Ok(calls.fetch_add(1, Ordering::SeqCst) < 10) }
            },
            10,
        )
        .await
        .unwrap();
        assert_eq!(slug.len(), 14);

        // Everything collides: 20 probes, then the 21-character fallback.
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_probe = Arc::clone(&calls);
        let slug = unique_random_slug(
            move |_| {
                let calls = Arc::clone(&calls_probe);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(true)
                }
            },
            10,
        )
        .await
        .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 20);
        assert_eq!(slug.len(), 21);
    }

    #[tokio::test]
    async fn probe_errors_propagate() {
        let result = unique_slug("base", |_| async {
            Err(StoreError::Backend("down".into()))
        })
        .await;
        assert!(result.is_err());
    }
}
