//! URL slugs for posts

use inkpost_http::{HttpError, HttpResult};
use inkpost_orm::Store;
use rand::{distributions::Uniform, thread_rng, Rng};

const SUFFIX_LEN: usize = 6;
const MAX_ATTEMPTS: usize = 8;
const SUFFIX_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Lower-case ASCII alphanumerics; every other run becomes a single `-`
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

fn random_suffix() -> String {
    let dist = Uniform::from(0..SUFFIX_CHARS.len());
    thread_rng()
        .sample_iter(dist)
        .take(SUFFIX_LEN)
        .map(|i| char::from(SUFFIX_CHARS[i]))
        .collect()
}

/// `slugify(title)` plus a random suffix
pub fn candidate(title: &str) -> String {
    let base = slugify(title);
    let base = if base.is_empty() { "post" } else { base.as_str() };
    format!("{}-{}", base, random_suffix())
}

/// A slug for `title` not yet used by any post
pub async fn generate_unique(store: &dyn Store, title: &str) -> HttpResult<String> {
    for _ in 0..MAX_ATTEMPTS {
        let slug = candidate(title);
        if !store.slug_exists(&slug).await? {
            return Ok(slug);
        }
    }
    Err(HttpError::internal(format!(
        "No free slug for '{}' after {} attempts",
        title, MAX_ATTEMPTS
    )))
}

/// Normalize a client-supplied slug; blank results are rejected
pub fn normalize_explicit(slug: &str) -> HttpResult<String> {
    let slug = slugify(slug);
    if slug.is_empty() {
        return Err(HttpError::invalid_field(
            "slug",
            "slug must contain at least one letter or digit",
        ));
    }
    Ok(slug)
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkpost_orm::{MemoryStore, NewPost, PostRepository};

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("  Rust: 2024 -- Edition!  "), "rust-2024-edition");
        assert_eq!(slugify("Crème brûlée"), "cr-me-br-l-e");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_candidate_shape() {
        let slug = candidate("Hello World");
        let (base, suffix) = slug.rsplit_once('-').unwrap();
        assert_eq!(base, "hello-world");
        assert_eq!(suffix.len(), 6);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        assert!(candidate("???").starts_with("post-"));
    }

    #[test]
    fn test_candidates_differ() {
        let slugs: std::collections::HashSet<_> = (0..20).map(|_| candidate("Same")).collect();
        assert!(slugs.len() > 1);
    }

    #[test]
    fn test_explicit_slug_is_normalized() {
        assert_eq!(normalize_explicit("My Custom Slug").unwrap(), "my-custom-slug");
        assert!(normalize_explicit("--").is_err());
    }

    #[tokio::test]
    async fn test_generate_unique_avoids_existing() {
        let store = MemoryStore::new();
        let slug = generate_unique(&store, "Hello").await.unwrap();
        store
            .create_post(NewPost {
                title: "Hello".into(),
                slug: slug.clone(),
                content: "x".into(),
                author_id: 1,
                ..Default::default()
            })
            .await
            .unwrap();
        let next = generate_unique(&store, "Hello").await.unwrap();
        assert_ne!(slug, next);
        assert!(next.starts_with("hello-"));
    }
}
