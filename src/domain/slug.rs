//! Slug derivation for group identifiers.
//!
//! Group slugs appear in URLs (`/group/{slug}`) and must be unique. The
//! helpers keep generation pure; callers supply the uniqueness predicate,
//! usually backed by the groups repository.

use std::future::Future;

use slug::slugify;
use thiserror::Error;

const MAX_SUFFIX_ATTEMPTS: usize = 32;

/// Upper bound on slug length, matching the group slug column contract.
pub const MAX_SLUG_CHARS: usize = 50;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
    #[error("exhausted attempts to find a unique slug for `{base}`")]
    Exhausted { base: String },
}

#[derive(Debug, Error)]
pub enum SlugAsyncError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error(transparent)]
    Predicate(E),
}

/// Derive a base slug from a group title or an explicit slug argument.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let mut candidate = slugify(input);
    if candidate.chars().count() > MAX_SLUG_CHARS {
        candidate = candidate.chars().take(MAX_SLUG_CHARS).collect();
        while candidate.ends_with('-') {
            candidate.pop();
        }
    }

    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// Returns `true` when `value` is already a well-formed slug.
pub fn is_valid_slug(value: &str) -> bool {
    !value.is_empty()
        && value.chars().count() <= MAX_SLUG_CHARS
        && value
            .chars()
            .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' || ch == '_')
}

/// Produce a slug that the async predicate reports as unused.
///
/// Collisions are retried with a numeric suffix (`-2`, `-3`, ...).
pub async fn generate_unique_slug_async<F, Fut, E>(
    input: &str,
    mut is_unique: F,
) -> Result<String, SlugAsyncError<E>>
where
    F: FnMut(&str) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    let base = derive_slug(input)?;

    if is_unique(&base).await.map_err(SlugAsyncError::Predicate)? {
        return Ok(base);
    }

    for attempt in 2..=MAX_SUFFIX_ATTEMPTS + 1 {
        let candidate = format!("{base}-{attempt}");
        if is_unique(&candidate)
            .await
            .map_err(SlugAsyncError::Predicate)?
        {
            return Ok(candidate);
        }
    }

    Err(SlugAsyncError::Slug(SlugError::Exhausted { base }))
}
