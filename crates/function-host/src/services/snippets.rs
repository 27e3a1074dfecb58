//! Snippet storage behind the `get_snippet` / `save_snippet` tools.
//!
//! Storage is abstracted by [`SnippetStore`] so a durable backend can be
//! swapped in; the host ships with [`InMemorySnippetStore`].

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

/// Longest accepted snippet name.
pub const MAX_SNIPPET_NAME_LEN: usize = 128;

/// Largest accepted snippet body (64KB).
pub const MAX_SNIPPET_SIZE_BYTES: usize = 64 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnippetError {
    #[error("Invalid snippet name: {0}")]
    InvalidName(String),

    #[error("Snippet exceeds {MAX_SNIPPET_SIZE_BYTES} bytes")]
    TooLarge,
}

/// Named text snippets.
#[async_trait]
pub trait SnippetStore: Send + Sync {
    /// Content of `name`, or `None` if nothing is stored under it.
    async fn get(&self, name: &str) -> Result<Option<String>, SnippetError>;

    /// Store `content` under `name`, replacing any previous content.
    async fn save(&self, name: &str, content: &str) -> Result<(), SnippetError>;
}

/// Process-local snippet store. Contents are lost on restart.
#[derive(Default)]
pub struct InMemorySnippetStore {
    snippets: RwLock<HashMap<String, String>>,
}

impl InMemorySnippetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnippetStore for InMemorySnippetStore {
    async fn get(&self, name: &str) -> Result<Option<String>, SnippetError> {
        validate_snippet_name(name)?;
        Ok(self.snippets.read().await.get(name).cloned())
    }

    async fn save(&self, name: &str, content: &str) -> Result<(), SnippetError> {
        validate_snippet_name(name)?;
        if content.len() > MAX_SNIPPET_SIZE_BYTES {
            return Err(SnippetError::TooLarge);
        }

        self.snippets
            .write()
            .await
            .insert(name.to_string(), content.to_string());
        Ok(())
    }
}

/// Names become storage keys, so they are limited to a path-safe alphabet.
///
/// # Errors
///
/// Returns `SnippetError::InvalidName` for empty, overlong, dot-leading or
/// non `[A-Za-z0-9._-]` names.
pub fn validate_snippet_name(name: &str) -> Result<(), SnippetError> {
    if name.is_empty() || name.len() > MAX_SNIPPET_NAME_LEN {
        return Err(SnippetError::InvalidName(format!(
            "name must be 1-{MAX_SNIPPET_NAME_LEN} characters"
        )));
    }

    if name.starts_with('.') {
        return Err(SnippetError::InvalidName(
            "name must not start with '.'".to_string(),
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(SnippetError::InvalidName(
            "name may only contain letters, digits, '-', '_' and '.'".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_then_get() {
        let store = InMemorySnippetStore::new();

        store.save("greeting", "fn main() {}").await.unwrap();

        assert_eq!(
            store.get("greeting").await.unwrap().as_deref(),
            Some("fn main() {}")
        );
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let store = InMemorySnippetStore::new();

        store.save("note", "v1").await.unwrap();
        store.save("note", "v2").await.unwrap();

        assert_eq!(store.get("note").await.unwrap().as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = InMemorySnippetStore::new();
        assert_eq!(store.get("nothing-here").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_oversized_snippet_rejected() {
        let store = InMemorySnippetStore::new();
        let big = "x".repeat(MAX_SNIPPET_SIZE_BYTES + 1);

        assert_eq!(store.save("big", &big).await, Err(SnippetError::TooLarge));
        assert_eq!(store.get("big").await.unwrap(), None);
    }

    #[test]
    fn test_validate_snippet_name() {
        assert!(validate_snippet_name("my-snippet_01.rs").is_ok());

        for bad in ["", ".hidden", "../escape", "with space", "slash/name", "ünïcode"] {
            assert!(
                matches!(validate_snippet_name(bad), Err(SnippetError::InvalidName(_))),
                "{bad:?} should be rejected"
            );
        }

        let long = "a".repeat(MAX_SNIPPET_NAME_LEN + 1);
        assert!(validate_snippet_name(&long).is_err());
    }
}
