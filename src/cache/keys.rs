//! Cache key definitions.

use std::fmt;

use axum::http::Uri;

/// Literal request path plus query string; `/` and `/?page=2` differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageKey(String);

impl PageKey {
    pub fn new(path: &str, query: Option<&str>) -> Self {
        match query {
            Some(query) if !query.is_empty() => Self(format!("{path}?{query}")),
            _ => Self(path.to_string()),
        }
    }

    pub fn from_uri(uri: &Uri) -> Self {
        Self::new(uri.path(), uri.query())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
