//! Share link parsing
//!
//! Public share links come in several shapes:
//!
//! - `https://cloud.189.cn/web/share?code=<code>`
//! - `https://cloud.189.cn/t/<code>`
//! - `https://cloud.189.cn/#/t/<code>` (hash routed web client)
//! - `https://h5.cloud.189.cn/share.html#/t/<code>` (mobile page)
//!
//! A bare alphanumeric code is accepted as well.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use url::Url;

use super::errors::DomainError;

/// Share code extracted from a public share link
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShareCode(String);

impl ShareCode {
    /// Extracts the share code from a link or bare code
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidShareLink`] when no code can be found
    pub fn parse(link: &str) -> Result<Self, DomainError> {
        let link = link.trim();
        if link.is_empty() {
            return Err(DomainError::InvalidShareLink("empty link".to_string()));
        }

        if !link.contains("://") {
            return Self::from_bare(link);
        }

        let url = Url::parse(link)
            .map_err(|e| DomainError::InvalidShareLink(format!("{link}: {e}")))?;

        let code = if url.path() == "/web/share" {
            url.query_pairs()
                .find(|(k, _)| k == "code")
                .map(|(_, v)| v.into_owned())
        } else if url.path().starts_with("/t/") {
            last_segment(url.path())
        } else if url.fragment().is_some_and(|f| f.contains("/t/")) {
            url.fragment().and_then(last_segment)
        } else if url.path().contains("share.html") {
            url.fragment().and_then(last_segment)
        } else {
            None
        };

        match code {
            Some(code) if !code.is_empty() => Ok(Self(code)),
            _ => Err(DomainError::InvalidShareLink(link.to_string())),
        }
    }

    fn from_bare(code: &str) -> Result<Self, DomainError> {
        if code.chars().all(|c| c.is_ascii_alphanumeric()) {
            Ok(Self(code.to_string()))
        } else {
            Err(DomainError::InvalidShareLink(code.to_string()))
        }
    }

    /// Get the inner string reference
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn last_segment(path: &str) -> Option<String> {
    path.rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl Display for ShareCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
