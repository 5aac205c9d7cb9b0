//! Fetch+parse contract
//!
//! A [`ProfileSource`] turns a fighter identifier into a parsed [`Profile`]:
//! the display name, an optional nickname and the identifiers of every
//! fighter the profile links to. How the document is retrieved and parsed is
//! up to the implementation; the discovery engine only sees the result.

mod cached;
mod directory;

pub use cached::CachedSource;
pub use directory::DirectorySource;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Parsed fighter profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    /// Identifiers of linked fighters (opponents), in document order
    #[serde(default)]
    pub links: Vec<String>,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nickname: None,
            links: Vec::new(),
        }
    }

    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = Some(nickname.into());
        self
    }

    pub fn with_links<I, S>(mut self, links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.links = links.into_iter().map(Into::into).collect();
        self
    }
}

/// Why an identifier could not be fetched or parsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("blocked by upstream: {0}")]
    Blocked(String),

    #[error("profile not found: {0}")]
    NotFound(String),

    #[error("failed to parse profile: {0}")]
    Parse(String),
}

/// Source of fighter profiles
#[allow(async_fn_in_trait)]
pub trait ProfileSource {
    /// Fetch and parse the profile for `id`
    async fn fetch(&self, id: &str) -> Result<Profile, FetchError>;
}

impl<T: ProfileSource> ProfileSource for Arc<T> {
    async fn fetch(&self, id: &str) -> Result<Profile, FetchError> {
        (**self).fetch(id).await
    }
}
