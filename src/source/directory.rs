//! Profiles read from a directory of pre-fetched JSON documents

use super::{FetchError, Profile, ProfileSource};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Reads `<root>/<id>.json` for each identifier.
///
/// Each document has the [`Profile`] shape:
/// `{ "name": "...", "nickname": "...", "links": ["id", ...] }`.
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, id: &str) -> Result<PathBuf, FetchError> {
        let valid = !id.is_empty()
            && !id.starts_with('.')
            && !id.contains(|c: char| c == '/' || c == '\\' || c == '\0');
        if !valid {
            return Err(FetchError::Blocked(format!("invalid identifier '{}'", id)));
        }
        Ok(self.root.join(format!("{}.json", id)))
    }
}

impl ProfileSource for DirectorySource {
    async fn fetch(&self, id: &str) -> Result<Profile, FetchError> {
        let path = self.document_path(id)?;

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => FetchError::NotFound(id.to_string()),
                _ => FetchError::Network(format!("{}: {}", path.display(), e)),
            })?;

        let profile: Profile =
            serde_json::from_str(&content).map_err(|e| FetchError::Parse(e.to_string()))?;

        tracing::trace!("Read profile {} with {} links", id, profile.links.len());
        Ok(profile)
    }
}
