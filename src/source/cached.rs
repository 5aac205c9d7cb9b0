//! Cache-backed profile source

use super::{FetchError, Profile, ProfileSource};
use crate::cache::{generate_key, CacheStats, ExpiringCache};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Serialize)]
struct ProfileRequest<'a> {
    kind: &'static str,
    id: &'a str,
}

/// Memoizes successful fetches of an inner source. Failures are not cached.
pub struct CachedSource<S> {
    inner: S,
    cache: Mutex<ExpiringCache<String, Profile>>,
}

impl<S: ProfileSource> CachedSource<S> {
    pub fn new(inner: S, ttl: Duration, max_entries: usize) -> Self {
        Self {
            inner,
            cache: Mutex::new(ExpiringCache::new(ttl, max_entries)),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub async fn stats(&self) -> CacheStats {
        self.cache.lock().await.stats()
    }
}

impl<S: ProfileSource> ProfileSource for CachedSource<S> {
    async fn fetch(&self, id: &str) -> Result<Profile, FetchError> {
        let key = match generate_key(&ProfileRequest { kind: "profile", id }) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!("Bypassing cache for {}: {}", id, e);
                return self.inner.fetch(id).await;
            }
        };

        if let Some(profile) = self.cache.lock().await.get(&key) {
            tracing::trace!("Cache hit for {}", id);
            return Ok(profile.clone());
        }

        let profile = self.inner.fetch(id).await?;
        self.cache.lock().await.set(key, profile.clone(), None);
        Ok(profile)
    }
}
