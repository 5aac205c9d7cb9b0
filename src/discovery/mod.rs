//! Breadth-first fighter discovery
//!
//! The engine walks the link graph level by level from one or more roots,
//! fetching each identifier through a paced [`ProfileSource`] and writing every
//! fighter it finds into the [`EntityStore`]. Per-identifier failures are
//! collected in the result instead of aborting the traversal.
//!
//! Frontier and processed-set state belongs to the engine and survives across
//! calls: a second `discover_from` or an `expand` continues from where the
//! previous calls left off and never fetches an identifier twice. Build a new
//! engine for a clean slate.

mod frontier;
mod result;

pub use frontier::{Frontier, TraversalState};
pub use result::DiscoveryResult;

use crate::config::DiscoveryConfig;
use crate::error::{FightgraphError, Result};
use crate::ratelimit::Throttle;
use crate::source::{FetchError, Profile, ProfileSource};
use crate::store::{normalize_name, EntityStore};
use ahash::{HashSet, HashSetExt};
use rand::Rng;

/// Bounds for a traversal call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Deepest level to fetch, counted in hops from a root
    pub max_depth: usize,
    /// Stop a level once this many new fighters were found on it
    pub max_per_depth: Option<usize>,
    /// Number of stored fighters `expand` picks as roots
    pub sample_size: usize,
}

impl DiscoveryOptions {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            max_per_depth: None,
            sample_size: 5,
        }
    }

    pub fn with_max_per_depth(mut self, cap: usize) -> Self {
        self.max_per_depth = Some(cap);
        self
    }

    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            max_per_depth: config.max_per_depth,
            sample_size: config.expand_sample_size,
        }
    }
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self::new(2)
    }
}

/// Drives traversal over a profile source, paced by a throttle
pub struct DiscoveryEngine<S, T> {
    source: S,
    throttle: T,
    store: EntityStore,
    state: TraversalState,
}

impl<S, T> DiscoveryEngine<S, T>
where
    S: ProfileSource,
    T: Throttle,
{
    pub fn new(source: S, throttle: T, store: EntityStore) -> Self {
        Self {
            source,
            throttle,
            store,
            state: TraversalState::new(),
        }
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut EntityStore {
        &mut self.store
    }

    pub fn into_store(self) -> EntityStore {
        self.store
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn throttle(&self) -> &T {
        &self.throttle
    }

    /// Identifiers waiting to be fetched
    pub fn frontier(&self) -> &Frontier {
        &self.state.frontier
    }

    /// Whether `id` already had a fetch attempt on this engine
    pub fn is_processed(&self, id: &str) -> bool {
        self.state.is_processed(id)
    }

    /// Identifiers that had a fetch attempt, successful or not
    pub fn processed(&self) -> impl Iterator<Item = &str> {
        self.state.processed.iter().map(String::as_str)
    }

    pub fn processed_count(&self) -> usize {
        self.state.processed.len()
    }

    /// Traverse from a single root
    pub async fn discover_from(
        &mut self,
        start_id: &str,
        options: &DiscoveryOptions,
    ) -> Result<DiscoveryResult> {
        self.discover_from_many(&[start_id], options).await
    }

    /// Seed every root at depth 0, then traverse
    pub async fn discover_from_many<I>(
        &mut self,
        start_ids: &[I],
        options: &DiscoveryOptions,
    ) -> Result<DiscoveryResult>
    where
        I: AsRef<str>,
    {
        for id in start_ids {
            self.seed(id.as_ref());
        }
        self.traverse(options, 0, &HashSet::new()).await
    }

    /// Traverse whatever is left in the frontier without seeding, starting
    /// at the shallowest pending depth
    pub async fn resume(&mut self, options: &DiscoveryOptions) -> Result<DiscoveryResult> {
        let start_depth = self
            .state
            .frontier
            .iter()
            .map(|(_, depth)| depth)
            .min()
            .unwrap_or(0);
        self.traverse(options, start_depth, &HashSet::new()).await
    }

    /// Re-seed from a random sample of stored fighters
    pub async fn expand(&mut self, options: &DiscoveryOptions) -> Result<DiscoveryResult> {
        let roots = {
            let mut rng = rand::thread_rng();
            self.sample_roots(options, &mut rng)?
        };
        self.expand_roots(roots, options).await
    }

    /// Like [`expand`](Self::expand) with a caller-supplied RNG
    pub async fn expand_with_rng<R: Rng + ?Sized>(
        &mut self,
        options: &DiscoveryOptions,
        rng: &mut R,
    ) -> Result<DiscoveryResult> {
        let roots = self.sample_roots(options, rng)?;
        self.expand_roots(roots, options).await
    }

    fn sample_roots<R: Rng + ?Sized>(
        &self,
        options: &DiscoveryOptions,
        rng: &mut R,
    ) -> Result<Vec<String>> {
        if self.store.is_empty() {
            return Err(FightgraphError::NoStartingPoint);
        }
        Ok(self.store.sample_ids(options.sample_size, rng))
    }

    async fn expand_roots(
        &mut self,
        roots: Vec<String>,
        options: &DiscoveryOptions,
    ) -> Result<DiscoveryResult> {
        tracing::info!("Expanding from {} stored fighters", roots.len());

        let mut merged = DiscoveryResult::default();
        for root in roots {
            // Roots are already stored; they are fetched once for their links.
            let mut exempt = HashSet::new();
            if self.seed_root(&root) {
                exempt.insert(root);
            }
            merged.merge(self.traverse(options, 0, &exempt).await?);
        }
        Ok(merged)
    }

    fn seed(&mut self, id: &str) -> bool {
        if self.state.is_processed(id) || self.store.has_by_id(id) {
            tracing::debug!("Skipping root {}: already known", id);
            return false;
        }
        self.state.frontier.promote_to_root(id) || self.state.frontier.insert(id, 0)
    }

    fn seed_root(&mut self, id: &str) -> bool {
        if self.state.is_processed(id) {
            tracing::debug!("Skipping expansion root {}: already processed", id);
            return false;
        }
        self.state.frontier.promote_to_root(id) || self.state.frontier.insert(id, 0)
    }

    async fn traverse(
        &mut self,
        options: &DiscoveryOptions,
        start_depth: usize,
        exempt: &HashSet<String>,
    ) -> Result<DiscoveryResult> {
        let mut result = DiscoveryResult::default();

        for depth in start_depth..=options.max_depth {
            let level = self.state.frontier.at_depth(depth);
            if level.is_empty() {
                tracing::debug!("Nothing to expand at depth {}", depth);
                break;
            }

            result.depth_reached = depth;
            tracing::info!("Depth {}: {} fighters queued", depth, level.len());

            let mut found_here = 0usize;
            for id in level {
                if self.state.is_processed(&id)
                    || (!exempt.contains(&id) && self.store.has_by_id(&id))
                {
                    self.state.frontier.remove(&id);
                    continue;
                }

                let outcome = self.fetch_paced(&id).await;
                self.state.mark_processed(&id);
                result.total_processed += 1;

                match outcome {
                    Ok(profile) => {
                        let is_new = !self.store.has_by_id(&id);
                        self.store.add(&profile.name, &id, profile.nickname.as_deref());

                        if is_new {
                            result.record_entity(&id, depth);
                            found_here += 1;
                        }

                        if depth < options.max_depth {
                            self.enqueue_links(&profile, depth + 1);
                        }

                        if options.max_per_depth.is_some_and(|cap| found_here >= cap) {
                            tracing::info!(
                                "Per-depth cap reached at depth {}, {} left queued",
                                depth,
                                self.state.frontier.at_depth(depth).len()
                            );
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to process {}: {}", id, e);
                        result.errors.push(format!("{}: {}", id, e));
                    }
                }
            }
        }

        self.store.save()?;

        tracing::info!(
            "Traversal finished: {} new, {} processed, {} errors",
            result.new_entities.len(),
            result.total_processed,
            result.errors.len()
        );
        Ok(result)
    }

    /// Take a rate-limit slot, fetch, and report the outcome to the throttle
    async fn fetch_paced(&self, id: &str) -> std::result::Result<Profile, FetchError> {
        self.throttle.wait_for_slot().await;
        tracing::debug!("Fetching {}", id);

        let outcome = self.source.fetch(id).await;
        match &outcome {
            Ok(_) => self.throttle.record_success().await,
            Err(_) => self.throttle.record_failure().await,
        }

        let profile = outcome?;
        if normalize_name(&profile.name).is_empty() {
            return Err(FetchError::Parse("profile has no name".to_string()));
        }
        Ok(profile)
    }

    fn enqueue_links(&mut self, profile: &Profile, depth: usize) {
        for link in &profile.links {
            let link = link.trim();
            if link.is_empty()
                || self.state.is_processed(link)
                || self.state.frontier.was_inserted(link)
                || self.store.has_by_id(link)
            {
                continue;
            }
            self.state.frontier.insert(link, depth);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::RateLimiter;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Graph {
        profiles: HashMap<String, Profile>,
        fetched: Mutex<Vec<String>>,
    }

    impl Graph {
        fn new(edges: Vec<(&str, &str, Vec<&str>)>) -> Self {
            let profiles = edges
                .into_iter()
                .map(|(id, name, links)| (id.to_string(), Profile::new(name).with_links(links)))
                .collect();
            Self {
                profiles,
                fetched: Mutex::new(Vec::new()),
            }
        }
    }

    impl ProfileSource for Graph {
        async fn fetch(&self, id: &str) -> std::result::Result<Profile, FetchError> {
            self.fetched.lock().unwrap().push(id.to_string());
            self.profiles
                .get(id)
                .cloned()
                .ok_or_else(|| FetchError::NotFound(id.to_string()))
        }
    }

    fn engine(dir: &TempDir, graph: Graph) -> DiscoveryEngine<Graph, RateLimiter> {
        let store = EntityStore::new(dir.path().join("fighters.json"));
        DiscoveryEngine::new(graph, RateLimiter::new(Duration::ZERO), store)
    }

    #[tokio::test]
    async fn test_depth_zero_only_fetches_root() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine(&dir, Graph::new(vec![("a", "Alpha", vec!["b"])]));

        let result = engine
            .discover_from("a", &DiscoveryOptions::new(0))
            .await
            .unwrap();

        assert_eq!(result.new_entities, vec!["a"]);
        assert_eq!(result.depth_reached, 0);
        assert!(engine.frontier().is_empty());
        assert_eq!(*engine.source().fetched.lock().unwrap(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_nameless_profile_is_an_error() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine(&dir, Graph::new(vec![("a", "  ", vec![])]));

        let result = engine
            .discover_from("a", &DiscoveryOptions::new(1))
            .await
            .unwrap();

        assert!(result.new_entities.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert!(engine.is_processed("a"));
        assert_eq!(engine.processed().collect::<Vec<_>>(), vec!["a"]);
        assert!(engine.store().is_empty());
    }

    #[tokio::test]
    async fn test_stored_root_is_skipped() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine(&dir, Graph::new(vec![("a", "Alpha", vec![])]));
        engine.store_mut().add("Alpha", "a", None);

        let result = engine
            .discover_from("a", &DiscoveryOptions::new(2))
            .await
            .unwrap();

        assert_eq!(result.total_processed, 0);
        assert!(engine.source().fetched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_self_links_and_cycles_terminate() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine(
            &dir,
            Graph::new(vec![
                ("a", "Alpha", vec!["a", "b"]),
                ("b", "Beta", vec!["a", "c"]),
                ("c", "Gamma", vec!["a", "b"]),
            ]),
        );

        let result = engine
            .discover_from("a", &DiscoveryOptions::new(10))
            .await
            .unwrap();

        assert_eq!(result.new_entities, vec!["a", "b", "c"]);
        assert_eq!(result.depth_reached, 2);
        assert_eq!(engine.source().fetched.lock().unwrap().len(), 3);
    }
}
