//! Traversal bookkeeping owned by one engine instance

use ahash::HashSet;
use ahash::HashSetExt;

/// Identifiers discovered but not yet fetched, tagged with discovery depth.
///
/// An identifier can be inserted once per frontier lifetime; later
/// discoveries of the same identifier are ignored, so the recorded depth is
/// the first (and therefore shortest, under BFS) one.
#[derive(Debug, Default)]
pub struct Frontier {
    pending: Vec<(String, usize)>,
    inserted: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            inserted: HashSet::new(),
        }
    }

    /// Queue `id` at `depth` unless it was ever queued before
    pub fn insert(&mut self, id: &str, depth: usize) -> bool {
        if !self.inserted.insert(id.to_string()) {
            return false;
        }
        self.pending.push((id.to_string(), depth));
        true
    }

    /// Move a pending identifier to depth 0, keeping its queue position.
    /// Used when a caller names it as a traversal root.
    pub fn promote_to_root(&mut self, id: &str) -> bool {
        match self.pending.iter_mut().find(|(pending, _)| pending == id) {
            Some(entry) => {
                entry.1 = 0;
                true
            }
            None => false,
        }
    }

    /// Whether `id` is waiting to be fetched
    pub fn contains(&self, id: &str) -> bool {
        self.pending.iter().any(|(pending, _)| pending == id)
    }

    /// Whether `id` was ever queued, pending or not
    pub fn was_inserted(&self, id: &str) -> bool {
        self.inserted.contains(id)
    }

    pub fn depth_of(&self, id: &str) -> Option<usize> {
        self.pending
            .iter()
            .find(|(pending, _)| pending == id)
            .map(|(_, depth)| *depth)
    }

    /// Pending identifiers at `depth`, in insertion order
    pub fn at_depth(&self, depth: usize) -> Vec<String> {
        self.pending
            .iter()
            .filter(|(_, d)| *d == depth)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Drop `id` from the pending queue. It still counts as inserted.
    pub fn remove(&mut self, id: &str) {
        self.pending.retain(|(pending, _)| pending != id);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.pending.iter().map(|(id, depth)| (id.as_str(), *depth))
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Frontier plus the set of identifiers that already had a fetch attempt
#[derive(Debug, Default)]
pub struct TraversalState {
    pub frontier: Frontier,
    pub processed: HashSet<String>,
}

impl TraversalState {
    pub fn new() -> Self {
        Self {
            frontier: Frontier::new(),
            processed: HashSet::new(),
        }
    }

    pub fn is_processed(&self, id: &str) -> bool {
        self.processed.contains(id)
    }

    /// Record a finished fetch attempt and take `id` off the frontier
    pub fn mark_processed(&mut self, id: &str) {
        self.processed.insert(id.to_string());
        self.frontier.remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_insert_wins() {
        let mut frontier = Frontier::new();
        assert!(frontier.insert("a", 1));
        assert!(!frontier.insert("a", 0));
        assert_eq!(frontier.depth_of("a"), Some(1));
    }

    #[test]
    fn test_removed_ids_cannot_return() {
        let mut frontier = Frontier::new();
        frontier.insert("a", 0);
        frontier.remove("a");
        assert!(!frontier.contains("a"));
        assert!(frontier.was_inserted("a"));
        assert!(!frontier.insert("a", 3));
        assert!(frontier.is_empty());
    }

    #[test]
    fn test_at_depth_keeps_insertion_order() {
        let mut frontier = Frontier::new();
        frontier.insert("c", 1);
        frontier.insert("a", 0);
        frontier.insert("b", 1);
        frontier.insert("d", 2);

        assert_eq!(frontier.at_depth(1), vec!["c", "b"]);
        assert_eq!(frontier.at_depth(0), vec!["a"]);
        assert!(frontier.at_depth(5).is_empty());
    }

    #[test]
    fn test_promote_to_root() {
        let mut frontier = Frontier::new();
        frontier.insert("x", 2);
        assert!(frontier.promote_to_root("x"));
        assert_eq!(frontier.depth_of("x"), Some(0));
        assert!(!frontier.promote_to_root("missing"));
    }

    #[test]
    fn test_mark_processed() {
        let mut state = TraversalState::new();
        state.frontier.insert("a", 0);
        state.mark_processed("a");
        assert!(state.is_processed("a"));
        assert!(!state.frontier.contains("a"));
    }
}
