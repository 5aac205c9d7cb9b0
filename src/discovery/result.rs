use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of one traversal call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryResult {
    /// Identifiers stored for the first time, in processing order
    pub new_entities: Vec<String>,
    /// Identifiers that had a fetch attempt
    pub total_processed: usize,
    /// One message per identifier that could not be fetched or parsed
    pub errors: Vec<String>,
    /// Deepest level that had identifiers to process
    pub depth_reached: usize,
    pub entities_by_depth: BTreeMap<usize, Vec<String>>,
}

impl DiscoveryResult {
    pub(crate) fn record_entity(&mut self, id: &str, depth: usize) {
        self.new_entities.push(id.to_string());
        self.entities_by_depth
            .entry(depth)
            .or_default()
            .push(id.to_string());
    }

    /// Fold another result into this one: lists are concatenated, the
    /// depth is the max of both, per-depth lists are concatenated key-wise
    pub fn merge(&mut self, other: DiscoveryResult) {
        self.new_entities.extend(other.new_entities);
        self.total_processed += other.total_processed;
        self.errors.extend(other.errors);
        self.depth_reached = self.depth_reached.max(other.depth_reached);
        for (depth, ids) in other.entities_by_depth {
            self.entities_by_depth.entry(depth).or_default().extend(ids);
        }
    }
}
