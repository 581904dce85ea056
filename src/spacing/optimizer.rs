//! Greedy conflict removal that maximizes the number of well-spaced trees.

use tracing::{debug, trace};

use crate::spacing::{ProximityGraph, RemovedSet, TreeNode};

/// Default minimum spacing (m) between neighbouring trees.
pub const DEFAULT_WELL_SPACING: f64 = 1.0;

/// Chooses which member of a conflicting pair to remove when both removals gain equally.
pub trait TieBreakPolicy {
    /// Return the id of the node to remove, `first.id` or `second.id`.
    fn loser(&self, first: &TreeNode, second: &TreeNode) -> usize;
}

/// Remove the shorter tree; on equal heights remove the second. A missing height
/// counts as lower than any measured one.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreferTaller;

impl TieBreakPolicy for PreferTaller {
    #[inline]
    fn loser(&self, first: &TreeNode, second: &TreeNode) -> usize {
        if first.height_meters < second.height_meters { first.id } else { second.id }
    }
}

/// Result of one optimization run.
#[derive(Debug, Clone, PartialEq)]
pub struct SpacingOutcome {
    pub removed: RemovedSet,
    /// Ids that are not removed and well spaced under `removed`, ascending.
    pub well_spaced: Vec<usize>,
    /// Mean height of the well-spaced trees that have one; 0 when there are none.
    pub average_height: f64,
    /// Passes that removed at least one tree.
    pub iterations: usize,
    /// False if the pass cap stopped the run while conflicts remained.
    pub converged: bool,
}

impl SpacingOutcome {
    #[inline] pub fn well_spaced_count(&self) -> usize { self.well_spaced.len() }

    #[inline] pub fn is_well_spaced(&self, id: usize) -> bool { self.well_spaced.binary_search(&id).is_ok() }
}

/// Iteratively resolves under-spaced pairs in a [`ProximityGraph`].
#[derive(Debug, Clone, Copy)]
pub struct SpacingOptimizer<P = PreferTaller> {
    threshold: f64,
    policy: P,
}

impl Default for SpacingOptimizer {
    fn default() -> Self { Self::new(DEFAULT_WELL_SPACING) }
}

impl SpacingOptimizer {
    pub fn new(threshold: f64) -> Self { Self { threshold, policy: PreferTaller } }
}

impl<P: TieBreakPolicy> SpacingOptimizer<P> {
    /// Use a custom tie-break policy.
    pub fn with_policy(threshold: f64, policy: P) -> Self { Self { threshold, policy } }

    #[inline] pub fn threshold(&self) -> f64 { self.threshold }

    /// Scan nodes in id order and pair each unprocessed node with every unprocessed,
    /// unremoved neighbour closer than the threshold. Paired neighbours are marked
    /// processed, so each node is the second member of at most one pair per scan.
    /// A node may still lead several pairs in one scan; pairs are not limited to one
    /// per node.
    pub fn find_conflicts(&self, graph: &ProximityGraph, removed: &RemovedSet) -> Vec<(usize, usize)> {
        let mut processed = vec![false; graph.node_count()];
        let mut conflicts = Vec::new();

        for id in 0..graph.node_count() {
            if removed.contains(id) || processed[id] { continue }
            for (neighbor, distance) in graph.neighbors(id) {
                if !removed.contains(neighbor) && !processed[neighbor] && distance < self.threshold {
                    conflicts.push((id, neighbor));
                    processed[neighbor] = true;
                }
            }
            processed[id] = true;
        }
        conflicts
    }

    /// Change in the well-spaced count if `node` were also removed.
    pub fn marginal_gain(&self, graph: &ProximityGraph, removed: &RemovedSet, node: usize) -> i64 {
        let before = graph.well_spaced_count(removed, self.threshold) as i64;
        let after = graph.well_spaced_count_with(removed, node, self.threshold) as i64;
        after - before
    }

    /// Run until no conflicts remain, a pass removes nothing, or `2 × node_count` passes ran.
    pub fn optimize(&self, graph: &ProximityGraph) -> SpacingOutcome {
        let mut removed = RemovedSet::new();
        let max_iterations = graph.node_count() * 2;
        let mut iterations = 0;
        let mut converged = false;

        while iterations < max_iterations {
            let conflicts = self.find_conflicts(graph, &removed);
            if conflicts.is_empty() {
                converged = true;
                break;
            }

            let mut improved = false;
            for (first, second) in conflicts {
                if removed.contains(first) || removed.contains(second) { continue }

                let gain_first = self.marginal_gain(graph, &removed, first);
                let gain_second = self.marginal_gain(graph, &removed, second);
                if gain_first <= 0 && gain_second <= 0 { continue }

                let loser = if gain_first > gain_second { first }
                    else if gain_second > gain_first { second }
                    else { self.policy.loser(graph.node(first), graph.node(second)) };
                trace!(first, second, gain_first, gain_second, loser, "resolved conflict");
                removed.insert(loser);
                improved = true;
            }

            if !improved {
                converged = true;
                break;
            }
            iterations += 1;
        }

        if !converged && self.find_conflicts(graph, &removed).is_empty() { converged = true }

        let well_spaced = graph.well_spaced(&removed, self.threshold);
        let heights: Vec<f64> = well_spaced.iter().filter_map(|&id| graph.node(id).height_meters).collect();
        let average_height = if heights.is_empty() { 0.0 } else { heights.iter().sum::<f64>() / heights.len() as f64 };
        debug!(
            nodes = graph.node_count(), removed = removed.len(), well_spaced = well_spaced.len(),
            iterations, converged, "spacing optimization finished"
        );

        SpacingOutcome { removed, well_spaced, average_height, iterations, converged }
    }
}
