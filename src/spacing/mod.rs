mod builder;
mod connections;
mod graph;
mod optimizer;

pub use builder::SpacingGraphBuilder;
pub use connections::{connection_lines, ConnectionLine};
pub use graph::{ProximityGraph, RemovedSet, TreeNode};
pub use optimizer::{PreferTaller, SpacingOptimizer, SpacingOutcome, TieBreakPolicy, DEFAULT_WELL_SPACING};
