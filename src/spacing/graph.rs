use ahash::AHashSet;
use geo::Point;

/// A tree reduced to its canopy centroid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeNode {
    /// Stable zero-based index within one image.
    pub id: usize,
    /// Canopy centroid as (longitude, latitude) in degrees.
    pub centroid: Point<f64>,
    /// Height in meters, if the segment had one.
    pub height_meters: Option<f64>,
}

impl TreeNode {
    pub fn new(id: usize, centroid: Point<f64>, height_meters: impl Into<Option<f64>>) -> Self {
        Self { id, centroid, height_meters: height_meters.into() }
    }

    /// False for trees whose outline had no centroid.
    #[inline] pub fn is_located(&self) -> bool { self.centroid.x().is_finite() && self.centroid.y().is_finite() }
}

/// Trees logically removed during optimization. Grows monotonically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovedSet {
    members: AHashSet<usize>,
}

impl RemovedSet {
    pub fn new() -> Self { Self::default() }

    /// Mark a node as removed. Returns false if it already was.
    #[inline] pub fn insert(&mut self, node: usize) -> bool { self.members.insert(node) }

    #[inline] pub fn contains(&self, node: usize) -> bool { self.members.contains(&node) }

    #[inline] pub fn len(&self) -> usize { self.members.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.members.is_empty() }

    /// Removed ids in ascending order.
    pub fn sorted(&self) -> Vec<usize> {
        let mut ids: Vec<usize> = self.members.iter().copied().collect();
        ids.sort_unstable();
        ids
    }
}

/// Undirected proximity graph over trees in compressed sparse row format.
/// Each edge is stored in both endpoints' lists with the same distance (m);
/// neighbour lists are sorted by id.
#[derive(Debug, Clone, Default)]
pub struct ProximityGraph {
    nodes: Vec<TreeNode>,
    offsets: Vec<u32>,
    edges: Vec<u32>,
    distances: Vec<f64>,
}

impl ProximityGraph {
    /// Construct a graph from per-node adjacency lists and matching distances.
    pub fn new(nodes: Vec<TreeNode>, edges: &[Vec<u32>], distances: &[Vec<f64>]) -> Self {
        assert!(edges.len() == nodes.len(), "edges.len() must equal nodes.len()");
        assert!(distances.len() == nodes.len(), "distances.len() must equal nodes.len()");
        edges.iter().zip(distances.iter()).enumerate().for_each(|(i, (edges, distances))| {
            assert!(edges.len() == distances.len(), "edges[{i}].len() must equal distances[{i}].len()");
        });

        Self {
            offsets: std::iter::once(0u32).chain(
                edges.iter()
                    .map(|v| v.len() as u32)
                    .scan(0u32, |acc, len| {*acc += len; Some(*acc)})
            ).collect::<Vec<u32>>(),
            edges: edges.iter().flatten().copied().collect(),
            distances: distances.iter().flatten().copied().collect(),
            nodes,
        }
    }

    /// Build from undirected edges `(i, j, distance)`, each listed once.
    /// Self-loops are dropped.
    pub fn from_edges(nodes: Vec<TreeNode>, edges: impl IntoIterator<Item = (usize, usize, f64)>) -> Self {
        let mut adjacency: Vec<Vec<(u32, f64)>> = vec![Vec::new(); nodes.len()];
        for (i, j, distance) in edges {
            if i == j { continue }
            adjacency[i].push((j as u32, distance));
            adjacency[j].push((i as u32, distance));
        }
        adjacency.iter_mut().for_each(|list| list.sort_by_key(|&(id, _)| id));

        let (edges, distances): (Vec<Vec<u32>>, Vec<Vec<f64>>) = adjacency.into_iter()
            .map(|list| list.into_iter().unzip::<u32, f64, Vec<u32>, Vec<f64>>())
            .unzip();
        Self::new(nodes, &edges, &distances)
    }

    /// Get the number of nodes in the graph.
    #[inline] pub fn node_count(&self) -> usize { self.nodes.len() }

    /// Get the number of undirected edges.
    #[inline] pub fn edge_count(&self) -> usize { self.edges.len() / 2 }

    #[inline] pub fn nodes(&self) -> &[TreeNode] { &self.nodes }

    #[inline] pub fn node(&self, id: usize) -> &TreeNode { &self.nodes[id] }

    /// Get the range of edges for a given node.
    #[inline]
    fn range(&self, node: usize) -> std::ops::Range<usize> {
        self.offsets[node] as usize .. self.offsets[node + 1] as usize
    }

    /// Get the degree (number of neighbors) of a given node.
    #[inline] pub fn degree(&self, node: usize) -> usize { self.range(node).len() }

    /// Get an iterator over the neighbors and edge distances of a given node, in id order.
    #[inline]
    pub fn neighbors(&self, node: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.range(node).map(move |v| (self.edges[v] as usize, self.distances[v]))
    }

    /// Every undirected edge once, as `(i, j, distance)` with `i < j`.
    pub fn edge_list(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (0..self.node_count()).flat_map(move |i| {
            self.neighbors(i).filter(move |&(j, _)| i < j).map(move |(j, d)| (i, j, d))
        })
    }

    /// A node is well spaced if it is located, not removed, and every remaining
    /// neighbour is at least `threshold` meters away.
    pub fn is_well_spaced(&self, node: usize, removed: &RemovedSet, threshold: f64) -> bool {
        self.is_well_spaced_with(node, |n| removed.contains(n), threshold)
    }

    /// Number of well-spaced nodes under `removed`.
    pub fn well_spaced_count(&self, removed: &RemovedSet, threshold: f64) -> usize {
        self.count_with(|n| removed.contains(n), threshold)
    }

    /// Number of well-spaced nodes under `removed ∪ {extra}`, without modifying `removed`.
    pub fn well_spaced_count_with(&self, removed: &RemovedSet, extra: usize, threshold: f64) -> usize {
        self.count_with(|n| n == extra || removed.contains(n), threshold)
    }

    /// Ids of well-spaced nodes under `removed`, ascending.
    pub fn well_spaced(&self, removed: &RemovedSet, threshold: f64) -> Vec<usize> {
        (0..self.node_count()).filter(|&n| self.is_well_spaced(n, removed, threshold)).collect()
    }

    fn count_with(&self, is_removed: impl Fn(usize) -> bool + Copy, threshold: f64) -> usize {
        (0..self.node_count()).filter(|&n| self.is_well_spaced_with(n, is_removed, threshold)).count()
    }

    fn is_well_spaced_with(&self, node: usize, is_removed: impl Fn(usize) -> bool, threshold: f64) -> bool {
        self.nodes[node].is_located() && !is_removed(node)
            && self.neighbors(node).all(|(nb, d)| is_removed(nb) || d >= threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes(n: usize) -> Vec<TreeNode> {
        (0..n).map(|i| TreeNode::new(i, Point::new(i as f64, 0.0), 1.0)).collect()
    }

    fn make_test_graph() -> ProximityGraph {
        ProximityGraph::new(
            nodes(4),
            &[
                vec![1, 2],       // 0
                vec![0, 2],       // 1
                vec![0, 1, 3],    // 2
                vec![2],          // 3
            ],
            &[
                vec![1.5, 2.0],
                vec![1.5, 0.5],
                vec![2.0, 0.5, 0.5],
                vec![0.5],
            ],
        )
    }

    #[test]
    fn csr_graph_construction() {
        let graph = make_test_graph();

        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 4);

        // Offsets are cumulative neighbor counts, len = nodes + 1
        assert_eq!(graph.offsets, vec![0, 2, 4, 7, 8]);
        assert_eq!(*graph.offsets.last().unwrap() as usize, graph.edges.len());
        assert_eq!(graph.edges.len(), graph.distances.len());
    }

    #[test]
    fn from_edges_is_symmetric_and_sorted() {
        let graph = ProximityGraph::from_edges(nodes(4), [(2, 3, 0.5), (0, 2, 2.0), (1, 2, 0.5), (0, 1, 1.5)]);
        for i in 0..graph.node_count() {
            let ids: Vec<usize> = graph.neighbors(i).map(|(j, _)| j).collect();
            assert!(ids.windows(2).all(|w| w[0] < w[1]));
            for (j, d) in graph.neighbors(i) {
                assert!(graph.neighbors(j).any(|(k, e)| k == i && e == d));
            }
        }
        assert_eq!(graph.degree(2), 3);
        assert_eq!(graph.edge_list().collect::<Vec<_>>(), vec![(0, 1, 1.5), (0, 2, 2.0), (1, 2, 0.5), (2, 3, 0.5)]);
    }

    #[test]
    fn self_loops_are_dropped() {
        let graph = ProximityGraph::from_edges(nodes(2), [(0, 0, 0.0), (0, 1, 2.0)]);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn well_spaced_respects_removed_neighbours() {
        let graph = make_test_graph();
        let mut removed = RemovedSet::new();

        // 0 has neighbours at 1.5 and 2.0; 1, 2, 3 all touch a 0.5 m edge.
        assert_eq!(graph.well_spaced(&removed, 1.0), vec![0]);

        removed.insert(2);
        assert_eq!(graph.well_spaced(&removed, 1.0), vec![0, 1, 3]);
        assert_eq!(graph.well_spaced_count(&removed, 1.0), 3);
        assert!(!graph.is_well_spaced(2, &removed, 1.0));
    }

    #[test]
    fn hypothetical_removal_leaves_set_untouched() {
        let graph = make_test_graph();
        let removed = RemovedSet::new();
        assert_eq!(graph.well_spaced_count_with(&removed, 2, 1.0), 3);
        assert!(removed.is_empty());
    }

    #[test]
    fn unlocated_nodes_are_never_well_spaced() {
        let mut nodes = nodes(3);
        nodes[1] = TreeNode::new(1, Point::new(f64::NAN, f64::NAN), None);
        let graph = ProximityGraph::from_edges(nodes, std::iter::empty());
        assert!(!graph.node(1).is_located());
        assert_eq!(graph.well_spaced(&RemovedSet::new(), 1.0), vec![0, 2]);
        assert_eq!(graph.well_spaced_count_with(&RemovedSet::new(), 0, 1.0), 1);
    }

    #[test]
    fn removed_set_only_grows() {
        let mut removed = RemovedSet::new();
        assert!(removed.insert(3));
        assert!(!removed.insert(3));
        removed.insert(1);
        assert_eq!(removed.sorted(), vec![1, 3]);
        assert_eq!(removed.len(), 2);
    }
}
