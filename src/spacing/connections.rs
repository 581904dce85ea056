use geo::Line;

use crate::config::LineClasses;
use crate::spacing::ProximityGraph;

/// A proximity edge drawn between two tree centroids.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionLine {
    pub from: usize,
    pub to: usize,
    /// Centroid to centroid, in longitude/latitude.
    pub line: Line<f64>,
    /// Geodesic distance in meters.
    pub distance: f64,
    /// 2 = too close, 1 = near, 0 = clear.
    pub class: u8,
}

impl ConnectionLine {
    /// Distance rounded to millimetres.
    #[inline] pub fn rounded_distance(&self) -> f64 { (self.distance * 1000.0).round() / 1000.0 }
}

/// One line per graph edge, ordered by `(from, to)`.
pub fn connection_lines(graph: &ProximityGraph, classes: &LineClasses) -> Vec<ConnectionLine> {
    graph.edge_list()
        .map(|(from, to, distance)| ConnectionLine {
            from,
            to,
            line: Line::new(graph.node(from).centroid, graph.node(to).centroid),
            distance,
            class: classes.classify(distance),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spacing::TreeNode;
    use geo::Point;

    #[test]
    fn every_edge_becomes_a_classified_line() {
        let nodes = (0..4).map(|i| TreeNode::new(i, Point::new(i as f64, 1.0), 0.0)).collect();
        let graph = ProximityGraph::from_edges(nodes, [(0, 1, 0.4), (1, 2, 1.5), (2, 3, 2.71828)]);
        let lines = connection_lines(&graph, &LineClasses::default());

        assert_eq!(lines.iter().map(|l| (l.from, l.to, l.class)).collect::<Vec<_>>(), vec![(0, 1, 2), (1, 2, 1), (2, 3, 0)]);
        assert_eq!(lines[2].rounded_distance(), 2.718);
        assert_eq!(lines[1].line.start, Point::new(1.0, 1.0).0);
    }
}
