use geo::{Centroid, Distance, Geodesic, Point};
use rstar::{RTree, RTreeObject, AABB};
use tracing::debug;

use crate::health::ClassifiedSegment;
use crate::spacing::{ProximityGraph, TreeNode};

/// Meters per degree of latitude, rounded down so search windows err large.
const METERS_PER_DEGREE_LAT: f64 = 110_574.0;
/// Meters per degree of longitude at the equator.
const METERS_PER_DEGREE_LON: f64 = 111_320.0;
/// Search windows are widened by this factor before the exact geodesic check.
const ENVELOPE_MARGIN: f64 = 1.5;

/// A tree centroid in an R-tree, associated with a node by index.
#[derive(Debug, Clone)]
struct IndexedCentroid {
    idx: usize,
    lonlat: [f64; 2],
}

impl RTreeObject for IndexedCentroid {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope { AABB::from_point(self.lonlat) }
}

/// Builds a [`ProximityGraph`] connecting every pair of trees whose centroids are
/// within `buffer_distance` meters on the WGS84 ellipsoid.
#[derive(Debug, Clone, Copy)]
pub struct SpacingGraphBuilder {
    buffer_distance: f64,
}

impl Default for SpacingGraphBuilder {
    fn default() -> Self { Self { buffer_distance: 3.0 } }
}

impl SpacingGraphBuilder {
    pub fn new(buffer_distance: f64) -> Self { Self { buffer_distance } }

    #[inline] pub fn buffer_distance(&self) -> f64 { self.buffer_distance }

    /// One node per segment, in input order. A segment without a centroid keeps its
    /// slot with a NaN position so ids stay aligned with the segments.
    pub fn nodes_from_segments(segments: &[ClassifiedSegment]) -> Vec<TreeNode> {
        segments.iter().enumerate()
            .map(|(id, segment)| {
                let centroid = segment.geometry.centroid().unwrap_or_else(|| {
                    debug!(segment = id, "segment has no centroid");
                    Point::new(f64::NAN, f64::NAN)
                });
                TreeNode::new(id, centroid, segment.height_meters)
            })
            .collect()
    }

    /// Build the graph for a set of classified segments.
    pub fn build_from_segments(&self, segments: &[ClassifiedSegment]) -> ProximityGraph {
        self.build(Self::nodes_from_segments(segments))
    }

    /// Connect every node pair within the buffer distance. Unlocated nodes stay isolated.
    pub fn build(&self, nodes: Vec<TreeNode>) -> ProximityGraph {
        let rtree = RTree::bulk_load(nodes.iter()
            .filter(|node| node.is_located())
            .map(|node| IndexedCentroid { idx: node.id, lonlat: [node.centroid.x(), node.centroid.y()] })
            .collect());

        let mut edges = Vec::new();
        for entry in rtree.iter() {
            let i = entry.idx;
            for candidate in rtree.locate_in_envelope_intersecting(&self.search_window(entry.lonlat)) {
                let j = candidate.idx;
                if j <= i { continue }

                let distance = Geodesic.distance(nodes[i].centroid, nodes[j].centroid);
                if distance <= self.buffer_distance {
                    edges.push((i, j, distance));
                }
            }
        }

        debug!(nodes = nodes.len(), edges = edges.len(), buffer = self.buffer_distance, "built proximity graph");
        ProximityGraph::from_edges(nodes, edges)
    }

    /// Longitude/latitude box that contains every point within the buffer of `lonlat`.
    fn search_window(&self, [lon, lat]: [f64; 2]) -> AABB<[f64; 2]> {
        let dlat = self.buffer_distance / METERS_PER_DEGREE_LAT * ENVELOPE_MARGIN;
        let cos_lat = (lat.abs() + dlat).min(90.0).to_radians().cos().max(1e-6);
        let dlon = (self.buffer_distance / (METERS_PER_DEGREE_LON * cos_lat) * ENVELOPE_MARGIN).min(360.0);
        AABB::from_corners([lon - dlon, lat - dlat], [lon + dlon, lat + dlat])
    }
}
