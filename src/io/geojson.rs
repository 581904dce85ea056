//! GeoJSON feature collections for health, spacing and connection-line outputs.

use std::{fs::File, io::{BufReader, BufWriter, Write}, path::Path};

use anyhow::{anyhow, bail, Context, Result};
use geo::{Coord, LineString, Polygon};
use serde_json::{json, Value};
use tracing::debug;

use crate::config::Palette;
use crate::io::fs::{assert_not_stdout, write_atomic};
use crate::health::{ClassifiedSegment, HealthClass};
use crate::spacing::{ConnectionLine, ProximityGraph, SpacingOutcome};

/// Named CRS carried by every collection we write.
const WGS84_URN: &str = "urn:ogc:def:crs:EPSG::4326";

fn feature_collection(features: Vec<Value>) -> Value {
    json!({
        "type": "FeatureCollection",
        "crs": { "type": "name", "properties": { "name": WGS84_URN } },
        "features": features,
    })
}

fn ring_coords(ring: &LineString<f64>) -> Vec<[f64; 2]> {
    ring.coords().map(|c| [c.x, c.y]).collect()
}

/// Classified canopy polygons with their scores.
pub fn health_collection(segments: &[ClassifiedSegment], palette: &Palette) -> Value {
    let features = segments.iter().map(|segment| {
        let class = segment.health_class.map(HealthClass::as_u8);
        json!({
            "type": "Feature",
            "geometry": {
                "type": "Polygon",
                "coordinates": [ring_coords(segment.geometry.exterior())],
            },
            "properties": {
                "height_meters": segment.height_meters,
                "vari_score": segment.vegetation_score,
                "pixel_count": segment.pixel_count,
                "estimated_age": segment.estimated_age_bracket,
                "class": class.map(|c| c.to_string()),
                "pixel_area_m2": segment.area_m2,
                "fill": class.and_then(|c| palette.health_color(c)),
            }
        })
    }).collect();

    feature_collection(features)
}

/// One point per located tree at its centroid, `class` "1" when well spaced.
pub fn spacing_collection(graph: &ProximityGraph, outcome: &SpacingOutcome) -> Value {
    let features = graph.nodes().iter().filter(|node| {
        if !node.is_located() { debug!(node = node.id, "skipping tree without a centroid") }
        node.is_located()
    }).map(|node| {
        json!({
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": [node.centroid.x(), node.centroid.y()] },
            "properties": {
                "class": if outcome.is_well_spaced(node.id) { "1" } else { "0" },
                "height_meters": node.height_meters,
            }
        })
    }).collect();

    feature_collection(features)
}

/// One line per proximity edge, classified by distance.
pub fn lines_collection(lines: &[ConnectionLine], palette: &Palette) -> Value {
    let features = lines.iter().map(|line| {
        json!({
            "type": "Feature",
            "geometry": {
                "type": "LineString",
                "coordinates": [[line.line.start.x, line.line.start.y], [line.line.end.x, line.line.end.y]],
            },
            "properties": {
                "class": line.class.to_string(),
                "distance": line.rounded_distance(),
                "stroke": palette.line_color(line.class),
            }
        })
    }).collect();

    feature_collection(features)
}

/// Write a GeoJSON value to `path`.
pub fn write_geojson(path: &Path, value: &Value) -> Result<()> {
    assert_not_stdout(path)?;
    write_atomic(path, |file| {
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, value)?;
        writer.flush()?;
        Ok(())
    }).with_context(|| format!("[io::geojson::write_geojson] Failed to write {}", path.display()))
}

/// Read a health collection written by [`health_collection`] back into segments.
pub fn read_health_features(path: &Path) -> Result<Vec<ClassifiedSegment>> {
    let file = File::open(path)
        .with_context(|| format!("[io::geojson::read_health_features] Failed to open {}", path.display()))?;
    let value: Value = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("[io::geojson::read_health_features] Failed to parse {}", path.display()))?;
    parse_health_features(&value)
        .with_context(|| format!("[io::geojson::read_health_features] Invalid health collection {}", path.display()))
}

/// Parse Polygon features into segments. Missing properties fall back to empty values.
pub fn parse_health_features(value: &Value) -> Result<Vec<ClassifiedSegment>> {
    let features = value["features"].as_array()
        .ok_or_else(|| anyhow!("FeatureCollection has no features array"))?;

    features.iter().enumerate().map(|(i, feature)| {
        let geometry = &feature["geometry"];
        if geometry["type"].as_str() != Some("Polygon") {
            bail!("feature {i} is not a Polygon");
        }
        let exterior = geometry["coordinates"].get(0).and_then(Value::as_array)
            .ok_or_else(|| anyhow!("feature {i} has no exterior ring"))?;

        let properties = &feature["properties"];
        Ok(ClassifiedSegment {
            geometry: Polygon::new(parse_ring(exterior).with_context(|| format!("feature {i}"))?, vec![]),
            height_meters: properties["height_meters"].as_f64(),
            vegetation_score: properties["vari_score"].as_f64().unwrap_or(0.0),
            pixel_count: properties["pixel_count"].as_u64().unwrap_or(0) as usize,
            estimated_age_bracket: properties["estimated_age"].as_str().map(str::to_string),
            health_class: parse_class(&properties["class"]),
            area_m2: properties["pixel_area_m2"].as_f64().unwrap_or(0.0),
        })
    }).collect()
}

/// Class is written as a string but accepted as a number too.
fn parse_class(value: &Value) -> Option<HealthClass> {
    let raw = match value {
        Value::String(s) => s.parse::<u8>().ok()?,
        Value::Number(n) => u8::try_from(n.as_u64()?).ok()?,
        _ => return None,
    };
    HealthClass::try_from(raw).ok()
}

/// Parse a ring of `[x, y]` pairs.
fn parse_ring(coords: &[Value]) -> Result<LineString<f64>> {
    coords.iter().map(|pair| {
        let x = pair.get(0).and_then(Value::as_f64).ok_or_else(|| anyhow!("Invalid coordinate: x must be a number"))?;
        let y = pair.get(1).and_then(Value::as_f64).ok_or_else(|| anyhow!("Invalid coordinate: y must be a number"))?;
        Ok(Coord { x, y })
    }).collect::<Result<Vec<_>>>().map(LineString)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LineClasses;
    use crate::spacing::{connection_lines, SpacingGraphBuilder, SpacingOptimizer, TreeNode};
    use geo::{polygon, Point};

    fn segment(class: Option<HealthClass>, height: Option<f64>) -> ClassifiedSegment {
        ClassifiedSegment {
            geometry: polygon![(x: 39.0, y: -6.0), (x: 39.00001, y: -6.0), (x: 39.00001, y: -6.00001)],
            height_meters: height,
            vegetation_score: 0.42,
            pixel_count: 120,
            estimated_age_bracket: height.map(|_| "0-5".to_string()),
            health_class: class,
            area_m2: 0.048,
        }
    }

    #[test]
    fn health_properties_and_crs() {
        let value = health_collection(&[segment(Some(HealthClass::Good), Some(1.8)), segment(None, None)], &Palette::default());
        assert_eq!(value["crs"]["properties"]["name"], WGS84_URN);

        let first = &value["features"][0]["properties"];
        assert_eq!(first["class"], "2");
        assert_eq!(first["fill"], "#30C876");
        assert_eq!(first["estimated_age"], "0-5");
        assert_eq!(first["pixel_count"], 120);

        let second = &value["features"][1]["properties"];
        assert!(second["height_meters"].is_null());
        assert!(second["class"].is_null());
        assert!(second["fill"].is_null());
    }

    #[test]
    fn health_collection_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("health.geojson");
        let segments = vec![segment(Some(HealthClass::Poor), Some(0.9)), segment(None, None)];
        write_geojson(&path, &health_collection(&segments, &Palette::default())).unwrap();

        let back = read_health_features(&path).unwrap();
        assert_eq!(back.len(), 2);
        for (read, written) in back.iter().zip(&segments) {
            assert_eq!(read.health_class, written.health_class);
            assert_eq!(read.pixel_count, written.pixel_count);
            assert_eq!(read.estimated_age_bracket, written.estimated_age_bracket);
            assert_eq!(read.height_meters.is_some(), written.height_meters.is_some());
            assert!((read.vegetation_score - written.vegetation_score).abs() < 1e-12);
            assert_eq!(read.geometry.exterior().0.len(), written.geometry.exterior().0.len());
        }
    }

    #[test]
    fn numeric_class_is_accepted() {
        assert_eq!(parse_class(&json!(3)), Some(HealthClass::Vigorous));
        assert_eq!(parse_class(&json!("1")), Some(HealthClass::Fair));
        assert_eq!(parse_class(&json!("7")), None);
    }

    #[test]
    fn non_polygon_features_are_rejected() {
        let value = json!({"features": [{"geometry": {"type": "Point", "coordinates": [0, 0]}, "properties": {}}]});
        assert!(parse_health_features(&value).is_err());
    }

    #[test]
    fn unlocated_trees_are_left_out_of_spacing_points() {
        let nodes = vec![
            TreeNode::new(0, Point::new(39.0, -6.0), 2.0),
            TreeNode::new(1, Point::new(f64::NAN, f64::NAN), None),
        ];
        let graph = SpacingGraphBuilder::new(3.0).build(nodes);
        let outcome = SpacingOptimizer::new(1.0).optimize(&graph);
        let points = spacing_collection(&graph, &outcome);
        let features = points["features"].as_array().unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0]["geometry"]["coordinates"], json!([39.0, -6.0]));
    }

    #[test]
    fn spacing_and_lines_collections() {
        let nodes = vec![
            TreeNode::new(0, Point::new(0.0, 0.0), 2.0),
            TreeNode::new(1, Point::new(0.0, 4.5e-6), 3.0),
            TreeNode::new(2, Point::new(0.0, 4.5e-5), 4.0),
        ];
        let graph = SpacingGraphBuilder::new(3.0).build(nodes);
        let outcome = SpacingOptimizer::new(1.0).optimize(&graph);

        let points = spacing_collection(&graph, &outcome);
        let classes: Vec<&str> = points["features"].as_array().unwrap().iter()
            .map(|f| f["properties"]["class"].as_str().unwrap())
            .collect();
        assert_eq!(classes, vec!["0", "1", "1"]);
        assert_eq!(points["features"][1]["properties"]["height_meters"], 3.0);

        let lines = lines_collection(&connection_lines(&graph, &LineClasses::default()), &Palette::default());
        let first = &lines["features"][0];
        assert_eq!(first["geometry"]["type"], "LineString");
        assert_eq!(first["properties"]["class"], "2");
        assert_eq!(first["properties"]["stroke"], "#FD3E3E");
    }
}
