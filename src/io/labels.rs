//! Per-image segment labels in labelme JSON form.

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One labelled outline in native image-pixel coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelShape {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub points: Vec<[f64; 2]>,
}

#[derive(Debug, Default, Deserialize)]
struct LabelFile {
    #[serde(default)]
    shapes: Vec<LabelShape>,
}

/// Read every shape of a label file, in file order.
pub fn read_labels(path: &Path) -> Result<Vec<LabelShape>> {
    let file = File::open(path)
        .with_context(|| format!("[io::labels::read_labels] Failed to open {}", path.display()))?;
    let labels: LabelFile = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("[io::labels::read_labels] Failed to parse {}", path.display()))?;
    Ok(labels.shapes)
}

/// Read label shapes from a JSON string.
pub fn parse_labels(json: &str) -> Result<Vec<LabelShape>> {
    let labels: LabelFile = serde_json::from_str(json)
        .context("[io::labels::parse_labels] Failed to parse label JSON")?;
    Ok(labels.shapes)
}

/// Number of shapes carrying `label`.
pub fn count_label(shapes: &[LabelShape], label: &str) -> usize {
    shapes.iter().filter(|shape| shape.label == label).count()
}

/// Point lists of all shapes, in order.
pub fn outlines(shapes: &[LabelShape]) -> Vec<Vec<[f64; 2]>> {
    shapes.iter().map(|shape| shape.points.clone()).collect()
}
