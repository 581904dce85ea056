//! Age bracket and health class from height, canopy size and greenness.

use serde::{Deserialize, Serialize};

use crate::health::{HealthClass, ZonalResult};
use crate::{Error, Result};

/// One growth-curve checkpoint: a tree of `age` years is expected to be `height` m tall
/// with a crown of `canopy_area` m².
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthStage {
    pub age: f64,
    pub height: f64,
    pub canopy_area: f64,
}

impl GrowthStage {
    pub const fn new(age: f64, height: f64, canopy_area: f64) -> Self { Self { age, height, canopy_area } }
}

/// Growth stages ordered by strictly increasing height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<GrowthStage>", into = "Vec<GrowthStage>")]
pub struct GrowthTable {
    stages: Vec<GrowthStage>,
}

impl GrowthTable {
    /// Validate and wrap a list of stages.
    pub fn new(stages: Vec<GrowthStage>) -> Result<Self> {
        if stages.len() < 2 {
            return Err(Error::config(format!("growth table needs at least 2 stages, got {}", stages.len())));
        }
        for stage in &stages {
            let valid = stage.age.is_finite() && stage.age >= 0.0
                && stage.height.is_finite() && stage.height > 0.0
                && stage.canopy_area.is_finite() && stage.canopy_area > 0.0;
            if !valid {
                return Err(Error::config(format!("invalid growth stage {stage:?}")));
            }
        }
        if let Some(pair) = stages.windows(2).find(|w| w[1].height <= w[0].height) {
            return Err(Error::config(format!(
                "growth table heights must be strictly increasing ({} then {})", pair[0].height, pair[1].height
            )));
        }
        Ok(Self { stages })
    }

    #[inline] pub fn stages(&self) -> &[GrowthStage] { &self.stages }
}

impl Default for GrowthTable {
    fn default() -> Self {
        Self {
            stages: vec![
                GrowthStage::new(5.0, 3.0, 3.0),
                GrowthStage::new(10.0, 8.0, 12.0),
                GrowthStage::new(20.0, 15.0, 28.0),
                GrowthStage::new(30.0, 22.0, 44.0),
                GrowthStage::new(40.0, 30.0, 70.0),
            ],
        }
    }
}

impl TryFrom<Vec<GrowthStage>> for GrowthTable {
    type Error = Error;

    fn try_from(stages: Vec<GrowthStage>) -> Result<Self> { Self::new(stages) }
}

impl From<GrowthTable> for Vec<GrowthStage> {
    fn from(table: GrowthTable) -> Self { table.stages }
}

/// The bracket a height falls in and the checkpoint it is scored against.
#[derive(Debug, Clone, PartialEq)]
pub struct AgeBracket {
    pub label: String,
    pub reference_height: f64,
    pub reference_pixels: f64,
}

/// Outcome of classifying one segment; both fields are `None` without a height.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Classification {
    pub age_bracket: Option<String>,
    pub health_class: Option<HealthClass>,
}

/// Scores segments against a [`GrowthTable`] at a given ground sample distance.
#[derive(Debug, Clone)]
pub struct HealthClassifier {
    table: GrowthTable,
    target_gsd: f64,
}

impl HealthClassifier {
    pub fn new(table: GrowthTable, target_gsd: f64) -> Result<Self> {
        if !(target_gsd.is_finite() && target_gsd > 0.0) {
            return Err(Error::config(format!("target GSD must be positive, got {target_gsd}")));
        }
        Ok(Self { table, target_gsd })
    }

    #[inline] pub fn table(&self) -> &GrowthTable { &self.table }

    /// Pixels covered by `area_m2` at the target GSD.
    #[inline]
    pub fn expected_pixels(&self, area_m2: f64) -> f64 {
        let gsd_cm = self.target_gsd * 100.0;
        area_m2 * 10_000.0 / (gsd_cm * gsd_cm)
    }

    /// Find the age bracket for `height`. Interior heights are scored against the upper stage.
    pub fn bracket(&self, height: f64) -> Option<AgeBracket> {
        if !height.is_finite() { return None }

        let stages = self.table.stages();
        let last = stages.len() - 1;
        let reference = |label: String, stage: &GrowthStage| AgeBracket {
            label,
            reference_height: stage.height,
            reference_pixels: self.expected_pixels(stage.canopy_area),
        };

        let (first, final_stage) = (&stages[0], &stages[last]);
        if height <= first.height {
            return Some(reference(format!("0-{}", first.age), first));
        }
        if height >= final_stage.height {
            return Some(reference(format!("{}+", final_stage.age), final_stage));
        }
        stages.windows(2)
            .find(|pair| pair[0].height <= height && height <= pair[1].height)
            .map(|pair| reference(format!("{}-{}", pair[0].age, pair[1].age), &pair[1]))
    }

    /// Mean of the height, area and greenness scores (percent of the bracket reference).
    pub fn score(bracket: &AgeBracket, height: f64, pixel_count: usize, vegetation_score: f64) -> f64 {
        let height_score = height / bracket.reference_height * 100.0;
        let area_score = pixel_count as f64 / bracket.reference_pixels * 100.0;
        let vari_score = vegetation_score * 100.0;
        (height_score + area_score + vari_score) / 3.0
    }

    /// Classify a segment's zonal statistics.
    pub fn classify(&self, zonal: &ZonalResult) -> Classification {
        let Some(height) = zonal.height_meters else { return Classification::default() };
        let Some(bracket) = self.bracket(height) else { return Classification::default() };

        let average = Self::score(&bracket, height, zonal.pixel_count, zonal.vegetation_score);
        Classification {
            health_class: HealthClass::from_score(average),
            age_bracket: Some(bracket.label),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn classifier() -> HealthClassifier { HealthClassifier::new(GrowthTable::default(), 0.02).unwrap() }

    #[test]
    fn expected_pixels_at_two_centimetres() {
        assert_relative_eq!(classifier().expected_pixels(12.0), 30_000.0, epsilon = 1e-6);
    }

    #[test]
    fn brackets_cover_the_table() {
        let c = classifier();
        assert_eq!(c.bracket(2.0).unwrap().label, "0-5");
        assert_eq!(c.bracket(3.0).unwrap().label, "0-5");
        assert_eq!(c.bracket(5.0).unwrap().label, "5-10");
        assert_eq!(c.bracket(15.0).unwrap().label, "10-20");
        assert_eq!(c.bracket(29.9).unwrap().label, "30-40");
        assert_eq!(c.bracket(30.0).unwrap().label, "40+");
        assert_eq!(c.bracket(30.5).unwrap().label, "40+");
        assert_eq!(c.bracket(55.0).unwrap().label, "40+");
        assert_eq!(c.bracket(f64::NAN), None);
    }

    #[test]
    fn interior_bracket_references_upper_stage() {
        let bracket = classifier().bracket(12.0).unwrap();
        assert_eq!(bracket.label, "10-20");
        assert_eq!(bracket.reference_height, 15.0);
        assert_relative_eq!(bracket.reference_pixels, 70_000.0, epsilon = 1e-6);
    }

    #[test]
    fn height_on_stage_boundary_uses_lower_bracket() {
        let c = classifier();
        let exact = c.expected_pixels(12.0) as usize;
        let result = c.classify(&ZonalResult { pixel_count: exact, vegetation_score: 0.6, height_meters: Some(8.0) });
        assert_eq!(result.age_bracket.as_deref(), Some("5-10"));
        // (100 + 100 + 60) / 3 ≈ 86.7
        assert_eq!(result.health_class, Some(HealthClass::Vigorous));
    }

    #[test]
    fn weak_signal_is_poor() {
        let result = classifier().classify(&ZonalResult { pixel_count: 100, vegetation_score: 0.1, height_meters: Some(1.0) });
        assert_eq!(result.age_bracket.as_deref(), Some("0-5"));
        assert_eq!(result.health_class, Some(HealthClass::Poor));
    }

    #[test]
    fn missing_height_yields_no_classification() {
        let result = classifier().classify(&ZonalResult { pixel_count: 500, vegetation_score: 0.9, height_meters: None });
        assert_eq!(result, Classification::default());
    }

    #[test]
    fn invalid_tables_are_configuration_errors() {
        assert!(matches!(GrowthTable::new(vec![GrowthStage::new(5.0, 3.0, 3.0)]), Err(Error::Configuration(_))));
        let unordered = vec![GrowthStage::new(5.0, 3.0, 3.0), GrowthStage::new(10.0, 3.0, 12.0)];
        assert!(GrowthTable::new(unordered).is_err());
        let negative = vec![GrowthStage::new(5.0, 3.0, -1.0), GrowthStage::new(10.0, 8.0, 12.0)];
        assert!(GrowthTable::new(negative).is_err());
    }

    #[test]
    fn table_parses_from_json_list() {
        let table: GrowthTable = serde_json::from_str(
            r#"[{"age": 1, "height": 0.5, "canopy_area": 0.2}, {"age": 3, "height": 1.5, "canopy_area": 1}]"#,
        ).unwrap();
        assert_eq!(table.stages().len(), 2);
        assert_eq!(serde_json::to_value(&table).unwrap().as_array().map(Vec::len), Some(2));
    }
}
