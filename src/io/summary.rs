//! Per-image summary rows and the batch `summary.csv`.

use std::path::Path;

use anyhow::{Context, Result};
use polars::{frame::DataFrame, io::SerWriter, prelude::{CsvWriter, NamedFrom}, series::Series};

use crate::io::{fs::{assert_not_stdout, write_atomic}, plots::PlotRecord};

/// Aggregate results for one processed image.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImageSummary {
    pub image: String,
    pub plot: Option<u32>,
    pub stratum: Option<char>,
    /// Shapes labelled as trees.
    pub total_trees: usize,
    pub well_spaced_trees: usize,
    /// Mean height of segments with a defined height; 0 when there are none.
    pub average_height: f64,
    pub well_spaced_average_height: f64,
    /// Counts below, between and above the height bucket thresholds.
    pub height_buckets: [usize; 3],
    /// Summed canopy pixel area in m².
    pub crown_closure_area: f64,
    /// Geodesic area of the image footprint in m².
    pub image_area: f64,
    pub plot_record: Option<PlotRecord>,
}

impl ImageSummary {
    /// Canopy area as a percentage of the image footprint; 0 for an empty footprint.
    pub fn crown_closure_percent(&self) -> f64 {
        if self.image_area > 0.0 { self.crown_closure_area / self.image_area * 100.0 } else { 0.0 }
    }

    fn plot_field(&self, field: impl Fn(&PlotRecord) -> &Option<String>) -> Option<String> {
        self.plot_record.as_ref().and_then(|r| field(r).clone())
    }
}

/// Tabulate summaries, one row per image in the given order.
pub fn summary_frame(summaries: &[ImageSummary]) -> Result<DataFrame> {
    let strings = |f: &dyn Fn(&ImageSummary) -> Option<String>| -> Vec<Option<String>> {
        summaries.iter().map(f).collect()
    };
    let floats = |f: &dyn Fn(&ImageSummary) -> f64| -> Vec<f64> { summaries.iter().map(f).collect() };
    let counts = |f: &dyn Fn(&ImageSummary) -> usize| -> Vec<u64> { summaries.iter().map(|s| f(s) as u64).collect() };

    let df = DataFrame::new(vec![
        Series::new("image".into(), strings(&|s| Some(s.image.clone()))).into(),
        Series::new("company".into(), strings(&|s| s.plot_field(|r| &r.location))).into(),
        Series::new("block".into(), strings(&|s| s.plot_field(|r| &r.block))).into(),
        Series::new("stratum".into(), strings(&|s| s.stratum.map(String::from))).into(),
        Series::new("plot".into(), summaries.iter().map(|s| s.plot).collect::<Vec<Option<u32>>>()).into(),
        Series::new("TreeType".into(), strings(&|s| s.plot_field(|r| &r.tree_type))).into(),
        Series::new("scan_date".into(), strings(&|s| s.plot_field(|r| &r.flight_date))).into(),
        Series::new("avgTreeHeight".into(), floats(&|s| s.average_height)).into(),
        Series::new("avgTreeHeight_well_spaced".into(), floats(&|s| s.well_spaced_average_height)).into(),
        Series::new("totalTrees".into(), counts(&|s| s.total_trees)).into(),
        Series::new("wellSpacedTrees".into(), counts(&|s| s.well_spaced_trees)).into(),
        Series::new("height_lt_1.5".into(), counts(&|s| s.height_buckets[0])).into(),
        Series::new("height_gte_1.5_lt_2.5".into(), counts(&|s| s.height_buckets[1])).into(),
        Series::new("height_gte_2.5".into(), counts(&|s| s.height_buckets[2])).into(),
        Series::new("slashArea".into(), strings(&|s| s.plot_field(|r| &r.slash_area))).into(),
        Series::new("voidArea".into(), strings(&|s| s.plot_field(|r| &r.void_area))).into(),
        Series::new("crown_closureArea".into(), floats(&|s| s.crown_closure_area)).into(),
        Series::new("image_area".into(), floats(&|s| s.image_area)).into(),
        Series::new("crown_closureArea_Percent".into(), floats(&ImageSummary::crown_closure_percent)).into(),
    ])?;
    Ok(df)
}

/// Write a DataFrame to a CSV file.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    assert_not_stdout(path)?;
    write_atomic(path, |file| Ok(CsvWriter::new(file).finish(df)?))
        .with_context(|| format!("[io::summary::write_csv] Failed to write CSV to {:?}", path))
}

/// Write the batch summary CSV.
pub fn write_summary(summaries: &[ImageSummary], path: &Path) -> Result<()> {
    let mut df = summary_frame(summaries)?;
    write_csv(&mut df, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn summary(image: &str) -> ImageSummary {
        ImageSummary {
            image: image.to_string(),
            plot: Some(19),
            stratum: Some('B'),
            total_trees: 12,
            well_spaced_trees: 9,
            average_height: 2.1,
            well_spaced_average_height: 2.4,
            height_buckets: [3, 6, 3],
            crown_closure_area: 25.0,
            image_area: 200.0,
            plot_record: Some(PlotRecord { location: Some("Zanzibar".into()), ..Default::default() }),
        }
    }

    #[test]
    fn crown_closure_percent_guards_empty_footprint() {
        assert_relative_eq!(summary("a").crown_closure_percent(), 12.5);
        let empty = ImageSummary { image_area: 0.0, ..summary("a") };
        assert_eq!(empty.crown_closure_percent(), 0.0);
    }

    #[test]
    fn frame_has_one_row_per_image() {
        let df = summary_frame(&[summary("a.tif"), ImageSummary { image: "b.tif".into(), ..Default::default() }]).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("company").unwrap().str().unwrap().get(0), Some("Zanzibar"));
        assert_eq!(df.column("company").unwrap().str().unwrap().get(1), None);
        assert_eq!(df.column("wellSpacedTrees").unwrap().u64().unwrap().get(0), Some(9));
    }

    #[test]
    fn summary_csv_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.csv");
        write_summary(&[summary("P2_19B_x.tif")], &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let header = text.lines().next().unwrap();
        assert!(header.starts_with("image,company,block,stratum,plot"));
        assert!(header.contains("crown_closureArea_Percent"));
        assert!(text.contains("P2_19B_x.tif"));
    }
}
