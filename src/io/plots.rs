//! Plot metadata keyed by plot number and stratum.

use std::{fs::File, path::Path, sync::LazyLock};

use anyhow::{Context, Result};
use polars::{frame::DataFrame, io::SerReader, prelude::CsvReadOptions};
use regex::Regex;

/// `_<digits><capital letter>_` anywhere in an image name, e.g. `P2_19B_ortho.tif`.
static PLOT_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"_(\d+)([A-Z])_").ok());

/// Extract `(plot, stratum)` from an image name.
pub fn plot_and_stratum(name: &str) -> Option<(u32, char)> {
    let captures = PLOT_PATTERN.as_ref()?.captures(name)?;
    let plot = captures.get(1)?.as_str().parse().ok()?;
    let stratum = captures.get(2)?.as_str().chars().next()?;
    Some((plot, stratum))
}

/// Survey metadata for one plot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlotRecord {
    pub plot: u32,
    pub stratum: String,
    pub location: Option<String>,
    pub block: Option<String>,
    pub slash_area: Option<String>,
    pub void_area: Option<String>,
    pub flight_date: Option<String>,
    pub tree_type: Option<String>,
}

/// Rows of a plot CSV (`plot, stratum, location, block, slashArea, voidArea, flightDate, treeType`).
#[derive(Debug, Clone, Default)]
pub struct PlotTable {
    records: Vec<PlotRecord>,
}

impl PlotTable {
    /// Read a plot CSV. All columns are read as text; rows without a numeric plot are skipped.
    pub fn read(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("[io::plots::read] Failed to open plot CSV: {}", path.display()))?;
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .into_reader_with_file_handle(file)
            .finish()
            .with_context(|| format!("[io::plots::read] Failed to read plot CSV from {:?}", path))?;
        Self::from_frame(&df)
    }

    /// Build from a DataFrame with string columns.
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let text = |name: &str, row: usize| -> Option<String> {
            let column = df.column(name).ok()?;
            let value = column.str().ok()?.get(row)?.trim();
            (!value.is_empty()).then(|| value.to_string())
        };
        df.column("plot").context("[io::plots::from_frame] Plot CSV has no 'plot' column")?;
        df.column("stratum").context("[io::plots::from_frame] Plot CSV has no 'stratum' column")?;

        let records = (0..df.height())
            .filter_map(|row| {
                Some(PlotRecord {
                    plot: text("plot", row)?.parse().ok()?,
                    stratum: text("stratum", row)?,
                    location: text("location", row),
                    block: text("block", row),
                    slash_area: text("slashArea", row),
                    void_area: text("voidArea", row),
                    flight_date: text("flightDate", row),
                    tree_type: text("treeType", row),
                })
            })
            .collect();
        Ok(Self { records })
    }

    #[inline] pub fn len(&self) -> usize { self.records.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.records.is_empty() }

    /// First record for a plot and stratum.
    pub fn lookup(&self, plot: u32, stratum: char) -> Option<&PlotRecord> {
        self.records.iter().find(|r| r.plot == plot && r.stratum.chars().eq(std::iter::once(stratum)))
    }
}
