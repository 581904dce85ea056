//! Reading inputs and writing result files.
//!
//! - `labels` - labelme JSON segment outlines
//! - `geojson` - health, spacing and connection-line feature collections
//! - `plots` - plot metadata CSV and image-name parsing
//! - `summary` - the per-batch `summary.csv`
//! - `fs` - directory checks and atomic writes

pub mod fs;
pub mod geojson;
pub mod labels;
pub mod plots;
pub mod summary;
