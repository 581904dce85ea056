mod classify;
mod estimator;
mod height;
pub mod mask;
mod segment;
pub mod vari;
pub mod zonal;

pub use classify::{AgeBracket, Classification, GrowthStage, GrowthTable, HealthClassifier};
pub use estimator::CanopyHealthEstimator;
pub use height::{HeightExtractor, DEFAULT_TOP_SAMPLES};
pub use segment::{ClassifiedSegment, HealthClass, SegmentPolygon, ZonalResult};
