#![doc = "Canopy health scoring and tree spacing optimization"]
mod error;

pub mod batch;
pub mod config;
pub mod geom;
pub mod health;
pub mod io;
pub mod raster;
pub mod spacing;

#[doc(inline)]
pub use error::{Error, Result};

#[doc(inline)]
pub use config::AnalysisConfig;

#[doc(inline)]
pub use health::{CanopyHealthEstimator, ClassifiedSegment, HealthClass, HealthClassifier};

#[doc(inline)]
pub use spacing::{ProximityGraph, SpacingGraphBuilder, SpacingOptimizer, SpacingOutcome};

#[doc(inline)]
pub use batch::{run_batch, ImagePipeline};
