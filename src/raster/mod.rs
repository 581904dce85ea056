mod affine;
mod crs;
mod geotiff;
mod grid;
pub mod sample;
mod source;

pub use affine::Affine;
pub use crs::Crs;
pub use geotiff::GeoTiffRaster;
pub use grid::RasterGrid;
pub use sample::{sample_pair, SampledPair};
pub use source::{InMemoryRaster, RasterSource};
