mod area;
mod proj;

pub use area::{bounds_polygon, footprint_area};
pub use proj::Reprojector;
