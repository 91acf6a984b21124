//! I/O operations for reading and writing geospatial data

mod geojson;
mod geotiff;

pub use geojson::{parse_geojson, read_geojson};
pub use geotiff::{read_geotiff, write_geotiff};
