//! # Vadose Algorithms
//!
//! Spatial algorithms for estimating vertical infiltration time through
//! the vadose zone.
//!
//! - **interpolation**: IDW, regularized spline, natural neighbor
//! - **rasterize**: burn polygon attributes onto a grid
//! - **resample**: nearest-neighbor grid alignment
//! - **infiltration**: formula table and the full processing pipeline

pub mod infiltration;
pub mod interpolation;
pub mod rasterize;
pub mod resample;

use geo_types::Geometry;

/// Human-readable name of a geometry variant, for error messages.
pub(crate) fn geometry_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::infiltration::{
        infiltration_time, thickness, CoefficientField, Denominator, Formula, FormulaInputs,
    };
    pub use crate::infiltration::pipeline::{
        run, LithologyFields, PipelineInputs, PipelineOutput, WorkingGrid,
    };
    pub use crate::interpolation::{
        idw, natural_neighbor, sample_points, spline, IdwParams, Method, NaturalNeighborParams,
        SamplePoint, SplineParams,
    };
    pub use crate::rasterize::rasterize_field;
    pub use crate::resample::resample_nearest;
    pub use vadose_core::prelude::*;
}
