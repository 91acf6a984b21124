//! Spatial interpolation algorithms
//!
//! Interpolate scattered point data onto regular raster grids:
//! - IDW: Inverse Distance Weighting with a nearest-n neighborhood
//! - Spline: regularized thin plate spline
//! - Natural Neighbor: discrete Sibson area-stealing

mod idw;
mod natural_neighbor;
mod spline;

pub use idw::{idw, IdwParams};
pub use natural_neighbor::{natural_neighbor, NaturalNeighborParams};
pub use spline::{spline, SplineParams};

use geo_types::Geometry;
use std::str::FromStr;
use vadose_core::vector::FeatureCollection;
use vadose_core::{Error, Result};

use crate::geometry_name;

/// A sample point with x, y coordinates and a value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePoint {
    pub x: f64,
    pub y: f64,
    pub value: f64,
}

impl SamplePoint {
    pub fn new(x: f64, y: f64, value: f64) -> Self {
        Self { x, y, value }
    }

    /// Squared Euclidean distance to another point
    #[inline]
    pub fn dist_sq(&self, other_x: f64, other_y: f64) -> f64 {
        let dx = self.x - other_x;
        let dy = self.y - other_y;
        dx * dx + dy * dy
    }

    /// Euclidean distance to another point
    #[inline]
    pub fn dist(&self, other_x: f64, other_y: f64) -> f64 {
        self.dist_sq(other_x, other_y).sqrt()
    }
}

/// Interpolation method selector.
///
/// Parsing is strict: an unrecognized name is rejected instead of falling
/// back to a default method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Idw,
    Spline,
    NaturalNeighbor,
}

impl Method {
    pub fn name(&self) -> &'static str {
        match self {
            Method::Idw => "idw",
            Method::Spline => "spline",
            Method::NaturalNeighbor => "natural-neighbor",
        }
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "idw" => Ok(Method::Idw),
            "spline" => Ok(Method::Spline),
            "natural-neighbor" | "natural_neighbor" | "naturalneighbor" | "nn" => {
                Ok(Method::NaturalNeighbor)
            }
            other => Err(Error::InvalidParameter {
                name: "method",
                value: other.to_string(),
                reason: "expected one of: idw, spline, natural-neighbor".to_string(),
            }),
        }
    }
}

/// Extract sample points from a point layer's numeric field.
///
/// Point and MultiPoint geometries contribute samples; any other geometry
/// in the layer is an error.
pub fn sample_points(layer: &FeatureCollection, field: &str) -> Result<Vec<SamplePoint>> {
    let mut points = Vec::new();

    for (idx, feature) in layer.iter().enumerate() {
        let value = match feature.numeric_property(field) {
            Some(v) => v,
            None if feature.get_property(field).is_none() => {
                return Err(Error::MissingField {
                    field: field.to_string(),
                    feature: idx,
                })
            }
            None => {
                return Err(Error::NonNumericField {
                    field: field.to_string(),
                    feature: idx,
                })
            }
        };

        match &feature.geometry {
            Some(Geometry::Point(p)) => points.push(SamplePoint::new(p.x(), p.y(), value)),
            Some(Geometry::MultiPoint(mp)) => {
                for p in &mp.0 {
                    points.push(SamplePoint::new(p.x(), p.y(), value));
                }
            }
            Some(other) => {
                return Err(Error::InvalidParameter {
                    name: "points",
                    value: geometry_name(other).to_string(),
                    reason: "only Point and MultiPoint geometries can be sampled".to_string(),
                })
            }
            None => {
                return Err(Error::InvalidParameter {
                    name: "points",
                    value: format!("feature {}", idx),
                    reason: "feature has no geometry".to_string(),
                })
            }
        }
    }

    if points.is_empty() {
        return Err(Error::Algorithm("No sample points provided".into()));
    }

    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{MultiPoint, Point, Polygon};
    use vadose_core::vector::{AttributeValue, Feature};

    fn point_feature(x: f64, y: f64, value: f64) -> Feature {
        let mut f = Feature::new(Geometry::Point(Point::new(x, y)));
        f.set_property("precip", AttributeValue::Float(value));
        f
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("idw".parse::<Method>().unwrap(), Method::Idw);
        assert_eq!("Spline".parse::<Method>().unwrap(), Method::Spline);
        assert_eq!("nn".parse::<Method>().unwrap(), Method::NaturalNeighbor);
        assert_eq!(
            " natural-neighbor ".parse::<Method>().unwrap(),
            Method::NaturalNeighbor
        );
    }

    #[test]
    fn test_method_rejects_unknown() {
        let err = "kriging".parse::<Method>().unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "method", .. }));
    }

    #[test]
    fn test_sample_points_extraction() {
        let mut layer = FeatureCollection::new();
        layer.push(point_feature(1.0, 2.0, 500.0));
        layer.push(point_feature(3.0, 4.0, 620.0));

        let points = sample_points(&layer, "precip").unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].x, 3.0);
        assert_eq!(points[1].value, 620.0);
    }

    #[test]
    fn test_sample_points_multipoint() {
        let mut f = Feature::new(Geometry::MultiPoint(MultiPoint::from(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
        ])));
        f.set_property("precip", AttributeValue::Int(400));

        let mut layer = FeatureCollection::new();
        layer.push(f);

        let points = sample_points(&layer, "precip").unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].value, 400.0);
    }

    #[test]
    fn test_sample_points_rejects_polygons() {
        let ring = vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)];
        let mut f = Feature::new(Geometry::Polygon(Polygon::new(ring.into(), vec![])));
        f.set_property("precip", AttributeValue::Float(1.0));

        let mut layer = FeatureCollection::new();
        layer.push(f);

        assert!(sample_points(&layer, "precip").is_err());
    }

    #[test]
    fn test_sample_points_missing_field() {
        let mut layer = FeatureCollection::new();
        layer.push(point_feature(0.0, 0.0, 1.0));
        let err = sample_points(&layer, "absent").unwrap_err();
        assert!(matches!(err, Error::MissingField { .. }));
    }
}
