//! Polygon-to-raster attribute burning
//!
//! Converts a polygon layer into a grid by assigning each cell the
//! attribute value of the polygon containing its center. Cells whose
//! center falls outside every polygon become nodata. Where polygons
//! overlap, the feature that appears last in the layer wins, so layer
//! order is significant for overlapping lithology sheets.

use geo::{BoundingRect, Contains};
use geo_types::{Geometry, Point};
use rayon::prelude::*;
use vadose_core::raster::{GeoTransform, Raster};
use vadose_core::vector::FeatureCollection;
use vadose_core::{Error, Result};

use crate::geometry_name;

/// One polygon feature prepared for burning.
struct Burn<'a> {
    geometry: &'a Geometry<f64>,
    /// (min_x, min_y, max_x, max_y) of the geometry
    bbox: (f64, f64, f64, f64),
    value: f64,
}

/// Burn a numeric attribute of a polygon layer onto a raster grid.
///
/// Each output cell takes the `field` value of the polygon whose
/// interior contains the cell center; later features shadow earlier
/// ones where they overlap. Cells covered by no polygon are NaN.
///
/// # Errors
/// - [`Error::MissingField`] / [`Error::NonNumericField`] if a feature
///   lacks a usable `field` value
/// - [`Error::InvalidParameter`] if the layer contains non-polygon
///   geometries
/// - [`Error::Algorithm`] if the layer is empty
pub fn rasterize_field(
    layer: &FeatureCollection,
    field: &str,
    rows: usize,
    cols: usize,
    transform: GeoTransform,
) -> Result<Raster<f64>> {
    if rows == 0 || cols == 0 {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }
    if layer.is_empty() {
        return Err(Error::Algorithm("No polygon features to rasterize".into()));
    }

    let mut burns: Vec<Burn> = Vec::with_capacity(layer.len());

    for (idx, feature) in layer.iter().enumerate() {
        let value = match feature.get_property(field) {
            None => {
                return Err(Error::MissingField {
                    field: field.to_string(),
                    feature: idx,
                })
            }
            Some(v) => v.as_f64().ok_or_else(|| Error::NonNumericField {
                field: field.to_string(),
                feature: idx,
            })?,
        };

        let geometry = match &feature.geometry {
            Some(g @ Geometry::Polygon(_)) | Some(g @ Geometry::MultiPolygon(_)) => g,
            Some(other) => {
                return Err(Error::InvalidParameter {
                    name: "polygons",
                    value: geometry_name(other).to_string(),
                    reason: "only Polygon and MultiPolygon geometries can be rasterized"
                        .to_string(),
                })
            }
            None => {
                return Err(Error::InvalidParameter {
                    name: "polygons",
                    value: format!("feature {idx}"),
                    reason: "feature has no geometry".to_string(),
                })
            }
        };

        // Degenerate geometries burn nothing
        let rect = match geometry.bounding_rect() {
            Some(r) => r,
            None => continue,
        };

        burns.push(Burn {
            geometry,
            bbox: (rect.min().x, rect.min().y, rect.max().x, rect.max().y),
            value,
        });
    }

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];

            for col in 0..cols {
                let (x, y) = transform.pixel_to_geo(col, row);

                // Last feature wins, so scan back to front and stop at
                // the first hit
                for burn in burns.iter().rev() {
                    let (min_x, min_y, max_x, max_y) = burn.bbox;
                    if x < min_x || x > max_x || y < min_y || y > max_y {
                        continue;
                    }
                    if burn.geometry.contains(&Point::new(x, y)) {
                        row_data[col] = burn.value;
                        break;
                    }
                }
            }

            row_data
        })
        .collect();

    let mut output = Raster::from_vec(data, rows, cols)?;
    output.set_transform(transform);
    output.set_nodata(Some(f64::NAN));

    Ok(output)
}
