//! Nearest-neighbor raster resampling
//!
//! Aligns a source raster onto a target grid by sampling the source cell
//! under each target cell center. Nearest-neighbor keeps categorical
//! lithology values intact and introduces no new values into continuous
//! inputs, which is what the thickness arithmetic wants.

use rayon::prelude::*;
use vadose_core::raster::{GeoTransform, Raster};
use vadose_core::{Error, Result};

/// Resample a raster onto a target grid with nearest-neighbor sampling.
///
/// Each target cell center is projected into the source grid and takes
/// the value of the source cell it lands in. Target cells outside the
/// source extent become NaN, and source nodata passes through unchanged.
pub fn resample_nearest(
    source: &Raster<f64>,
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

    let src_rows = source.rows() as f64;
    let src_cols = source.cols() as f64;

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];

            for col in 0..cols {
                let (x, y) = transform.pixel_to_geo(col, row);
                let (src_col, src_row) = source.geo_to_pixel(x, y);

                // NaN here means a degenerate source transform; casting
                // NaN would silently index cell (0, 0)
                if !src_col.is_finite() || !src_row.is_finite() {
                    continue;
                }

                let sc = src_col.floor();
                let sr = src_row.floor();
                if sc < 0.0 || sr < 0.0 || sc >= src_cols || sr >= src_rows {
                    continue;
                }

                row_data[col] = unsafe { source.get_unchecked(sr as usize, sc as usize) };
            }

            row_data
        })
        .collect();

    let mut output = Raster::from_vec(data, rows, cols)?;
    output.set_transform(transform);
    output.set_nodata(Some(f64::NAN));

    Ok(output)
}
