//! Regularized thin plate spline interpolation
//!
//! Constructs a smooth surface through the sample points by minimizing
//! bending energy. The interpolant has the form:
//! ```text
//! f(x,y) = a1 + a2*x + a3*y + sum_i w_i * U(||(x,y) - (x_i,y_i)||)
//! ```
//! where U(r) = r^2 * ln(r) is the thin plate radial basis in 2D. A
//! positive smoothing weight on the kernel diagonal relaxes the exact-fit
//! constraint, which keeps noisy precipitation gauges from printing
//! bullseyes into the surface.
//!
//! Solving the (n+3)x(n+3) system is practical up to a few thousand
//! points; gauge networks are far below that.
//!
//! Reference:
//! Duchon, J. (1976). Interpolation des fonctions de deux variables suivant
//! le principe de la flexion des plaques minces. RAIRO Analyse Numérique.
//! Wahba, G. (1990). Spline Models for Observational Data. SIAM.

use ndarray::Array2;
use rayon::prelude::*;
use vadose_core::raster::{GeoTransform, Raster};
use vadose_core::{Error, Result};

use super::SamplePoint;

/// Parameters for spline interpolation
#[derive(Debug, Clone)]
pub struct SplineParams {
    /// Output raster rows
    pub rows: usize,
    /// Output raster columns
    pub cols: usize,
    /// Output raster geotransform
    pub transform: GeoTransform,
    /// Smoothing weight (>= 0) on the kernel diagonal. 0 means exact
    /// interpolation; the pipeline default of 0.1 gives the regularized
    /// spline.
    pub smoothing: f64,
}

impl Default for SplineParams {
    fn default() -> Self {
        Self {
            rows: 100,
            cols: 100,
            transform: GeoTransform::default(),
            smoothing: 0.1,
        }
    }
}

/// Thin plate radial basis: U(r) = r^2 * ln(r), with U(0) = 0
#[inline]
fn spline_kernel(r: f64) -> f64 {
    if r < 1e-15 {
        0.0
    } else {
        r * r * r.ln()
    }
}

/// Perform regularized thin plate spline interpolation onto a raster grid.
///
/// # Errors
/// - If fewer than 3 points are provided
/// - If the linear system is singular (collinear or duplicate points)
pub fn spline(points: &[SamplePoint], params: SplineParams) -> Result<Raster<f64>> {
    let n = points.len();
    if n < 3 {
        return Err(Error::Algorithm(
            "Spline requires at least 3 non-collinear points".into(),
        ));
    }

    // Build the (n+3) x (n+3) system:
    // [K + lambda*I  P] [w]   [z]
    // [P^T           0] [a] = [0]
    let m = n + 3;
    let mut mat = vec![0.0_f64; m * m];
    let mut rhs = vec![0.0_f64; m];

    for i in 0..n {
        for j in 0..n {
            if i == j {
                mat[i * m + j] = params.smoothing;
            } else {
                let dx = points[i].x - points[j].x;
                let dy = points[i].y - points[j].y;
                let r = (dx * dx + dy * dy).sqrt();
                mat[i * m + j] = spline_kernel(r);
            }
        }
    }

    for i in 0..n {
        // P: rows i, columns n..n+3
        mat[i * m + n] = 1.0;
        mat[i * m + n + 1] = points[i].x;
        mat[i * m + n + 2] = points[i].y;
        // P^T: rows n..n+3, column i
        mat[n * m + i] = 1.0;
        mat[(n + 1) * m + i] = points[i].x;
        mat[(n + 2) * m + i] = points[i].y;
    }

    // RHS: [z1, ..., zn, 0, 0, 0]
    for i in 0..n {
        rhs[i] = points[i].value;
    }

    let coeffs = gauss_solve(m, &mut mat, &mut rhs)?;

    let weights = &coeffs[..n];
    let a1 = coeffs[n];
    let a2 = coeffs[n + 1];
    let a3 = coeffs[n + 2];

    let rows = params.rows;
    let cols = params.cols;
    let transform = params.transform;

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];

            for col in 0..cols {
                let (x, y) = transform.pixel_to_geo(col, row);

                let mut val = a1 + a2 * x + a3 * y;

                for (i, pt) in points.iter().enumerate() {
                    let dx = x - pt.x;
                    let dy = y - pt.y;
                    let r = (dx * dx + dy * dy).sqrt();
                    val += weights[i] * spline_kernel(r);
                }

                row_data[col] = val;
            }

            row_data
        })
        .collect();

    let mut output = Raster::new(rows, cols);
    output.set_transform(transform);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), output_data)
        .map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}

/// Solve Ax = b using Gaussian elimination with partial pivoting.
///
/// Modifies `mat` and `rhs` in place. Returns solution vector.
fn gauss_solve(n: usize, mat: &mut [f64], rhs: &mut [f64]) -> Result<Vec<f64>> {
    // Forward elimination
    for col in 0..n {
        // Find pivot (max absolute value in column)
        let mut max_val = mat[col * n + col].abs();
        let mut max_row = col;
        for row in (col + 1)..n {
            let val = mat[row * n + col].abs();
            if val > max_val {
                max_val = val;
                max_row = row;
            }
        }

        if max_val < 1e-14 {
            return Err(Error::Algorithm(
                "Spline: singular matrix (points may be collinear or duplicate)".into(),
            ));
        }

        if max_row != col {
            for j in 0..n {
                let a = col * n + j;
                let b = max_row * n + j;
                mat.swap(a, b);
            }
            rhs.swap(col, max_row);
        }

        let pivot = mat[col * n + col];
        for row in (col + 1)..n {
            let factor = mat[row * n + col] / pivot;
            mat[row * n + col] = 0.0;
            for j in (col + 1)..n {
                mat[row * n + j] -= factor * mat[col * n + j];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    // Back substitution
    let mut x = vec![0.0_f64; n];
    for col in (0..n).rev() {
        let mut sum = rhs[col];
        for j in (col + 1)..n {
            sum -= mat[col * n + j] * x[j];
        }
        x[col] = sum / mat[col * n + col];
    }

    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_params(rows: usize, cols: usize, extent: (f64, f64, f64, f64), smoothing: f64) -> SplineParams {
        let (x_min, y_min, x_max, y_max) = extent;
        let x_res = (x_max - x_min) / cols as f64;
        let y_res = -(y_max - y_min) / rows as f64;
        SplineParams {
            rows,
            cols,
            transform: GeoTransform::new(x_min, y_max, x_res, y_res),
            smoothing,
        }
    }

    #[test]
    fn test_spline_exact_interpolation() {
        // With zero smoothing the surface passes through the samples
        let points = vec![
            SamplePoint::new(0.0, 0.0, 10.0),
            SamplePoint::new(10.0, 0.0, 20.0),
            SamplePoint::new(0.0, 10.0, 30.0),
            SamplePoint::new(10.0, 10.0, 40.0),
            SamplePoint::new(5.0, 5.0, 25.0),
        ];

        let params = make_params(11, 11, (0.0, 0.0, 10.0, 10.0), 0.0);
        let result = spline(&points, params).unwrap();

        let center = result.get(5, 5).unwrap();
        assert!(
            (center - 25.0).abs() < 2.0,
            "Center should be ~25.0, got {:.2}",
            center
        );
    }

    #[test]
    fn test_spline_linear_surface() {
        // A perfectly linear surface f(x,y) = 2x + 3y + 1 is reproduced
        // by the polynomial part alone
        let points: Vec<SamplePoint> = vec![
            SamplePoint::new(0.0, 0.0, 1.0),
            SamplePoint::new(10.0, 0.0, 21.0),
            SamplePoint::new(0.0, 10.0, 31.0),
            SamplePoint::new(10.0, 10.0, 51.0),
            SamplePoint::new(5.0, 5.0, 26.0),
            SamplePoint::new(3.0, 7.0, 28.0),
        ];

        let params = make_params(11, 11, (0.0, 0.0, 10.0, 10.0), 0.0);
        let result = spline(&points, params).unwrap();

        for row in 2..9 {
            for col in 2..9 {
                let x = col as f64 * (10.0 / 11.0) + 0.5 * (10.0 / 11.0);
                let y = 10.0 - (row as f64 * (10.0 / 11.0) + 0.5 * (10.0 / 11.0));
                let expected = 2.0 * x + 3.0 * y + 1.0;
                let actual = result.get(row, col).unwrap();
                assert!(
                    (actual - expected).abs() < 1.0,
                    "Linear surface at ({},{}) [{:.1},{:.1}]: expected {:.2}, got {:.2}",
                    row, col, x, y, expected, actual
                );
            }
        }
    }

    #[test]
    fn test_spline_smoothing_flattens_spike() {
        let points = vec![
            SamplePoint::new(0.0, 0.0, 10.0),
            SamplePoint::new(10.0, 0.0, 10.0),
            SamplePoint::new(5.0, 5.0, 100.0), // spike
            SamplePoint::new(0.0, 10.0, 10.0),
            SamplePoint::new(10.0, 10.0, 10.0),
        ];

        let exact = spline(&points, make_params(11, 11, (0.0, 0.0, 10.0, 10.0), 0.0)).unwrap();
        let smooth = spline(&points, make_params(11, 11, (0.0, 0.0, 10.0, 10.0), 100.0)).unwrap();

        let exact_center = exact.get(5, 5).unwrap();
        let smooth_center = smooth.get(5, 5).unwrap();

        assert!(
            smooth_center < exact_center,
            "Smoothing should reduce spike: exact={:.1}, smooth={:.1}",
            exact_center, smooth_center
        );
    }

    #[test]
    fn test_spline_uniform_values() {
        // Constant data lies in the polynomial span, so the regularized
        // spline reproduces it regardless of smoothing
        let points = vec![
            SamplePoint::new(1.0, 1.0, 500.0),
            SamplePoint::new(9.0, 1.0, 500.0),
            SamplePoint::new(5.0, 9.0, 500.0),
            SamplePoint::new(3.0, 4.0, 500.0),
        ];

        let result = spline(&points, make_params(10, 10, (0.0, 0.0, 10.0, 10.0), 0.1)).unwrap();
        for row in 0..10 {
            for col in 0..10 {
                let val = result.get(row, col).unwrap();
                assert!(
                    (val - 500.0).abs() < 1e-6,
                    "Uniform field should stay uniform, got {} at ({}, {})",
                    val, row, col
                );
            }
        }
    }

    #[test]
    fn test_spline_too_few_points() {
        let points = vec![
            SamplePoint::new(0.0, 0.0, 10.0),
            SamplePoint::new(1.0, 0.0, 20.0),
        ];
        let params = make_params(5, 5, (0.0, 0.0, 1.0, 1.0), 0.0);
        assert!(spline(&points, params).is_err());
    }

    #[test]
    fn test_spline_kernel_function() {
        assert!((spline_kernel(0.0)).abs() < 1e-10, "U(0) should be 0");
        assert!((spline_kernel(1.0)).abs() < 1e-10, "U(1) = 1*ln(1) = 0");

        let u2 = spline_kernel(2.0);
        let expected = 4.0 * 2.0_f64.ln();
        assert!(
            (u2 - expected).abs() < 1e-10,
            "U(2) = 4*ln(2) ~ {:.4}, got {:.4}",
            expected, u2
        );
    }

    #[test]
    fn test_spline_symmetry() {
        // Symmetric input should produce symmetric output
        let points = vec![
            SamplePoint::new(0.0, 0.0, 10.0),
            SamplePoint::new(10.0, 0.0, 10.0),
            SamplePoint::new(0.0, 10.0, 10.0),
            SamplePoint::new(10.0, 10.0, 10.0),
            SamplePoint::new(5.0, 5.0, 50.0),
        ];

        let params = make_params(11, 11, (0.0, 0.0, 10.0, 10.0), 0.0);
        let result = spline(&points, params).unwrap();

        let v22 = result.get(2, 2).unwrap();
        let v28 = result.get(2, 8).unwrap();
        let v82 = result.get(8, 2).unwrap();
        let v88 = result.get(8, 8).unwrap();

        assert!(
            (v22 - v28).abs() < 0.5 && (v22 - v82).abs() < 0.5 && (v22 - v88).abs() < 0.5,
            "Symmetric input should give symmetric output: {:.1}, {:.1}, {:.1}, {:.1}",
            v22, v28, v82, v88
        );
    }
}
