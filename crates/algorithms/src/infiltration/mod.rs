//! Infiltration-time formulas for the aeration zone
//!
//! Estimates how long water percolating from the surface needs to reach
//! the water table. Three formulas from the Polish hydrogeological
//! literature are supported, all cell-wise over aligned rasters:
//!
//! ```text
//! Witczak-Zurek:  t = (H * w) / (P * i)
//! Bindeman:       t = (H * n) / ((P * i)^2 * k)^(1/3)
//! Macioszczyk:    t = (H * w) / ((P * i)^2 * k)^(1/3)
//! ```
//!
//! where H is aeration-zone thickness [m], w moisture capacity, n
//! effective porosity, P annual precipitation [mm], i the effective
//! infiltration coefficient and k the filtration coefficient [m/d].
//! All three share one evaluator: a formula picks its numerator
//! coefficient field and its denominator shape from a table, so adding
//! a variant means adding a table row, not another arithmetic branch.

pub mod pipeline;

use ndarray::Array2;
use rayon::prelude::*;
use std::fmt;
use std::str::FromStr;
use vadose_core::raster::Raster;
use vadose_core::{Error, Result};

/// Lithology attribute fields a formula can draw on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoefficientField {
    /// Moisture capacity of the aeration zone (w)
    MoistureCapacity,
    /// Effective infiltration coefficient (i)
    InfiltrationCoefficient,
    /// Filtration (hydraulic conductivity) coefficient (k)
    FiltrationCoefficient,
    /// Effective porosity (n)
    EffectivePorosity,
}

impl CoefficientField {
    /// Stable name for this field, used to label intermediate rasters.
    pub fn slug(&self) -> &'static str {
        match self {
            CoefficientField::MoistureCapacity => "moisture_capacity",
            CoefficientField::InfiltrationCoefficient => "infiltration_coefficient",
            CoefficientField::FiltrationCoefficient => "filtration_coefficient",
            CoefficientField::EffectivePorosity => "effective_porosity",
        }
    }
}

/// Shape of the formula denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denominator {
    /// P * i
    Linear,
    /// ((P * i)^2 * k)^(1/3)
    CubeRoot,
}

/// Infiltration-time formula selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formula {
    WitczakZurek,
    Bindeman,
    Macioszczyk,
}

impl Formula {
    pub fn name(&self) -> &'static str {
        match self {
            Formula::WitczakZurek => "witczak-zurek",
            Formula::Bindeman => "bindeman",
            Formula::Macioszczyk => "macioszczyk",
        }
    }

    /// Coefficient field multiplied into the numerator alongside
    /// thickness.
    pub fn numerator_field(&self) -> CoefficientField {
        match self {
            Formula::WitczakZurek | Formula::Macioszczyk => CoefficientField::MoistureCapacity,
            Formula::Bindeman => CoefficientField::EffectivePorosity,
        }
    }

    pub fn denominator(&self) -> Denominator {
        match self {
            Formula::WitczakZurek => Denominator::Linear,
            Formula::Bindeman | Formula::Macioszczyk => Denominator::CubeRoot,
        }
    }

    /// All lithology fields this formula needs rasterized.
    pub fn required_fields(&self) -> &'static [CoefficientField] {
        match self {
            Formula::WitczakZurek => &[
                CoefficientField::MoistureCapacity,
                CoefficientField::InfiltrationCoefficient,
            ],
            Formula::Bindeman => &[
                CoefficientField::EffectivePorosity,
                CoefficientField::InfiltrationCoefficient,
                CoefficientField::FiltrationCoefficient,
            ],
            Formula::Macioszczyk => &[
                CoefficientField::MoistureCapacity,
                CoefficientField::InfiltrationCoefficient,
                CoefficientField::FiltrationCoefficient,
            ],
        }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Formula {
    type Err = Error;

    /// Strict parsing: unknown names are an error, never a default.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "witczak-zurek" | "witczak_zurek" | "witczakzurek" => Ok(Formula::WitczakZurek),
            "bindeman" => Ok(Formula::Bindeman),
            "macioszczyk" => Ok(Formula::Macioszczyk),
            other => Err(Error::InvalidParameter {
                name: "formula",
                value: other.to_string(),
                reason: "expected one of: witczak-zurek, bindeman, macioszczyk".to_string(),
            }),
        }
    }
}

/// Compute aeration-zone thickness: elevation minus water table, floored
/// at zero.
///
/// Negative differences come from data noise where the two surfaces
/// cross and are clamped rather than rejected. NaN in either input
/// propagates.
pub fn thickness(elevation: &Raster<f64>, water_table: &Raster<f64>) -> Result<Raster<f64>> {
    let rows = elevation.rows();
    let cols = elevation.cols();

    if water_table.rows() != rows || water_table.cols() != cols {
        return Err(Error::SizeMismatch {
            er: rows,
            ec: cols,
            ar: water_table.rows(),
            ac: water_table.cols(),
        });
    }

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];

            for col in 0..cols {
                let e = unsafe { elevation.get_unchecked(row, col) };
                let w = unsafe { water_table.get_unchecked(row, col) };
                // f64::max would turn NaN into 0 here
                let d = e - w;
                row_data[col] = if d < 0.0 { 0.0 } else { d };
            }

            row_data
        })
        .collect();

    let mut output = elevation.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), data)
        .map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}

/// Aligned input rasters for formula evaluation. All rasters must share
/// the working-grid dimensions.
#[derive(Debug, Clone, Copy)]
pub struct FormulaInputs<'a> {
    /// Aeration-zone thickness H
    pub thickness: &'a Raster<f64>,
    /// Numerator coefficient (moisture capacity or effective porosity,
    /// per [`Formula::numerator_field`])
    pub numerator: &'a Raster<f64>,
    /// Annual precipitation P
    pub precipitation: &'a Raster<f64>,
    /// Effective infiltration coefficient i
    pub infiltration: &'a Raster<f64>,
    /// Filtration coefficient k; required by cube-root formulas
    pub filtration: Option<&'a Raster<f64>>,
}

/// Evaluate an infiltration-time formula cell-wise.
///
/// NaN in any operand yields NaN. Zero denominators follow IEEE float
/// semantics (infinity, or NaN for 0/0) rather than being flagged.
///
/// # Errors
/// - [`Error::SizeMismatch`] if any raster disagrees with the thickness
///   grid dimensions
/// - [`Error::Algorithm`] if a cube-root formula is evaluated without a
///   filtration raster
pub fn infiltration_time(inputs: FormulaInputs<'_>, formula: Formula) -> Result<Raster<f64>> {
    let rows = inputs.thickness.rows();
    let cols = inputs.thickness.cols();

    for raster in [inputs.numerator, inputs.precipitation, inputs.infiltration]
        .into_iter()
        .chain(inputs.filtration)
    {
        if raster.rows() != rows || raster.cols() != cols {
            return Err(Error::SizeMismatch {
                er: rows,
                ec: cols,
                ar: raster.rows(),
                ac: raster.cols(),
            });
        }
    }

    // None here means a linear denominator
    let filtration = match formula.denominator() {
        Denominator::Linear => None,
        Denominator::CubeRoot => Some(inputs.filtration.ok_or_else(|| {
            Error::Algorithm(format!(
                "{} requires a filtration coefficient raster",
                formula.name()
            ))
        })?),
    };

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];

            for col in 0..cols {
                let h = unsafe { inputs.thickness.get_unchecked(row, col) };
                let n = unsafe { inputs.numerator.get_unchecked(row, col) };
                let p = unsafe { inputs.precipitation.get_unchecked(row, col) };
                let i = unsafe { inputs.infiltration.get_unchecked(row, col) };

                row_data[col] = match filtration {
                    None => (h * n) / (p * i),
                    Some(fr) => {
                        let k = unsafe { fr.get_unchecked(row, col) };
                        (h * n) / ((p * i).powi(2) * k).cbrt()
                    }
                };
            }

            row_data
        })
        .collect();

    let mut output = inputs.thickness.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), data)
        .map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}
