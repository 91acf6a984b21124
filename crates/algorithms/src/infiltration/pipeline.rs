//! End-to-end infiltration-time pipeline
//!
//! Orchestrates grid reconciliation, resampling, rasterization,
//! interpolation and formula evaluation over already-loaded inputs.
//! File I/O stays with the caller, so the whole pipeline runs and tests
//! in memory; derived rasters come back named for optional saving.

use vadose_core::raster::{GeoTransform, Raster};
use vadose_core::vector::FeatureCollection;
use vadose_core::{Error, Result};

use super::{
    infiltration_time, thickness, CoefficientField, Denominator, Formula, FormulaInputs,
};
use crate::interpolation::{
    idw, natural_neighbor, sample_points, spline, IdwParams, Method, NaturalNeighborParams,
    SamplePoint, SplineParams,
};
use crate::rasterize::rasterize_field;
use crate::resample::resample_nearest;

/// IDW distance exponent used for precipitation surfaces.
const IDW_POWER: f64 = 2.0;
/// Smoothing weight for the regularized spline.
const SPLINE_SMOOTHING: f64 = 0.1;
/// Nearest-point neighborhood when the caller does not give one.
const DEFAULT_MAX_POINTS: usize = 12;

/// The grid every derived raster is computed on.
///
/// Cell size is the larger of the two input rasters' cell sizes, so the
/// coarser input is never oversampled; the extent comes from the
/// elevation raster.
#[derive(Debug, Clone, Copy)]
pub struct WorkingGrid {
    pub rows: usize,
    pub cols: usize,
    pub transform: GeoTransform,
}

impl WorkingGrid {
    pub fn from_inputs(elevation: &Raster<f64>, water_table: &Raster<f64>) -> Result<Self> {
        if elevation.is_empty() || water_table.is_empty() {
            return Err(Error::InvalidDimensions {
                width: 0,
                height: 0,
            });
        }

        let cell = elevation.cell_size().max(water_table.cell_size());
        if !cell.is_finite() || cell <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "cell_size",
                value: cell.to_string(),
                reason: "input rasters must have a positive cell size".to_string(),
            });
        }

        let (min_x, min_y, max_x, max_y) = elevation.bounds();
        // The epsilon keeps float noise in extent/cell from adding a
        // sliver row or column
        let cols = (((max_x - min_x) / cell) - 1e-9).ceil().max(1.0) as usize;
        let rows = (((max_y - min_y) / cell) - 1e-9).ceil().max(1.0) as usize;

        Ok(Self {
            rows,
            cols,
            transform: GeoTransform::new(min_x, max_y, cell, -cell),
        })
    }

    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size()
    }
}

/// Attribute field names on the lithology layer, one per coefficient.
#[derive(Debug, Clone)]
pub struct LithologyFields {
    /// Moisture capacity (w)
    pub moisture_capacity: String,
    /// Effective infiltration coefficient (i)
    pub infiltration: String,
    /// Filtration coefficient (k)
    pub filtration: String,
    /// Effective porosity (n)
    pub effective_porosity: String,
}

impl LithologyFields {
    pub fn name_of(&self, field: CoefficientField) -> &str {
        match field {
            CoefficientField::MoistureCapacity => &self.moisture_capacity,
            CoefficientField::InfiltrationCoefficient => &self.infiltration,
            CoefficientField::FiltrationCoefficient => &self.filtration,
            CoefficientField::EffectivePorosity => &self.effective_porosity,
        }
    }
}

/// Everything one pipeline run needs, already loaded.
#[derive(Debug)]
pub struct PipelineInputs<'a> {
    pub formula: Formula,
    pub elevation: &'a Raster<f64>,
    pub water_table: &'a Raster<f64>,
    pub lithology: &'a FeatureCollection,
    pub fields: LithologyFields,
    pub precipitation: &'a FeatureCollection,
    pub precipitation_field: String,
    pub method: Method,
    /// Nearest-point neighborhood for IDW; methods without a
    /// neighborhood parameter ignore it.
    pub max_points: Option<usize>,
}

/// Result raster plus the derived rasters it was computed from.
#[derive(Debug)]
pub struct PipelineOutput {
    pub result: Raster<f64>,
    /// (name, raster) pairs in generation order, for `--save-intermediates`
    pub intermediates: Vec<(String, Raster<f64>)>,
    pub grid: WorkingGrid,
}

/// Run the full pipeline: validate, reconcile grids, derive rasters,
/// evaluate the formula.
///
/// Field validation happens before any raster work, so a typo in a
/// field name fails in milliseconds instead of after the interpolation.
pub fn run(inputs: PipelineInputs<'_>) -> Result<PipelineOutput> {
    // Preflight: layers non-empty, every needed field present and numeric
    if inputs.lithology.is_empty() {
        return Err(Error::EmptyLayer("lithology".to_string()));
    }
    if inputs.precipitation.is_empty() {
        return Err(Error::EmptyLayer("precipitation".to_string()));
    }
    for &field in inputs.formula.required_fields() {
        inputs
            .lithology
            .require_numeric_field(inputs.fields.name_of(field))?;
    }
    inputs
        .precipitation
        .require_numeric_field(&inputs.precipitation_field)?;

    let grid = WorkingGrid::from_inputs(inputs.elevation, inputs.water_table)?;

    // Align both surfaces onto the working grid, then thickness
    let elevation = resample_nearest(inputs.elevation, grid.rows, grid.cols, grid.transform)?;
    let water_table = resample_nearest(inputs.water_table, grid.rows, grid.cols, grid.transform)?;
    let thickness = thickness(&elevation, &water_table)?;

    // Coefficient rasters, only the fields the formula consumes
    let numerator_field = inputs.formula.numerator_field();
    let numerator = burn(&inputs, numerator_field, &grid)?;
    let infiltration = burn(&inputs, CoefficientField::InfiltrationCoefficient, &grid)?;
    let filtration = match inputs.formula.denominator() {
        Denominator::Linear => None,
        Denominator::CubeRoot => Some(burn(
            &inputs,
            CoefficientField::FiltrationCoefficient,
            &grid,
        )?),
    };

    // Precipitation surface
    let points = sample_points(inputs.precipitation, &inputs.precipitation_field)?;
    let precipitation = interpolate_surface(&points, &inputs, &grid)?;

    let result = infiltration_time(
        FormulaInputs {
            thickness: &thickness,
            numerator: &numerator,
            precipitation: &precipitation,
            infiltration: &infiltration,
            filtration: filtration.as_ref(),
        },
        inputs.formula,
    )?;

    let mut intermediates = vec![
        ("thickness".to_string(), thickness),
        (numerator_field.slug().to_string(), numerator),
        (
            CoefficientField::InfiltrationCoefficient.slug().to_string(),
            infiltration,
        ),
    ];
    if let Some(k) = filtration {
        intermediates.push((CoefficientField::FiltrationCoefficient.slug().to_string(), k));
    }
    intermediates.push(("precipitation".to_string(), precipitation));

    Ok(PipelineOutput {
        result,
        intermediates,
        grid,
    })
}

fn burn(
    inputs: &PipelineInputs<'_>,
    field: CoefficientField,
    grid: &WorkingGrid,
) -> Result<Raster<f64>> {
    rasterize_field(
        inputs.lithology,
        inputs.fields.name_of(field),
        grid.rows,
        grid.cols,
        grid.transform,
    )
}

fn interpolate_surface(
    points: &[SamplePoint],
    inputs: &PipelineInputs<'_>,
    grid: &WorkingGrid,
) -> Result<Raster<f64>> {
    match inputs.method {
        Method::Idw => idw(
            points,
            IdwParams {
                power: IDW_POWER,
                max_points: Some(inputs.max_points.unwrap_or(DEFAULT_MAX_POINTS)),
                rows: grid.rows,
                cols: grid.cols,
                transform: grid.transform,
                ..Default::default()
            },
        ),
        Method::Spline => spline(
            points,
            SplineParams {
                rows: grid.rows,
                cols: grid.cols,
                transform: grid.transform,
                smoothing: SPLINE_SMOOTHING,
            },
        ),
        Method::NaturalNeighbor => natural_neighbor(
            points,
            NaturalNeighborParams {
                rows: grid.rows,
                cols: grid.cols,
                transform: grid.transform,
                ..Default::default()
            },
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{Geometry, Point, Polygon};
    use vadose_core::vector::{AttributeValue, Feature};

    fn raster(rows: usize, cols: usize, value: f64, origin: (f64, f64), cell: f64) -> Raster<f64> {
        let mut r = Raster::filled(rows, cols, value);
        r.set_transform(GeoTransform::new(origin.0, origin.1, cell, -cell));
        r.set_nodata(Some(f64::NAN));
        r
    }

    #[test]
    fn test_working_grid_takes_coarser_cell() {
        let elevation = raster(8, 8, 100.0, (500.0, 700.0), 25.0);
        let water_table = raster(2, 2, 30.0, (500.0, 700.0), 100.0);

        let grid = WorkingGrid::from_inputs(&elevation, &water_table).unwrap();
        assert_eq!(grid.cell_size(), 100.0);

        // Argument order changes the anchor, never the cell size
        let swapped = WorkingGrid::from_inputs(&water_table, &elevation).unwrap();
        assert_eq!(swapped.cell_size(), 100.0);
    }

    #[test]
    fn test_working_grid_extent_from_elevation() {
        // 4x4 at 25m from (500, 700): extent 100m x 100m
        let elevation = raster(4, 4, 100.0, (500.0, 700.0), 25.0);
        let water_table = raster(2, 2, 30.0, (500.0, 700.0), 50.0);

        let grid = WorkingGrid::from_inputs(&elevation, &water_table).unwrap();
        assert_eq!((grid.rows, grid.cols), (2, 2));
        assert_eq!(grid.transform.origin_x, 500.0);
        assert_eq!(grid.transform.origin_y, 700.0);
        assert_eq!(grid.transform.pixel_width, 50.0);
        assert_eq!(grid.transform.pixel_height, -50.0);
    }

    #[test]
    fn test_working_grid_identity_when_equal() {
        let elevation = raster(4, 4, 100.0, (0.0, 4.0), 1.0);
        let water_table = raster(4, 4, 30.0, (0.0, 4.0), 1.0);

        let grid = WorkingGrid::from_inputs(&elevation, &water_table).unwrap();
        assert_eq!((grid.rows, grid.cols), (4, 4));
        assert_eq!(grid.transform, *elevation.transform());
    }

    fn covering_polygon() -> Polygon<f64> {
        Polygon::new(
            vec![
                (-10.0, -10.0),
                (110.0, -10.0),
                (110.0, 110.0),
                (-10.0, 110.0),
                (-10.0, -10.0),
            ]
            .into(),
            vec![],
        )
    }

    fn lithology_layer(with_filtration: bool) -> FeatureCollection {
        let mut f = Feature::new(Geometry::Polygon(covering_polygon()));
        f.set_property("w", AttributeValue::Float(0.2));
        f.set_property("i", AttributeValue::Float(0.05));
        f.set_property("n", AttributeValue::Float(0.35));
        if with_filtration {
            f.set_property("k", AttributeValue::Float(10.0));
        }
        let mut layer = FeatureCollection::new();
        layer.push(f);
        layer
    }

    fn precipitation_layer() -> FeatureCollection {
        let mut layer = FeatureCollection::new();
        for (x, y) in [(10.0, 10.0), (90.0, 10.0), (50.0, 90.0), (50.0, 50.0)] {
            let mut f = Feature::new(Geometry::Point(Point::new(x, y)));
            f.set_property("precip", AttributeValue::Float(500.0));
            layer.push(f);
        }
        layer
    }

    fn field_names() -> LithologyFields {
        LithologyFields {
            moisture_capacity: "w".to_string(),
            infiltration: "i".to_string(),
            filtration: "k".to_string(),
            effective_porosity: "n".to_string(),
        }
    }

    #[test]
    fn test_run_rejects_empty_lithology() {
        let elevation = raster(4, 4, 100.0, (0.0, 100.0), 25.0);
        let water_table = raster(4, 4, 30.0, (0.0, 100.0), 25.0);

        let result = run(PipelineInputs {
            formula: Formula::WitczakZurek,
            elevation: &elevation,
            water_table: &water_table,
            lithology: &FeatureCollection::new(),
            fields: field_names(),
            precipitation: &precipitation_layer(),
            precipitation_field: "precip".to_string(),
            method: Method::Idw,
            max_points: None,
        });
        assert!(matches!(result, Err(Error::EmptyLayer(_))));
    }

    #[test]
    fn test_run_rejects_missing_field_before_compute() {
        // Macioszczyk needs the filtration field, which this layer lacks
        let elevation = raster(4, 4, 100.0, (0.0, 100.0), 25.0);
        let water_table = raster(4, 4, 30.0, (0.0, 100.0), 25.0);
        let lithology = lithology_layer(false);

        let result = run(PipelineInputs {
            formula: Formula::Macioszczyk,
            elevation: &elevation,
            water_table: &water_table,
            lithology: &lithology,
            fields: field_names(),
            precipitation: &precipitation_layer(),
            precipitation_field: "precip".to_string(),
            method: Method::Idw,
            max_points: None,
        });
        assert!(matches!(result, Err(Error::MissingField { .. })));
    }

    #[test]
    fn test_run_skips_filtration_for_linear_formula() {
        // Witczak-Zurek never touches the filtration field, so its
        // absence is fine and no filtration intermediate is produced
        let elevation = raster(4, 4, 100.0, (0.0, 100.0), 25.0);
        let water_table = raster(4, 4, 30.0, (0.0, 100.0), 25.0);
        let lithology = lithology_layer(false);

        let output = run(PipelineInputs {
            formula: Formula::WitczakZurek,
            elevation: &elevation,
            water_table: &water_table,
            lithology: &lithology,
            fields: field_names(),
            precipitation: &precipitation_layer(),
            precipitation_field: "precip".to_string(),
            method: Method::Idw,
            max_points: None,
        })
        .unwrap();

        assert!(output
            .intermediates
            .iter()
            .all(|(name, _)| name != "filtration_coefficient"));
    }
}
