//! Native GeoTIFF reading and writing
//!
//! Uses the `tiff` crate. Reads any single-band integer or float pixel
//! format, casting into the requested cell type. Writes 32-bit float
//! pixels plus the ModelPixelScale/ModelTiepoint tags and a minimal
//! GeoKey directory so downstream GIS tools recognize the georeferencing.

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use std::fs::File;
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

// GeoTIFF tag ids
const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;

/// Read a GeoTIFF file into a Raster.
///
/// Values are cast into `T`; pixels that do not fit become the type's
/// default no-data value.
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    let mut decoder =
        Decoder::new(file).map_err(|e| Error::Geotiff(format!("decode error: {}", e)))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::Geotiff(format!("cannot read dimensions: {}", e)))?;

    let rows = height as usize;
    let cols = width as usize;

    let result = decoder
        .read_image()
        .map_err(|e| Error::Geotiff(format!("cannot read image data: {}", e)))?;

    macro_rules! cast_buf {
        ($buf:expr) => {
            $buf.iter()
                .map(|&v| num_traits::cast(v).unwrap_or(T::default_nodata()))
                .collect()
        };
    }

    let data: Vec<T> = match result {
        DecodingResult::U8(buf) => cast_buf!(buf),
        DecodingResult::U16(buf) => cast_buf!(buf),
        DecodingResult::U32(buf) => cast_buf!(buf),
        DecodingResult::U64(buf) => cast_buf!(buf),
        DecodingResult::I8(buf) => cast_buf!(buf),
        DecodingResult::I16(buf) => cast_buf!(buf),
        DecodingResult::I32(buf) => cast_buf!(buf),
        DecodingResult::I64(buf) => cast_buf!(buf),
        DecodingResult::F32(buf) => cast_buf!(buf),
        DecodingResult::F64(buf) => cast_buf!(buf),
        _ => {
            return Err(Error::UnsupportedDataType(
                "unsupported TIFF pixel format".to_string(),
            ))
        }
    };

    if data.len() != rows * cols {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let mut raster = Raster::from_vec(data, rows, cols)?;

    // Georeferencing tags are optional; a bare TIFF keeps the default transform
    if let Ok(transform) = read_geotransform(&mut decoder) {
        raster.set_transform(transform);
    }

    Ok(raster)
}

/// Attempt to read a GeoTransform from the ModelPixelScale + ModelTiepoint tags
fn read_geotransform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Result<GeoTransform> {
    // The decoder keys its IFD by the named Tag variants for known ids,
    // so a lookup via Tag::Unknown(33550) would never match.
    let scale = decoder
        .get_tag_f64_vec(Tag::ModelPixelScaleTag)
        .map_err(|_| Error::Geotiff("no pixel scale tag".into()))?;

    let tiepoint = decoder
        .get_tag_f64_vec(Tag::ModelTiepointTag)
        .map_err(|_| Error::Geotiff("no tiepoint tag".into()))?;

    if scale.len() >= 2 && tiepoint.len() >= 6 {
        // tiepoint: [I, J, K, X, Y, Z]; scale: [ScaleX, ScaleY, ScaleZ]
        let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
        let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
        let pixel_width = scale[0];
        let pixel_height = -scale[1]; // Negative for north-up

        return Ok(GeoTransform::new(origin_x, origin_y, pixel_width, pixel_height));
    }

    Err(Error::Geotiff("cannot determine geotransform".into()))
}

/// Write a Raster to a GeoTIFF file as 32-bit float.
///
/// An existing file at `path` is overwritten.
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    let mut encoder =
        TiffEncoder::new(file).map_err(|e| Error::Geotiff(format!("encoder error: {}", e)))?;

    let (rows, cols) = raster.shape();

    let data: Vec<f32> = raster
        .data()
        .iter()
        .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
        .collect();

    let mut image = encoder
        .new_image::<Gray32Float>(cols as u32, rows as u32)
        .map_err(|e| Error::Geotiff(format!("cannot create image: {}", e)))?;

    let gt = raster.transform();

    let scale = vec![gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_PIXEL_SCALE), scale.as_slice())
        .map_err(|e| Error::Geotiff(format!("cannot write scale tag: {}", e)))?;

    let tiepoint = vec![0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_TIEPOINT), tiepoint.as_slice())
        .map_err(|e| Error::Geotiff(format!("cannot write tiepoint tag: {}", e)))?;

    // Minimal GeoKey directory: GTModelTypeGeoKey = Projected,
    // GTRasterTypeGeoKey = RasterPixelIsArea
    let geokeys: Vec<u16> = vec![
        1, 1, 0, 2, // Version 1.1.0, 2 keys
        1024, 0, 1, 1,
        1025, 0, 1, 1,
    ];
    image
        .encoder()
        .write_tag(Tag::Unknown(GEO_KEY_DIRECTORY), geokeys.as_slice())
        .map_err(|e| Error::Geotiff(format!("cannot write geokey tag: {}", e)))?;

    image
        .write_data(&data)
        .map_err(|e| Error::Geotiff(format!("cannot write image data: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_raster() -> Raster<f64> {
        let mut raster = Raster::from_vec((0..12).map(f64::from).collect(), 3, 4).unwrap();
        raster.set_transform(GeoTransform::new(500.0, 700.0, 25.0, -25.0));
        raster.set_nodata(Some(f64::NAN));
        raster
    }

    #[test]
    fn test_geotiff_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.tif");

        let raster = sample_raster();
        write_geotiff(&raster, &path).unwrap();
        let back: Raster<f64> = read_geotiff(&path).unwrap();

        assert_eq!(back.shape(), (3, 4));
        assert_relative_eq!(back.get(0, 0).unwrap(), 0.0);
        assert_relative_eq!(back.get(2, 3).unwrap(), 11.0);

        let gt = back.transform();
        assert_relative_eq!(gt.origin_x, 500.0);
        assert_relative_eq!(gt.origin_y, 700.0);
        assert_relative_eq!(gt.pixel_width, 25.0);
        assert_relative_eq!(gt.pixel_height, -25.0);
    }

    #[test]
    fn test_write_overwrites_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.tif");

        write_geotiff(&sample_raster(), &path).unwrap();

        let mut second = Raster::filled(2, 2, 9.0_f64);
        second.set_transform(GeoTransform::new(0.0, 2.0, 1.0, -1.0));
        write_geotiff(&second, &path).unwrap();

        let back: Raster<f64> = read_geotiff(&path).unwrap();
        assert_eq!(back.shape(), (2, 2));
        assert_relative_eq!(back.get(1, 1).unwrap(), 9.0);
    }

    #[test]
    fn test_nan_survives_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.tif");

        let mut raster = sample_raster();
        raster.set(1, 1, f64::NAN).unwrap();
        write_geotiff(&raster, &path).unwrap();

        let back: Raster<f64> = read_geotiff(&path).unwrap();
        assert!(back.get(1, 1).unwrap().is_nan());
        assert_relative_eq!(back.get(1, 2).unwrap(), 6.0);
    }
}
