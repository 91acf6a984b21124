//! GeoJSON vector layer reading

use crate::error::{Error, Result};
use crate::vector::{AttributeValue, Feature, FeatureCollection};
use geojson::feature::Id;
use geojson::GeoJson;
use std::path::Path;

/// Read a GeoJSON file into a FeatureCollection.
///
/// Accepts a top-level FeatureCollection, a single Feature, or a bare
/// Geometry (wrapped as one attribute-less feature).
pub fn read_geojson<P: AsRef<Path>>(path: P) -> Result<FeatureCollection> {
    let text = std::fs::read_to_string(path.as_ref())?;
    parse_geojson(&text)
}

/// Parse GeoJSON text into a FeatureCollection
pub fn parse_geojson(text: &str) -> Result<FeatureCollection> {
    let gj = text
        .parse::<GeoJson>()
        .map_err(|e| Error::GeoJson(e.to_string()))?;

    let mut collection = FeatureCollection::new();
    match gj {
        GeoJson::FeatureCollection(fc) => {
            for f in fc.features {
                collection.push(convert_feature(f)?);
            }
        }
        GeoJson::Feature(f) => collection.push(convert_feature(f)?),
        GeoJson::Geometry(g) => {
            let geometry = geo_types::Geometry::<f64>::try_from(g)
                .map_err(|e| Error::GeoJson(format!("unsupported geometry: {}", e)))?;
            collection.push(Feature::new(geometry));
        }
    }

    Ok(collection)
}

fn convert_feature(f: geojson::Feature) -> Result<Feature> {
    let mut feature = match f.geometry {
        Some(g) => {
            let geometry = geo_types::Geometry::<f64>::try_from(g)
                .map_err(|e| Error::GeoJson(format!("unsupported geometry: {}", e)))?;
            Feature::new(geometry)
        }
        None => Feature::empty(),
    };

    if let Some(props) = f.properties {
        for (key, value) in props {
            feature.set_property(key, attribute_from_json(&value));
        }
    }

    feature.id = f.id.map(|id| match id {
        Id::String(s) => s,
        Id::Number(n) => n.to_string(),
    });

    Ok(feature)
}

fn attribute_from_json(value: &serde_json::Value) -> AttributeValue {
    match value {
        serde_json::Value::Null => AttributeValue::Null,
        serde_json::Value::Bool(b) => AttributeValue::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                AttributeValue::Int(i)
            } else {
                AttributeValue::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => AttributeValue::String(s.clone()),
        // Arrays and nested objects are kept as raw JSON text
        other => AttributeValue::String(other.to_string()),
    }
}
