//! Vector feature model
//!
//! A `Feature` pairs a geo-types geometry with an attribute map, the way
//! attribute tables travel alongside shapes in vector layers. The pipeline
//! only ever reads numeric attributes, so typed access goes through
//! [`AttributeValue::as_f64`] and the collection-level field checks.

use geo_types::Geometry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    /// Numeric view of the value. Ints widen to f64; anything else is `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Int(v) => Some(*v as f64),
            AttributeValue::Float(v) => Some(*v),
            _ => None,
        }
    }
}

/// A geographic feature with geometry and attributes
#[derive(Debug, Clone)]
pub struct Feature {
    /// Feature geometry
    pub geometry: Option<Geometry<f64>>,
    /// Feature attributes
    pub properties: HashMap<String, AttributeValue>,
    /// Optional feature ID
    pub id: Option<String>,
}

impl Feature {
    /// Create a new feature with geometry
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry: Some(geometry),
            properties: HashMap::new(),
            id: None,
        }
    }

    /// Create a feature with no geometry
    pub fn empty() -> Self {
        Self {
            geometry: None,
            properties: HashMap::new(),
            id: None,
        }
    }

    /// Set an attribute
    pub fn set_property(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.properties.insert(key.into(), value);
    }

    /// Get an attribute
    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }

    /// Get an attribute as f64, if present and numeric
    pub fn numeric_property(&self, key: &str) -> Option<f64> {
        self.properties.get(key).and_then(AttributeValue::as_f64)
    }
}

/// Collection of features
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self { features: Vec::new() }
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// Check that `field` exists and is numeric on every feature.
    ///
    /// Errors name the first offending feature by index, so a bad attribute
    /// table is reported before any raster work starts.
    pub fn require_numeric_field(&self, field: &str) -> Result<()> {
        for (idx, feature) in self.features.iter().enumerate() {
            match feature.get_property(field) {
                None => {
                    return Err(Error::MissingField {
                        field: field.to_string(),
                        feature: idx,
                    })
                }
                Some(value) => {
                    if value.as_f64().is_none() {
                        return Err(Error::NonNumericField {
                            field: field.to_string(),
                            feature: idx,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::Point;

    fn feature_with(value: AttributeValue) -> Feature {
        let mut f = Feature::new(Geometry::Point(Point::new(0.0, 0.0)));
        f.set_property("depth", value);
        f
    }

    #[test]
    fn test_numeric_property() {
        let f = feature_with(AttributeValue::Int(7));
        assert_eq!(f.numeric_property("depth"), Some(7.0));
        assert_eq!(f.numeric_property("missing"), None);
    }

    #[test]
    fn test_require_numeric_field_ok() {
        let mut fc = FeatureCollection::new();
        fc.push(feature_with(AttributeValue::Float(1.5)));
        fc.push(feature_with(AttributeValue::Int(2)));
        assert!(fc.require_numeric_field("depth").is_ok());
    }

    #[test]
    fn test_require_numeric_field_missing() {
        let mut fc = FeatureCollection::new();
        fc.push(feature_with(AttributeValue::Float(1.5)));
        fc.push(Feature::empty());

        let err = fc.require_numeric_field("depth").unwrap_err();
        assert!(matches!(err, Error::MissingField { feature: 1, .. }));
    }

    #[test]
    fn test_require_numeric_field_text() {
        let mut fc = FeatureCollection::new();
        fc.push(feature_with(AttributeValue::String("n/a".into())));

        let err = fc.require_numeric_field("depth").unwrap_err();
        assert!(matches!(err, Error::NonNumericField { feature: 0, .. }));
    }
}
