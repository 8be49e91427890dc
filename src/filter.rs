//! Per-feature filtering applied while streaming.
//!
//! [`FilterOptions`] is the plain, deserializable description of a filter;
//! [`FeatureFilter`] is its compiled form, built once per run:
//!
//! ```
//! use dxf2geo::filter::{FeatureFilter, FilterOptions};
//!
//! let options = FilterOptions {
//!     include_layers: vec!["roads".to_string()],
//!     min_length: Some(10.0),
//!     ..FilterOptions::default()
//! };
//! let filter = FeatureFilter::new(&options).unwrap();
//! assert!(filter.layer_allowed(Some("  Roads ")));
//! assert!(!filter.layer_allowed(Some("tmp")));
//! ```

use std::collections::{BTreeMap, BTreeSet, HashSet};

use gdal::vector::{Feature, Geometry};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{ExtractError, Result};
use crate::utils::{field_text, LAYER_FIELD};

/// Axis-aligned filter extent, `(min_x, min_y, max_x, max_y)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        BoundingBox {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Whether the envelope `(min_x, max_x, min_y, max_y)` touches this box.
    pub fn intersects(&self, min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> bool {
        !(max_x < self.min_x || min_x > self.max_x || max_y < self.min_y || min_y > self.max_y)
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from(v: [f64; 4]) -> Self {
        BoundingBox::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.min_x, b.min_y, b.max_x, b.max_y]
    }
}

/// Options for filtering DXF features prior to export.
///
/// Every criterion is optional. Empty layer lists mean "not configured".
/// Layer exclusion always takes precedence over inclusion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterOptions {
    pub include_layers: Vec<String>,
    pub exclude_layers: Vec<String>,
    /// Regular expressions matched against the trimmed layer name.
    pub include_layer_patterns: Vec<String>,
    pub exclude_layer_patterns: Vec<String>,
    pub min_area: Option<f64>,
    pub min_length: Option<f64>,
    pub drop_empty: bool,
    /// Drop zero-area polygons and zero-length lines, unless an explicit
    /// minimum is configured for that measure.
    pub drop_zero_geom: bool,
    pub bbox: Option<BoundingBox>,
    /// Exact-match exclusions, e.g. `{"SubClasses": {"AcDbEntity:AcDbText"}}`.
    pub exclude_field_values: BTreeMap<String, BTreeSet<String>>,
}

impl Default for FilterOptions {
    fn default() -> Self {
        FilterOptions {
            include_layers: Vec::new(),
            exclude_layers: Vec::new(),
            include_layer_patterns: Vec::new(),
            exclude_layer_patterns: Vec::new(),
            min_area: None,
            min_length: None,
            drop_empty: true,
            drop_zero_geom: true,
            bbox: None,
            exclude_field_values: BTreeMap::new(),
        }
    }
}

impl FilterOptions {
    /// Whether any criterion beyond the bounding box is set.
    ///
    /// Used by exporters that can only translate the extent.
    pub fn has_attribute_criteria(&self) -> bool {
        !self.include_layers.is_empty()
            || !self.exclude_layers.is_empty()
            || !self.include_layer_patterns.is_empty()
            || !self.exclude_layer_patterns.is_empty()
            || self.min_area.is_some()
            || self.min_length.is_some()
            || !self.exclude_field_values.is_empty()
    }
}

/// Compiled [`FilterOptions`].
#[derive(Debug)]
pub struct FeatureFilter {
    include: HashSet<String>,
    exclude: HashSet<String>,
    include_patterns: Vec<Regex>,
    exclude_patterns: Vec<Regex>,
    min_area: Option<f64>,
    min_length: Option<f64>,
    drop_empty: bool,
    drop_zero_geom: bool,
    bbox: Option<BoundingBox>,
    exclude_field_values: BTreeMap<String, BTreeSet<String>>,
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|source| ExtractError::InvalidPattern {
                pattern: p.clone(),
                source,
            })
        })
        .collect()
}

fn lowered(names: &[String]) -> HashSet<String> {
    names.iter().map(|n| n.trim().to_lowercase()).collect()
}

impl FeatureFilter {
    pub fn new(options: &FilterOptions) -> Result<Self> {
        Ok(FeatureFilter {
            include: lowered(&options.include_layers),
            exclude: lowered(&options.exclude_layers),
            include_patterns: compile_patterns(&options.include_layer_patterns)?,
            exclude_patterns: compile_patterns(&options.exclude_layer_patterns)?,
            min_area: options.min_area,
            min_length: options.min_length,
            drop_empty: options.drop_empty,
            drop_zero_geom: options.drop_zero_geom,
            bbox: options.bbox,
            exclude_field_values: options.exclude_field_values.clone(),
        })
    }

    /// Runs the layer, field-value and geometry checks, in that order.
    pub fn allows(&self, feature: &Feature) -> bool {
        let layer = field_text(feature, LAYER_FIELD);
        self.layer_allowed(layer.as_deref())
            && self.fields_allowed(|name| field_text(feature, name))
            && self.geometry_allowed(feature.geometry())
    }

    /// Layer inclusion/exclusion. A missing layer name is treated as `""`.
    pub fn layer_allowed(&self, layer: Option<&str>) -> bool {
        let raw = layer.unwrap_or_default().trim();
        let name = raw.to_lowercase();

        let has_include = !self.include.is_empty() || !self.include_patterns.is_empty();
        if has_include
            && !self.include.contains(&name)
            && !self.include_patterns.iter().any(|re| re.is_match(raw))
        {
            return false;
        }

        !(self.exclude.contains(&name) || self.exclude_patterns.iter().any(|re| re.is_match(raw)))
    }

    /// Field-value exclusion. `lookup` returns `None` for a missing or
    /// unreadable attribute, which never rejects.
    pub fn fields_allowed<F>(&self, lookup: F) -> bool
    where
        F: Fn(&str) -> Option<String>,
    {
        self.exclude_field_values.iter().all(|(field, disallowed)| {
            lookup(field).map_or(true, |value| !disallowed.contains(&value))
        })
    }

    /// Emptiness, measure thresholds and bounding-box checks.
    ///
    /// Thresholds are inclusive: a measure equal to the minimum is kept.
    pub fn geometry_allowed(&self, geometry: Option<&Geometry>) -> bool {
        let Some(geometry) = geometry else {
            return !self.drop_empty;
        };
        if self.drop_empty && geometry.is_empty() {
            return false;
        }

        let name = geometry.geometry_name().to_uppercase();

        if name.contains("POLYGON") && !self.measure_allowed(geometry.area(), self.min_area) {
            return false;
        }
        if name.contains("LINE") && !self.measure_allowed(geometry.length(), self.min_length) {
            return false;
        }

        if let Some(bbox) = &self.bbox {
            let env = geometry.envelope();
            if !bbox.intersects(env.MinX, env.MaxX, env.MinY, env.MaxY) {
                return false;
            }
        }
        true
    }

    fn measure_allowed(&self, measure: f64, minimum: Option<f64>) -> bool {
        match minimum {
            Some(min) => measure >= min,
            None => !(self.drop_zero_geom && measure == 0.0),
        }
    }
}
