#![allow(dead_code)]

use std::path::{Path, PathBuf};

use gdal::vector::LayerAccess;
use gdal::Dataset;

pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures").join(name)
}

/// Number of features in the first layer of `path`.
pub fn feature_count(path: &Path) -> u64 {
    let ds = Dataset::open(path).unwrap();
    let layer = ds.layer(0).unwrap();
    layer.feature_count()
}

/// Values of a string attribute in the first layer of `path`.
pub fn string_values(path: &Path, field: &str) -> Vec<String> {
    let ds = Dataset::open(path).unwrap();
    let mut layer = ds.layer(0).unwrap();
    let mut values: Vec<String> = layer
        .features()
        .filter_map(|f| dxf2geo::utils::field_text(&f, field))
        .collect();
    values.sort();
    values
}

/// `(min_x, max_x, min_y, max_y)` enclosing every geometry of the first layer.
pub fn combined_envelope(path: &Path) -> (f64, f64, f64, f64) {
    let ds = Dataset::open(path).unwrap();
    let mut layer = ds.layer(0).unwrap();
    let mut env = (f64::MAX, f64::MIN, f64::MAX, f64::MIN);
    for feature in layer.features() {
        let e = feature.geometry().unwrap().envelope();
        env.0 = env.0.min(e.MinX);
        env.1 = env.1.max(e.MaxX);
        env.2 = env.2.min(e.MinY);
        env.3 = env.3.max(e.MaxY);
    }
    env
}
