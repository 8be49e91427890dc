//! Reloading exported data for inspection.
//!
//! [`load_geometries`] understands every layout the exporter produces, plus
//! a plain directory of `.gpkg`/`.shp` files:
//!
//! 1. a single `.shp` or `.gpkg` file;
//! 2. per-type Shapefiles, `<root>/<type>/<type>.shp`;
//! 3. per-type GeoPackages, `<root>/<type>.gpkg` (all layers of each);
//! 4. otherwise any top-level `.gpkg` files, then `.shp` files, by name.

use std::fs;
use std::path::{Path, PathBuf};

use gdal::vector::{FieldValue, Layer, LayerAccess};
use gdal::Dataset;
use tracing::{debug, info};

use crate::errors::{ExtractError, Result};
use crate::options::DEFAULT_GEOMETRY_TYPES;
use crate::utils::value_text;

pub mod plot;

pub use self::plot::plot_geometries;

/// Attribute holding the DXF paper-space flag.
pub const PAPER_SPACE_FIELD: &str = "PaperSpace";

/// One reloaded feature.
#[derive(Clone, Debug, PartialEq)]
pub struct PreviewFeature {
    pub geometry: Option<geo_types::Geometry<f64>>,
    /// Upper-case geometry type label, e.g. `MULTILINESTRING`.
    pub geometry_type: Option<String>,
    /// File stem or GeoPackage layer the feature came from.
    pub source: String,
    pub attributes: Vec<(String, Option<FieldValue>)>,
}

impl PreviewFeature {
    /// Case-insensitive attribute lookup; unset values are `None`.
    pub fn attribute(&self, name: &str) -> Option<&FieldValue> {
        self.attributes
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .and_then(|(_, v)| v.as_ref())
    }

    fn is_paper_space(&self) -> bool {
        self.attribute(PAPER_SPACE_FIELD)
            .cloned()
            .and_then(value_text)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .is_some_and(|v| v as i64 == 1)
    }
}

/// Features reloaded from one or more output datasets.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureCollection {
    pub rows: Vec<PreviewFeature>,
    /// WKT of the first spatial reference found; inputs are not reprojected.
    pub crs: Option<String>,
}

impl FeatureCollection {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Geometry type labels in order of first appearance.
    pub fn geometry_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = Vec::new();
        for label in self.rows.iter().filter_map(|r| r.geometry_type.as_deref()) {
            if !types.contains(&label) {
                types.push(label);
            }
        }
        types
    }

    /// Drops features drawn in paper space (`PaperSpace = 1`).
    pub fn modelspace_only(self) -> Self {
        FeatureCollection {
            rows: self
                .rows
                .into_iter()
                .filter(|r| !r.is_paper_space())
                .collect(),
            crs: self.crs,
        }
    }

    fn extend(&mut self, other: FeatureCollection) {
        self.rows.extend(other.rows);
        if self.crs.is_none() {
            self.crs = other.crs;
        }
    }
}

/// Loads every feature found at `input` into one collection.
///
/// `geometry_types` selects the per-type files probed in a directory and
/// defaults to the exporter's default list.
pub fn load_geometries(input: &Path, geometry_types: Option<&[String]>) -> Result<FeatureCollection> {
    let defaults: Vec<String>;
    let geometry_types = match geometry_types {
        Some(types) => types,
        None => {
            defaults = DEFAULT_GEOMETRY_TYPES.iter().map(|s| s.to_string()).collect();
            &defaults
        }
    };

    let mut parts = Vec::new();
    if input.is_file() {
        parts.push(load_file(input)?);
    } else if input.is_dir() {
        for gtype in geometry_types {
            let stem = gtype.to_lowercase();
            let shp = input.join(&stem).join(format!("{stem}.shp"));
            if shp.is_file() {
                parts.push(read_dataset(&shp, Some(gtype), false)?);
            }
        }
        for gtype in geometry_types {
            let gpkg = input.join(format!("{}.gpkg", gtype.to_lowercase()));
            if gpkg.is_file() {
                parts.push(read_dataset(&gpkg, None, true)?);
            }
        }
        if parts.is_empty() {
            debug!("No per-type outputs in {}, scanning top level", input.display());
            for path in top_level_files(input, "gpkg")? {
                parts.push(read_dataset(&path, None, true)?);
            }
            for path in top_level_files(input, "shp")? {
                parts.push(read_dataset(&path, None, false)?);
            }
        }
    } else {
        return Err(ExtractError::PreviewInputMissing(input.to_path_buf()));
    }

    if parts.is_empty() {
        return Err(ExtractError::NothingLoaded(input.to_path_buf()));
    }

    let mut collection = FeatureCollection::default();
    for part in parts {
        collection.extend(part);
    }
    info!("Loaded {} features from {}", collection.len(), input.display());
    Ok(collection)
}

fn load_file(path: &Path) -> Result<FeatureCollection> {
    match extension(path).as_deref() {
        Some("shp") => read_dataset(path, None, false),
        Some("gpkg") => read_dataset(path, None, true),
        _ => Err(ExtractError::UnsupportedPreviewFile(path.to_path_buf())),
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_lowercase())
}

fn top_level_files(root: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(root)? {
        let path = entry?.path();
        if path.is_file() && extension(&path).as_deref() == Some(ext) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Reads a dataset. GeoPackage rows are labelled by layer name, Shapefile
/// rows by file stem; `label` overrides the geometry type of every row.
fn read_dataset(path: &Path, label: Option<&str>, by_layer: bool) -> Result<FeatureCollection> {
    let dataset = Dataset::open(path)?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut collection = FeatureCollection::default();
    for mut layer in dataset.layers() {
        let source = if by_layer { layer.name() } else { stem.clone() };
        collection.extend(read_layer(&mut layer, &source, label)?);
    }
    Ok(collection)
}

fn read_layer(layer: &mut Layer, source: &str, label: Option<&str>) -> Result<FeatureCollection> {
    let crs = layer.spatial_ref().map(|srs| srs.to_wkt()).transpose()?;
    let names: Vec<String> = layer.defn().fields().map(|f| f.name()).collect();

    let mut rows = Vec::new();
    for feature in layer.features() {
        let geometry_type = match label {
            Some(label) => Some(label.to_uppercase()),
            None => feature.geometry().map(|g| g.geometry_name().to_uppercase()),
        };
        let geometry = feature.geometry().and_then(|g| match g.to_geo() {
            Ok(geometry) => Some(geometry),
            Err(e) => {
                debug!("Cannot convert geometry of feature {:?}: {e}", feature.fid());
                None
            }
        });
        let attributes = names
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), feature.field(idx).ok().flatten()))
            .collect();

        rows.push(PreviewFeature {
            geometry,
            geometry_type,
            source: source.to_string(),
            attributes,
        });
    }
    Ok(FeatureCollection { rows, crs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::point;

    fn row(paper_space: Option<FieldValue>) -> PreviewFeature {
        PreviewFeature {
            geometry: Some(point!(x: 1.0, y: 2.0).into()),
            geometry_type: Some("POINT".to_string()),
            source: "point".to_string(),
            attributes: vec![
                ("Layer".to_string(), Some(FieldValue::StringValue("a".into()))),
                ("PAPERSPACE".to_string(), paper_space),
            ],
        }
    }

    #[test]
    fn test_modelspace_only() {
        let collection = FeatureCollection {
            rows: vec![
                row(Some(FieldValue::IntegerValue(0))),
                row(Some(FieldValue::IntegerValue(1))),
                row(Some(FieldValue::RealValue(1.0))),
                row(Some(FieldValue::StringValue("1".into()))),
                row(None),
            ],
            crs: None,
        };
        let kept = collection.modelspace_only();
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_geometry_types_in_order() {
        let mut line = row(None);
        line.geometry_type = Some("LINESTRING".to_string());
        let collection = FeatureCollection {
            rows: vec![row(None), line, row(None)],
            crs: None,
        };
        assert_eq!(collection.geometry_types(), vec!["POINT", "LINESTRING"]);
    }

    #[test]
    fn test_attribute_lookup() {
        let r = row(Some(FieldValue::IntegerValue(0)));
        assert_eq!(r.attribute("layer"), Some(&FieldValue::StringValue("a".into())));
        assert!(r.attribute("Text").is_none());
    }

    #[test]
    fn test_missing_and_unsupported_input() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_geometries(&dir.path().join("absent"), None),
            Err(ExtractError::PreviewInputMissing(_))
        ));

        let csv = dir.path().join("points.csv");
        fs::write(&csv, "x,y\n").unwrap();
        assert!(matches!(
            load_geometries(&csv, None),
            Err(ExtractError::UnsupportedPreviewFile(_))
        ));

        let empty = dir.path().join("empty");
        fs::create_dir(&empty).unwrap();
        assert!(matches!(
            load_geometries(&empty, None),
            Err(ExtractError::NothingLoaded(_))
        ));
    }
}
