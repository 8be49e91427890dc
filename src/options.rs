use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use gdal::vector::OGRwkbGeometryType;
use tracing::level_filters::LevelFilter;

use crate::errors::{ExtractError, Result};
use crate::filter::{FeatureFilter, FilterOptions};
use crate::schema::FieldNaming;

/// Geometry types exported when the caller does not name any.
pub const DEFAULT_GEOMETRY_TYPES: [&str; 5] = [
    "POINT",
    "LINESTRING",
    "POLYGON",
    "MULTILINESTRING",
    "MULTIPOLYGON",
];

/// GDAL warnings that are demoted to debug messages by default.
pub const DEFAULT_SUPPRESSED_WARNINGS: [&str; 2] = ["Block ", "DXF: Skipping"];

/// OGR layer type hint for a geometry type name; unknown names map to `wkbUnknown`.
pub fn geometry_type_hint(name: &str) -> OGRwkbGeometryType::Type {
    match name.to_uppercase().as_str() {
        "POINT" => OGRwkbGeometryType::wkbPoint,
        "MULTIPOINT" => OGRwkbGeometryType::wkbMultiPoint,
        "LINESTRING" => OGRwkbGeometryType::wkbLineString,
        "MULTILINESTRING" => OGRwkbGeometryType::wkbMultiLineString,
        "POLYGON" => OGRwkbGeometryType::wkbPolygon,
        "MULTIPOLYGON" => OGRwkbGeometryType::wkbMultiPolygon,
        _ => OGRwkbGeometryType::wkbUnknown,
    }
}

/// Supported output formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// One geometry type per file, dBase attribute names.
    Shapefile,
    /// Single-file container; tolerates mixed geometry types in one layer.
    GeoPackage,
}

impl OutputFormat {
    /// GDAL driver short name.
    pub fn driver_name(&self) -> &'static str {
        match self {
            OutputFormat::Shapefile => "ESRI Shapefile",
            OutputFormat::GeoPackage => "GPKG",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Shapefile => "shp",
            OutputFormat::GeoPackage => "gpkg",
        }
    }

    pub fn field_naming(&self) -> FieldNaming {
        match self {
            OutputFormat::Shapefile => FieldNaming::Shapefile,
            OutputFormat::GeoPackage => FieldNaming::Preserve,
        }
    }

    pub fn supports_mixed_geometries(&self) -> bool {
        matches!(self, OutputFormat::GeoPackage)
    }
}

impl FromStr for OutputFormat {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "ESRI SHAPEFILE" => Ok(OutputFormat::Shapefile),
            "GPKG" => Ok(OutputFormat::GeoPackage),
            _ => Err(ExtractError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.driver_name())
    }
}

/// How output units are produced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Strategy {
    /// In-process copy through the GDAL bindings.
    #[default]
    Library,
    /// One `ogr2ogr` invocation per output unit.
    Ogr2Ogr { program: PathBuf },
}

impl FromStr for Strategy {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "library" => Ok(Strategy::Library),
            "ogr2ogr" => Ok(Strategy::Ogr2Ogr {
                program: PathBuf::from("ogr2ogr"),
            }),
            _ => Err(ExtractError::UnsupportedStrategy(s.to_string())),
        }
    }
}

/// Configuration for a single DXF-to-GIS extraction.
///
/// ```
/// use dxf2geo::options::{ExtractOptions, OutputFormat};
///
/// let options = ExtractOptions {
///     flatten: true,
///     format: OutputFormat::GeoPackage,
///     ..ExtractOptions::new("drawing.dxf", "out")
/// };
/// assert!(options.validate().is_ok());
/// ```
#[derive(Clone, Debug)]
pub struct ExtractOptions {
    pub source: PathBuf,
    pub output_root: PathBuf,
    /// Write every geometry type into one `all_geometries` layer.
    pub flatten: bool,
    pub format: OutputFormat,
    /// Geometry types exported in partitioned mode, in order.
    pub geometry_types: Vec<String>,
    /// Fail when a unit writes nothing or the external converter fails.
    pub raise_on_error: bool,
    pub filter: Option<FilterOptions>,
    pub strategy: Strategy,
    /// Substrings of GDAL warnings to demote to debug messages.
    pub suppress_warnings: Vec<String>,
    pub log_level: LevelFilter,
    /// Mirror the run log to stderr.
    pub console_log: bool,
}

impl ExtractOptions {
    pub fn new(source: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        ExtractOptions {
            source: source.into(),
            output_root: output_root.into(),
            flatten: false,
            format: OutputFormat::Shapefile,
            geometry_types: DEFAULT_GEOMETRY_TYPES.iter().map(|s| s.to_string()).collect(),
            raise_on_error: false,
            filter: None,
            strategy: Strategy::default(),
            suppress_warnings: DEFAULT_SUPPRESSED_WARNINGS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            log_level: LevelFilter::INFO,
            console_log: false,
        }
    }

    /// Checks that need no I/O. Called before anything touches the filesystem.
    pub fn validate(&self) -> Result<()> {
        if self.flatten && !self.format.supports_mixed_geometries() {
            return Err(ExtractError::FlattenedShapefile);
        }
        if !self.flatten && self.geometry_types.is_empty() {
            return Err(ExtractError::NoGeometryTypes);
        }
        self.compiled_filter()?;
        Ok(())
    }

    pub(crate) fn compiled_filter(&self) -> Result<Option<FeatureFilter>> {
        self.filter.as_ref().map(FeatureFilter::new).transpose()
    }
}
