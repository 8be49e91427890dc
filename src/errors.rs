use std::path::PathBuf;
use std::process::ExitStatus;

use gdal::errors::GdalError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExtractError>;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unsupported output format '{0}'. Use 'ESRI Shapefile' or 'GPKG'.")]
    UnsupportedFormat(String),
    #[error("Flattened shapefile not supported; use GPKG or set flatten = false.")]
    FlattenedShapefile,
    #[error("Unsupported export strategy '{0}'. Use 'library' or 'ogr2ogr'.")]
    UnsupportedStrategy(String),
    #[error("No geometry types requested for partitioned output")]
    NoGeometryTypes,
    #[error("Invalid layer pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to open source dataset {path}: {reason}")]
    InputOpen { path: PathBuf, reason: String },
    #[error("OGR driver not found: {name}")]
    DriverNotFound {
        name: String,
        #[source]
        source: GdalError,
    },
    #[error("Failed to create {what}")]
    OutputCreate {
        what: String,
        #[source]
        source: Option<GdalError>,
    },
    #[error("No features written for '{unit}'")]
    NoFeaturesWritten { unit: String },

    #[error("Failed to launch external converter '{program}': {source}")]
    ToolLaunch {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("External converter {status} for '{unit}'")]
    ToolFailed { unit: String, status: ExitStatus },

    #[error("No valid input found at {0}")]
    PreviewInputMissing(PathBuf),
    #[error("No geometries loaded from {0}")]
    NothingLoaded(PathBuf),
    #[error("Unsupported file format: {0}")]
    UnsupportedPreviewFile(PathBuf),

    #[error(transparent)]
    Gdal(#[from] GdalError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ExtractError {
    pub(crate) fn output_create(what: impl Into<String>, source: GdalError) -> Self {
        ExtractError::OutputCreate {
            what: what.into(),
            source: Some(source),
        }
    }
}
