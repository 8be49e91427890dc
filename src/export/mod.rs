//! Export orchestration.
//!
//! A run validates its [`ExtractOptions`], starts a fresh run log in the
//! output root, installs the GDAL diagnostics guard and hands the output
//! units to the configured [`Exporter`]:
//!
//! * flattened: one `all_geometries` unit holding every geometry type;
//! * partitioned: one unit per requested geometry type, in request order.
//!
//! Structural failures (source, driver, dataset, layer, field) stop the run.
//! Per-feature failures are counted and logged by the streamer.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use gdal::vector::OGRwkbGeometryType;
use tracing::{error, info, warn};

use crate::diagnostics::GdalDiagnostics;
use crate::errors::{ExtractError, Result};
use crate::logging::RunLog;
use crate::options::{geometry_type_hint, ExtractOptions, OutputFormat, Strategy};
use crate::schema::FieldNaming;

pub mod ogr;
pub mod ogr2ogr;

pub use self::ogr::OgrExporter;
pub use self::ogr2ogr::Ogr2OgrExporter;

/// Layer and file stem of the flattened output.
pub const FLATTENED_NAME: &str = "all_geometries";

/// One output dataset/layer pair.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputUnit {
    pub name: String,
    pub path: PathBuf,
    pub layer_name: String,
    /// Geometry type copied into this unit; `None` copies everything.
    pub geometry_type: Option<String>,
    pub format: OutputFormat,
}

impl OutputUnit {
    pub fn flattened(root: &Path, format: OutputFormat) -> Self {
        OutputUnit {
            name: FLATTENED_NAME.to_string(),
            path: root.join(format!("{FLATTENED_NAME}.{}", format.extension())),
            layer_name: FLATTENED_NAME.to_string(),
            geometry_type: None,
            format,
        }
    }

    /// Shapefiles go to `<root>/<type>/<type>.shp`, containers to `<root>/<type>.gpkg`.
    pub fn partitioned(root: &Path, format: OutputFormat, geometry_type: &str) -> Self {
        let stem = geometry_type.trim().to_lowercase();
        let path = match format {
            OutputFormat::Shapefile => root.join(&stem).join(format!("{stem}.shp")),
            OutputFormat::GeoPackage => root.join(format!("{stem}.gpkg")),
        };
        OutputUnit {
            name: stem.clone(),
            path,
            layer_name: stem,
            geometry_type: Some(geometry_type.trim().to_uppercase()),
            format,
        }
    }

    pub fn geometry_hint(&self) -> OGRwkbGeometryType::Type {
        self.geometry_type
            .as_deref()
            .map(geometry_type_hint)
            .unwrap_or(OGRwkbGeometryType::wkbUnknown)
    }

    pub fn field_naming(&self) -> FieldNaming {
        self.format.field_naming()
    }

    /// Creates the parent directory and clears any previous output at this path.
    pub fn prepare(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        remove_existing_output(&self.path, self.format)
    }
}

/// Deletes `path`, and for Shapefiles every `<stem>.*` sidecar next to it.
pub fn remove_existing_output(path: &Path, format: OutputFormat) -> Result<()> {
    remove_if_exists(path)?;
    if format != OutputFormat::Shapefile {
        return Ok(());
    }

    let (Some(parent), Some(stem)) = (path.parent(), path.file_stem()) else {
        return Ok(());
    };
    let prefix = format!("{}.", stem.to_string_lossy());
    let entries = match fs::read_dir(parent) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    for entry in entries {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with(&prefix) && entry.path().is_file() {
            remove_if_exists(&entry.path())?;
        }
    }
    Ok(())
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Outcome of one output unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitReport {
    pub name: String,
    pub path: PathBuf,
    pub written: usize,
    pub skipped: usize,
    /// Recoverable failure recorded instead of aborting the run.
    pub failure: Option<String>,
}

/// Outcome of a whole run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportReport {
    pub units: Vec<UnitReport>,
    pub log_path: PathBuf,
}

impl ExportReport {
    pub fn total_written(&self) -> usize {
        self.units.iter().map(|u| u.written).sum()
    }

    pub fn total_skipped(&self) -> usize {
        self.units.iter().map(|u| u.skipped).sum()
    }

    pub fn unit(&self, name: &str) -> Option<&UnitReport> {
        self.units.iter().find(|u| u.name == name)
    }
}

/// A way of producing output units from the source drawing.
pub trait Exporter {
    /// Creates, populates and closes one unit.
    ///
    /// `strict` turns recoverable unit failures into errors.
    fn export_unit(&mut self, unit: &OutputUnit, strict: bool) -> Result<UnitReport>;

    fn export_flattened(&mut self, unit: &OutputUnit, strict: bool) -> Result<UnitReport> {
        let report = self.export_unit(unit, strict)?;
        check_written(&report, strict)?;
        Ok(report)
    }

    /// Units are produced in order; the first error stops the loop.
    fn export_partitioned(&mut self, units: &[OutputUnit], strict: bool) -> Result<Vec<UnitReport>> {
        units
            .iter()
            .map(|unit| {
                let report = self.export_unit(unit, strict)?;
                check_written(&report, strict)?;
                Ok(report)
            })
            .collect()
    }
}

fn check_written(report: &UnitReport, strict: bool) -> Result<()> {
    if report.written > 0 {
        return Ok(());
    }
    if strict {
        return Err(ExtractError::NoFeaturesWritten {
            unit: report.name.clone(),
        });
    }
    warn!("No features written for {}", report.name);
    Ok(())
}

/// Extracts the geometries of `options.source` under `options.output_root`.
///
/// Options are validated before anything touches the filesystem. Every run
/// rewrites `<output_root>/export.log`, including failed runs.
///
/// Runs are meant to be sequential. GDAL routes its diagnostics through one
/// process-wide handler, so overlapping runs on different threads replace
/// each other's handler and may lose GDAL messages.
pub fn extract_geometries(options: &ExtractOptions) -> Result<ExportReport> {
    options.validate()?;
    fs::create_dir_all(&options.output_root)?;

    let log = RunLog::create(&options.output_root, options.log_level, options.console_log)?;
    let units = log.in_scope(|| {
        let _diagnostics =
            GdalDiagnostics::install(log.dispatch().clone(), options.suppress_warnings.clone());
        run(options).inspect_err(|e| error!("Export failed: {e}"))
    })?;

    Ok(ExportReport {
        units,
        log_path: log.path().to_path_buf(),
    })
}

fn run(options: &ExtractOptions) -> Result<Vec<UnitReport>> {
    let mut exporter: Box<dyn Exporter> = match &options.strategy {
        Strategy::Library => Box::new(OgrExporter::open(
            &options.source,
            options.format,
            options.compiled_filter()?,
        )?),
        Strategy::Ogr2Ogr { program } => Box::new(Ogr2OgrExporter::new(
            program,
            &options.source,
            options.filter.as_ref(),
        )?),
    };

    let reports = if options.flatten {
        let unit = OutputUnit::flattened(&options.output_root, options.format);
        vec![exporter.export_flattened(&unit, options.raise_on_error)?]
    } else {
        let units: Vec<OutputUnit> = options
            .geometry_types
            .iter()
            .map(|t| OutputUnit::partitioned(&options.output_root, options.format, t))
            .collect();
        exporter.export_partitioned(&units, options.raise_on_error)?
    };

    info!(
        "Export finished: {} written, {} skipped",
        reports.iter().map(|r| r.written).sum::<usize>(),
        reports.iter().map(|r| r.skipped).sum::<usize>()
    );
    Ok(reports)
}
