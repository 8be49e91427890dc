use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use gdal::vector::LayerAccess;
use gdal::Dataset;
use tracing::{debug, error, info, warn};

use crate::errors::{ExtractError, Result};
use crate::export::{Exporter, OutputUnit, UnitReport};
use crate::filter::{BoundingBox, FilterOptions};

/// Exporter that runs the `ogr2ogr` command line tool once per unit.
///
/// Only the bounding box of a filter can be handed to the tool, as `-spat`.
pub struct Ogr2OgrExporter {
    program: PathBuf,
    source: PathBuf,
    bbox: Option<BoundingBox>,
}

impl Ogr2OgrExporter {
    pub fn new(program: &Path, source: &Path, filter: Option<&FilterOptions>) -> Result<Self> {
        if !source.exists() {
            return Err(ExtractError::InputOpen {
                path: source.to_path_buf(),
                reason: "file not found".to_string(),
            });
        }
        if filter.is_some_and(FilterOptions::has_attribute_criteria) {
            warn!(
                "{} only applies the bounding box; other filter criteria are ignored",
                program.display()
            );
        }
        Ok(Ogr2OgrExporter {
            program: program.to_path_buf(),
            source: source.to_path_buf(),
            bbox: filter.and_then(|f| f.bbox),
        })
    }

    /// Command line arguments for `unit`, without the program name.
    pub fn build_args(&self, unit: &OutputUnit) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-f".into(),
            unit.format.driver_name().into(),
            unit.path.clone().into(),
            self.source.clone().into(),
            "-skipfailures".into(),
            "-nln".into(),
            unit.layer_name.clone().into(),
        ];
        if let Some(geometry_type) = &unit.geometry_type {
            args.push("-nlt".into());
            args.push(geometry_type.into());
            args.push("-where".into());
            args.push(format!("OGR_GEOMETRY='{geometry_type}'").into());
        }
        if let Some(b) = self.bbox {
            args.push("-spat".into());
            for v in [b.min_x, b.min_y, b.max_x, b.max_y] {
                args.push(v.to_string().into());
            }
        }
        args
    }
}

/// Features in the first layer of `path`, or zero when it cannot be read.
fn count_written(path: &Path) -> usize {
    match Dataset::open(path).and_then(|ds| ds.layer(0).map(|l| l.feature_count())) {
        Ok(count) => count as usize,
        Err(e) => {
            debug!("Cannot count features in {}: {e}", path.display());
            0
        }
    }
}

impl Exporter for Ogr2OgrExporter {
    fn export_unit(&mut self, unit: &OutputUnit, strict: bool) -> Result<UnitReport> {
        info!("Exporting {} to {}", unit.name, unit.path.display());
        unit.prepare()?;

        let args = self.build_args(unit);
        debug!("Running {} {:?}", self.program.display(), args);
        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|source| ExtractError::ToolLaunch {
                program: self.program.display().to_string(),
                source,
            })?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            info!("{}: {line}", self.program.display());
        }
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            warn!("{}: {line}", self.program.display());
        }

        let mut report = UnitReport {
            name: unit.name.clone(),
            path: unit.path.clone(),
            written: 0,
            skipped: 0,
            failure: None,
        };
        if output.status.success() {
            report.written = count_written(&unit.path);
            info!("Written {}: {}", unit.name, report.written);
        } else if strict {
            return Err(ExtractError::ToolFailed {
                unit: unit.name.clone(),
                status: output.status,
            });
        } else {
            error!("{} {} for {}", self.program.display(), output.status, unit.name);
            report.failure = Some(format!("{} {}", self.program.display(), output.status));
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::OutputFormat;
    use crate::test_utils::fixture;

    fn exporter(filter: Option<&FilterOptions>) -> Ogr2OgrExporter {
        Ogr2OgrExporter::new(Path::new("ogr2ogr"), &fixture("drawing.geojson"), filter).unwrap()
    }

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_partitioned_args() {
        let unit = OutputUnit::partitioned(Path::new("out"), OutputFormat::Shapefile, "polygon");
        let args = strings(exporter(None).build_args(&unit));
        let source = fixture("drawing.geojson").display().to_string();
        let target = Path::new("out")
            .join("polygon")
            .join("polygon.shp")
            .display()
            .to_string();
        assert_eq!(
            args,
            vec![
                "-f",
                "ESRI Shapefile",
                target.as_str(),
                source.as_str(),
                "-skipfailures",
                "-nln",
                "polygon",
                "-nlt",
                "POLYGON",
                "-where",
                "OGR_GEOMETRY='POLYGON'",
            ]
        );
    }

    #[test]
    fn test_flattened_args_with_bbox() {
        let filter = FilterOptions {
            bbox: Some(BoundingBox::new(-100.0, -100.0, 200.0, 200.5)),
            ..FilterOptions::default()
        };
        let unit = OutputUnit::flattened(Path::new("out"), OutputFormat::GeoPackage);
        let args = strings(exporter(Some(&filter)).build_args(&unit));
        assert_eq!(&args[..2], &["-f", "GPKG"]);
        assert!(!args.contains(&"-where".to_string()));
        assert_eq!(&args[args.len() - 5..], &["-spat", "-100", "-100", "200", "200.5"]);
    }

    #[test]
    fn test_missing_source() {
        assert!(matches!(
            Ogr2OgrExporter::new(Path::new("ogr2ogr"), Path::new("fixtures/nope.dxf"), None),
            Err(ExtractError::InputOpen { .. })
        ));
    }

    #[test]
    fn test_missing_program() {
        let dir = tempfile::tempdir().unwrap();
        let mut exporter = Ogr2OgrExporter::new(
            Path::new("dxf2geo-no-such-converter"),
            &fixture("drawing.geojson"),
            None,
        )
        .unwrap();
        let unit = OutputUnit::partitioned(dir.path(), OutputFormat::GeoPackage, "POINT");
        assert!(matches!(
            exporter.export_unit(&unit, false),
            Err(ExtractError::ToolLaunch { .. })
        ));
    }
}
