use std::path::{Path, PathBuf};

use gdal::vector::{LayerAccess, LayerOptions};
use gdal::{Dataset, DatasetOptions, Driver, DriverManager, GdalOpenFlags};
use tracing::info;

use crate::errors::{ExtractError, Result};
use crate::export::{Exporter, OutputUnit, UnitReport};
use crate::filter::FeatureFilter;
use crate::options::OutputFormat;
use crate::schema::{copy_schema, FieldSpec};
use crate::stream::stream_features;

/// In-process exporter built on the GDAL bindings.
///
/// The first layer of the source is streamed once per output unit.
pub struct OgrExporter {
    source: Dataset,
    source_path: PathBuf,
    fields: Vec<FieldSpec>,
    driver: Driver,
    filter: Option<FeatureFilter>,
}

impl OgrExporter {
    /// Opens `path` read-only and looks up the output driver.
    pub fn open(path: &Path, format: OutputFormat, filter: Option<FeatureFilter>) -> Result<Self> {
        info!("Opening source {}", path.display());
        let input_open = |reason: String| ExtractError::InputOpen {
            path: path.to_path_buf(),
            reason,
        };

        let source = Dataset::open_ex(
            path,
            DatasetOptions {
                open_flags: GdalOpenFlags::GDAL_OF_VECTOR,
                ..Default::default()
            },
        )
        .map_err(|e| input_open(e.to_string()))?;
        if source.layer_count() == 0 {
            return Err(input_open("no layers".to_string()));
        }

        let fields = {
            let layer = source.layer(0)?;
            info!(
                "Source layer '{}': {} features, {} fields",
                layer.name(),
                layer.feature_count(),
                layer.defn().fields().count()
            );
            FieldSpec::from_defn(layer.defn())
        };

        let driver = DriverManager::get_driver_by_name(format.driver_name()).map_err(|source| {
            ExtractError::DriverNotFound {
                name: format.driver_name().to_string(),
                source,
            }
        })?;

        Ok(OgrExporter {
            source,
            source_path: path.to_path_buf(),
            fields,
            driver,
            filter,
        })
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }
}

impl Exporter for OgrExporter {
    fn export_unit(&mut self, unit: &OutputUnit, _strict: bool) -> Result<UnitReport> {
        info!("Exporting {} to {}", unit.name, unit.path.display());
        unit.prepare()?;

        let mut source = self.source.layer(0)?;
        let srs = source.spatial_ref();

        let mut dataset = self.driver.create_vector_only(&unit.path).map_err(|e| {
            ExtractError::output_create(format!("dataset {}", unit.path.display()), e)
        })?;
        let output = dataset
            .create_layer(LayerOptions {
                name: &unit.layer_name,
                srs: srs.as_ref(),
                ty: unit.geometry_hint(),
                options: None,
            })
            .map_err(|e| ExtractError::output_create(format!("layer '{}'", unit.layer_name), e))?;

        let mapping = copy_schema(&self.fields, &output, unit.field_naming())?;
        let stats = stream_features(
            &mut source,
            &output,
            unit.geometry_type.as_deref(),
            &mapping,
            self.filter.as_ref(),
        );
        info!("Written {}: {}, Skipped: {}", unit.name, stats.written, stats.skipped);

        Ok(UnitReport {
            name: unit.name.clone(),
            path: unit.path.clone(),
            written: stats.written,
            skipped: stats.skipped,
            failure: None,
        })
    }
}
