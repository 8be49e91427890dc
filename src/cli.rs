//! Command-line interface.

use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{load_config, ExtractConfig};
use crate::errors::Result;
use crate::filter::{BoundingBox, FilterOptions};
use crate::options::ExtractOptions;

/// Convert DXF drawings into Shapefiles or GeoPackages.
#[derive(Parser, Debug)]
#[command(name = "dxf2geo")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, env = "DXF2GEO_LOG_LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export the geometries of a DXF file
    Extract(ExtractArgs),

    /// Render exported data as an interactive HTML page
    Preview(PreviewArgs),
}

#[derive(Args, Debug, Default)]
pub struct ExtractArgs {
    /// Source drawing
    pub source: PathBuf,

    /// Directory receiving the outputs and export.log
    pub output_root: PathBuf,

    /// TOML file with default settings; flags override it
    #[arg(short, long, env = "DXF2GEO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output driver: "ESRI Shapefile" or "GPKG"
    #[arg(short, long)]
    pub format: Option<String>,

    /// Write every geometry type into a single layer (GPKG only)
    #[arg(long, overrides_with = "no_flatten")]
    pub flatten: bool,

    /// Write one output per geometry type even if the config sets flatten
    #[arg(long, overrides_with = "flatten")]
    pub no_flatten: bool,

    /// Geometry types to export, comma separated
    #[arg(long, value_delimiter = ',')]
    pub geometry_types: Option<Vec<String>>,

    /// Fail when an output unit writes nothing
    #[arg(long, overrides_with = "no_strict")]
    pub strict: bool,

    /// Only warn about empty output units even if the config is strict
    #[arg(long, overrides_with = "strict")]
    pub no_strict: bool,

    /// Export strategy: "library" or "ogr2ogr"
    #[arg(long)]
    pub strategy: Option<String>,

    #[arg(long = "include-layer")]
    pub include_layers: Vec<String>,

    #[arg(long = "exclude-layer")]
    pub exclude_layers: Vec<String>,

    /// Regular expression selecting layers
    #[arg(long = "include-layer-pattern")]
    pub include_layer_patterns: Vec<String>,

    /// Regular expression rejecting layers
    #[arg(long = "exclude-layer-pattern")]
    pub exclude_layer_patterns: Vec<String>,

    #[arg(long)]
    pub min_area: Option<f64>,

    #[arg(long)]
    pub min_length: Option<f64>,

    /// Keep features with null or empty geometries
    #[arg(long)]
    pub keep_empty: bool,

    /// Keep zero-length lines and zero-area polygons
    #[arg(long)]
    pub keep_zero_measure: bool,

    /// Extent as minx,miny,maxx,maxy
    #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
    pub bbox: Option<BoundingBox>,

    /// Drop features whose attribute equals a value, as NAME=VALUE
    #[arg(long = "exclude-field", value_parser = parse_field_value)]
    pub exclude_fields: Vec<(String, String)>,
}

#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Exported file or output root
    pub input: PathBuf,

    /// HTML file to write
    pub output_html: PathBuf,

    /// Geometry types to look for, comma separated
    #[arg(long, value_delimiter = ',')]
    pub geometry_types: Option<Vec<String>>,

    /// Skip features drawn in paper space
    #[arg(long)]
    pub modelspace_only: bool,
}

fn parse_bbox(s: &str) -> std::result::Result<BoundingBox, String> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|e| format!("'{v}': {e}")))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    match values[..] {
        [min_x, min_y, max_x, max_y] => Ok(BoundingBox::new(min_x, min_y, max_x, max_y)),
        _ => Err(format!("expected 4 comma separated numbers, got {}", values.len())),
    }
}

/// `Some(true)` for `--x`, `Some(false)` for `--no-x`, `None` when neither is given.
fn switch(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (false, true) => Some(false),
        (false, false) => None,
    }
}

fn parse_field_value(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{s}'")),
    }
}

impl ExtractArgs {
    fn has_filter_flags(&self) -> bool {
        !self.include_layers.is_empty()
            || !self.exclude_layers.is_empty()
            || !self.include_layer_patterns.is_empty()
            || !self.exclude_layer_patterns.is_empty()
            || self.min_area.is_some()
            || self.min_length.is_some()
            || self.keep_empty
            || self.keep_zero_measure
            || self.bbox.is_some()
            || !self.exclude_fields.is_empty()
    }

    /// Layers the flags over `base`, typically read from `--config`.
    pub fn merge_into(&self, mut base: ExtractConfig) -> ExtractConfig {
        base.source = Some(self.source.clone());
        base.output_root = Some(self.output_root.clone());
        if self.format.is_some() {
            base.format = self.format.clone();
        }
        if let Some(flatten) = switch(self.flatten, self.no_flatten) {
            base.flatten = Some(flatten);
        }
        if self.geometry_types.is_some() {
            base.geometry_types = self.geometry_types.clone();
        }
        if let Some(strict) = switch(self.strict, self.no_strict) {
            base.raise_on_error = Some(strict);
        }
        if self.strategy.is_some() {
            base.strategy = self.strategy.clone();
        }

        if self.has_filter_flags() {
            let filter = base.filter.get_or_insert_with(FilterOptions::default);
            filter.include_layers.extend(self.include_layers.iter().cloned());
            filter.exclude_layers.extend(self.exclude_layers.iter().cloned());
            filter
                .include_layer_patterns
                .extend(self.include_layer_patterns.iter().cloned());
            filter
                .exclude_layer_patterns
                .extend(self.exclude_layer_patterns.iter().cloned());
            if self.min_area.is_some() {
                filter.min_area = self.min_area;
            }
            if self.min_length.is_some() {
                filter.min_length = self.min_length;
            }
            if self.keep_empty {
                filter.drop_empty = false;
            }
            if self.keep_zero_measure {
                filter.drop_zero_geom = false;
            }
            if self.bbox.is_some() {
                filter.bbox = self.bbox;
            }
            for (name, value) in &self.exclude_fields {
                filter
                    .exclude_field_values
                    .entry(name.clone())
                    .or_insert_with(BTreeSet::new)
                    .insert(value.clone());
            }
        }
        base
    }

    /// Reads `--config` if given, applies the flags and validates.
    pub fn resolve(&self, log_level: Option<&str>) -> Result<ExtractOptions> {
        let base = match &self.config {
            Some(path) => load_config(path)?,
            None => ExtractConfig::default(),
        };
        let mut config = self.merge_into(base);
        if let Some(level) = log_level {
            config.log_level = Some(level.to_string());
        }
        let mut options = config.into_options()?;
        options.console_log = true;
        Ok(options)
    }
}
