//! TOML run configuration.
//!
//! ```toml
//! source = "drawing.dxf"
//! output_root = "out"
//! format = "GPKG"
//! geometry_types = ["LINESTRING", "POLYGON"]
//! raise_on_error = true
//!
//! [filter]
//! exclude_layers = ["defpoints"]
//! min_length = 0.5
//! bbox = [0.0, 0.0, 1000.0, 1000.0]
//!
//! [filter.exclude_field_values]
//! Linetype = ["HIDDEN"]
//! ```
//!
//! Every key is optional; the CLI supplies or overrides the rest.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::level_filters::LevelFilter;

use crate::errors::{ExtractError, Result};
use crate::filter::FilterOptions;
use crate::options::{ExtractOptions, Strategy};

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractConfig {
    pub source: Option<PathBuf>,
    pub output_root: Option<PathBuf>,
    pub flatten: Option<bool>,
    pub format: Option<String>,
    pub geometry_types: Option<Vec<String>>,
    pub raise_on_error: Option<bool>,
    pub strategy: Option<String>,
    /// Program used by the `ogr2ogr` strategy.
    pub ogr2ogr_program: Option<PathBuf>,
    pub suppress_warnings: Option<Vec<String>>,
    pub log_level: Option<String>,
    pub filter: Option<FilterOptions>,
}

/// Reads and parses a TOML configuration file.
pub fn load_config(path: &Path) -> Result<ExtractConfig> {
    let text = fs::read_to_string(path)
        .map_err(|e| ExtractError::Config(format!("cannot read {}: {e}", path.display())))?;
    toml::from_str(&text)
        .map_err(|e| ExtractError::Config(format!("cannot parse {}: {e}", path.display())))
}

pub(crate) fn parse_level(level: &str) -> Result<LevelFilter> {
    level
        .parse::<LevelFilter>()
        .map_err(|_| ExtractError::Config(format!("unknown log level '{level}'")))
}

impl ExtractConfig {
    /// Converts into validated [`ExtractOptions`].
    ///
    /// `source` and `output_root` must be set by now, either in the file or
    /// by the caller.
    pub fn into_options(self) -> Result<ExtractOptions> {
        let source = self
            .source
            .ok_or_else(|| ExtractError::Config("missing 'source'".to_string()))?;
        let output_root = self
            .output_root
            .ok_or_else(|| ExtractError::Config("missing 'output_root'".to_string()))?;

        let mut options = ExtractOptions::new(source, output_root);
        if let Some(flatten) = self.flatten {
            options.flatten = flatten;
        }
        if let Some(format) = self.format {
            options.format = format.parse()?;
        }
        if let Some(types) = self.geometry_types {
            options.geometry_types = types;
        }
        if let Some(strict) = self.raise_on_error {
            options.raise_on_error = strict;
        }
        if let Some(strategy) = self.strategy {
            options.strategy = strategy.parse()?;
        }
        if let (Strategy::Ogr2Ogr { program }, Some(custom)) =
            (&mut options.strategy, self.ogr2ogr_program)
        {
            *program = custom;
        }
        if let Some(suppress) = self.suppress_warnings {
            options.suppress_warnings = suppress;
        }
        if let Some(level) = self.log_level {
            options.log_level = parse_level(&level)?;
        }
        options.filter = self.filter;

        options.validate()?;
        Ok(options)
    }
}
