//! Export the geometries of DXF drawings to GIS formats.
//!
//! The drawing is read through [GDAL](https://gdal.org/)'s vector drivers
//! and written either partitioned, one Shapefile or GeoPackage per geometry
//! type, or flattened into a single GeoPackage layer. Features can be
//! filtered on the way by layer, attribute value, size and extent.
//!
//! ## Use
//!
//! ```no_run
//! use dxf2geo::filter::FilterOptions;
//! use dxf2geo::{extract_geometries, ExtractOptions, OutputFormat};
//!
//! let options = ExtractOptions {
//!     format: OutputFormat::GeoPackage,
//!     geometry_types: vec!["LINESTRING".to_string(), "POLYGON".to_string()],
//!     filter: Some(FilterOptions {
//!         exclude_layers: vec!["defpoints".to_string()],
//!         min_length: Some(0.5),
//!         ..FilterOptions::default()
//!     }),
//!     ..ExtractOptions::new("site.dxf", "out")
//! };
//! let report = extract_geometries(&options).unwrap();
//! println!("{} features written, see {}", report.total_written(), report.log_path.display());
//! ```
//!
//! Exported data can be reloaded with [`load_geometries`] and drawn with
//! [`plot_geometries`].

pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod export;
pub mod filter;
pub mod logging;
pub mod options;
pub mod preview;
pub mod schema;
pub mod stream;
pub mod utils;

pub use errors::{ExtractError, Result};
pub use export::{extract_geometries, ExportReport, Exporter, OutputUnit, UnitReport};
pub use options::{ExtractOptions, OutputFormat, Strategy};
pub use preview::{load_geometries, plot_geometries, FeatureCollection};

#[cfg(test)]
mod test_utils;
