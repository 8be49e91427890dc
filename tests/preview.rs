mod common;

use std::fs;
use std::path::Path;

use common::fixture;
use dxf2geo::preview::plot::render_html;
use dxf2geo::{
    extract_geometries, load_geometries, plot_geometries, ExtractError, ExtractOptions,
    OutputFormat,
};

fn export(root: &Path, format: OutputFormat, flatten: bool) {
    let options = ExtractOptions {
        format,
        flatten,
        ..ExtractOptions::new(fixture("drawing.geojson"), root)
    };
    extract_geometries(&options).unwrap();
}

#[test]
fn test_load_partitioned_shapefiles() {
    let dir = tempfile::tempdir().unwrap();
    export(dir.path(), OutputFormat::Shapefile, false);

    let collection = load_geometries(dir.path(), None).unwrap();
    assert_eq!(collection.len(), 5);
    assert_eq!(collection.geometry_types(), vec!["POINT", "LINESTRING", "POLYGON"]);

    let sources: Vec<&str> = collection.rows.iter().map(|r| r.source.as_str()).collect();
    assert_eq!(sources[0], "point");
    assert!(sources[1..4].iter().all(|s| *s == "linestring"));
    assert!(collection.crs.is_some());
}

#[test]
fn test_load_selected_types_only() {
    let dir = tempfile::tempdir().unwrap();
    export(dir.path(), OutputFormat::Shapefile, false);

    let types = vec!["LINESTRING".to_string()];
    let collection = load_geometries(dir.path(), Some(&types)).unwrap();
    assert_eq!(collection.len(), 3);
}

#[test]
fn test_load_partitioned_geopackages() {
    let dir = tempfile::tempdir().unwrap();
    export(dir.path(), OutputFormat::GeoPackage, false);

    let collection = load_geometries(dir.path(), None).unwrap();
    assert_eq!(collection.len(), 5);
    assert!(collection.rows.iter().any(|r| r.source == "polygon"));
}

#[test]
fn test_load_single_flattened_file() {
    let dir = tempfile::tempdir().unwrap();
    export(dir.path(), OutputFormat::GeoPackage, true);

    let collection = load_geometries(&dir.path().join("all_geometries.gpkg"), None).unwrap();
    assert_eq!(collection.len(), 5);
    assert!(collection.rows.iter().all(|r| r.source == "all_geometries"));
    assert_eq!(
        collection.geometry_types(),
        vec!["LINESTRING", "POLYGON", "POINT"]
    );
}

#[test]
fn test_fallback_scans_top_level_files() {
    let dir = tempfile::tempdir().unwrap();
    export(dir.path(), OutputFormat::GeoPackage, true);
    // not named after a geometry type
    fs::rename(
        dir.path().join("all_geometries.gpkg"),
        dir.path().join("site.gpkg"),
    )
    .unwrap();

    let collection = load_geometries(dir.path(), None).unwrap();
    assert_eq!(collection.len(), 5);
}

#[test]
fn test_modelspace_only_drops_paper_space() {
    let dir = tempfile::tempdir().unwrap();
    export(dir.path(), OutputFormat::Shapefile, false);

    let collection = load_geometries(dir.path(), None).unwrap().modelspace_only();
    assert_eq!(collection.len(), 4);
    assert!(!collection.geometry_types().contains(&"POINT"));
}

#[test]
fn test_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        load_geometries(&dir.path().join("nothing-here"), None),
        Err(ExtractError::PreviewInputMissing(_))
    ));
}

#[test]
fn test_plot_reloaded_output() {
    let dir = tempfile::tempdir().unwrap();
    export(dir.path(), OutputFormat::Shapefile, false);
    let collection = load_geometries(dir.path(), None).unwrap();

    let html_path = dir.path().join("preview.html");
    plot_geometries(&collection, &html_path).unwrap();
    let html = fs::read_to_string(&html_path).unwrap();
    assert_eq!(html, render_html(&collection).unwrap());
    assert!(html.contains("\"name\":\"LINESTRING\""));
    assert!(html.contains("LAYER: roads"));
}
