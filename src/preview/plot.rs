//! Standalone HTML preview rendered with plotly.js.

use std::fs;
use std::path::Path;

use geo_types::{Coord, Geometry, LineString};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::errors::Result;
use crate::preview::{FeatureCollection, PreviewFeature};
use crate::utils::value_text;

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TraceKind {
    Markers,
    Lines,
    Polygons,
}

impl TraceKind {
    fn for_label(label: &str) -> Option<Self> {
        match label {
            "POINT" | "MULTIPOINT" => Some(TraceKind::Markers),
            "LINESTRING" | "MULTILINESTRING" => Some(TraceKind::Lines),
            "POLYGON" | "MULTIPOLYGON" => Some(TraceKind::Polygons),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct Marker {
    size: u32,
}

#[derive(Debug, Serialize)]
struct Line {
    width: u32,
}

/// One `scatter` trace.
#[derive(Debug, Serialize)]
pub struct Trace {
    #[serde(rename = "type")]
    kind: &'static str,
    pub x: Vec<Option<f64>>,
    pub y: Vec<Option<f64>>,
    mode: &'static str,
    pub name: String,
    pub text: Vec<String>,
    hoverinfo: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    marker: Option<Marker>,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<Line>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

impl Trace {
    fn new(name: &str, kind: TraceKind) -> Self {
        let mut trace = Trace {
            kind: "scatter",
            x: Vec::new(),
            y: Vec::new(),
            mode: "lines",
            name: name.to_string(),
            text: Vec::new(),
            hoverinfo: "text",
            marker: None,
            line: None,
            fill: None,
            opacity: None,
        };
        match kind {
            TraceKind::Markers => {
                trace.mode = "markers";
                trace.marker = Some(Marker { size: 4 });
            }
            TraceKind::Lines => trace.line = Some(Line { width: 1 }),
            TraceKind::Polygons => {
                trace.fill = Some("toself");
                trace.opacity = Some(0.4);
            }
        }
        trace
    }

    fn push_point(&mut self, c: Coord<f64>, hover: &str) {
        self.x.push(Some(c.x));
        self.y.push(Some(c.y));
        self.text.push(hover.to_string());
    }

    /// Appends a path followed by a gap so consecutive paths stay separate.
    fn push_path(&mut self, path: &LineString<f64>, hover: &str) {
        for c in path.coords() {
            self.push_point(*c, hover);
        }
        self.x.push(None);
        self.y.push(None);
        self.text.push(hover.to_string());
    }

    fn push_geometry(&mut self, geometry: &Geometry<f64>, hover: &str) {
        match geometry {
            Geometry::Point(p) => self.push_point(p.0, hover),
            Geometry::MultiPoint(mp) => mp.iter().for_each(|p| self.push_point(p.0, hover)),
            Geometry::LineString(ls) => self.push_path(ls, hover),
            Geometry::MultiLineString(mls) => mls.iter().for_each(|ls| self.push_path(ls, hover)),
            Geometry::Polygon(p) => self.push_path(p.exterior(), hover),
            Geometry::MultiPolygon(mp) => mp.iter().for_each(|p| self.push_path(p.exterior(), hover)),
            _ => {}
        }
    }
}

/// `name: value` lines for every set attribute, or a single space.
pub fn hover_text(row: &PreviewFeature) -> String {
    let text = row
        .attributes
        .iter()
        .filter_map(|(name, value)| {
            let value = value_text(value.clone()?)?;
            Some(format!("{name}: {value}"))
        })
        .collect::<Vec<_>>()
        .join("<br>");
    if text.is_empty() {
        " ".to_string()
    } else {
        text
    }
}

/// One trace per geometry type label, in order of first appearance.
///
/// Labels other than the point, line and polygon families are not drawn.
pub fn build_traces(collection: &FeatureCollection) -> Vec<Trace> {
    let mut traces = Vec::new();
    for label in collection.geometry_types() {
        let Some(kind) = TraceKind::for_label(label) else {
            continue;
        };
        let mut trace = Trace::new(label, kind);
        for row in collection
            .rows
            .iter()
            .filter(|r| r.geometry_type.as_deref() == Some(label))
        {
            if let Some(geometry) = &row.geometry {
                trace.push_geometry(geometry, &hover_text(row));
            }
        }
        traces.push(trace);
    }
    traces
}

fn layout() -> serde_json::Value {
    json!({
        "xaxis": { "title": { "text": "X" } },
        "yaxis": { "title": { "text": "Y" }, "scaleanchor": "x" },
        "legend": { "title": { "text": "Geometry Type" } },
        "autosize": true,
        "showlegend": true,
    })
}

/// Complete HTML page for `collection`.
pub fn render_html(collection: &FeatureCollection) -> Result<String> {
    // "</" inside inline JSON would close the script element
    let data = serde_json::to_string(&build_traces(collection))?.replace("</", "<\\/");
    let layout = serde_json::to_string(&layout())?;
    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8" />
<title>dxf2geo preview</title>
<script src="{PLOTLY_CDN}"></script>
</head>
<body>
<div id="preview" style="width:100%;height:95vh;"></div>
<script>
Plotly.newPlot("preview", {data}, {layout}, {{"responsive": true}});
</script>
</body>
</html>
"#
    ))
}

/// Writes the preview of `collection` to `output_html`.
pub fn plot_geometries(collection: &FeatureCollection, output_html: &Path) -> Result<()> {
    if let Some(parent) = output_html.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(output_html, render_html(collection)?)?;
    info!("Preview written to {}", output_html.display());
    Ok(())
}
