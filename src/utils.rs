use gdal::vector::{Feature, FieldValue, Geometry};

/// Name of the attribute GDAL's DXF driver stores the drawing layer in.
pub const LAYER_FIELD: &str = "Layer";

/// Text form of a named attribute, or `None` when the field does not exist,
/// is unset, or holds a list/date value.
///
/// Field lookup is case-insensitive, so `"Layer"` also finds a Shapefile's `LAYER`.
pub fn field_text(feature: &Feature, name: &str) -> Option<String> {
    let idx = feature.field_index(name).ok()?;
    let value = feature.field(idx).ok()??;
    value_text(value)
}

pub(crate) fn value_text(value: FieldValue) -> Option<String> {
    match value {
        FieldValue::StringValue(s) => Some(s),
        FieldValue::IntegerValue(v) => Some(v.to_string()),
        FieldValue::Integer64Value(v) => Some(v.to_string()),
        FieldValue::RealValue(v) => Some(v.to_string()),
        _ => None,
    }
}

/// Case-insensitive, exact comparison of a geometry's type name.
///
/// A missing geometry never matches.
pub fn geometry_name_equals(geometry: Option<&Geometry>, target: &str) -> bool {
    geometry.is_some_and(|g| g.geometry_name().eq_ignore_ascii_case(target))
}
