use gdal::vector::{Feature, LayerAccess};
use tracing::warn;

use crate::filter::FeatureFilter;
use crate::schema::SchemaMapping;
use crate::utils::geometry_name_equals;

/// Outcome of one streaming pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub written: usize,
    /// Features that passed every filter but could not be written.
    pub skipped: usize,
}

/// Copies features of `source` into `output`.
///
/// The source cursor is reset first, so the same layer can be streamed once
/// per output unit. Features whose geometry type differs from
/// `geometry_name` (case-insensitive) or that `filter` rejects never reach
/// the output and are not counted. A feature that fails to copy is logged,
/// counted as skipped, and the pass continues.
pub fn stream_features<S, O>(
    source: &mut S,
    output: &O,
    geometry_name: Option<&str>,
    mapping: &SchemaMapping,
    filter: Option<&FeatureFilter>,
) -> StreamStats
where
    S: LayerAccess,
    O: LayerAccess,
{
    let mut stats = StreamStats::default();

    source.reset_feature_reading();
    for feature in source.features() {
        if let Some(name) = geometry_name {
            if !geometry_name_equals(feature.geometry(), name) {
                continue;
            }
        }
        if filter.is_some_and(|f| !f.allows(&feature)) {
            continue;
        }

        match copy_feature(&feature, output, mapping) {
            Ok(()) => stats.written += 1,
            Err(e) => {
                stats.skipped += 1;
                warn!(fid = ?feature.fid(), "Skipping a feature: {e}");
            }
        }
    }
    stats
}

fn copy_feature<O: LayerAccess>(
    source: &Feature,
    output: &O,
    mapping: &SchemaMapping,
) -> gdal::errors::Result<()> {
    let mut target = Feature::new(output.defn())?;
    for (src_idx, dest_idx) in mapping.pairs() {
        if let Some(value) = source.field(src_idx)? {
            target.set_field(dest_idx, &value)?;
        }
    }
    if let Some(geometry) = source.geometry() {
        // deep copy; the output must not alias the source geometry
        target.set_geometry(geometry.clone())?;
    }
    target.create(output)
}
