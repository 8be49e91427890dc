//! Attribute schema translation between the source layer and an output layer.

use std::collections::{HashMap, HashSet};

use gdal::vector::{Defn, FieldDefn, LayerAccess, OGRFieldType};

use crate::errors::{ExtractError, Result};

/// dBase limit on field name length.
pub const SHAPEFILE_NAME_LIMIT: usize = 10;

/// Replaces anything other than `[A-Za-z0-9_]` with `_`.
///
/// ```
/// assert_eq!(dxf2geo::schema::normalise_field_name("Entity Handle#1"), "Entity_Handle_1");
/// ```
pub fn normalise_field_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Valid, unique Shapefile field names for `source_names`, in order.
///
/// Names are normalised, upper-cased and cut to [`SHAPEFILE_NAME_LIMIT`]
/// characters. A collision with an already assigned name is resolved by
/// appending `_1`, `_2`, ... within the length budget.
pub fn shapefile_field_names<S: AsRef<str>>(source_names: &[S]) -> Vec<String> {
    let mut used = HashSet::new();
    let mut result = Vec::with_capacity(source_names.len());

    for raw in source_names {
        let mut base = normalise_field_name(raw.as_ref()).to_uppercase();
        if base.is_empty() {
            base.push('F');
        }
        base.truncate(SHAPEFILE_NAME_LIMIT);

        let mut candidate = base.clone();
        let mut i = 1;
        while used.contains(&candidate) {
            let suffix = format!("_{i}");
            let keep = SHAPEFILE_NAME_LIMIT.saturating_sub(suffix.len());
            candidate = format!("{}{suffix}", &base[..keep.min(base.len())]);
            i += 1;
        }
        used.insert(candidate.clone());
        result.push(candidate);
    }
    result
}

/// Naming rules imposed by the destination format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldNaming {
    /// The driver keeps names as given (possibly adjusting case).
    Preserve,
    /// dBase rules: upper-case, at most ten characters, unique.
    Shapefile,
}

/// Definition of one source attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: OGRFieldType::Type,
    pub width: i32,
    pub precision: i32,
}

impl FieldSpec {
    /// Field definitions of a layer, in declaration order.
    pub fn from_defn(defn: &Defn) -> Vec<FieldSpec> {
        defn.fields()
            .map(|field| FieldSpec {
                name: field.name(),
                field_type: field.field_type(),
                width: field.width(),
                precision: field.precision(),
            })
            .collect()
    }
}

/// Source field index → destination field index, `None` when dropped.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SchemaMapping {
    targets: Vec<Option<usize>>,
}

impl SchemaMapping {
    pub fn new(targets: Vec<Option<usize>>) -> Self {
        SchemaMapping { targets }
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn target(&self, source_idx: usize) -> Option<usize> {
        self.targets.get(source_idx).copied().flatten()
    }

    /// `(source, destination)` pairs of the attributes that are copied.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.targets
            .iter()
            .enumerate()
            .filter_map(|(src, dest)| dest.map(|d| (src, d)))
    }
}

/// Creates `fields` on `output` and returns the source→destination mapping.
///
/// Type, width and precision are copied verbatim. Destination indices are
/// looked up by name after creation, since drivers may reorder or recase.
/// Any rejected field aborts with [`ExtractError::OutputCreate`].
pub fn copy_schema<L: LayerAccess>(
    fields: &[FieldSpec],
    output: &L,
    naming: FieldNaming,
) -> Result<SchemaMapping> {
    let dest_names: Vec<String> = match naming {
        FieldNaming::Shapefile => shapefile_field_names(
            &fields.iter().map(|f| f.name.as_str()).collect::<Vec<_>>(),
        ),
        FieldNaming::Preserve => fields.iter().map(|f| f.name.clone()).collect(),
    };

    for (spec, dest_name) in fields.iter().zip(&dest_names) {
        let create = || -> gdal::errors::Result<()> {
            let field_defn = FieldDefn::new(dest_name, spec.field_type)?;
            field_defn.set_width(spec.width);
            field_defn.set_precision(spec.precision);
            field_defn.add_to_layer(output)
        };
        create().map_err(|e| ExtractError::output_create(format!("field '{dest_name}'"), e))?;
    }

    let index_by_name: HashMap<String, usize> = output
        .defn()
        .fields()
        .enumerate()
        .map(|(idx, field)| (field.name(), idx))
        .collect();

    Ok(SchemaMapping::new(
        dest_names
            .iter()
            .map(|name| {
                index_by_name
                    .get(name)
                    .or_else(|| {
                        index_by_name
                            .iter()
                            .find(|(k, _)| k.eq_ignore_ascii_case(name))
                            .map(|(_, idx)| idx)
                    })
                    .copied()
            })
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gdal::vector::LayerOptions;
    use gdal::DriverManager;
    use test_case::test_case;

    #[test_case("Layer", "Layer" ; "already clean")]
    #[test_case("Entity Handle", "Entity_Handle" ; "space")]
    #[test_case("a-b.c", "a_b_c" ; "punctuation")]
    #[test_case("Höhe", "H_he" ; "non ascii")]
    #[test_case("", "" ; "empty stays empty")]
    fn test_normalise_field_name(raw: &str, expected: &str) {
        assert_eq!(normalise_field_name(raw), expected);
    }

    #[test]
    fn test_shapefile_names_truncate_and_uppercase() {
        let names = shapefile_field_names(&["Layer", "SubClasses", "EntityHandle"]);
        assert_eq!(names, vec!["LAYER", "SUBCLASSES", "ENTITYHAND"]);
    }

    #[test]
    fn test_shapefile_names_deduplicate() {
        let names = shapefile_field_names(&[
            "EntityHandle",
            "EntityHandleX",
            "entityhandle_other",
            "layer",
            "LAYER",
        ]);
        assert_eq!(
            names,
            vec!["ENTITYHAND", "ENTITYHA_1", "ENTITYHA_2", "LAYER", "LAYER_1"]
        );
    }

    #[test]
    fn test_shapefile_names_placeholder() {
        assert_eq!(shapefile_field_names(&["", ""]), vec!["F", "F_1"]);
        assert_eq!(shapefile_field_names(&["###"]), vec!["___"]);
    }

    #[test]
    fn test_shapefile_names_are_bounded_and_unique() {
        let raw: Vec<String> = (0..150).map(|i| format!("attribute name {}", i % 7)).collect();
        let names = shapefile_field_names(&raw);
        let unique: HashSet<&String> = names.iter().collect();
        assert_eq!(unique.len(), raw.len());
        for name in &names {
            assert!(name.len() <= SHAPEFILE_NAME_LIMIT, "{name} too long");
            assert!(name
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_'));
        }
    }

    fn specs() -> Vec<FieldSpec> {
        vec![
            FieldSpec {
                name: "Layer".to_string(),
                field_type: OGRFieldType::OFTString,
                width: 32,
                precision: 0,
            },
            FieldSpec {
                name: "EntityHandle".to_string(),
                field_type: OGRFieldType::OFTString,
                width: 0,
                precision: 0,
            },
            FieldSpec {
                name: "EntityHandleX".to_string(),
                field_type: OGRFieldType::OFTReal,
                width: 12,
                precision: 3,
            },
        ]
    }

    #[test]
    fn test_copy_schema_preserve() {
        let driver = DriverManager::get_driver_by_name("Memory").unwrap();
        let mut ds = driver.create_vector_only("").unwrap();
        let layer = ds
            .create_layer(LayerOptions {
                name: "out",
                ..Default::default()
            })
            .unwrap();

        let mapping = copy_schema(&specs(), &layer, FieldNaming::Preserve).unwrap();
        assert_eq!(mapping, SchemaMapping::new(vec![Some(0), Some(1), Some(2)]));

        let created = FieldSpec::from_defn(layer.defn());
        assert_eq!(created, specs());
    }

    #[test]
    fn test_copy_schema_shapefile() {
        let dir = tempfile::tempdir().unwrap();
        let driver = DriverManager::get_driver_by_name("ESRI Shapefile").unwrap();
        let mut ds = driver
            .create_vector_only(dir.path().join("line.shp"))
            .unwrap();
        let layer = ds
            .create_layer(LayerOptions {
                name: "line",
                ..Default::default()
            })
            .unwrap();

        let mapping = copy_schema(&specs(), &layer, FieldNaming::Shapefile).unwrap();
        assert_eq!(mapping.len(), 3);
        assert_eq!(mapping.pairs().count(), 3);

        let names: Vec<String> = layer.defn().fields().map(|f| f.name()).collect();
        assert_eq!(names, vec!["LAYER", "ENTITYHAND", "ENTITYHA_1"]);
        for (src, dest) in mapping.pairs() {
            assert_eq!(src, dest);
        }
    }

    #[test]
    fn test_copy_schema_rejected_field_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let driver = DriverManager::get_driver_by_name("GPKG").unwrap();
        let mut ds = driver
            .create_vector_only(dir.path().join("out.gpkg"))
            .unwrap();
        let layer = ds
            .create_layer(LayerOptions {
                name: "out",
                ..Default::default()
            })
            .unwrap();

        // GeoPackage column names collide case-insensitively
        let upper = specs().remove(0);
        let lower = FieldSpec {
            name: "layer".to_string(),
            ..upper.clone()
        };
        let fields = vec![upper, lower];

        let err = copy_schema(&fields, &layer, FieldNaming::Preserve).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::OutputCreate { ref what, source: Some(_) } if what == "field 'layer'"
        ));
    }

    #[test]
    fn test_mapping_target() {
        let mapping = SchemaMapping::new(vec![Some(1), None, Some(0)]);
        assert_eq!(mapping.target(0), Some(1));
        assert_eq!(mapping.target(1), None);
        assert_eq!(mapping.target(7), None);
        assert_eq!(mapping.pairs().collect::<Vec<_>>(), vec![(0, 1), (2, 0)]);
    }
}
