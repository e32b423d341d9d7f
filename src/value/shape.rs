//! Declared value shapes.
//!
//! Shapes describe the structure of inputs and outputs at
//! schema-definition time: scalars, ordered records, and finite-domain
//! tables. The graph builder flattens shapes into leaf nodes, and the
//! evaluator uses them to reassemble structured parameter values.

use smallvec::SmallVec;

use crate::path::Segment;
use crate::table::{KeyDomain, TableKey};

/// Relative address of one leaf inside a shape.
pub type LeafSegments = SmallVec<[Segment; 4]>;

/// The declared type of a field, parameter, or output.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueType {
    Bool,
    Int,
    Float,
    Str,
    /// External file reference (opaque handle; see [`crate::external`]).
    File,
    Record(RecordShape),
    Table(TableShape),
}

impl ValueType {
    pub fn table(domain: KeyDomain, value: ValueType) -> Self {
        ValueType::Table(TableShape {
            domain,
            value: Box::new(value),
        })
    }

    /// Short name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Str => "str",
            ValueType::File => "file",
            ValueType::Record(_) => "record",
            ValueType::Table(_) => "table",
        }
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, ValueType::Record(_) | ValueType::Table(_))
    }

    /// Relative segment sequences addressing every leaf of this shape.
    ///
    /// Scalars are their own (empty-sequence) leaf. Records recurse per
    /// field in declaration order; tables produce one leaf per domain key
    /// in enumeration order, with no whole-table entry.
    pub fn leaf_segments(&self) -> Vec<LeafSegments> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut SmallVec::new(), &mut leaves);
        leaves
    }

    fn collect_leaves(&self, prefix: &mut LeafSegments, leaves: &mut Vec<LeafSegments>) {
        match self {
            ValueType::Record(shape) => {
                for (name, field_type) in shape.fields() {
                    prefix.push(Segment::attr(name));
                    field_type.collect_leaves(prefix, leaves);
                    prefix.pop();
                }
            }
            ValueType::Table(shape) => {
                for key in shape.domain.keys() {
                    prefix.push(Segment::key(key.components().iter().cloned()));
                    shape.value.collect_leaves(prefix, leaves);
                    prefix.pop();
                }
            }
            _ => leaves.push(prefix.clone()),
        }
    }

    /// Walks `segments` down the shape, returning the addressed sub-shape.
    pub fn type_at(&self, segments: &[Segment]) -> Result<&ValueType, String> {
        let mut current = self;
        for segment in segments {
            match (segment, current) {
                (Segment::Attr(name), ValueType::Record(shape)) => {
                    current = shape.get(name).ok_or_else(|| {
                        format!("record has no field '{name}'")
                    })?;
                }
                (Segment::Attr(name), other) => {
                    return Err(format!(
                        "cannot access field '{name}' on a {} value",
                        other.name()
                    ));
                }
                (Segment::Key(components), ValueType::Table(shape)) => {
                    let key = TableKey::new(components.iter().cloned());
                    shape.domain.index_of(&key).map_err(|e| e.to_string())?;
                    current = &shape.value;
                }
                (Segment::Key(components), other) => {
                    return Err(format!(
                        "cannot index a {} value with key '{}'",
                        other.name(),
                        components.join(",")
                    ));
                }
            }
        }
        Ok(current)
    }
}

/// An ordered record shape: field names mapped to their declared types.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordShape {
    fields: Vec<(String, ValueType)>,
}

impl RecordShape {
    pub fn new() -> Self {
        RecordShape::default()
    }

    /// Appends a field; declaration order is preserved.
    pub fn field(mut self, name: impl Into<String>, value_type: ValueType) -> Self {
        self.fields.push((name.into(), value_type));
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &ValueType)> {
        self.fields.iter().map(|(name, ty)| (name.as_str(), ty))
    }

    pub fn get(&self, name: &str) -> Option<&ValueType> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, ty)| ty)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Checks for duplicate field names, recursively.
    pub fn validate(&self) -> Result<(), String> {
        for (i, (name, ty)) in self.fields.iter().enumerate() {
            if self.fields[..i].iter().any(|(other, _)| other == name) {
                return Err(format!("duplicate field '{name}'"));
            }
            if let ValueType::Record(nested) = ty {
                nested
                    .validate()
                    .map_err(|reason| format!("in field '{name}': {reason}"))?;
            }
        }
        Ok(())
    }
}

/// A table shape: key domain plus value type shared by every entry.
#[derive(Debug, Clone, PartialEq)]
pub struct TableShape {
    pub domain: KeyDomain,
    pub value: Box<ValueType>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::EnumDomain;

    fn mode_domain() -> KeyDomain {
        KeyDomain::single(EnumDomain::new("Mode", ["nominal", "safe"]).unwrap())
    }

    #[test]
    fn test_leaf_segments_flatten_nested_shapes() {
        let shape = ValueType::Record(
            RecordShape::new()
                .field("battery_capacity", ValueType::Float)
                .field(
                    "limits",
                    ValueType::Record(
                        RecordShape::new()
                            .field("min", ValueType::Float)
                            .field("max", ValueType::Float),
                    ),
                )
                .field(
                    "generation",
                    ValueType::table(mode_domain(), ValueType::Float),
                ),
        );

        let rendered: Vec<String> = shape
            .leaf_segments()
            .iter()
            .map(|segments| {
                segments
                    .iter()
                    .map(ToString::to_string)
                    .collect::<String>()
            })
            .collect();
        assert_eq!(
            rendered,
            vec![
                ".battery_capacity",
                ".limits.min",
                ".limits.max",
                ".generation[nominal]",
                ".generation[safe]",
            ]
        );
    }

    #[test]
    fn test_type_at_walks_records_and_tables() {
        let shape = ValueType::Record(
            RecordShape::new().field("generation", ValueType::table(mode_domain(), ValueType::Float)),
        );
        let ty = shape
            .type_at(&[Segment::attr("generation"), Segment::key(["safe"])])
            .unwrap();
        assert_eq!(*ty, ValueType::Float);

        assert!(shape.type_at(&[Segment::attr("missing")]).is_err());
        assert!(shape
            .type_at(&[Segment::attr("generation"), Segment::key(["eclipse"])])
            .is_err());
    }

    #[test]
    fn test_duplicate_fields_rejected() {
        let shape = RecordShape::new()
            .field("a", ValueType::Float)
            .field("a", ValueType::Bool);
        assert!(shape.validate().is_err());
    }
}
