//! Runtime values.
//!
//! The engine moves data around as a closed, recursively-defined variant:
//! scalars, ordered records, and finite-domain tables. Flattening turns a
//! structured value into per-leaf entries addressed by relative segments;
//! hydration is the inverse, reassembling a structured value from leaves
//! guided by its declared shape. Both are total over the variant.

pub mod shape;

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::external::FileHandle;
use crate::path::Segment;
pub use crate::table::{Table, TableError, TableKey};

pub use shape::{LeafSegments, RecordShape, TableShape, ValueType};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    #[error("type mismatch at {at}: expected {expected}, got {got}")]
    Shape {
        at: String,
        expected: String,
        got: String,
    },
    #[error("missing leaf value at {at}")]
    MissingLeaf { at: String },
    #[error("unexpected leaf value at {at}")]
    UnexpectedLeaf { at: String },
    #[error(transparent)]
    Table(#[from] TableError),
}

/// One runtime value: a scalar, a record, or a table of values.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    File(FileHandle),
    Record(Record),
    Table(Table<Value>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::File(_) => "file",
            Value::Record(_) => "record",
            Value::Table(_) => "table",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileHandle> {
        match self {
            Value::File(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table<Value>> {
        match self {
            Value::Table(table) => Some(table),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<FileHandle> for Value {
    fn from(v: FileHandle) -> Self {
        Value::File(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Record(v)
    }
}

impl From<Table<Value>> for Value {
    fn from(v: Table<Value>) -> Self {
        Value::Table(v)
    }
}

/// An ordered record value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Record::default()
    }

    /// Appends a field; declaration order is preserved.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn render_at(segments: &[Segment]) -> String {
    if segments.is_empty() {
        "the value root".to_string()
    } else {
        format!(
            "'{}'",
            segments.iter().map(ToString::to_string).collect::<String>()
        )
    }
}

/// Checks that `value` structurally conforms to `declared`.
///
/// Records must carry exactly the declared fields; tables must be built
/// over the declared domain. Scalar kinds match exactly (no coercion).
pub fn check_type(value: &Value, declared: &ValueType) -> Result<(), ValueError> {
    check_type_at(value, declared, &mut Vec::new())
}

fn check_type_at(
    value: &Value,
    declared: &ValueType,
    at: &mut Vec<Segment>,
) -> Result<(), ValueError> {
    let mismatch = |at: &[Segment]| ValueError::Shape {
        at: render_at(at),
        expected: declared.name().to_string(),
        got: value.type_name().to_string(),
    };

    match (declared, value) {
        (ValueType::Bool, Value::Bool(_))
        | (ValueType::Int, Value::Int(_))
        | (ValueType::Float, Value::Float(_))
        | (ValueType::Str, Value::Str(_))
        | (ValueType::File, Value::File(_)) => Ok(()),
        (ValueType::Record(shape), Value::Record(record)) => {
            for (name, field_type) in shape.fields() {
                let field_value = record.get(name).ok_or_else(|| ValueError::Shape {
                    at: render_at(at),
                    expected: format!("record with field '{name}'"),
                    got: "record without it".to_string(),
                })?;
                at.push(Segment::attr(name));
                check_type_at(field_value, field_type, at)?;
                at.pop();
            }
            for (name, _) in record.fields() {
                if shape.get(name).is_none() {
                    return Err(ValueError::Shape {
                        at: render_at(at),
                        expected: "declared record fields only".to_string(),
                        got: format!("extra field '{name}'"),
                    });
                }
            }
            Ok(())
        }
        (ValueType::Table(shape), Value::Table(table)) => {
            if table.domain() != &shape.domain {
                return Err(ValueError::Shape {
                    at: render_at(at),
                    expected: "table over the declared key domain".to_string(),
                    got: "table over a different domain".to_string(),
                });
            }
            for (key, entry) in table.iter() {
                at.push(Segment::key(key.components().iter().cloned()));
                check_type_at(entry, &shape.value, at)?;
                at.pop();
            }
            Ok(())
        }
        _ => Err(mismatch(at)),
    }
}

/// Flattens a structured value into `(relative segments, scalar)` leaves.
///
/// Total over the variant: scalars yield themselves at the empty segment
/// sequence, records recurse per field, tables per domain key.
pub fn flatten(value: &Value) -> Vec<(LeafSegments, Value)> {
    let mut leaves = Vec::new();
    flatten_into(value, &mut LeafSegments::new(), &mut leaves);
    leaves
}

fn flatten_into(value: &Value, prefix: &mut LeafSegments, leaves: &mut Vec<(LeafSegments, Value)>) {
    match value {
        Value::Record(record) => {
            for (name, field_value) in record.fields() {
                prefix.push(Segment::attr(name));
                flatten_into(field_value, prefix, leaves);
                prefix.pop();
            }
        }
        Value::Table(table) => {
            for (key, entry) in table.iter() {
                prefix.push(Segment::key(key.components().iter().cloned()));
                flatten_into(entry, prefix, leaves);
                prefix.pop();
            }
        }
        scalar => leaves.push((prefix.clone(), scalar.clone())),
    }
}

/// Reassembles a structured value of shape `declared` from leaf entries.
///
/// The inverse of [`flatten`]: `hydrate(ty, flatten(v))` returns `v` for
/// every `v` conforming to `ty`. Missing leaves, stray leaves, and
/// incomplete tables are reported with the offending relative address.
pub fn hydrate(
    declared: &ValueType,
    leaves: &BTreeMap<LeafSegments, Value>,
) -> Result<Value, ValueError> {
    let entries: Vec<(&[Segment], &Value)> = leaves
        .iter()
        .map(|(segments, value)| (segments.as_slice(), value))
        .collect();
    hydrate_at(declared, &entries, &mut Vec::new())
}

fn hydrate_at(
    declared: &ValueType,
    entries: &[(&[Segment], &Value)],
    at: &mut Vec<Segment>,
) -> Result<Value, ValueError> {
    match declared {
        ValueType::Record(shape) => {
            let mut record = Record::new();
            for (name, field_type) in shape.fields() {
                let sub: Vec<(&[Segment], &Value)> = entries
                    .iter()
                    .filter(|(segments, _)| {
                        matches!(segments.first(), Some(Segment::Attr(attr)) if attr == name)
                    })
                    .map(|(segments, value)| (&segments[1..], *value))
                    .collect();
                at.push(Segment::attr(name));
                let field_value = hydrate_at(field_type, &sub, at)?;
                at.pop();
                record = record.field(name, field_value);
            }
            Ok(Value::Record(record))
        }
        ValueType::Table(shape) => {
            let mut by_key: BTreeMap<TableKey, Vec<(&[Segment], &Value)>> = BTreeMap::new();
            for (segments, value) in entries {
                match segments.first() {
                    Some(Segment::Key(components)) => {
                        by_key
                            .entry(TableKey::new(components.iter().cloned()))
                            .or_default()
                            .push((&segments[1..], *value));
                    }
                    _ => {
                        return Err(ValueError::UnexpectedLeaf {
                            at: render_at(segments),
                        })
                    }
                }
            }
            let mut table_entries = Vec::new();
            for (key, sub) in &by_key {
                at.push(Segment::key(key.components().iter().cloned()));
                let entry = hydrate_at(&shape.value, sub, at)?;
                at.pop();
                table_entries.push((key.clone(), entry));
            }
            Ok(Value::Table(Table::new(shape.domain.clone(), table_entries)?))
        }
        _ => match entries {
            [(rest, value)] if rest.is_empty() => Ok((**value).clone()),
            [] => Err(ValueError::MissingLeaf { at: render_at(at) }),
            _ => Err(ValueError::UnexpectedLeaf { at: render_at(at) }),
        },
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Str(s) => serializer.serialize_str(s),
            Value::File(handle) => handle.serialize(serializer),
            Value::Record(record) => record.serialize(serializer),
            Value::Table(table) => table.serialize(serializer),
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (name, value) in self.fields() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::File(handle) => write!(f, "{handle}"),
            Value::Record(record) => {
                write!(f, "{{")?;
                for (i, (name, value)) in record.fields().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                write!(f, "}}")
            }
            Value::Table(table) => {
                write!(f, "{{")?;
                for (i, (key, value)) in table.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "[{key}]: {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}
