//! Input ingestion and output documents.
//!
//! The structured-document boundary of the engine: validating a leaf-value
//! map against the compiled graph before evaluation, exporting a computed
//! leaf-value map grouped by scope and `{model, calc.<name>, verification}`
//! sections, and reading such a document back into input leaves. Documents
//! are TOML; every exported key corresponds to exactly one declared node.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::external::FileHandle;
use crate::graph::{NodeGraph, NodeKind, UnitKind};
use crate::path::{Path, PathRoot, ScopedPath, Segment};
use crate::value::{check_type, hydrate, LeafSegments, Value, ValueType};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("missing input value for '{path}'")]
    MissingInput { path: ScopedPath },
    #[error("type mismatch for '{path}': expected {expected}, got {got}")]
    TypeMismatch {
        path: ScopedPath,
        expected: String,
        got: String,
    },
    #[error("'{path}' is not a declared input leaf")]
    UnknownInput { path: ScopedPath },
    #[error("malformed input document: {reason}")]
    Document { reason: String },
}

/// Validates a leaf-value map against the graph's model leaves.
///
/// Every declared model leaf must be present with the declared scalar
/// type; paths that do not name a model leaf are rejected. All problems
/// are collected.
pub fn validate_inputs(
    graph: &NodeGraph,
    values: &BTreeMap<ScopedPath, Value>,
) -> Result<(), Vec<InputError>> {
    let mut errors = Vec::new();

    for (path, node) in graph.nodes() {
        if node.kind != NodeKind::ModelLeaf {
            continue;
        }
        match values.get(path) {
            None => errors.push(InputError::MissingInput { path: path.clone() }),
            Some(value) => {
                if check_type(value, &node.value_type).is_err() {
                    errors.push(InputError::TypeMismatch {
                        path: path.clone(),
                        expected: node.value_type.name().to_string(),
                        got: value.type_name().to_string(),
                    });
                }
            }
        }
    }

    for path in values.keys() {
        let declared = graph
            .nodes()
            .get(path)
            .map(|node| node.kind == NodeKind::ModelLeaf)
            .unwrap_or(false);
        if !declared {
            errors.push(InputError::UnknownInput { path: path.clone() });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Builds the output document: one table per scope with `model`,
/// `calc.<name>`, and `verification` sections.
///
/// Units whose leaves are absent (upstream failure) are left out of the
/// document; model leaves are always present for a validated run.
pub fn export_values(
    graph: &NodeGraph,
    values: &BTreeMap<ScopedPath, Value>,
) -> toml::Table {
    let mut document = toml::Table::new();

    for scope in graph.scope_names() {
        let mut scope_table = toml::Table::new();

        let model_root = ScopedPath::new(scope, Path::model());
        if let Some(model) = hydrate_subtree(graph, values, &model_root) {
            scope_table.insert("model".to_string(), value_to_toml(&model));
        }

        let mut calc_table = toml::Table::new();
        let mut verification_table = toml::Table::new();
        for unit in graph.units().iter().filter(|u| u.scope == *scope) {
            let Some(output) = hydrate_subtree(graph, values, &unit.path()) else {
                continue;
            };
            match unit.kind {
                UnitKind::Calculation => {
                    calc_table.insert(unit.name.clone(), value_to_toml(&output));
                }
                UnitKind::Verification => {
                    verification_table.insert(unit.name.clone(), value_to_toml(&output));
                }
            }
        }
        if !calc_table.is_empty() {
            scope_table.insert("calc".to_string(), toml::Value::Table(calc_table));
        }
        if !verification_table.is_empty() {
            scope_table.insert(
                "verification".to_string(),
                toml::Value::Table(verification_table),
            );
        }

        document.insert(scope.clone(), toml::Value::Table(scope_table));
    }

    document
}

/// Renders the output document as TOML text.
pub fn export_to_string(
    graph: &NodeGraph,
    values: &BTreeMap<ScopedPath, Value>,
) -> Result<String, InputError> {
    toml::to_string(&export_values(graph, values)).map_err(|e| InputError::Document {
        reason: e.to_string(),
    })
}

/// Reads a TOML input document into a model-leaf value map.
///
/// The document is walked shape-first against each scope's declared input
/// record, so missing and mistyped values are reported with their leaf
/// paths. Sections other than `model` (e.g. `calc`, `verification` from a
/// previously exported document) are ignored, which makes export/ingest
/// round-trips direct.
pub fn read_inputs(
    graph: &NodeGraph,
    text: &str,
) -> Result<BTreeMap<ScopedPath, Value>, Vec<InputError>> {
    let document: toml::Table = toml::from_str(text).map_err(|e| {
        vec![InputError::Document {
            reason: e.to_string(),
        }]
    })?;

    let mut errors = Vec::new();
    for key in document.keys() {
        if !graph.scope_names().iter().any(|s| s == key) {
            errors.push(InputError::Document {
                reason: format!("unknown scope '{key}'"),
            });
        }
    }

    let mut values = BTreeMap::new();
    for scope in graph.scope_names() {
        let root_path = ScopedPath::new(scope, Path::model());
        let declared = graph
            .type_of(&root_path)
            .expect("every scope has an input record");
        let model = document
            .get(scope)
            .and_then(toml::Value::as_table)
            .and_then(|t| t.get("model"));
        read_value(
            &declared,
            model,
            scope,
            &mut LeafSegments::new(),
            &mut values,
            &mut errors,
        );
    }

    if errors.is_empty() {
        Ok(values)
    } else {
        Err(errors)
    }
}

fn leaf_path(scope: &str, segments: &LeafSegments) -> ScopedPath {
    ScopedPath::new(
        scope,
        Path {
            root: PathRoot::Model,
            segments: segments.clone(),
        },
    )
}

/// Shape-directed conversion of one TOML subtree into leaf values.
fn read_value(
    declared: &ValueType,
    source: Option<&toml::Value>,
    scope: &str,
    at: &mut LeafSegments,
    values: &mut BTreeMap<ScopedPath, Value>,
    errors: &mut Vec<InputError>,
) {
    match declared {
        ValueType::Record(shape) => {
            let table = match source {
                Some(toml::Value::Table(table)) => Some(table),
                Some(other) => {
                    errors.push(InputError::TypeMismatch {
                        path: leaf_path(scope, at),
                        expected: "record".to_string(),
                        got: toml_type_name(other).to_string(),
                    });
                    return;
                }
                None => None,
            };
            for (name, field_type) in shape.fields() {
                at.push(Segment::attr(name));
                read_value(
                    field_type,
                    table.and_then(|t| t.get(name)),
                    scope,
                    at,
                    values,
                    errors,
                );
                at.pop();
            }
            if let Some(table) = table {
                for key in table.keys() {
                    if shape.get(key).is_none() {
                        at.push(Segment::attr(key));
                        errors.push(InputError::UnknownInput {
                            path: leaf_path(scope, at),
                        });
                        at.pop();
                    }
                }
            }
        }
        ValueType::Table(shape) => {
            let table = match source {
                Some(toml::Value::Table(table)) => Some(table),
                Some(other) => {
                    errors.push(InputError::TypeMismatch {
                        path: leaf_path(scope, at),
                        expected: "table".to_string(),
                        got: toml_type_name(other).to_string(),
                    });
                    return;
                }
                None => None,
            };
            for key in shape.domain.keys() {
                at.push(Segment::key(key.components().iter().cloned()));
                read_value(
                    &shape.value,
                    table.and_then(|t| t.get(&key.to_string())),
                    scope,
                    at,
                    values,
                    errors,
                );
                at.pop();
            }
            if let Some(table) = table {
                for key in table.keys() {
                    if shape.domain.parse_key(key).is_err() {
                        at.push(Segment::key(key.split(',').map(str::trim)));
                        errors.push(InputError::UnknownInput {
                            path: leaf_path(scope, at),
                        });
                        at.pop();
                    }
                }
            }
        }
        scalar => match source {
            None => errors.push(InputError::MissingInput {
                path: leaf_path(scope, at),
            }),
            Some(source) => match read_scalar(scalar, source) {
                Some(value) => {
                    values.insert(leaf_path(scope, at), value);
                }
                None => errors.push(InputError::TypeMismatch {
                    path: leaf_path(scope, at),
                    expected: scalar.name().to_string(),
                    got: toml_type_name(source).to_string(),
                }),
            },
        },
    }
}

fn read_scalar(declared: &ValueType, source: &toml::Value) -> Option<Value> {
    match (declared, source) {
        (ValueType::Bool, toml::Value::Boolean(b)) => Some(Value::Bool(*b)),
        (ValueType::Int, toml::Value::Integer(i)) => Some(Value::Int(*i)),
        (ValueType::Float, toml::Value::Float(f)) => Some(Value::Float(*f)),
        // Hand-authored documents often write `80` for a float field.
        (ValueType::Float, toml::Value::Integer(i)) => Some(Value::Float(*i as f64)),
        (ValueType::Str, toml::Value::String(s)) => Some(Value::Str(s.clone())),
        (ValueType::File, toml::Value::String(path)) => Some(Value::File(FileHandle::new(path))),
        (ValueType::File, toml::Value::Table(table)) => {
            let path = table.get("path")?.as_str()?;
            let checksum = match table.get("checksum") {
                Some(value) => Some(value.as_str()?.to_string()),
                None => None,
            };
            Some(Value::File(FileHandle {
                path: path.into(),
                checksum,
            }))
        }
        _ => None,
    }
}

fn toml_type_name(value: &toml::Value) -> &'static str {
    match value {
        toml::Value::String(_) => "string",
        toml::Value::Integer(_) => "integer",
        toml::Value::Float(_) => "float",
        toml::Value::Boolean(_) => "boolean",
        toml::Value::Datetime(_) => "datetime",
        toml::Value::Array(_) => "array",
        toml::Value::Table(_) => "table",
    }
}

fn value_to_toml(value: &Value) -> toml::Value {
    match value {
        Value::Bool(b) => toml::Value::Boolean(*b),
        Value::Int(i) => toml::Value::Integer(*i),
        Value::Float(f) => toml::Value::Float(*f),
        Value::Str(s) => toml::Value::String(s.clone()),
        Value::File(handle) => {
            let mut table = toml::Table::new();
            table.insert(
                "path".to_string(),
                toml::Value::String(handle.path.display().to_string()),
            );
            if let Some(checksum) = &handle.checksum {
                table.insert(
                    "checksum".to_string(),
                    toml::Value::String(checksum.clone()),
                );
            }
            toml::Value::Table(table)
        }
        Value::Record(record) => {
            let mut table = toml::Table::new();
            for (name, field) in record.fields() {
                table.insert(name.to_string(), value_to_toml(field));
            }
            toml::Value::Table(table)
        }
        Value::Table(entries) => {
            let mut table = toml::Table::new();
            for (key, entry) in entries.iter() {
                table.insert(key.to_string(), value_to_toml(entry));
            }
            toml::Value::Table(table)
        }
    }
}

/// Reassembles the structured value rooted at `root` from leaf values.
/// Returns `None` when any leaf is absent (e.g. after an upstream
/// failure).
fn hydrate_subtree(
    graph: &NodeGraph,
    values: &BTreeMap<ScopedPath, Value>,
    root: &ScopedPath,
) -> Option<Value> {
    let declared = graph.type_of(root).ok()?;
    let mut leaves: BTreeMap<LeafSegments, Value> = BTreeMap::new();
    for leaf in declared.leaf_segments() {
        let full = ScopedPath::new(&root.scope, root.path.extend(&leaf));
        leaves.insert(leaf, values.get(&full)?.clone());
    }
    hydrate(&declared, &leaves).ok()
}
