//! Graph construction from a declared schema.
//!
//! Compilation is a pure transformation: it flattens every scope's input
//! record and every calculation/verification output into addressable leaf
//! nodes, resolves declared references against the full node set (a second
//! pass, so declaration order between components does not matter), checks
//! cross-scope imports, and assembles the dependency structure. All
//! structural problems are collected into one diagnostic list.

pub mod requirements;

use std::collections::{BTreeMap, BTreeSet};

use petgraph::graph::{DiGraph, NodeIndex};

use crate::path::{Path, PathError, PathRoot, ScopedPath};
use crate::schema::{ComputeFn, Param, Project, SchemaError};
use crate::value::ValueType;

pub use requirements::{RequirementForest, RequirementNode};

/// Index of an execution unit (one calculation or verification).
pub type UnitId = usize;

/// What kind of leaf a graph node is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// An input leaf of a scope's record.
    ModelLeaf,
    /// One leaf of a calculation's structured output.
    CalculationOutput,
    /// One boolean result of a verification (per table key, for keyed
    /// verifications).
    VerificationResult,
}

/// One addressable leaf in the graph.
#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub id: ScopedPath,
    pub kind: NodeKind,
    /// Declared scalar type of this leaf.
    pub value_type: ValueType,
    /// The unit producing this leaf; `None` for model leaves.
    pub unit: Option<UnitId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Calculation,
    Verification,
}

/// One unit of execution: a calculation or verification together with its
/// resolved parameters and expanded leaf-level dependency set.
#[derive(Clone)]
pub struct UnitSpec {
    pub id: UnitId,
    pub scope: String,
    pub name: String,
    pub kind: UnitKind,
    pub output: ValueType,
    pub xfail: bool,
    pub imports: Vec<String>,
    /// `(parameter name, resolved reference)` in declaration order.
    pub params: Vec<(String, ScopedPath)>,
    /// Every leaf this unit reads, expanded from the parameter references.
    pub dependencies: BTreeSet<ScopedPath>,
    pub func: ComputeFn,
}

impl UnitSpec {
    /// The unit's own address, e.g. `Power::@sizing` or `Power::?margin`.
    pub fn path(&self) -> ScopedPath {
        let path = match self.kind {
            UnitKind::Calculation => Path::calc(&self.name),
            UnitKind::Verification => Path::verification(&self.name),
        };
        ScopedPath::new(&self.scope, path)
    }
}

impl std::fmt::Debug for UnitSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitSpec")
            .field("id", &self.id)
            .field("path", &self.path().to_string())
            .field("params", &self.params)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

/// The compiled, immutable graph: every addressable leaf, every execution
/// unit, and the dependency structure between them.
#[derive(Debug)]
pub struct NodeGraph {
    project_name: String,
    scopes: Vec<String>,
    /// Per-scope input root type (`Record` of the scope's input shape).
    input_types: BTreeMap<String, ValueType>,
    nodes: BTreeMap<ScopedPath, NodeSpec>,
    units: Vec<UnitSpec>,
    /// Unit-level dependency graph; edge from producer to consumer.
    unit_graph: DiGraph<UnitId, ()>,
    unit_indices: Vec<NodeIndex>,
    /// Scope-level graph derived from declared imports; edge from imported
    /// scope to importing scope.
    scope_graph: DiGraph<String, ()>,
    /// Leaf-level dependency edges (dependency node, dependent node).
    edges: Vec<(ScopedPath, ScopedPath)>,
    requirements: RequirementForest,
}

impl NodeGraph {
    /// Compiles a project. Diagnostics are collected; an `Err` carries
    /// every structural problem found.
    pub fn build(project: &Project) -> Result<NodeGraph, Vec<SchemaError>> {
        let mut errors: Vec<SchemaError> = Vec::new();

        // Scope registry and input root types.
        let mut scopes = Vec::new();
        let mut input_types = BTreeMap::new();
        for scope in project.scopes() {
            if let Err(reason) = scope.input().validate() {
                errors.push(SchemaError::InvalidInputShape {
                    scope: scope.name().to_string(),
                    reason,
                });
            }
            scopes.push(scope.name().to_string());
            input_types.insert(
                scope.name().to_string(),
                ValueType::Record(scope.input().clone()),
            );
        }

        // Execution units in declaration order: per scope, calculations
        // then verifications.
        let mut units: Vec<UnitSpec> = Vec::new();
        let mut raw_params: Vec<Vec<Param>> = Vec::new();
        for scope in project.scopes() {
            for calc in scope.calculations() {
                units.push(UnitSpec {
                    id: units.len(),
                    scope: scope.name().to_string(),
                    name: calc.name.clone(),
                    kind: UnitKind::Calculation,
                    output: calc.output.clone(),
                    xfail: false,
                    imports: calc.imports.clone(),
                    params: Vec::new(),
                    dependencies: BTreeSet::new(),
                    func: calc.func.clone(),
                });
                raw_params.push(calc.params.clone());
            }
            for verification in scope.verifications() {
                units.push(UnitSpec {
                    id: units.len(),
                    scope: scope.name().to_string(),
                    name: verification.name.clone(),
                    kind: UnitKind::Verification,
                    output: verification.output.clone(),
                    xfail: verification.xfail,
                    imports: verification.imports.clone(),
                    params: Vec::new(),
                    dependencies: BTreeSet::new(),
                    func: verification.func.clone(),
                });
                raw_params.push(verification.params.clone());
            }
        }

        // First pass: register every leaf node — model leaves and unit
        // output leaves — so reference resolution can see the whole set.
        let mut nodes: BTreeMap<ScopedPath, NodeSpec> = BTreeMap::new();
        for scope in project.scopes() {
            let root_type = &input_types[scope.name()];
            for leaf in root_type.leaf_segments() {
                let id = ScopedPath::new(
                    scope.name(),
                    Path {
                        root: PathRoot::Model,
                        segments: leaf.clone(),
                    },
                );
                let value_type = root_type
                    .type_at(&leaf)
                    .expect("leaf segments address their own shape")
                    .clone();
                nodes.insert(
                    id.clone(),
                    NodeSpec {
                        id,
                        kind: NodeKind::ModelLeaf,
                        value_type,
                        unit: None,
                    },
                );
            }
        }
        for unit in &units {
            let kind = match unit.kind {
                UnitKind::Calculation => NodeKind::CalculationOutput,
                UnitKind::Verification => NodeKind::VerificationResult,
            };
            for leaf in unit.output.leaf_segments() {
                let id = ScopedPath::new(&unit.scope, unit_root(unit).extend(&leaf));
                let value_type = unit
                    .output
                    .type_at(&leaf)
                    .expect("leaf segments address their own shape")
                    .clone();
                nodes.insert(
                    id.clone(),
                    NodeSpec {
                        id,
                        kind,
                        value_type,
                        unit: Some(unit.id),
                    },
                );
            }
        }

        // Second pass: resolve references. Imports are checked before
        // resolution so an undeclared import is reported independently of
        // whether the target exists.
        let mut resolved: Vec<(Vec<(String, ScopedPath)>, BTreeSet<ScopedPath>)> = Vec::new();
        for (unit, params) in units.iter().zip(&raw_params) {
            let unit_name = unit.path().to_string();
            let mut unit_params = Vec::new();
            let mut dependencies = BTreeSet::new();

            for param in params {
                if unit_params.iter().any(|(name, _)| name == &param.name) {
                    errors.push(SchemaError::DuplicateParam {
                        unit: unit_name.clone(),
                        param: param.name.clone(),
                    });
                    continue;
                }
                let dep_path = match ScopedPath::parse(&param.reference, &unit.scope) {
                    Ok(path) => path,
                    Err(source) => {
                        errors.push(SchemaError::InvalidReference {
                            unit: unit_name.clone(),
                            param: param.name.clone(),
                            source,
                        });
                        continue;
                    }
                };
                if dep_path.scope != unit.scope
                    && !unit.imports.iter().any(|i| i == &dep_path.scope)
                {
                    errors.push(SchemaError::UndeclaredImport {
                        unit: unit_name.clone(),
                        scope: dep_path.scope.clone(),
                        path: dep_path.to_string(),
                    });
                    continue;
                }
                match type_at_path(&input_types, &units, &dep_path) {
                    Ok(dep_type) => {
                        for leaf in dep_type.leaf_segments() {
                            dependencies.insert(ScopedPath::new(
                                &dep_path.scope,
                                dep_path.path.extend(&leaf),
                            ));
                        }
                        unit_params.push((param.name.clone(), dep_path));
                    }
                    Err(reason) => {
                        errors.push(SchemaError::UnresolvedDependency {
                            unit: unit_name.clone(),
                            param: param.name.clone(),
                            path: dep_path.to_string(),
                            reason,
                        });
                    }
                }
            }
            resolved.push((unit_params, dependencies));
        }
        for (unit, (params, dependencies)) in units.iter_mut().zip(resolved) {
            unit.params = params;
            unit.dependencies = dependencies;
        }

        // Dependency structure: leaf-level edges, the unit-level graph for
        // ordering, and the scope-level import graph.
        let mut edges = Vec::new();
        let mut unit_graph: DiGraph<UnitId, ()> = DiGraph::new();
        let unit_indices: Vec<NodeIndex> =
            units.iter().map(|u| unit_graph.add_node(u.id)).collect();
        for unit in &units {
            let outputs: Vec<ScopedPath> = unit
                .output
                .leaf_segments()
                .into_iter()
                .map(|leaf| ScopedPath::new(&unit.scope, unit_root(unit).extend(&leaf)))
                .collect();
            let mut producer_units: BTreeSet<UnitId> = BTreeSet::new();
            for dep in &unit.dependencies {
                for output in &outputs {
                    edges.push((dep.clone(), output.clone()));
                }
                if let Some(node) = nodes.get(dep) {
                    if let Some(producer) = node.unit {
                        producer_units.insert(producer);
                    }
                }
            }
            for producer in producer_units {
                unit_graph.add_edge(unit_indices[producer], unit_indices[unit.id], ());
            }
        }

        let mut scope_graph: DiGraph<String, ()> = DiGraph::new();
        let scope_indices: BTreeMap<&str, NodeIndex> = scopes
            .iter()
            .map(|name| (name.as_str(), scope_graph.add_node(name.clone())))
            .collect();
        for unit in &units {
            for import in &unit.imports {
                if let (Some(&from), Some(&to)) = (
                    scope_indices.get(import.as_str()),
                    scope_indices.get(unit.scope.as_str()),
                ) {
                    if !scope_graph.contains_edge(from, to) {
                        scope_graph.add_edge(from, to, ());
                    }
                }
            }
        }

        let requirements = requirements::build_forest(project, &units, &mut errors);

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(NodeGraph {
            project_name: project.name.clone(),
            scopes,
            input_types,
            nodes,
            units,
            unit_graph,
            unit_indices,
            scope_graph,
            edges,
            requirements,
        })
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// Scope names in declaration order.
    pub fn scope_names(&self) -> &[String] {
        &self.scopes
    }

    /// All leaf nodes, keyed by path (stable structural order).
    pub fn nodes(&self) -> &BTreeMap<ScopedPath, NodeSpec> {
        &self.nodes
    }

    /// Execution units in declaration order.
    pub fn units(&self) -> &[UnitSpec] {
        &self.units
    }

    pub fn requirements(&self) -> &RequirementForest {
        &self.requirements
    }

    /// Leaf-level dependency edges `(dependency, dependent)`.
    pub fn dependency_edges(&self) -> &[(ScopedPath, ScopedPath)] {
        &self.edges
    }

    /// Looks up the node at `path`.
    pub fn resolve(&self, path: &ScopedPath) -> Result<&NodeSpec, PathError> {
        self.nodes.get(path).ok_or_else(|| PathError::UnknownPath {
            path: path.to_string(),
        })
    }

    /// The declared type at any addressable path (leaf or interior).
    pub fn type_of(&self, path: &ScopedPath) -> Result<ValueType, String> {
        type_at_path(&self.input_types, &self.units, path)
    }

    /// Units whose outputs this unit reads, deduplicated, ascending.
    pub fn unit_dependencies(&self, unit: UnitId) -> Vec<UnitId> {
        let mut producers: BTreeSet<UnitId> = BTreeSet::new();
        for neighbor in self
            .unit_graph
            .neighbors_directed(self.unit_indices[unit], petgraph::Direction::Incoming)
        {
            producers.insert(self.unit_graph[neighbor]);
        }
        producers.into_iter().collect()
    }

    /// Output leaf paths of a unit, in the output shape's leaf order
    /// (record declaration order, table domain order).
    pub fn unit_output_paths(&self, unit: UnitId) -> Vec<ScopedPath> {
        let unit = &self.units[unit];
        unit.output
            .leaf_segments()
            .into_iter()
            .map(|leaf| ScopedPath::new(&unit.scope, unit_root(unit).extend(&leaf)))
            .collect()
    }

    /// Model leaf paths of one scope, in input shape leaf order.
    pub fn model_leaf_paths(&self, scope: &str) -> Vec<ScopedPath> {
        match self.input_types.get(scope) {
            Some(root_type) => root_type
                .leaf_segments()
                .into_iter()
                .map(|leaf| {
                    ScopedPath::new(
                        scope,
                        Path {
                            root: PathRoot::Model,
                            segments: leaf,
                        },
                    )
                })
                .collect(),
            None => Vec::new(),
        }
    }

    /// Scope-level dependency pairs `(imported, importing)` derived from
    /// declared imports.
    pub fn scope_dependencies(&self) -> Vec<(String, String)> {
        self.scope_graph
            .edge_indices()
            .filter_map(|edge| self.scope_graph.edge_endpoints(edge))
            .map(|(from, to)| {
                (
                    self.scope_graph[from].clone(),
                    self.scope_graph[to].clone(),
                )
            })
            .collect()
    }
}

fn unit_root(unit: &UnitSpec) -> Path {
    match unit.kind {
        UnitKind::Calculation => Path::calc(&unit.name),
        UnitKind::Verification => Path::verification(&unit.name),
    }
}

/// Declared type at `path`, resolved against scope input shapes and unit
/// output shapes.
fn type_at_path(
    input_types: &BTreeMap<String, ValueType>,
    units: &[UnitSpec],
    path: &ScopedPath,
) -> Result<ValueType, String> {
    let root_type = match &path.path.root {
        PathRoot::Model => input_types
            .get(&path.scope)
            .ok_or_else(|| format!("unknown scope '{}'", path.scope))?,
        PathRoot::Calc(name) => {
            if !input_types.contains_key(&path.scope) {
                return Err(format!("unknown scope '{}'", path.scope));
            }
            &units
                .iter()
                .find(|u| {
                    u.kind == UnitKind::Calculation && u.scope == path.scope && &u.name == name
                })
                .ok_or_else(|| format!("no calculation '{name}' in scope '{}'", path.scope))?
                .output
        }
        PathRoot::Verification(name) => {
            if !input_types.contains_key(&path.scope) {
                return Err(format!("unknown scope '{}'", path.scope));
            }
            &units
                .iter()
                .find(|u| {
                    u.kind == UnitKind::Verification && u.scope == path.scope && &u.name == name
                })
                .ok_or_else(|| format!("no verification '{name}' in scope '{}'", path.scope))?
                .output
        }
    };
    root_type
        .type_at(&path.path.segments)
        .cloned()
        .map_err(|reason| format!("at '{}': {reason}", path.path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Calculation, Requirement, Scope, Verification};
    use crate::table::{EnumDomain, KeyDomain};
    use crate::value::{RecordShape, Value};

    fn mode_domain() -> KeyDomain {
        KeyDomain::single(EnumDomain::new("Mode", ["nominal", "safe"]).unwrap())
    }

    fn power_scope() -> Scope {
        let mut scope = Scope::new(
            "Power",
            RecordShape::new()
                .field("battery_capacity", ValueType::Float)
                .field(
                    "generation",
                    ValueType::table(mode_domain(), ValueType::Float),
                )
                .field(
                    "consumption",
                    ValueType::table(mode_domain(), ValueType::Float),
                ),
        );
        scope
            .add_calculation(
                Calculation::new(
                    "margin",
                    ValueType::table(mode_domain(), ValueType::Float),
                    |inputs| {
                        let generation = inputs.table("generation")?;
                        let consumption = inputs.table("consumption")?;
                        Ok(Value::Table(generation.map(|key, value| {
                            let gen = value.as_float().unwrap_or(0.0);
                            let con = consumption
                                .get(key)
                                .ok()
                                .and_then(Value::as_float)
                                .unwrap_or(0.0);
                            Value::Float(gen - con)
                        })))
                    },
                )
                .param("generation", "$.generation")
                .param("consumption", "$.consumption"),
            )
            .unwrap();
        scope
            .add_verification(
                Verification::per_key("margin_positive", mode_domain(), |inputs| {
                    let margin = inputs.table("margin")?;
                    Ok(Value::Table(
                        margin.map(|_, value| Value::Bool(value.as_float().unwrap_or(0.0) > 0.0)),
                    ))
                })
                .param("margin", "@margin"),
            )
            .unwrap();
        scope
    }

    #[test]
    fn test_build_registers_one_node_per_leaf() {
        let mut project = Project::new("demo");
        project.add_scope(power_scope()).unwrap();
        let graph = project.compile().unwrap();

        // 5 model leaves + 2 calculation outputs + 2 verification results.
        assert_eq!(graph.nodes().len(), 9);

        let result_nodes: Vec<_> = graph
            .nodes()
            .values()
            .filter(|n| n.kind == NodeKind::VerificationResult)
            .collect();
        assert_eq!(result_nodes.len(), 2);

        let resolved = graph
            .resolve(&ScopedPath::parse("?margin_positive[safe]", "Power").unwrap())
            .unwrap();
        assert_eq!(resolved.value_type, ValueType::Bool);
    }

    #[test]
    fn test_unknown_path_resolution_fails() {
        let mut project = Project::new("demo");
        project.add_scope(power_scope()).unwrap();
        let graph = project.compile().unwrap();

        let missing = ScopedPath::parse("$.solar_area", "Power").unwrap();
        assert!(matches!(
            graph.resolve(&missing),
            Err(PathError::UnknownPath { .. })
        ));
    }

    #[test]
    fn test_unresolved_dependency_is_collected() {
        let mut scope = Scope::new(
            "Power",
            RecordShape::new().field("battery_capacity", ValueType::Float),
        );
        scope
            .add_verification(
                Verification::new("check", |_| Ok(Value::Bool(true)))
                    .param("capacity", "$.batery_capacity") // typo
                    .param("rate", "@no_such_calc.rate"),
            )
            .unwrap();
        let mut project = Project::new("demo");
        project.add_scope(scope).unwrap();

        let errors = project.compile().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .all(|e| matches!(e, SchemaError::UnresolvedDependency { .. })));
    }

    #[test]
    fn test_undeclared_import_is_independent_of_target_existence() {
        let mut thermal = Scope::new(
            "Thermal",
            RecordShape::new().field("max_temperature", ValueType::Float),
        );
        thermal
            .add_calculation(
                Calculation::new("heat_load", ValueType::Float, |_| Ok(Value::Float(0.0)))
                    // Exists, but Power is not imported.
                    .param("draw", "Power::$.battery_capacity")
                    // Does not exist either; still an import violation.
                    .param("ghost", "Power::$.no_such_field"),
            )
            .unwrap();

        let mut project = Project::new("demo");
        project
            .add_scope(Scope::new(
                "Power",
                RecordShape::new().field("battery_capacity", ValueType::Float),
            ))
            .unwrap();
        project.add_scope(thermal).unwrap();

        let errors = project.compile().unwrap_err();
        assert_eq!(errors.len(), 2);
        for error in &errors {
            assert!(
                matches!(error, SchemaError::UndeclaredImport { scope, .. } if scope == "Power"),
                "unexpected error: {error}"
            );
        }
    }

    #[test]
    fn test_declared_import_allows_cross_scope_reference() {
        let mut thermal = Scope::new(
            "Thermal",
            RecordShape::new().field("max_temperature", ValueType::Float),
        );
        thermal
            .add_calculation(
                Calculation::new("heat_load", ValueType::Float, |inputs| {
                    inputs.float("draw").map(Value::Float)
                })
                .param("draw", "Power::$.battery_capacity")
                .import("Power"),
            )
            .unwrap();

        let mut project = Project::new("demo");
        project
            .add_scope(Scope::new(
                "Power",
                RecordShape::new().field("battery_capacity", ValueType::Float),
            ))
            .unwrap();
        project.add_scope(thermal).unwrap();

        let graph = project.compile().unwrap();
        assert_eq!(
            graph.scope_dependencies(),
            vec![("Power".to_string(), "Thermal".to_string())]
        );
    }

    #[test]
    fn test_requirement_link_errors_are_collected() {
        let mut scope = power_scope();
        scope
            .add_requirement(
                Requirement::new("REQ-PWR-001", "Power margin is positive.")
                    .verified_by("?margin_positive"),
            )
            .unwrap();
        scope
            .add_requirement(
                Requirement::new("REQ-PWR-002", "Linked to nothing real.")
                    .verified_by("?no_such_verification")
                    .under("REQ-MISSING"),
            )
            .unwrap();
        scope
            .add_requirement(
                Requirement::new("REQ-PWR-003", "Depends on nothing real.")
                    .depends_on("REQ-GHOST"),
            )
            .unwrap();

        let mut project = Project::new("demo");
        project.add_scope(scope).unwrap();
        let errors = project.compile().unwrap_err();

        assert!(errors
            .iter()
            .any(|e| matches!(e, SchemaError::UnknownRequirementLink { .. })));
        assert!(errors
            .iter()
            .any(|e| matches!(e, SchemaError::UnknownRequirementParent { .. })));
        assert!(errors
            .iter()
            .any(|e| matches!(e, SchemaError::UnknownRequirementDependency { .. })));
    }

    #[test]
    fn test_requirement_extension_across_scopes() {
        let mut system = Scope::new("System", RecordShape::new());
        system
            .add_requirement(Requirement::new("REQ-SYS-001", "All subsystems work."))
            .unwrap();

        let mut power = power_scope();
        power
            .add_requirement(
                Requirement::new("REQ-PWR-001", "Margin positive in all modes.")
                    .verified_by("?margin_positive")
                    .under("REQ-SYS-001"),
            )
            .unwrap();

        let mut project = Project::new("demo");
        project.add_scope(system).unwrap();
        project.add_scope(power).unwrap();

        let graph = project.compile().unwrap();
        let forest = graph.requirements();
        let root = forest.get("REQ-SYS-001").unwrap();
        assert_eq!(root.children.len(), 1);
        assert_eq!(forest.entries()[root.children[0]].id, "REQ-PWR-001");
    }

    #[test]
    fn test_child_depending_on_its_ancestor_is_circular() {
        let mut scope = Scope::new("System", RecordShape::new());
        scope
            .add_requirement(Requirement::new("R1", "Parent."))
            .unwrap();
        // A child whose status feeds back into its own ancestor can never
        // be resolved.
        scope
            .add_requirement(
                Requirement::new("R2", "Child tied back to its parent.")
                    .under("R1")
                    .depends_on("R1"),
            )
            .unwrap();

        let mut project = Project::new("demo");
        project.add_scope(scope).unwrap();
        let errors = project.compile().unwrap_err();

        assert_eq!(errors.len(), 1);
        match &errors[0] {
            SchemaError::CircularRequirementDependency { cycle } => {
                assert!(cycle.iter().any(|id| id == "R1"));
                assert!(cycle.iter().any(|id| id == "R2"));
            }
            other => panic!("expected CircularRequirementDependency, got {other}"),
        }
    }

    #[test]
    fn test_mutual_parents_are_circular() {
        let mut scope = Scope::new("System", RecordShape::new());
        scope
            .add_requirement(Requirement::new("R1", "One.").under("R2"))
            .unwrap();
        scope
            .add_requirement(Requirement::new("R2", "Other.").under("R1"))
            .unwrap();

        let mut project = Project::new("demo");
        project.add_scope(scope).unwrap();
        let errors = project.compile().unwrap_err();

        assert!(errors
            .iter()
            .any(|e| matches!(e, SchemaError::CircularRequirementDependency { .. })));
    }
}
