//! Topological evaluation of a compiled graph.
//!
//! Execution order is fully determined before any user closure runs:
//! Kahn's algorithm over execution units, with the ready set kept in
//! declaration order so ties between independent units always break the
//! same way. A unit failure is local — its outputs are marked absent with
//! an attributable error, its dependents are skipped, and independent
//! branches still evaluate — but the run as a whole is recorded as failed.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use tracing::debug;

use crate::graph::{NodeGraph, NodeKind, UnitId};
use crate::io::{validate_inputs, InputError};
use crate::path::ScopedPath;
use crate::schema::Inputs;
use crate::value::{check_type, flatten, hydrate, LeafSegments, Value};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    /// A user closure returned an error, or its result did not conform to
    /// the declared output type.
    #[error("evaluation of '{path}' failed: {cause}")]
    CalculationFailed { path: ScopedPath, cause: String },
    /// A dependency leaf was never produced because of an upstream
    /// failure; the unit was skipped, not executed.
    #[error("'{path}' was skipped: dependency '{missing}' is unavailable")]
    DependencyUnavailable {
        path: ScopedPath,
        missing: ScopedPath,
    },
    /// No valid execution order exists. Fatal for the whole evaluation.
    #[error("cyclic dependency: {}", cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },
    /// The initial leaf-value map failed validation. Fatal; nothing ran.
    #[error("invalid input values ({} problem(s))", errors.len())]
    InvalidInput { errors: Vec<InputError> },
}

/// The outcome of one evaluation pass.
///
/// `values` holds every produced leaf (inputs included); a leaf missing
/// from `values` appears in `absent` with the error that explains why.
/// The map is owned by this result and never reused across runs.
#[derive(Debug, Clone, Default)]
pub struct EvaluationResult {
    values: BTreeMap<ScopedPath, Value>,
    absent: BTreeMap<ScopedPath, EvalError>,
    errors: Vec<EvalError>,
    verdicts: BTreeMap<ScopedPath, bool>,
    order: Vec<ScopedPath>,
}

impl EvaluationResult {
    /// True when every unit executed and none failed.
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Every resolved leaf value, keyed by path in stable order.
    pub fn values(&self) -> &BTreeMap<ScopedPath, Value> {
        &self.values
    }

    pub fn get(&self, path: &ScopedPath) -> Option<&Value> {
        self.values.get(path)
    }

    /// Why a leaf is missing from [`Self::values`], if it is.
    pub fn absence(&self, path: &ScopedPath) -> Option<&EvalError> {
        self.absent.get(path)
    }

    /// Unit-level failures in execution order.
    pub fn errors(&self) -> &[EvalError] {
        &self.errors
    }

    /// PASS/FAIL per verification-result node that was produced.
    pub fn verdicts(&self) -> &BTreeMap<ScopedPath, bool> {
        &self.verdicts
    }

    /// Unit paths in the order they were executed (or skipped).
    pub fn order(&self) -> &[ScopedPath] {
        &self.order
    }
}

/// Single-threaded, synchronous evaluator over a compiled graph.
pub struct Evaluator<'a> {
    graph: &'a NodeGraph,
}

impl<'a> Evaluator<'a> {
    pub fn new(graph: &'a NodeGraph) -> Self {
        Self { graph }
    }

    /// Evaluates every unit exactly once against `initial` model-leaf
    /// values.
    ///
    /// Fatal conditions — invalid inputs, a dependency cycle — abort
    /// before any user closure runs. Per-unit failures are recorded in
    /// the result and do not stop independent branches.
    pub fn evaluate(
        &self,
        initial: &BTreeMap<ScopedPath, Value>,
    ) -> Result<EvaluationResult, EvalError> {
        validate_inputs(self.graph, initial)
            .map_err(|errors| EvalError::InvalidInput { errors })?;
        let order = self.execution_order()?;

        let mut result = EvaluationResult {
            values: initial.clone(),
            ..Default::default()
        };

        for unit_id in order {
            let unit = &self.graph.units()[unit_id];
            let unit_path = unit.path();
            let outputs = self.graph.unit_output_paths(unit_id);

            // All dependency leaves must have been produced.
            if let Some(missing) = unit
                .dependencies
                .iter()
                .find(|dep| !result.values.contains_key(*dep))
            {
                let error = EvalError::DependencyUnavailable {
                    path: unit_path.clone(),
                    missing: missing.clone(),
                };
                debug!(unit = %unit_path, missing = %missing, "skipping unit");
                for output in outputs {
                    result.absent.insert(output, error.clone());
                }
                result.errors.push(error);
                result.order.push(unit_path);
                continue;
            }

            let params = match self.resolve_params(unit_id, &result.values) {
                Ok(params) => params,
                Err(cause) => {
                    self.record_failure(&mut result, unit_path.clone(), cause, &outputs);
                    result.order.push(unit_path);
                    continue;
                }
            };

            debug!(unit = %unit_path, "evaluating");
            let value = match (unit.func)(&Inputs::new(&params)) {
                Ok(value) => value,
                Err(cause) => {
                    self.record_failure(&mut result, unit_path.clone(), cause, &outputs);
                    result.order.push(unit_path);
                    continue;
                }
            };
            if let Err(error) = check_type(&value, &unit.output) {
                self.record_failure(&mut result, unit_path.clone(), error.to_string(), &outputs);
                result.order.push(unit_path);
                continue;
            }

            // Flatten the structured result under the unit's output paths.
            for (segments, leaf_value) in flatten(&value) {
                let leaf_path =
                    ScopedPath::new(&unit.scope, unit_path.path.extend(&segments));
                if let Value::Bool(passed) = leaf_value {
                    if self
                        .graph
                        .nodes()
                        .get(&leaf_path)
                        .map(|n| n.kind == NodeKind::VerificationResult)
                        .unwrap_or(false)
                    {
                        result.verdicts.insert(leaf_path.clone(), passed);
                    }
                }
                result.values.insert(leaf_path, leaf_value);
            }
            result.order.push(unit_path);
        }

        debug!(
            produced = result.values.len(),
            failed = result.errors.len(),
            "evaluation finished"
        );
        Ok(result)
    }

    /// Deterministic topological order over execution units.
    ///
    /// Ready units are processed in declaration order (unit declaration
    /// order within a scope, then scope declaration order), so repeated
    /// runs on the same schema execute identically.
    pub fn execution_order(&self) -> Result<Vec<UnitId>, EvalError> {
        let units = self.graph.units();
        let count = units.len();

        let mut successors: Vec<Vec<UnitId>> = vec![Vec::new(); count];
        let mut indegree: Vec<usize> = vec![0; count];
        for unit in units {
            let dependencies = self.graph.unit_dependencies(unit.id);
            indegree[unit.id] = dependencies.len();
            for dep in dependencies {
                successors[dep].push(unit.id);
            }
        }

        let mut ready: BTreeSet<UnitId> = (0..count).filter(|&i| indegree[i] == 0).collect();
        let mut order = Vec::with_capacity(count);
        while let Some(&next) = ready.iter().next() {
            ready.remove(&next);
            order.push(next);
            for &successor in &successors[next] {
                indegree[successor] -= 1;
                if indegree[successor] == 0 {
                    ready.insert(successor);
                }
            }
        }

        if order.len() != count {
            return Err(self.extract_cycle());
        }
        Ok(order)
    }

    /// Three-state depth-first search reporting the full cycle path.
    fn extract_cycle(&self) -> EvalError {
        #[derive(Clone, Copy, PartialEq)]
        enum Visit {
            Unvisited,
            InProgress,
            Done,
        }

        fn visit(
            unit: UnitId,
            graph: &NodeGraph,
            state: &mut [Visit],
            trail: &mut Vec<UnitId>,
            cycle: &mut Option<Vec<UnitId>>,
        ) {
            if cycle.is_some() {
                return;
            }
            match state[unit] {
                Visit::Done => return,
                Visit::InProgress => {
                    let start = trail.iter().position(|&t| t == unit).unwrap_or(0);
                    let mut found: Vec<UnitId> = trail[start..].to_vec();
                    found.push(unit);
                    *cycle = Some(found);
                    return;
                }
                Visit::Unvisited => {}
            }
            state[unit] = Visit::InProgress;
            trail.push(unit);
            for dep in graph.unit_dependencies(unit) {
                visit(dep, graph, state, trail, cycle);
            }
            trail.pop();
            state[unit] = Visit::Done;
        }

        let count = self.graph.units().len();
        let mut state = vec![Visit::Unvisited; count];
        let mut trail = Vec::new();
        let mut cycle = None;
        for unit in 0..count {
            if state[unit] == Visit::Unvisited {
                visit(unit, self.graph, &mut state, &mut trail, &mut cycle);
            }
            if cycle.is_some() {
                break;
            }
        }

        let cycle = cycle.unwrap_or_default();
        EvalError::CyclicDependency {
            cycle: cycle
                .into_iter()
                .map(|unit| self.graph.units()[unit].path().to_string())
                .collect(),
        }
    }

    /// Reassembles each declared parameter from the accumulated leaves.
    fn resolve_params(
        &self,
        unit: UnitId,
        values: &BTreeMap<ScopedPath, Value>,
    ) -> Result<BTreeMap<String, Value>, String> {
        let mut params = BTreeMap::new();
        for (name, dep_path) in &self.graph.units()[unit].params {
            let declared = self
                .graph
                .type_of(dep_path)
                .expect("references are resolved at compile time");
            let mut leaves: BTreeMap<LeafSegments, Value> = BTreeMap::new();
            for leaf in declared.leaf_segments() {
                let full = ScopedPath::new(&dep_path.scope, dep_path.path.extend(&leaf));
                let value = values
                    .get(&full)
                    .expect("dependency availability was checked before execution");
                leaves.insert(leaf, value.clone());
            }
            let value = hydrate(&declared, &leaves)
                .map_err(|e| format!("could not assemble parameter '{name}': {e}"))?;
            params.insert(name.clone(), value);
        }
        Ok(params)
    }

    fn record_failure(
        &self,
        result: &mut EvaluationResult,
        path: ScopedPath,
        cause: String,
        outputs: &[ScopedPath],
    ) {
        let error = EvalError::CalculationFailed {
            path: path.clone(),
            cause,
        };
        debug!(unit = %path, error = %error, "unit failed");
        for output in outputs {
            result.absent.insert(output.clone(), error.clone());
        }
        result.errors.push(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Calculation, Project, Scope, Verification};
    use crate::table::{EnumDomain, KeyDomain, TableKey};
    use crate::value::{RecordShape, Table, ValueType};

    fn mode_domain() -> KeyDomain {
        KeyDomain::single(EnumDomain::new("Mode", ["nominal", "safe"]).unwrap())
    }

    fn float_table(domain: KeyDomain, entries: &[(&str, f64)]) -> Value {
        Value::Table(
            Table::new(
                domain,
                entries
                    .iter()
                    .map(|(key, v)| (TableKey::single(*key), Value::Float(*v))),
            )
            .unwrap(),
        )
    }

    fn power_project() -> Project {
        let mut scope = Scope::new(
            "Power",
            RecordShape::new()
                .field("generation", ValueType::table(mode_domain(), ValueType::Float))
                .field("consumption", ValueType::table(mode_domain(), ValueType::Float)),
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
                        margin.map(|_, v| Value::Bool(v.as_float().unwrap_or(0.0) > 0.0)),
                    ))
                })
                .param("margin", "@margin"),
            )
            .unwrap();

        let mut project = Project::new("demo");
        project.add_scope(scope).unwrap();
        project
    }

    fn power_inputs() -> BTreeMap<ScopedPath, Value> {
        let mut values = BTreeMap::new();
        let generation = float_table(mode_domain(), &[("nominal", 80.0), ("safe", 20.0)]);
        let consumption = float_table(mode_domain(), &[("nominal", 60.0), ("safe", 30.0)]);
        for (path, value) in crate::value::flatten(&generation) {
            values.insert(
                ScopedPath::parse(&format!("$.generation{}", render(&path)), "Power").unwrap(),
                value,
            );
        }
        for (path, value) in crate::value::flatten(&consumption) {
            values.insert(
                ScopedPath::parse(&format!("$.consumption{}", render(&path)), "Power").unwrap(),
                value,
            );
        }
        values
    }

    fn render(segments: &LeafSegments) -> String {
        segments.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_evaluate_produces_every_declared_leaf() {
        let project = power_project();
        let graph = project.compile().unwrap();
        let result = Evaluator::new(&graph).evaluate(&power_inputs()).unwrap();

        assert!(result.success());
        for path in graph.nodes().keys() {
            assert!(
                result.get(path).is_some() || result.absence(path).is_some(),
                "leaf '{path}' neither produced nor attributed"
            );
        }

        let nominal = ScopedPath::parse("@margin[nominal]", "Power").unwrap();
        assert_eq!(result.get(&nominal), Some(&Value::Float(20.0)));

        let safe_check = ScopedPath::parse("?margin_positive[safe]", "Power").unwrap();
        assert_eq!(result.verdicts()[&safe_check], false);
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let project = power_project();
        let graph = project.compile().unwrap();
        let evaluator = Evaluator::new(&graph);

        let first = evaluator.evaluate(&power_inputs()).unwrap();
        let second = evaluator.evaluate(&power_inputs()).unwrap();

        assert_eq!(first.order(), second.order());
        assert_eq!(first.values(), second.values());
        let first_keys: Vec<_> = first.values().keys().collect();
        let second_keys: Vec<_> = second.values().keys().collect();
        assert_eq!(first_keys, second_keys);
    }

    #[test]
    fn test_two_calculation_cycle_names_both_units() {
        let mut scope = Scope::new("Loop", RecordShape::new());
        scope
            .add_calculation(
                Calculation::new("a", ValueType::Float, |inputs| {
                    inputs.float("b").map(Value::Float)
                })
                .param("b", "@b"),
            )
            .unwrap();
        scope
            .add_calculation(
                Calculation::new("b", ValueType::Float, |inputs| {
                    inputs.float("a").map(Value::Float)
                })
                .param("a", "@a"),
            )
            .unwrap();

        let mut project = Project::new("demo");
        project.add_scope(scope).unwrap();
        let graph = project.compile().unwrap();

        let err = Evaluator::new(&graph)
            .evaluate(&BTreeMap::new())
            .unwrap_err();
        match err {
            EvalError::CyclicDependency { cycle } => {
                assert!(cycle.iter().any(|name| name == "Loop::@a"));
                assert!(cycle.iter().any(|name| name == "Loop::@b"));
            }
            other => panic!("expected CyclicDependency, got {other:?}"),
        }
    }

    #[test]
    fn test_failure_skips_dependents_but_not_siblings() {
        let mut scope = Scope::new(
            "Plant",
            RecordShape::new().field("x", ValueType::Float),
        );
        scope
            .add_calculation(
                Calculation::new("broken", ValueType::Float, |_| {
                    Err("deliberate failure".to_string())
                })
                .param("x", "$.x"),
            )
            .unwrap();
        scope
            .add_calculation(
                Calculation::new("downstream", ValueType::Float, |inputs| {
                    inputs.float("b").map(Value::Float)
                })
                .param("b", "@broken"),
            )
            .unwrap();
        scope
            .add_calculation(
                Calculation::new("independent", ValueType::Float, |inputs| {
                    let x = inputs.float("x")?;
                    Ok(Value::Float(x * 2.0))
                })
                .param("x", "$.x"),
            )
            .unwrap();

        let mut project = Project::new("demo");
        project.add_scope(scope).unwrap();
        let graph = project.compile().unwrap();

        let mut inputs = BTreeMap::new();
        inputs.insert(
            ScopedPath::parse("$.x", "Plant").unwrap(),
            Value::Float(3.0),
        );
        let result = Evaluator::new(&graph).evaluate(&inputs).unwrap();

        assert!(!result.success());
        // The sibling branch still evaluated.
        let independent = ScopedPath::parse("@independent", "Plant").unwrap();
        assert_eq!(result.get(&independent), Some(&Value::Float(6.0)));

        // The failed unit is attributed, and its dependent was skipped.
        let broken = ScopedPath::parse("@broken", "Plant").unwrap();
        assert!(matches!(
            result.absence(&broken),
            Some(EvalError::CalculationFailed { .. })
        ));
        let downstream = ScopedPath::parse("@downstream", "Plant").unwrap();
        assert!(matches!(
            result.absence(&downstream),
            Some(EvalError::DependencyUnavailable { .. })
        ));
        assert_eq!(result.errors().len(), 2);
    }

    #[test]
    fn test_invalid_inputs_abort_before_execution() {
        let project = power_project();
        let graph = project.compile().unwrap();

        let mut inputs = power_inputs();
        inputs.remove(&ScopedPath::parse("$.generation[safe]", "Power").unwrap());

        let err = Evaluator::new(&graph).evaluate(&inputs).unwrap_err();
        match err {
            EvalError::InvalidInput { errors } => {
                assert_eq!(errors.len(), 1);
                assert!(matches!(errors[0], InputError::MissingInput { .. }));
            }
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_multi_key_verification_has_independent_results() {
        let phase = EnumDomain::new("Phase", ["launch", "cruise", "operations"]).unwrap();
        let mode = EnumDomain::new("Mode", ["nominal", "safe"]).unwrap();
        let domain = KeyDomain::new([phase, mode]).unwrap();

        let mut scope = Scope::new(
            "Power",
            RecordShape::new().field(
                "margin",
                ValueType::table(domain.clone(), ValueType::Float),
            ),
        );
        scope
            .add_verification(
                Verification::per_key("margin_ok", domain.clone(), |inputs| {
                    let margin = inputs.table("margin")?;
                    Ok(Value::Table(
                        margin.map(|_, v| Value::Bool(v.as_float().unwrap_or(0.0) >= 0.0)),
                    ))
                })
                .param("margin", "$.margin"),
            )
            .unwrap();
        let mut project = Project::new("demo");
        project.add_scope(scope).unwrap();
        let graph = project.compile().unwrap();

        let mut inputs = BTreeMap::new();
        for (i, key) in domain.keys().enumerate() {
            inputs.insert(
                ScopedPath::parse(&format!("$.margin[{key}]"), "Power").unwrap(),
                // Exactly one negative margin.
                Value::Float(if i == 3 { -1.0 } else { 1.0 }),
            );
        }
        let result = Evaluator::new(&graph).evaluate(&inputs).unwrap();

        // A 2x3 domain produces exactly 6 independent result nodes.
        assert_eq!(result.verdicts().len(), 6);
        let failing: Vec<String> = result
            .verdicts()
            .iter()
            .filter(|(_, passed)| !**passed)
            .map(|(path, _)| path.to_string())
            .collect();
        assert_eq!(failing, vec!["Power::?margin_ok[cruise,safe]"]);
    }
}
