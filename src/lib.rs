//! Declarative verification-graph engine.
//!
//! Callers declare a schema of named scopes — each owning one input
//! record, derived calculations, and boolean verifications — and wire
//! parameters to fields elsewhere in the graph with string references.
//! Compiling the schema resolves every reference into a dependency graph;
//! evaluation runs each calculation exactly once in a deterministic
//! topological order and records PASS/FAIL per verification result. A
//! separate requirement hierarchy then aggregates those results into
//! satisfaction statuses for reporting.
//!
//! ```
//! use veritrace_core::{
//!     Calculation, Evaluator, Project, RecordShape, Requirement, Scope,
//!     ScopedPath, TraceReport, Value, ValueType, Verification,
//! };
//! use std::collections::BTreeMap;
//!
//! let mut power = Scope::new(
//!     "Power",
//!     RecordShape::new()
//!         .field("generation", ValueType::Float)
//!         .field("consumption", ValueType::Float),
//! );
//! power
//!     .add_calculation(
//!         Calculation::new("margin", ValueType::Float, |inputs| {
//!             Ok(Value::Float(inputs.float("gen")? - inputs.float("con")?))
//!         })
//!         .param("gen", "$.generation")
//!         .param("con", "$.consumption"),
//!     )
//!     .unwrap();
//! power
//!     .add_verification(
//!         Verification::new("margin_positive", |inputs| {
//!             Ok(Value::Bool(inputs.float("margin")? > 0.0))
//!         })
//!         .param("margin", "@margin"),
//!     )
//!     .unwrap();
//! power
//!     .add_requirement(
//!         Requirement::new("REQ-PWR-001", "Power margin is positive.")
//!             .verified_by("?margin_positive"),
//!     )
//!     .unwrap();
//!
//! let mut project = Project::new("Demo");
//! project.add_scope(power).unwrap();
//! let graph = project.compile().unwrap();
//!
//! let mut inputs = BTreeMap::new();
//! inputs.insert(
//!     ScopedPath::parse("$.generation", "Power").unwrap(),
//!     Value::Float(80.0),
//! );
//! inputs.insert(
//!     ScopedPath::parse("$.consumption", "Power").unwrap(),
//!     Value::Float(60.0),
//! );
//! let result = Evaluator::new(&graph).evaluate(&inputs).unwrap();
//! assert!(result.success());
//!
//! let report = TraceReport::build(&graph, &result);
//! assert_eq!(report.unexpected_failures, 0);
//! ```

pub mod eval;
pub mod external;
pub mod graph;
pub mod io;
pub mod path;
pub mod schema;
pub mod table;
pub mod trace;
pub mod value;

// Re-export the primary API surface at the crate root.
pub use eval::{EvalError, EvaluationResult, Evaluator};
pub use external::{ChecksumReport, FileHandle};
pub use graph::{NodeGraph, NodeKind, NodeSpec, RequirementForest, UnitKind};
pub use io::{export_to_string, export_values, read_inputs, validate_inputs, InputError};
pub use path::{Path, PathError, PathRoot, ScopedPath, Segment};
pub use schema::{
    Calculation, Inputs, Param, Project, Requirement, SchemaError, Scope, Verification,
};
pub use table::{EnumDomain, KeyDomain, Table, TableError, TableKey};
pub use trace::{
    assess, compute_statuses, ReportOptions, RequirementStatus, RunSummary, TraceReport,
    VerificationOutcome,
};
pub use value::{check_type, flatten, hydrate, Record, RecordShape, Value, ValueError, ValueType};

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn mode_domain() -> KeyDomain {
        KeyDomain::single(EnumDomain::new("Mode", ["nominal", "safe"]).unwrap())
    }

    /// End-to-end: two scopes with a cross-scope import, table-valued
    /// verification, a requirement tree spanning scopes, and the exported
    /// document round-tripping back into the input map.
    #[test]
    fn test_small_satellite_end_to_end() {
        let mut power = Scope::new(
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
        power
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
        power
            .add_verification(
                Verification::new("battery_sized", |inputs| {
                    Ok(Value::Bool(inputs.float("capacity")? >= 100.0))
                })
                .param("capacity", "$.battery_capacity"),
            )
            .unwrap();
        power
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

        let mut thermal = Scope::new(
            "Thermal",
            RecordShape::new()
                .field("dissipation_limit", ValueType::Float)
                .field("efficiency", ValueType::Float),
        );
        thermal
            .add_calculation(
                Calculation::new("heat_load", ValueType::Float, |inputs| {
                    let consumption = inputs.table("consumption")?;
                    let efficiency = inputs.float("efficiency")?;
                    let worst = consumption
                        .iter()
                        .filter_map(|(_, v)| v.as_float())
                        .fold(0.0_f64, f64::max);
                    Ok(Value::Float(worst * (1.0 - efficiency)))
                })
                .param("consumption", "Power::$.consumption")
                .param("efficiency", "$.efficiency")
                .import("Power"),
            )
            .unwrap();
        thermal
            .add_verification(
                Verification::new("heat_within_limit", |inputs| {
                    Ok(Value::Bool(inputs.float("load")? <= inputs.float("limit")?))
                })
                .param("load", "@heat_load")
                .param("limit", "$.dissipation_limit"),
            )
            .unwrap();

        let mut system = Scope::new("System", RecordShape::new());
        system
            .add_requirement(Requirement::new(
                "REQ-SYS-001",
                "The satellite bus sustains all operating modes.",
            ))
            .unwrap();

        power
            .add_requirement(
                Requirement::new("REQ-PWR-001", "Battery capacity is sufficient.")
                    .verified_by("?battery_sized")
                    .under("REQ-SYS-001"),
            )
            .unwrap();
        power
            .add_requirement(
                Requirement::new("REQ-PWR-002", "Positive power margin in every mode.")
                    .verified_by("?margin_positive")
                    .under("REQ-SYS-001"),
            )
            .unwrap();
        thermal
            .add_requirement(
                Requirement::new("REQ-TH-001", "Waste heat stays within the radiator limit.")
                    .verified_by("?heat_within_limit")
                    .under("REQ-SYS-001"),
            )
            .unwrap();

        let mut project = Project::new("SmallSat");
        project.add_scope(system).unwrap();
        project.add_scope(power).unwrap();
        project.add_scope(thermal).unwrap();

        let graph = project.compile().unwrap();
        assert_eq!(
            graph.scope_dependencies(),
            vec![("Power".to_string(), "Thermal".to_string())]
        );

        let mut inputs: BTreeMap<ScopedPath, Value> = BTreeMap::new();
        let mut set = |path: &str, scope: &str, value: Value| {
            inputs.insert(ScopedPath::parse(path, scope).unwrap(), value);
        };
        set("$.battery_capacity", "Power", Value::Float(120.0));
        set("$.generation[nominal]", "Power", Value::Float(80.0));
        set("$.generation[safe]", "Power", Value::Float(40.0));
        set("$.consumption[nominal]", "Power", Value::Float(60.0));
        set("$.consumption[safe]", "Power", Value::Float(25.0));
        set("$.dissipation_limit", "Thermal", Value::Float(30.0));
        set("$.efficiency", "Thermal", Value::Float(0.7));

        let result = Evaluator::new(&graph).evaluate(&inputs).unwrap();
        assert!(result.success());

        // Cross-scope calculation saw Power's consumption table.
        let heat = ScopedPath::parse("@heat_load", "Thermal").unwrap();
        let load = result.get(&heat).and_then(Value::as_float).unwrap();
        assert!((load - 18.0).abs() < 1e-9);

        let statuses = compute_statuses(&graph, &result);
        assert_eq!(statuses["REQ-PWR-001"], RequirementStatus::Verified);
        assert_eq!(statuses["REQ-PWR-002"], RequirementStatus::Verified);
        assert_eq!(statuses["REQ-TH-001"], RequirementStatus::Verified);
        assert_eq!(statuses["REQ-SYS-001"], RequirementStatus::Satisfied);

        let report = TraceReport::build(&graph, &result);
        let summary = assess(&result, &report, ReportOptions::default());
        assert!(summary.success);

        // Export the full document and re-ingest the model subset.
        let document = export_to_string(&graph, result.values()).unwrap();
        let reread = read_inputs(&graph, &document).unwrap();
        assert_eq!(reread, inputs);
    }
}
