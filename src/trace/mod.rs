//! Requirement satisfaction and traceability reporting.
//!
//! After evaluation, each requirement's status is computed bottom-up from
//! its linked verification results, its children, and its hard
//! dependencies. Statuses are data, not errors: a FAILED or NOT_VERIFIED
//! requirement is a legitimate outcome. Structural problems (unknown
//! link targets, dependency cycles) were already rejected when the graph
//! was compiled.

use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write as _;

use serde::Serialize;

use crate::eval::EvaluationResult;
use crate::graph::{NodeGraph, RequirementForest};
use crate::path::ScopedPath;

/// Satisfaction state of one requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementStatus {
    /// Direct verification results exist and all pass.
    Verified,
    /// No direct results, but every child is verified or satisfied.
    Satisfied,
    /// A direct result failed, a child is not in a passing state, or a
    /// hard dependency failed.
    Failed,
    /// Neither direct results nor children: a coverage gap.
    NotVerified,
}

impl RequirementStatus {
    fn passes(self) -> bool {
        matches!(self, RequirementStatus::Verified | RequirementStatus::Satisfied)
    }
}

impl fmt::Display for RequirementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            RequirementStatus::Verified => "VERIFIED",
            RequirementStatus::Satisfied => "SATISFIED",
            RequirementStatus::Failed => "FAILED",
            RequirementStatus::NotVerified => "NOT VERIFIED",
        };
        write!(f, "{token}")
    }
}

/// One verification-result node linked to a requirement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationOutcome {
    pub path: ScopedPath,
    /// False also covers results that never ran (upstream failure).
    pub passed: bool,
    /// The verification was declared an expected failure.
    pub xfail: bool,
}

/// One requirement with its computed status, in report order.
#[derive(Debug, Clone, Serialize)]
pub struct TraceEntry {
    pub id: String,
    pub scope: String,
    pub description: String,
    pub status: RequirementStatus,
    pub xfail: bool,
    /// Linked results in declaration order (table keys in domain order).
    pub outcomes: Vec<VerificationOutcome>,
    pub children: Vec<String>,
    pub depends_on: Vec<String>,
    pub depth: usize,
}

/// The full requirement trace: entries in pre-order (roots in declaration
/// order, children before siblings' children) plus count aggregates.
#[derive(Debug, Clone, Serialize)]
pub struct TraceReport {
    pub project: String,
    pub entries: Vec<TraceEntry>,
    pub verified: usize,
    pub satisfied: usize,
    pub failed: usize,
    pub not_verified: usize,
    /// FAILED requirements not marked xfail.
    pub unexpected_failures: usize,
    /// NOT_VERIFIED requirements (reported, not failures by themselves).
    pub coverage_gaps: usize,
}

/// Computes every requirement's status from evaluation verdicts.
///
/// Link targets and dependency cycles were validated at compile time, so
/// this is total over a compiled graph.
pub fn compute_statuses(
    graph: &NodeGraph,
    result: &EvaluationResult,
) -> BTreeMap<String, RequirementStatus> {
    let forest = graph.requirements();
    let (statuses, _) = compute_forest(graph, forest, result);
    forest
        .entries()
        .iter()
        .enumerate()
        .map(|(i, entry)| (entry.id.clone(), statuses[i]))
        .collect()
}

fn compute_forest(
    graph: &NodeGraph,
    forest: &RequirementForest,
    result: &EvaluationResult,
) -> (Vec<RequirementStatus>, Vec<Vec<VerificationOutcome>>) {
    let count = forest.entries().len();
    let mut outcomes: Vec<Vec<VerificationOutcome>> = Vec::with_capacity(count);
    for entry in forest.entries() {
        let mut linked = Vec::new();
        for &unit_id in &entry.verified_by {
            let unit = &graph.units()[unit_id];
            for path in graph.unit_output_paths(unit_id) {
                let passed = result.verdicts().get(&path).copied().unwrap_or(false);
                linked.push(VerificationOutcome {
                    path,
                    passed,
                    xfail: unit.xfail,
                });
            }
        }
        outcomes.push(linked);
    }

    let mut statuses: Vec<Option<RequirementStatus>> = vec![None; count];
    for i in 0..count {
        compute_entry(i, forest, &outcomes, &mut statuses);
    }
    (
        statuses
            .into_iter()
            .map(|s| s.expect("every requirement was visited"))
            .collect(),
        outcomes,
    )
}

/// Bottom-up, memoized status computation for one requirement.
fn compute_entry(
    index: usize,
    forest: &RequirementForest,
    outcomes: &[Vec<VerificationOutcome>],
    statuses: &mut Vec<Option<RequirementStatus>>,
) -> RequirementStatus {
    if let Some(status) = statuses[index] {
        return status;
    }
    let entry = &forest.entries()[index];

    let child_statuses: Vec<RequirementStatus> = entry
        .children
        .iter()
        .map(|&child| compute_entry(child, forest, outcomes, statuses))
        .collect();
    let dependency_statuses: Vec<RequirementStatus> = entry
        .depends_on
        .iter()
        .map(|&dep| compute_entry(dep, forest, outcomes, statuses))
        .collect();

    let linked = &outcomes[index];
    let results_ok = linked.iter().all(|o| o.passed);
    let children_ok = child_statuses.iter().all(|s| s.passes());

    let own = match (linked.is_empty(), child_statuses.is_empty()) {
        // Direct results only.
        (false, true) => {
            if results_ok {
                RequirementStatus::Verified
            } else {
                RequirementStatus::Failed
            }
        }
        // Children only.
        (true, false) => {
            if children_ok {
                RequirementStatus::Satisfied
            } else {
                RequirementStatus::Failed
            }
        }
        // Neither: coverage gap.
        (true, true) => RequirementStatus::NotVerified,
        // Both: either group failing fails the requirement.
        (false, false) => {
            if results_ok && children_ok {
                RequirementStatus::Verified
            } else {
                RequirementStatus::Failed
            }
        }
    };

    // A failed hard dependency forces FAILED regardless of own outcome.
    let status = if dependency_statuses
        .iter()
        .any(|s| *s == RequirementStatus::Failed)
    {
        RequirementStatus::Failed
    } else {
        own
    };

    statuses[index] = Some(status);
    status
}

impl TraceReport {
    /// Builds the trace for a compiled graph and one evaluation result.
    pub fn build(graph: &NodeGraph, result: &EvaluationResult) -> TraceReport {
        let forest = graph.requirements();
        let (statuses, outcomes) = compute_forest(graph, forest, result);

        let mut entries = Vec::with_capacity(forest.entries().len());
        for &root in forest.roots() {
            push_pre_order(forest, &statuses, &outcomes, root, 0, &mut entries);
        }

        let count = |status: RequirementStatus| {
            entries
                .iter()
                .filter(|e: &&TraceEntry| e.status == status)
                .count()
        };
        let unexpected_failures = entries
            .iter()
            .filter(|e| e.status == RequirementStatus::Failed && !e.xfail)
            .count();
        let coverage_gaps = count(RequirementStatus::NotVerified);

        TraceReport {
            project: graph.project_name().to_string(),
            verified: count(RequirementStatus::Verified),
            satisfied: count(RequirementStatus::Satisfied),
            failed: count(RequirementStatus::Failed),
            not_verified: coverage_gaps,
            unexpected_failures,
            coverage_gaps,
            entries,
        }
    }

    pub fn get(&self, id: &str) -> Option<&TraceEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Renders the trace as a tree with a count summary.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Requirement trace for '{}':", self.project);
        let _ = writeln!(out, "--------------------------------------------------");

        let roots: Vec<usize> = (0..self.entries.len())
            .filter(|&i| self.entries[i].depth == 0)
            .collect();
        for (i, &root) in roots.iter().enumerate() {
            self.render_entry(root, "", i + 1 == roots.len(), true, &mut out);
        }

        let _ = writeln!(
            out,
            "{} requirement(s) | verified {} | satisfied {} | failed {} | not verified {} | unexpected failures {}",
            self.entries.len(),
            self.verified,
            self.satisfied,
            self.failed,
            self.not_verified,
            self.unexpected_failures,
        );
        out
    }

    fn render_entry(
        &self,
        index: usize,
        prefix: &str,
        is_last: bool,
        is_root: bool,
        out: &mut String,
    ) {
        let entry = &self.entries[index];
        let connector = if is_root {
            ""
        } else if is_last {
            "`-- "
        } else {
            "|-- "
        };
        let xfail_mark = if entry.xfail { " (xfail)" } else { "" };
        let _ = writeln!(
            out,
            "{prefix}{connector}[{}]{xfail_mark} {}: {}",
            entry.status, entry.id, entry.description
        );

        let child_prefix = if is_root {
            prefix.to_string()
        } else if is_last {
            format!("{prefix}    ")
        } else {
            format!("{prefix}|   ")
        };

        // Child entries follow this entry in pre-order; find them by depth.
        let children: Vec<usize> = self.child_indices(index);
        for (i, outcome) in entry.outcomes.iter().enumerate() {
            let last_outcome = i + 1 == entry.outcomes.len() && children.is_empty();
            let outcome_connector = if last_outcome { "`-- " } else { "|-- " };
            let verdict = if outcome.passed { "PASS" } else { "FAIL" };
            let xfail = if outcome.xfail { " (xfail)" } else { "" };
            let _ = writeln!(
                out,
                "{child_prefix}{outcome_connector}{verdict}{xfail} {}",
                outcome.path
            );
        }
        for (i, &child) in children.iter().enumerate() {
            self.render_entry(child, &child_prefix, i + 1 == children.len(), false, out);
        }
    }

    /// Direct children of a pre-order entry: subsequent entries one level
    /// deeper, up to the next entry at the same or shallower depth.
    fn child_indices(&self, index: usize) -> Vec<usize> {
        let depth = self.entries[index].depth;
        let mut children = Vec::new();
        for (i, entry) in self.entries.iter().enumerate().skip(index + 1) {
            if entry.depth <= depth {
                break;
            }
            if entry.depth == depth + 1 {
                children.push(i);
            }
        }
        children
    }
}

fn push_pre_order(
    forest: &RequirementForest,
    statuses: &[RequirementStatus],
    outcomes: &[Vec<VerificationOutcome>],
    index: usize,
    depth: usize,
    entries: &mut Vec<TraceEntry>,
) {
    let node = &forest.entries()[index];
    entries.push(TraceEntry {
        id: node.id.clone(),
        scope: node.scope.clone(),
        description: node.description.clone(),
        status: statuses[index],
        xfail: node.xfail,
        outcomes: outcomes[index].clone(),
        children: node
            .children
            .iter()
            .map(|&c| forest.entries()[c].id.clone())
            .collect(),
        depends_on: node
            .depends_on
            .iter()
            .map(|&d| forest.entries()[d].id.clone())
            .collect(),
        depth,
    });
    for &child in &node.children {
        push_pre_order(forest, statuses, outcomes, child, depth + 1, entries);
    }
}

/// How the external pass/fail signal is derived from a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    /// Treat NOT_VERIFIED requirements as failures instead of reported
    /// coverage gaps.
    pub fail_on_coverage_gap: bool,
}

/// The aggregate outcome of one evaluation + trace pass.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RunSummary {
    pub success: bool,
    pub evaluation_errors: usize,
    pub unexpected_failures: usize,
    pub coverage_gaps: usize,
}

/// Derives the external pass/fail signal: failed if any evaluation error
/// occurred or any non-xfail requirement FAILED; coverage gaps fail the
/// run only when the caller opts in.
pub fn assess(
    result: &EvaluationResult,
    report: &TraceReport,
    options: ReportOptions,
) -> RunSummary {
    let evaluation_errors = result.errors().len();
    let success = evaluation_errors == 0
        && report.unexpected_failures == 0
        && (!options.fail_on_coverage_gap || report.coverage_gaps == 0);
    RunSummary {
        success,
        evaluation_errors,
        unexpected_failures: report.unexpected_failures,
        coverage_gaps: report.coverage_gaps,
    }
}
