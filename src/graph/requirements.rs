//! Requirement forest finalization.
//!
//! Requirements live in a hierarchy parallel to the computation graph.
//! Scopes declare them with optional parent IDs ("fetch and extend" from
//! any scope); compilation assembles the forest, resolves `verified_by`
//! and `depends_on` targets, and rejects duplicates, unknown targets, and
//! cycles. After compilation the forest is immutable.

use std::collections::BTreeMap;

use crate::path::{PathRoot, ScopedPath};
use crate::schema::{Project, SchemaError};

use super::{UnitId, UnitKind, UnitSpec};

/// One finalized requirement with resolved links.
#[derive(Debug, Clone)]
pub struct RequirementNode {
    pub id: String,
    pub scope: String,
    pub description: String,
    pub xfail: bool,
    /// Verification units backing this requirement, in declaration order.
    pub verified_by: Vec<UnitId>,
    /// Child entry indices, in declaration order across scopes.
    pub children: Vec<usize>,
    /// Hard-dependency entry indices.
    pub depends_on: Vec<usize>,
    pub parent: Option<usize>,
}

/// All requirements of a project, in declaration order (scope declaration
/// order, then per-scope declaration order).
#[derive(Debug, Clone, Default)]
pub struct RequirementForest {
    entries: Vec<RequirementNode>,
    roots: Vec<usize>,
    index: BTreeMap<String, usize>,
}

impl RequirementForest {
    pub fn entries(&self) -> &[RequirementNode] {
        &self.entries
    }

    /// Indices of root requirements (no parent), in declaration order.
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn get(&self, id: &str) -> Option<&RequirementNode> {
        self.index.get(id).map(|&i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Assembles the requirement forest, appending structural problems to
/// `errors` rather than stopping at the first.
pub fn build_forest(
    project: &Project,
    units: &[UnitSpec],
    errors: &mut Vec<SchemaError>,
) -> RequirementForest {
    let mut entries: Vec<RequirementNode> = Vec::new();
    let mut index: BTreeMap<String, usize> = BTreeMap::new();
    let mut declared_parents: Vec<Option<String>> = Vec::new();

    for scope in project.scopes() {
        for requirement in scope.requirements() {
            if let Some(&existing) = index.get(&requirement.id) {
                errors.push(SchemaError::DuplicateRequirement {
                    id: requirement.id.clone(),
                    first: entries[existing].scope.clone(),
                    second: scope.name().to_string(),
                });
                continue;
            }

            let verified_by =
                resolve_verified_by(requirement, scope.name(), units, errors);

            index.insert(requirement.id.clone(), entries.len());
            declared_parents.push(requirement.parent.clone());
            entries.push(RequirementNode {
                id: requirement.id.clone(),
                scope: scope.name().to_string(),
                description: requirement.description.clone(),
                xfail: requirement.xfail,
                verified_by,
                children: Vec::new(),
                depends_on: Vec::new(),
                parent: None,
            });
        }
    }

    // Attach children under their declared parents (any scope).
    for child in 0..entries.len() {
        let Some(parent_id) = declared_parents[child].clone() else {
            continue;
        };
        match index.get(&parent_id) {
            Some(&parent) => {
                entries[child].parent = Some(parent);
                entries[parent].children.push(child);
            }
            None => errors.push(SchemaError::UnknownRequirementParent {
                id: entries[child].id.clone(),
                parent: parent_id,
            }),
        }
    }

    // Resolve hard dependencies.
    for scope in project.scopes() {
        for requirement in scope.requirements() {
            let Some(&entry) = index.get(&requirement.id) else {
                continue; // duplicate, already reported
            };
            if entries[entry].scope != scope.name() {
                continue; // the duplicate lives elsewhere
            }
            for target in &requirement.depends_on {
                match index.get(target) {
                    Some(&dep) => entries[entry].depends_on.push(dep),
                    None => errors.push(SchemaError::UnknownRequirementDependency {
                        id: requirement.id.clone(),
                        target: target.clone(),
                    }),
                }
            }
        }
    }

    let roots: Vec<usize> = (0..entries.len())
        .filter(|&i| entries[i].parent.is_none())
        .collect();

    detect_cycles(&entries, errors);

    RequirementForest {
        entries,
        roots,
        index,
    }
}

fn resolve_verified_by(
    requirement: &crate::schema::Requirement,
    default_scope: &str,
    units: &[UnitSpec],
    errors: &mut Vec<SchemaError>,
) -> Vec<UnitId> {
    let mut resolved = Vec::new();
    for reference in &requirement.verified_by {
        let parsed = match ScopedPath::parse(reference, default_scope) {
            Ok(path) => path,
            Err(source) => {
                errors.push(SchemaError::UnknownRequirementLink {
                    id: requirement.id.clone(),
                    target: reference.clone(),
                    reason: source.to_string(),
                });
                continue;
            }
        };
        let PathRoot::Verification(name) = &parsed.path.root else {
            errors.push(SchemaError::UnknownRequirementLink {
                id: requirement.id.clone(),
                target: reference.clone(),
                reason: "a requirement links whole verifications ('?name')".to_string(),
            });
            continue;
        };
        if !parsed.path.segments.is_empty() {
            errors.push(SchemaError::UnknownRequirementLink {
                id: requirement.id.clone(),
                target: reference.clone(),
                reason: "a verification link cannot carry segments".to_string(),
            });
            continue;
        }
        match units.iter().find(|u| {
            u.kind == UnitKind::Verification && u.scope == parsed.scope && u.name == *name
        }) {
            Some(unit) => resolved.push(unit.id),
            None => errors.push(SchemaError::UnknownRequirementLink {
                id: requirement.id.clone(),
                target: reference.clone(),
                reason: format!(
                    "no verification '{name}' in scope '{}'",
                    parsed.scope
                ),
            }),
        }
    }
    resolved
}

/// Rejects cycles over the union of child and `depends_on` links.
///
/// Status computation recurses into both edge kinds, so a cycle that
/// mixes them — a child depending on its own ancestor — is just as
/// unresolvable as a pure parent loop or a pure `depends_on` loop. One
/// three-state DFS over the combined edge set covers all three shapes.
fn detect_cycles(entries: &[RequirementNode], errors: &mut Vec<SchemaError>) {
    #[derive(Clone, PartialEq)]
    enum Visit {
        None,
        Visiting,
        Done,
    }
    let mut state = vec![Visit::None; entries.len()];

    fn visit(
        i: usize,
        entries: &[RequirementNode],
        state: &mut [Visit],
        trail: &mut Vec<usize>,
        errors: &mut Vec<SchemaError>,
    ) {
        match state[i] {
            Visit::Done => return,
            Visit::Visiting => {
                let start = trail.iter().position(|&t| t == i).unwrap_or(0);
                let mut cycle: Vec<String> =
                    trail[start..].iter().map(|&t| entries[t].id.clone()).collect();
                cycle.push(entries[i].id.clone());
                errors.push(SchemaError::CircularRequirementDependency { cycle });
                return;
            }
            Visit::None => {}
        }
        state[i] = Visit::Visiting;
        trail.push(i);
        for &next in entries[i].children.iter().chain(&entries[i].depends_on) {
            visit(next, entries, state, trail, errors);
        }
        trail.pop();
        state[i] = Visit::Done;
    }

    let mut trail = Vec::new();
    for i in 0..entries.len() {
        if state[i] == Visit::None {
            visit(i, entries, &mut state, &mut trail, errors);
        }
    }
}
