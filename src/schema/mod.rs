//! Schema declaration layer.
//!
//! Callers describe a project with explicit builder objects: a [`Project`]
//! owns named [`Scope`]s; each scope owns one input record shape, ordered
//! [`Calculation`]s and [`Verification`]s, and [`Requirement`] definitions.
//! Every calculation/verification registers its parameter list as
//! `(name, reference)` pairs up front; nothing is inferred from the
//! compute closure. Once [`Project::compile`] succeeds the schema is
//! frozen — the compiled graph holds its own copy of everything it needs.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::path::PathError;
use crate::table::KeyDomain;
use crate::value::{RecordShape, Value, ValueType};

/// Structural problems detected while declaring or compiling a schema.
///
/// Compilation collects every diagnostic instead of stopping at the first:
/// schema authoring is iterative and the caller wants the full list.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("scope '{name}' is already defined")]
    DuplicateScope { name: String },
    #[error("calculation '{name}' already exists in scope '{scope}'")]
    DuplicateCalculation { scope: String, name: String },
    #[error("verification '{name}' already exists in scope '{scope}'")]
    DuplicateVerification { scope: String, name: String },
    #[error("parameter '{param}' is declared twice on '{unit}'")]
    DuplicateParam { unit: String, param: String },
    #[error("invalid input record for scope '{scope}': {reason}")]
    InvalidInputShape { scope: String, reason: String },
    #[error("invalid reference on parameter '{param}' of '{unit}': {source}")]
    InvalidReference {
        unit: String,
        param: String,
        #[source]
        source: PathError,
    },
    #[error("parameter '{param}' of '{unit}' references '{path}', which cannot be resolved: {reason}")]
    UnresolvedDependency {
        unit: String,
        param: String,
        path: String,
        reason: String,
    },
    #[error("'{unit}' references scope '{scope}' without declaring it as an import (path '{path}')")]
    UndeclaredImport {
        unit: String,
        scope: String,
        path: String,
    },
    #[error("requirement '{id}' is declared in both scope '{first}' and scope '{second}'")]
    DuplicateRequirement {
        id: String,
        first: String,
        second: String,
    },
    #[error("requirement '{id}' is attached under unknown parent '{parent}'")]
    UnknownRequirementParent { id: String, parent: String },
    #[error("requirement '{id}' links unknown verification '{target}': {reason}")]
    UnknownRequirementLink {
        id: String,
        target: String,
        reason: String,
    },
    #[error("requirement '{id}' depends on unknown requirement '{target}'")]
    UnknownRequirementDependency { id: String, target: String },
    #[error("circular requirement dependency: {}", cycle.join(" -> "))]
    CircularRequirementDependency { cycle: Vec<String> },
}

/// Resolved parameter values handed to a compute closure.
///
/// The engine guarantees every declared parameter is present before the
/// closure runs; the typed accessors return an error message suitable for
/// bubbling out of the closure with `?`.
pub struct Inputs<'a> {
    values: &'a BTreeMap<String, Value>,
}

impl<'a> Inputs<'a> {
    pub fn new(values: &'a BTreeMap<String, Value>) -> Self {
        Inputs { values }
    }

    pub fn get(&self, name: &str) -> Result<&Value, String> {
        self.values
            .get(name)
            .ok_or_else(|| format!("no parameter named '{name}'"))
    }

    pub fn bool(&self, name: &str) -> Result<bool, String> {
        let value = self.get(name)?;
        value
            .as_bool()
            .ok_or_else(|| format!("parameter '{name}' is a {}, not a bool", value.type_name()))
    }

    pub fn int(&self, name: &str) -> Result<i64, String> {
        let value = self.get(name)?;
        value
            .as_int()
            .ok_or_else(|| format!("parameter '{name}' is a {}, not an int", value.type_name()))
    }

    pub fn float(&self, name: &str) -> Result<f64, String> {
        let value = self.get(name)?;
        value
            .as_float()
            .ok_or_else(|| format!("parameter '{name}' is a {}, not a float", value.type_name()))
    }

    pub fn str(&self, name: &str) -> Result<&str, String> {
        let value = self.get(name)?;
        value
            .as_str()
            .ok_or_else(|| format!("parameter '{name}' is a {}, not a str", value.type_name()))
    }

    pub fn file(&self, name: &str) -> Result<&crate::external::FileHandle, String> {
        let value = self.get(name)?;
        value
            .as_file()
            .ok_or_else(|| format!("parameter '{name}' is a {}, not a file", value.type_name()))
    }

    pub fn record(&self, name: &str) -> Result<&crate::value::Record, String> {
        let value = self.get(name)?;
        value
            .as_record()
            .ok_or_else(|| format!("parameter '{name}' is a {}, not a record", value.type_name()))
    }

    pub fn table(&self, name: &str) -> Result<&crate::table::Table<Value>, String> {
        let value = self.get(name)?;
        value
            .as_table()
            .ok_or_else(|| format!("parameter '{name}' is a {}, not a table", value.type_name()))
    }
}

/// User-supplied compute body. The engine treats it as opaque: it receives
/// resolved parameter values and returns one structured value or an error
/// message.
pub type ComputeFn = Arc<dyn Fn(&Inputs<'_>) -> Result<Value, String> + Send + Sync>;

/// One declared parameter: closure-visible name plus reference text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub reference: String,
}

/// A named pure function bound to a scope, producing one structured value.
#[derive(Clone)]
pub struct Calculation {
    pub name: String,
    pub imports: Vec<String>,
    pub params: Vec<Param>,
    pub output: ValueType,
    pub func: ComputeFn,
}

impl Calculation {
    pub fn new(
        name: impl Into<String>,
        output: ValueType,
        func: impl Fn(&Inputs<'_>) -> Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        Calculation {
            name: name.into(),
            imports: Vec::new(),
            params: Vec::new(),
            output,
            func: Arc::new(func),
        }
    }

    /// Declares a parameter wired to `reference` (e.g. `"$.capacity"`,
    /// `"@sizing.total"`, `"Power::$.bus_voltage"`).
    pub fn param(mut self, name: impl Into<String>, reference: impl Into<String>) -> Self {
        self.params.push(Param {
            name: name.into(),
            reference: reference.into(),
        });
        self
    }

    /// Declares that references into `scope` are legal from this component.
    pub fn import(mut self, scope: impl Into<String>) -> Self {
        self.imports.push(scope.into());
        self
    }
}

impl fmt::Debug for Calculation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Calculation")
            .field("name", &self.name)
            .field("imports", &self.imports)
            .field("params", &self.params)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

/// A boolean check bound to a scope.
///
/// Structurally a calculation whose output is constrained to `bool` or a
/// table of `bool` — the constructors enforce the constraint, so a
/// verification's per-key results are always independent pass/fail nodes.
#[derive(Clone)]
pub struct Verification {
    pub name: String,
    pub imports: Vec<String>,
    pub params: Vec<Param>,
    pub output: ValueType,
    pub xfail: bool,
    pub func: ComputeFn,
}

impl Verification {
    /// A verification producing a single boolean.
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(&Inputs<'_>) -> Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        Verification {
            name: name.into(),
            imports: Vec::new(),
            params: Vec::new(),
            output: ValueType::Bool,
            xfail: false,
            func: Arc::new(func),
        }
    }

    /// A verification producing one boolean per key of `domain`.
    pub fn per_key(
        name: impl Into<String>,
        domain: KeyDomain,
        func: impl Fn(&Inputs<'_>) -> Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        Verification {
            name: name.into(),
            imports: Vec::new(),
            params: Vec::new(),
            output: ValueType::table(domain, ValueType::Bool),
            xfail: false,
            func: Arc::new(func),
        }
    }

    pub fn param(mut self, name: impl Into<String>, reference: impl Into<String>) -> Self {
        self.params.push(Param {
            name: name.into(),
            reference: reference.into(),
        });
        self
    }

    pub fn import(mut self, scope: impl Into<String>) -> Self {
        self.imports.push(scope.into());
        self
    }

    /// Marks an expected failure: a FAIL result is still reported but does
    /// not count toward the run's unexpected-failure aggregate.
    pub fn xfail(mut self, xfail: bool) -> Self {
        self.xfail = xfail;
        self
    }
}

impl fmt::Debug for Verification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Verification")
            .field("name", &self.name)
            .field("imports", &self.imports)
            .field("params", &self.params)
            .field("output", &self.output)
            .field("xfail", &self.xfail)
            .finish_non_exhaustive()
    }
}

/// A human-authored traceability node.
///
/// Requirements form a forest separate from the computation graph: a
/// requirement may link verification results (`verified_by`), sit under a
/// parent declared anywhere in the project (`under`), and depend on other
/// requirements (`depends_on`). All attachment happens before
/// [`Project::compile`]; the compiled forest is immutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub id: String,
    pub description: String,
    pub verified_by: Vec<String>,
    pub depends_on: Vec<String>,
    pub parent: Option<String>,
    pub xfail: bool,
}

impl Requirement {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Requirement {
            id: id.into(),
            description: description.into(),
            verified_by: Vec::new(),
            depends_on: Vec::new(),
            parent: None,
            xfail: false,
        }
    }

    /// Links a verification by reference (`"?name"` or `"Scope::?name"`).
    pub fn verified_by(mut self, reference: impl Into<String>) -> Self {
        self.verified_by.push(reference.into());
        self
    }

    /// Declares a hard dependency: if `id`'s status is FAILED, this
    /// requirement is forced to FAILED as well.
    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        self.depends_on.push(id.into());
        self
    }

    /// Attaches this requirement as a child of `parent_id`, which may be
    /// declared in any scope.
    pub fn under(mut self, parent_id: impl Into<String>) -> Self {
        self.parent = Some(parent_id.into());
        self
    }

    /// Marks a requirement whose failure is expected.
    pub fn xfail(mut self, xfail: bool) -> Self {
        self.xfail = xfail;
        self
    }
}

/// A named partition of the graph: one input record, plus ordered
/// calculations, verifications, and requirement definitions.
#[derive(Debug, Clone)]
pub struct Scope {
    name: String,
    input: RecordShape,
    calculations: Vec<Calculation>,
    verifications: Vec<Verification>,
    requirements: Vec<Requirement>,
}

impl Scope {
    pub fn new(name: impl Into<String>, input: RecordShape) -> Self {
        Scope {
            name: name.into(),
            input,
            calculations: Vec::new(),
            verifications: Vec::new(),
            requirements: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input(&self) -> &RecordShape {
        &self.input
    }

    pub fn calculations(&self) -> &[Calculation] {
        &self.calculations
    }

    pub fn verifications(&self) -> &[Verification] {
        &self.verifications
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    pub fn add_calculation(&mut self, calculation: Calculation) -> Result<(), SchemaError> {
        if self.calculations.iter().any(|c| c.name == calculation.name) {
            return Err(SchemaError::DuplicateCalculation {
                scope: self.name.clone(),
                name: calculation.name,
            });
        }
        self.calculations.push(calculation);
        Ok(())
    }

    pub fn add_verification(&mut self, verification: Verification) -> Result<(), SchemaError> {
        if self
            .verifications
            .iter()
            .any(|v| v.name == verification.name)
        {
            return Err(SchemaError::DuplicateVerification {
                scope: self.name.clone(),
                name: verification.name,
            });
        }
        self.verifications.push(verification);
        Ok(())
    }

    /// Registers a requirement. Cross-scope uniqueness and parent/link
    /// resolution are checked at [`Project::compile`].
    pub fn add_requirement(&mut self, requirement: Requirement) -> Result<(), SchemaError> {
        if self.requirements.iter().any(|r| r.id == requirement.id) {
            return Err(SchemaError::DuplicateRequirement {
                id: requirement.id,
                first: self.name.clone(),
                second: self.name.clone(),
            });
        }
        self.requirements.push(requirement);
        Ok(())
    }
}

/// The root schema object: an ordered collection of scopes.
#[derive(Debug, Clone, Default)]
pub struct Project {
    pub name: String,
    scopes: Vec<Scope>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Project {
            name: name.into(),
            scopes: Vec::new(),
        }
    }

    pub fn add_scope(&mut self, scope: Scope) -> Result<(), SchemaError> {
        if self.scopes.iter().any(|s| s.name == scope.name) {
            return Err(SchemaError::DuplicateScope { name: scope.name });
        }
        self.scopes.push(scope);
        Ok(())
    }

    /// Scopes in declaration order.
    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    pub fn scope(&self, name: &str) -> Option<&Scope> {
        self.scopes.iter().find(|s| s.name == name)
    }

    /// Resolves every reference, validates imports and requirements, and
    /// freezes the schema into an evaluable node graph. All structural
    /// problems are reported together.
    pub fn compile(&self) -> Result<crate::graph::NodeGraph, Vec<SchemaError>> {
        crate::graph::NodeGraph::build(self)
    }
}
