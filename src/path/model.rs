//! Path value types: roots, segments, and scope qualification.

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;

use super::parse::{parse_path, PathError};

/// One step into a structured value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
    /// Named field of a record.
    Attr(String),
    /// Table entry. One component per key axis, in declared axis order.
    Key(SmallVec<[String; 2]>),
}

impl Segment {
    pub fn attr(name: impl Into<String>) -> Self {
        Segment::Attr(name.into())
    }

    pub fn key<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Segment::Key(components.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Attr(name) => write!(f, ".{name}"),
            Segment::Key(components) => write!(f, "[{}]", components.join(",")),
        }
    }
}

/// The addressable root within one scope.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathRoot {
    /// The scope's input record (`$`).
    Model,
    /// A named calculation's output (`@name`).
    Calc(String),
    /// A named verification's result (`?name`).
    Verification(String),
}

impl fmt::Display for PathRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathRoot::Model => write!(f, "$"),
            PathRoot::Calc(name) => write!(f, "@{name}"),
            PathRoot::Verification(name) => write!(f, "?{name}"),
        }
    }
}

/// A scope-relative address: root plus segment sequence.
///
/// Two paths are equal iff root and segments are equal; ordering is
/// structural and stable across runs, so paths serve as deterministic map
/// keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path {
    pub root: PathRoot,
    pub segments: SmallVec<[Segment; 4]>,
}

impl Path {
    pub fn model() -> Self {
        Path {
            root: PathRoot::Model,
            segments: SmallVec::new(),
        }
    }

    pub fn calc(name: impl Into<String>) -> Self {
        Path {
            root: PathRoot::Calc(name.into()),
            segments: SmallVec::new(),
        }
    }

    pub fn verification(name: impl Into<String>) -> Self {
        Path {
            root: PathRoot::Verification(name.into()),
            segments: SmallVec::new(),
        }
    }

    /// Returns a copy with `segment` appended.
    pub fn join(&self, segment: Segment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Path {
            root: self.root.clone(),
            segments,
        }
    }

    /// Returns a copy with all of `tail` appended.
    pub fn extend(&self, tail: &[Segment]) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(tail.iter().cloned());
        Path {
            root: self.root.clone(),
            segments,
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)?;
        for segment in &self.segments {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

/// A fully qualified address: owning scope plus scope-relative path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopedPath {
    pub scope: String,
    pub path: Path,
}

impl ScopedPath {
    pub fn new(scope: impl Into<String>, path: Path) -> Self {
        ScopedPath {
            scope: scope.into(),
            path,
        }
    }

    /// Parses `text`, inheriting `default_scope` when no `Scope::` prefix is
    /// present.
    pub fn parse(text: &str, default_scope: &str) -> Result<Self, PathError> {
        let (scope, path) = parse_path(text)?;
        Ok(ScopedPath {
            scope: scope.unwrap_or_else(|| default_scope.to_string()),
            path,
        })
    }
}

impl fmt::Display for ScopedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.scope, self.path)
    }
}

// Paths serialize as their textual form; the text round-trips through the
// parser, which keeps document keys human-readable.
impl Serialize for ScopedPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ScopedPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        let (scope, path) = parse_path(&text).map_err(D::Error::custom)?;
        let scope = scope.ok_or_else(|| {
            D::Error::custom(format!("path '{text}' is missing an explicit scope"))
        })?;
        Ok(ScopedPath { scope, path })
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Path {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        let (scope, path) = parse_path(&text).map_err(D::Error::custom)?;
        if scope.is_some() {
            return Err(D::Error::custom(format!(
                "expected a scope-relative path, got '{text}'"
            )));
        }
        Ok(path)
    }
}
