//! Surface syntax parser for paths.
//!
//! Grammar:
//!
//! ```text
//! path     := (scope "::")? root segment*
//! root     := "$" | "@" ident | "?" ident
//! segment  := "." ident | "[" key ("," key)* "]"
//! ident    := [A-Za-z_][A-Za-z0-9_]*
//! key      := [A-Za-z0-9_-]+            (surrounding spaces ignored)
//! ```

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char as pchar, space0},
    combinator::{all_consuming, map, opt, recognize},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};
use thiserror::Error;

use super::model::{Path, PathRoot, Segment};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("invalid path syntax in '{text}': {reason}")]
    InvalidPathSyntax { text: String, reason: String },
    #[error("no node exists at path '{path}'")]
    UnknownPath { path: String },
}

fn ident(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

fn key_component(input: &str) -> IResult<&str, &str> {
    delimited(
        space0,
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-'),
        space0,
    )(input)
}

fn root(input: &str) -> IResult<&str, PathRoot> {
    alt((
        map(pchar('$'), |_| PathRoot::Model),
        map(preceded(pchar('@'), ident), |name| {
            PathRoot::Calc(name.to_string())
        }),
        map(preceded(pchar('?'), ident), |name| {
            PathRoot::Verification(name.to_string())
        }),
    ))(input)
}

fn segment(input: &str) -> IResult<&str, Segment> {
    alt((
        map(preceded(pchar('.'), ident), Segment::attr),
        map(
            delimited(
                pchar('['),
                separated_list1(pchar(','), key_component),
                pchar(']'),
            ),
            Segment::key,
        ),
    ))(input)
}

fn scoped_path(input: &str) -> IResult<&str, (Option<&str>, Path)> {
    map(
        tuple((opt(terminated(ident, tag("::"))), root, many0(segment))),
        |(scope, root, segments)| {
            (
                scope,
                Path {
                    root,
                    segments: segments.into_iter().collect(),
                },
            )
        },
    )(input)
}

/// Parses `text` into an optional explicit scope and a scope-relative path.
///
/// The scope is `None` when the text has no `Scope::` prefix; the caller
/// supplies the inherited scope (see [`super::ScopedPath::parse`]).
pub fn parse_path(text: &str) -> Result<(Option<String>, Path), PathError> {
    let trimmed = text.trim();
    match all_consuming(scoped_path)(trimmed) {
        Ok((_, (scope, path))) => Ok((scope.map(str::to_string), path)),
        Err(_) => Err(PathError::InvalidPathSyntax {
            text: text.to_string(),
            reason: diagnose(trimmed),
        }),
    }
}

/// Produces a human-oriented reason for a parse failure.
fn diagnose(text: &str) -> String {
    if text.is_empty() {
        return "empty path".to_string();
    }
    let opens = text.matches('[').count();
    let closes = text.matches(']').count();
    if opens != closes {
        return "unbalanced brackets".to_string();
    }
    if text.contains("[]") || text.contains("[,") || text.contains(",]") || text.contains(",,") {
        return "empty table key".to_string();
    }
    if text.contains("..") || text.ends_with('.') {
        return "empty attribute segment".to_string();
    }
    if !text.contains(['$', '@', '?']) {
        return "missing root marker ('$', '@name' or '?name')".to_string();
    }
    "unexpected character".to_string()
}
