//! The four problem kinds and the list that aggregates them.
//!
//! - [`ConstructionProblem`]: the declarations or the engine setup are wrong.
//!   Always fatal; no loader runs.
//! - [`LoaderProblem`]: a source failed to supply or parse a value.
//! - [`ValueProblem`]: a parsed value was rejected by a validator.
//! - [`RequirementProblem`]: a required value is missing after all loaders ran.
//!
//! Resolution collects every problem it can find in one pass and reports them
//! together through a [`ProblemList`].

use crate::error::{ParseError, ProblemCode};
use crate::lifecycle::InitOrigin;
use crate::naming::NamingError;
use crate::property::PropertyId;
use crate::values::ValueSource;
use serde::Serialize;
use std::fmt;

/// Diagnostic reference to a property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyRef {
    pub id: PropertyId,
    /// Canonical name, or the field name if naming failed.
    pub name: String,
    pub group: String,
}

impl fmt::Display for PropertyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Diagnostic reference to a loader by its position in the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoaderRef {
    /// Zero-based position in the loader list.
    pub position: usize,
    pub description: String,
}

impl fmt::Display for LoaderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loader #{} ({})", self.position + 1, self.description)
    }
}

/// The declarations or the engine configuration are invalid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConstructionProblem {
    #[error("{bad_property} cannot use the name '{conflict_name}': it is already used by {ref_property}")]
    NonUniqueNames {
        ref_property: PropertyRef,
        bad_property: PropertyRef,
        conflict_name: String,
    },

    #[error("property {property} is registered more than once (in '{first_group}' and '{second_group}')")]
    DuplicateProperty {
        property: PropertyRef,
        first_group: String,
        second_group: String,
    },

    #[error("{loader} is the same loader instance as loader #{}", .first_position + 1)]
    DuplicateLoader { loader: LoaderRef, first_position: usize },

    #[error("property {property} has an invalid name: {error}")]
    InvalidName { property: PropertyRef, error: NamingError },

    #[error("default value '{default}' of {property} is invalid: {message}")]
    InvalidDefaultValue {
        property: PropertyRef,
        default: String,
        message: String,
    },

    #[error("a validator of {property} is misconfigured: {message}")]
    InvalidValidator { property: PropertyRef, message: String },

    #[error("a forced value was supplied for {property}, which is not registered")]
    UnregisteredForcedValue { property: PropertyRef },

    #[error("configuration initialization re-entered itself: {reentrant} was requested while {original} was still in progress")]
    InitiationLoop {
        original: InitOrigin,
        reentrant: InitOrigin,
    },

    #[error("configuration is already initialized ({original}); {attempted} was rejected")]
    AlreadyInitialized {
        original: InitOrigin,
        attempted: InitOrigin,
    },
}

impl ConstructionProblem {
    pub fn code(&self) -> ProblemCode {
        match self {
            ConstructionProblem::NonUniqueNames { .. } => ProblemCode::NonUniqueNames,
            ConstructionProblem::DuplicateProperty { .. } => ProblemCode::DuplicateProperty,
            ConstructionProblem::DuplicateLoader { .. } => ProblemCode::DuplicateLoader,
            ConstructionProblem::InvalidName { .. } => ProblemCode::InvalidName,
            ConstructionProblem::InvalidDefaultValue { .. } => ProblemCode::InvalidDefaultValue,
            ConstructionProblem::InvalidValidator { .. } => ProblemCode::InvalidValidator,
            ConstructionProblem::UnregisteredForcedValue { .. } => ProblemCode::UnregisteredForcedValue,
            ConstructionProblem::InitiationLoop { .. } => ProblemCode::InitiationLoop,
            ConstructionProblem::AlreadyInitialized { .. } => ProblemCode::AlreadyInitialized,
        }
    }
}

/// What went wrong inside one loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoaderProblemKind {
    #[error("{property} was already set by {first_source}{}", name_suffix(.name))]
    DuplicateProperty {
        property: PropertyRef,
        name: Option<String>,
        first_source: ValueSource,
    },

    #[error("'{name}' is not a known property name")]
    UnknownProperty { name: String },

    #[error("{property}{}: {error}", name_suffix(.name))]
    Parse {
        property: PropertyRef,
        name: Option<String>,
        error: ParseError,
    },

    #[error("source not found: {location} ({message})")]
    SourceNotFound { location: String, message: String },

    #[error("error reading {location}: {message}")]
    SourceError { location: String, message: String },
}

fn name_suffix(name: &Option<String>) -> String {
    match name {
        Some(name) => format!(" (as '{name}')"),
        None => String::new(),
    }
}

impl LoaderProblemKind {
    pub fn source_not_found(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceNotFound {
            location: location.into(),
            message: message.into(),
        }
    }

    pub fn source_error(location: impl Into<String>, message: impl ToString) -> Self {
        Self::SourceError {
            location: location.into(),
            message: message.to_string(),
        }
    }

    pub fn code(&self) -> ProblemCode {
        match self {
            LoaderProblemKind::DuplicateProperty { .. } => ProblemCode::DuplicatePropertyLoader,
            LoaderProblemKind::UnknownProperty { .. } => ProblemCode::UnknownProperty,
            LoaderProblemKind::Parse { .. } => ProblemCode::ParseFailure,
            LoaderProblemKind::SourceNotFound { .. } => ProblemCode::SourceNotFound,
            LoaderProblemKind::SourceError { .. } => ProblemCode::SourceError,
        }
    }

    /// The property the problem is about, if it concerns a single property.
    pub fn property(&self) -> Option<&PropertyRef> {
        match self {
            LoaderProblemKind::DuplicateProperty { property, .. }
            | LoaderProblemKind::Parse { property, .. } => Some(property),
            _ => None,
        }
    }
}

/// A source failed to supply or parse a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{loader}: {kind}")]
pub struct LoaderProblem {
    pub loader: LoaderRef,
    pub kind: LoaderProblemKind,
}

impl LoaderProblem {
    pub fn code(&self) -> ProblemCode {
        self.kind.code()
    }
}

/// A parsed value was rejected by one of its property's validators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{property} = '{value}' from {supplied_by}: {message}")]
pub struct ValueProblem {
    pub property: PropertyRef,
    pub value: String,
    pub supplied_by: ValueSource,
    pub message: String,
}

impl ValueProblem {
    pub fn code(&self) -> ProblemCode {
        ProblemCode::InvalidValue
    }
}

/// A required value is missing after every loader ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequirementProblem {
    #[error("{property} is required but has no value and no default")]
    RequiredProperty { property: PropertyRef },

    #[error("at least one property of group '{group}' must be set")]
    RequiredGroup { group: String },
}

impl RequirementProblem {
    pub fn code(&self) -> ProblemCode {
        match self {
            RequirementProblem::RequiredProperty { .. } => ProblemCode::RequiredProperty,
            RequirementProblem::RequiredGroup { .. } => ProblemCode::RequiredGroup,
        }
    }
}

/// Any problem found during resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "category", content = "problem", rename_all = "snake_case")]
pub enum Problem {
    #[error(transparent)]
    Construction(#[from] ConstructionProblem),
    #[error(transparent)]
    Loader(#[from] LoaderProblem),
    #[error(transparent)]
    Value(#[from] ValueProblem),
    #[error(transparent)]
    Requirement(#[from] RequirementProblem),
}

impl Problem {
    pub fn code(&self) -> ProblemCode {
        match self {
            Problem::Construction(p) => p.code(),
            Problem::Loader(p) => p.code(),
            Problem::Value(p) => p.code(),
            Problem::Requirement(p) => p.code(),
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            Problem::Construction(_) => "construction",
            Problem::Loader(_) => "loader",
            Problem::Value(_) => "value",
            Problem::Requirement(_) => "requirement",
        }
    }
}

/// Ordered collection of problems.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ProblemList<P = Problem> {
    problems: Vec<P>,
}

impl<P> Default for ProblemList<P> {
    fn default() -> Self {
        Self {
            problems: Vec::new(),
        }
    }
}

impl<P> ProblemList<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, problem: impl Into<P>) {
        self.problems.push(problem.into());
    }

    /// Add a problem if there is one; `None` is ignored.
    pub fn add_opt<Q: Into<P>>(&mut self, problem: Option<Q>) {
        if let Some(problem) = problem {
            self.add(problem);
        }
    }

    /// Append every problem of another list, converting as needed.
    pub fn add_all<Q: Into<P>>(&mut self, other: ProblemList<Q>) {
        self.problems.extend(other.problems.into_iter().map(Into::into));
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, P> {
        self.problems.iter()
    }

    pub fn first(&self) -> Option<&P> {
        self.problems.first()
    }

    pub fn into_vec(self) -> Vec<P> {
        self.problems
    }
}

impl ProblemList<Problem> {
    pub fn construction(&self) -> impl Iterator<Item = &ConstructionProblem> {
        self.problems.iter().filter_map(|p| match p {
            Problem::Construction(p) => Some(p),
            _ => None,
        })
    }

    pub fn loader(&self) -> impl Iterator<Item = &LoaderProblem> {
        self.problems.iter().filter_map(|p| match p {
            Problem::Loader(p) => Some(p),
            _ => None,
        })
    }

    pub fn value(&self) -> impl Iterator<Item = &ValueProblem> {
        self.problems.iter().filter_map(|p| match p {
            Problem::Value(p) => Some(p),
            _ => None,
        })
    }

    pub fn requirement(&self) -> impl Iterator<Item = &RequirementProblem> {
        self.problems.iter().filter_map(|p| match p {
            Problem::Requirement(p) => Some(p),
            _ => None,
        })
    }

    pub fn has_construction_problems(&self) -> bool {
        self.construction().next().is_some()
    }

    pub fn with_code(&self, code: ProblemCode) -> impl Iterator<Item = &Problem> {
        self.problems.iter().filter(move |p| p.code() == code)
    }
}

impl<P> IntoIterator for ProblemList<P> {
    type Item = P;
    type IntoIter = std::vec::IntoIter<P>;

    fn into_iter(self) -> Self::IntoIter {
        self.problems.into_iter()
    }
}

impl<'a, P> IntoIterator for &'a ProblemList<P> {
    type Item = &'a P;
    type IntoIter = std::slice::Iter<'a, P>;

    fn into_iter(self) -> Self::IntoIter {
        self.problems.iter()
    }
}

impl<P> FromIterator<P> for ProblemList<P> {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self {
            problems: iter.into_iter().collect(),
        }
    }
}

impl<P> Extend<P> for ProblemList<P> {
    fn extend<I: IntoIterator<Item = P>>(&mut self, iter: I) {
        self.problems.extend(iter);
    }
}

impl From<ConstructionProblem> for ProblemList<Problem> {
    fn from(problem: ConstructionProblem) -> Self {
        Self {
            problems: vec![problem.into()],
        }
    }
}

impl fmt::Display for ProblemList<Problem> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} configuration problem(s)", self.problems.len())?;
        for problem in &self.problems {
            write!(f, "\n  - [{}] {}", problem.category(), problem)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProblemList<Problem> {}
