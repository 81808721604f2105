//! The loader contract and the process environment abstraction.
//!
//! A [`Loader`] reads one source and returns what it found as
//! [`LoaderValues`]. It never claims values itself: the engine resolves
//! names, parses raw strings and applies first-wins precedence.

use crate::problem::LoaderProblemKind;
use crate::property::{DynProperty, ErasedValue, Property, PropertyType};
use crate::registry::PropertyRegistry;
use crate::values::LoadedValues;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Process environment seen by loaders.
pub trait Environment: Send + Sync + fmt::Debug {
    /// Value of one environment variable.
    fn var(&self, name: &str) -> Option<String>;

    /// Every environment variable.
    fn vars(&self) -> Vec<(String, String)>;

    /// Command line arguments, without the program name.
    fn args(&self) -> Vec<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnvironment;

impl Environment for SystemEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn vars(&self) -> Vec<(String, String)> {
        std::env::vars_os()
            .map(|(k, v)| (k.to_string_lossy().into_owned(), v.to_string_lossy().into_owned()))
            .collect()
    }

    fn args(&self) -> Vec<String> {
        std::env::args().skip(1).collect()
    }
}

/// In-memory environment, mostly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MapEnvironment {
    vars: BTreeMap<String, String>,
    args: Vec<String>,
}

impl MapEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl Environment for MapEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }

    fn vars(&self) -> Vec<(String, String)> {
        self.vars.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    fn args(&self) -> Vec<String> {
        self.args.clone()
    }
}

/// What a loader is given to work with.
pub struct LoadContext<'a> {
    pub registry: &'a PropertyRegistry,
    pub environment: &'a dyn Environment,
    /// Values claimed by forced values and earlier loaders.
    pub existing: &'a LoadedValues,
}

impl<'a> LoadContext<'a> {
    pub fn new(
        registry: &'a PropertyRegistry,
        environment: &'a dyn Environment,
        existing: &'a LoadedValues,
    ) -> Self {
        Self {
            registry,
            environment,
            existing,
        }
    }

    /// Value claimed so far for `property`, falling back to its default.
    pub fn value<'p, T: PropertyType>(&self, property: &'p Property<T>) -> Option<&'p T>
    where
        'a: 'p,
    {
        self.existing.get(property).or_else(|| property.default_value())
    }
}

/// One entry a loader found.
#[derive(Debug, Clone)]
pub enum LoadedEntry {
    /// A raw value under a name the engine resolves through the registry.
    Named { name: String, raw: String },
    /// A raw value for a property the loader already identified.
    Raw {
        property: DynProperty,
        raw: String,
        /// The source-side name, for diagnostics.
        name: Option<String>,
    },
    /// An already typed value.
    Value {
        property: DynProperty,
        value: ErasedValue,
    },
}

/// Output of one loader run. Entries keep the order the source produced them.
#[derive(Debug, Clone, Default)]
pub struct LoaderValues {
    pub entries: Vec<LoadedEntry>,
    pub problems: Vec<LoaderProblemKind>,
}

impl LoaderValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(&mut self, name: impl Into<String>, raw: impl Into<String>) {
        self.entries.push(LoadedEntry::Named {
            name: name.into(),
            raw: raw.into(),
        });
    }

    pub fn raw(&mut self, property: DynProperty, raw: impl Into<String>, name: Option<String>) {
        self.entries.push(LoadedEntry::Raw {
            property,
            raw: raw.into(),
            name,
        });
    }

    pub fn value<T: PropertyType>(&mut self, property: &Property<T>, value: T) {
        self.entries.push(LoadedEntry::Value {
            property: property.to_dyn(),
            value: Arc::new(value),
        });
    }

    pub fn problem(&mut self, problem: LoaderProblemKind) {
        self.problems.push(problem);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.problems.is_empty()
    }
}

/// A pluggable value source.
///
/// Loaders run synchronously and strictly in pipeline order. Identity is the
/// `Arc` holding the loader: the same instance may appear only once in a
/// pipeline, while several instances of one loader type are fine.
pub trait Loader: Send + Sync {
    fn load(&self, ctx: &LoadContext<'_>) -> LoaderValues;

    /// Human-readable source location for diagnostics.
    fn specific_load_description(&self) -> String;

    /// Whether names that match no property are reported.
    fn reports_unknown_properties(&self) -> bool {
        true
    }

    /// Called once after the whole pipeline ran.
    fn release_resources(&self) {}
}

impl fmt::Debug for dyn Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Loader({})", self.specific_load_description())
    }
}
