use crate::loader::{LoadContext, LoadedEntry, Loader, LoaderValues};
use crate::property::{Property, PropertyType};
use std::sync::Arc;

/// Values held in memory: by name, by property, or already typed.
#[derive(Debug, Clone)]
pub struct FixedValueLoader {
    description: String,
    entries: Vec<LoadedEntry>,
    report_unknown: bool,
}

impl FixedValueLoader {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            entries: Vec::new(),
            report_unknown: true,
        }
    }

    /// `name=raw`, where `name` is any input name of a property.
    pub fn with_name(mut self, name: impl Into<String>, raw: impl Into<String>) -> Self {
        self.entries.push(LoadedEntry::Named {
            name: name.into(),
            raw: raw.into(),
        });
        self
    }

    /// A raw value for a known property.
    pub fn with_raw<T: PropertyType>(mut self, property: &Property<T>, raw: impl Into<String>) -> Self {
        self.entries.push(LoadedEntry::Raw {
            property: property.to_dyn(),
            raw: raw.into(),
            name: None,
        });
        self
    }

    /// A typed value for a known property.
    pub fn with_value<T: PropertyType>(mut self, property: &Property<T>, value: T) -> Self {
        self.entries.push(LoadedEntry::Value {
            property: property.to_dyn(),
            value: Arc::new(value),
        });
        self
    }

    /// Parse `name=value` pairs; an entry without `=` is a flag set to `true`.
    pub fn with_pairs<I, S>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for pair in pairs {
            let (name, raw) = split_pair(pair.as_ref());
            if !name.is_empty() {
                self = self.with_name(name, raw);
            }
        }
        self
    }

    pub fn report_unknown(mut self, report: bool) -> Self {
        self.report_unknown = report;
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Split `name=value`, trimming the name. No `=` means a `true` flag.
pub(crate) fn split_pair(pair: &str) -> (&str, &str) {
    match pair.split_once('=') {
        Some((name, raw)) => (name.trim(), raw),
        None => (pair.trim(), "true"),
    }
}

impl Loader for FixedValueLoader {
    fn load(&self, _ctx: &LoadContext<'_>) -> LoaderValues {
        LoaderValues {
            entries: self.entries.clone(),
            problems: Vec::new(),
        }
    }

    fn specific_load_description(&self) -> String {
        self.description.clone()
    }

    fn reports_unknown_properties(&self) -> bool {
        self.report_unknown
    }
}
