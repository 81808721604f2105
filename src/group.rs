//! Property groups: named containers sharing a namespace prefix.

use crate::property::{DynProperty, Property, PropertyType};

/// A named set of properties.
///
/// The group name becomes the prefix of every member's canonical name. Groups
/// are assembled explicitly; discovery (code generation, manifests) happens
/// outside the engine and ends in calls to [`PropertyGroup::add`].
#[derive(Debug, Clone)]
pub struct PropertyGroup {
    name: String,
    properties: Vec<DynProperty>,
    at_least_one_required: bool,
}

impl PropertyGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
            at_least_one_required: false,
        }
    }

    /// Add a property (builder style).
    pub fn with<T: PropertyType>(mut self, property: &Property<T>) -> Self {
        self.add(property);
        self
    }

    pub fn add<T: PropertyType>(&mut self, property: &Property<T>) -> &mut Self {
        self.properties.push(property.to_dyn());
        self
    }

    pub fn add_dyn(&mut self, property: DynProperty) -> &mut Self {
        self.properties.push(property);
        self
    }

    /// Require that at least one member receives an explicit value.
    pub fn require_at_least_one(mut self) -> Self {
        self.at_least_one_required = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn properties(&self) -> &[DynProperty] {
        &self.properties
    }

    pub fn is_at_least_one_required(&self) -> bool {
        self.at_least_one_required
    }
}
