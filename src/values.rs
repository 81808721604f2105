//! Loaded values: the accumulating set used during resolution and the
//! read-only map exposed once resolution is done.

use crate::problem::LoaderRef;
use crate::property::{DynProperty, ErasedValue, Property, PropertyId, PropertyType};
use crate::registry::PropertyRegistry;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Where a claimed value came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValueSource {
    /// Supplied by the caller as a forced override.
    Forced,
    Loader { loader: LoaderRef },
}

impl fmt::Display for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueSource::Forced => write!(f, "forced values"),
            ValueSource::Loader { loader } => write!(f, "{loader}"),
        }
    }
}

/// A value claimed for a property, with its context.
#[derive(Debug, Clone)]
pub struct ClaimedValue {
    pub value: ErasedValue,
    pub source: ValueSource,
    /// The raw string the value was parsed from, when there was one.
    pub raw: Option<String>,
    /// The name the source used, when it addressed the property by name.
    pub name: Option<String>,
}

/// Values claimed so far, in claim order.
///
/// The first claim for a property wins; the engine never overwrites an entry.
#[derive(Debug, Clone, Default)]
pub struct LoadedValues {
    values: HashMap<PropertyId, ClaimedValue>,
    order: Vec<PropertyId>,
}

impl LoadedValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a value. Returns the existing claim instead if there already is one.
    pub(crate) fn claim(&mut self, id: PropertyId, value: ClaimedValue) -> Result<(), &ClaimedValue> {
        if self.values.contains_key(&id) {
            return Err(&self.values[&id]);
        }
        self.values.insert(id, value);
        self.order.push(id);
        Ok(())
    }

    /// Typed value for a property, if one was claimed.
    pub fn get<T: PropertyType>(&self, property: &Property<T>) -> Option<&T> {
        self.values
            .get(&property.id())
            .and_then(|claimed| claimed.value.downcast_ref::<T>())
    }

    pub fn claimed(&self, id: PropertyId) -> Option<&ClaimedValue> {
        self.values.get(&id)
    }

    pub fn contains(&self, id: PropertyId) -> bool {
        self.values.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Claimed values in claim order.
    pub fn iter(&self) -> impl Iterator<Item = (PropertyId, &ClaimedValue)> {
        self.order
            .iter()
            .filter_map(|id| self.values.get(id).map(|claimed| (*id, claimed)))
    }
}

/// Typed values supplied by the caller that take precedence over every loader.
#[derive(Debug, Clone, Default)]
pub struct ForcedValues {
    entries: Vec<(DynProperty, ErasedValue)>,
}

impl ForcedValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force a value; forcing the same property again replaces the earlier value.
    pub fn set<T: PropertyType>(mut self, property: &Property<T>, value: T) -> Self {
        self.entries.retain(|(p, _)| p.id() != property.id());
        self.entries.push((property.to_dyn(), Arc::new(value)));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn entries(&self) -> &[(DynProperty, ErasedValue)] {
        &self.entries
    }
}

/// The resolved, read-only view of effective values.
///
/// Immutable once built; share it behind an `Arc` for concurrent reads.
#[derive(Debug, Clone)]
pub struct ValueMap {
    registry: Arc<PropertyRegistry>,
    values: LoadedValues,
}

impl ValueMap {
    pub(crate) fn new(registry: Arc<PropertyRegistry>, values: LoadedValues) -> Self {
        Self { registry, values }
    }

    pub fn registry(&self) -> &PropertyRegistry {
        &self.registry
    }

    /// Value supplied by a loader or a forced override.
    pub fn explicit_value<T: PropertyType>(&self, property: &Property<T>) -> Option<&T> {
        self.values.get(property)
    }

    /// Explicit value, falling back to the declared default.
    pub fn effective_value<'a, T: PropertyType>(&'a self, property: &'a Property<T>) -> Option<&'a T> {
        self.explicit_value(property).or_else(|| property.default_value())
    }

    pub fn is_explicitly_set<T: PropertyType>(&self, property: &Property<T>) -> bool {
        self.values.contains(property.id())
    }

    /// Where the explicit value of a property came from.
    pub fn source_of<T: PropertyType>(&self, property: &Property<T>) -> Option<&ValueSource> {
        self.values.claimed(property.id()).map(|c| &c.source)
    }

    pub fn claimed(&self, id: PropertyId) -> Option<&ClaimedValue> {
        self.values.claimed(id)
    }

    pub fn loaded(&self) -> &LoadedValues {
        &self.values
    }

    /// Raw form of the effective value of every registered property, in registration order.
    pub fn effective_raw_values(&self) -> Vec<EffectiveRawValue<'_>> {
        self.registry
            .entries()
            .map(|entry| {
                let property = entry.property();
                let claimed = self.values.claimed(property.id());
                let raw = match claimed {
                    Some(claimed) => property.raw_value(&claimed.value),
                    None => property.default_raw(),
                };
                EffectiveRawValue {
                    name: entry.canonical_name(),
                    value: raw,
                    source: claimed.map(|c| &c.source),
                }
            })
            .collect()
    }
}

/// Display row for reports: canonical name, effective raw value and its source.
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveRawValue<'a> {
    pub name: &'a str,
    pub value: Option<String>,
    /// `None` when the value is the declared default (or absent).
    pub source: Option<&'a ValueSource>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claimed(value: ErasedValue) -> ClaimedValue {
        ClaimedValue {
            value,
            source: ValueSource::Forced,
            raw: None,
            name: None,
        }
    }

    #[test]
    fn test_first_claim_wins() {
        let prop = Property::<String>::builder("A").build();
        let mut values = LoadedValues::new();

        assert!(values.claim(prop.id(), claimed(Arc::new("one".to_string()))).is_ok());
        assert!(values.claim(prop.id(), claimed(Arc::new("two".to_string()))).is_err());

        assert_eq!(values.get(&prop).map(String::as_str), Some("one"));
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn test_forced_values_replace_same_property() {
        let prop = Property::<i64>::builder("N").build();
        let forced = ForcedValues::new().set(&prop, 1).set(&prop, 2);
        assert_eq!(forced.len(), 1);
        let value = forced.entries()[0].1.downcast_ref::<i64>().copied();
        assert_eq!(value, Some(2));
    }

    #[test]
    fn test_effective_value_falls_back_to_default() {
        let (registry, _) = crate::registry::RegistryBuilder::new().build();
        let map = ValueMap::new(Arc::new(registry), LoadedValues::new());
        let effective = {
            let port = Property::<u16>::builder("PORT").default_value(8080).build();
            map.effective_value(&port).copied()
        };
        assert_eq!(effective, Some(8080));

        let port = Property::<u16>::builder("PORT").build();
        assert_eq!(map.effective_value(&port), None);
        assert!(!map.is_explicitly_set(&port));
    }
}
