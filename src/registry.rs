//! The property registry: every registered property, its group and names.
//!
//! Built once by [`RegistryBuilder::build`] and immutable afterwards. Naming
//! collisions are not fatal to building itself: they are returned as
//! [`ConstructionProblem`]s so every collision is reported in one pass, and
//! the engine refuses to load anything when there are any.

use crate::group::PropertyGroup;
use crate::naming::{CaseInsensitiveNaming, EffectiveName, NamingStrategy};
use crate::problem::{ConstructionProblem, ProblemList, PropertyRef};
use crate::property::{AnyProperty, DynProperty, Property, PropertyId, PropertyType};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// One registered property.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    property: DynProperty,
    group: usize,
    group_name: String,
    canonical: EffectiveName,
    aliases: Vec<EffectiveName>,
}

impl RegistryEntry {
    pub fn property(&self) -> &DynProperty {
        &self.property
    }

    pub fn id(&self) -> PropertyId {
        self.property.id()
    }

    pub fn group_name(&self) -> &str {
        &self.group_name
    }

    /// Index of the owning group in [`PropertyRegistry::groups`].
    pub fn group_index(&self) -> usize {
        self.group
    }

    pub fn canonical_name(&self) -> &str {
        &self.canonical.actual
    }

    pub fn canonical(&self) -> &EffectiveName {
        &self.canonical
    }

    pub fn aliases(&self) -> &[EffectiveName] {
        &self.aliases
    }

    /// Canonical name and input aliases, as declared.
    pub fn in_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(&self.canonical)
            .chain(self.aliases.iter())
            .filter(|n| n.direction.is_in())
            .map(|n| n.actual.as_str())
    }

    pub fn property_ref(&self) -> PropertyRef {
        PropertyRef {
            id: self.property.id(),
            name: self.canonical.actual.clone(),
            group: self.group_name.clone(),
        }
    }
}

/// A registered group.
#[derive(Debug, Clone)]
pub struct GroupEntry {
    pub name: String,
    pub members: Vec<PropertyId>,
    pub at_least_one_required: bool,
}

/// Immutable catalog of properties and the names that map to them.
pub struct PropertyRegistry {
    naming: Arc<dyn NamingStrategy>,
    entries: Vec<RegistryEntry>,
    by_id: HashMap<PropertyId, usize>,
    /// Effective input names to entry index.
    in_names: HashMap<String, usize>,
    groups: Vec<GroupEntry>,
}

impl fmt::Debug for PropertyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyRegistry")
            .field("naming", &self.naming)
            .field("properties", &self.entries.len())
            .field("groups", &self.groups.len())
            .finish()
    }
}

impl PropertyRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn naming(&self) -> &dyn NamingStrategy {
        self.naming.as_ref()
    }

    /// Entries in registration order.
    pub fn entries(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn groups(&self) -> &[GroupEntry] {
        &self.groups
    }

    pub fn entry(&self, id: PropertyId) -> Option<&RegistryEntry> {
        self.by_id.get(&id).map(|&index| &self.entries[index])
    }

    pub fn contains(&self, id: PropertyId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn canonical_name<T: PropertyType>(&self, property: &Property<T>) -> Option<&str> {
        self.entry(property.id()).map(RegistryEntry::canonical_name)
    }

    pub fn aliases<T: PropertyType>(&self, property: &Property<T>) -> &[EffectiveName] {
        self.entry(property.id())
            .map(RegistryEntry::aliases)
            .unwrap_or_default()
    }

    /// Look up a property by any input name, normalized with the naming strategy.
    pub fn property_for_name(&self, name: &str) -> Option<&DynProperty> {
        self.entry_for_name(name).map(RegistryEntry::property)
    }

    pub fn entry_for_name(&self, name: &str) -> Option<&RegistryEntry> {
        let effective = self.naming.to_effective_name(name);
        self.in_names
            .get(&effective)
            .map(|&index| &self.entries[index])
    }

    /// Diagnostic reference for any property, registered or not.
    pub fn property_ref(&self, property: &dyn AnyProperty) -> PropertyRef {
        match self.entry(property.id()) {
            Some(entry) => entry.property_ref(),
            None => PropertyRef {
                id: property.id(),
                name: property.name().to_string(),
                group: String::new(),
            },
        }
    }
}

/// Collects groups and builds a [`PropertyRegistry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    groups: Vec<PropertyGroup>,
    naming: Option<Arc<dyn NamingStrategy>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn naming(mut self, naming: Arc<dyn NamingStrategy>) -> Self {
        self.naming = Some(naming);
        self
    }

    pub fn group(mut self, group: PropertyGroup) -> Self {
        self.groups.push(group);
        self
    }

    pub fn groups(mut self, groups: impl IntoIterator<Item = PropertyGroup>) -> Self {
        self.groups.extend(groups);
        self
    }

    /// Register a single property into the named group, creating the group on first use.
    pub fn register<T: PropertyType>(mut self, group: &str, property: &Property<T>) -> Self {
        match self.groups.iter_mut().find(|g| g.name() == group) {
            Some(existing) => {
                existing.add(property);
            }
            None => self.groups.push(PropertyGroup::new(group).with(property)),
        }
        self
    }

    /// Finalize. Registration order (group order, then member order) decides
    /// name ownership: the first property to claim a name keeps it.
    pub fn build(self) -> (PropertyRegistry, ProblemList<ConstructionProblem>) {
        let naming = self
            .naming
            .unwrap_or_else(|| Arc::new(CaseInsensitiveNaming));
        let mut problems = ProblemList::new();
        let mut entries: Vec<RegistryEntry> = Vec::new();
        let mut by_id: HashMap<PropertyId, usize> = HashMap::new();
        // Every effective name (any direction) to its owning entry.
        let mut all_names: HashMap<String, usize> = HashMap::new();
        let mut in_names: HashMap<String, usize> = HashMap::new();
        let mut groups = Vec::with_capacity(self.groups.len());

        for (group_index, group) in self.groups.iter().enumerate() {
            let mut members = Vec::new();

            for property in group.properties() {
                if let Some(&existing) = by_id.get(&property.id()) {
                    let first: &RegistryEntry = &entries[existing];
                    problems.add(ConstructionProblem::DuplicateProperty {
                        property: first.property_ref(),
                        first_group: first.group_name.clone(),
                        second_group: group.name().to_string(),
                    });
                    continue;
                }

                let names = match naming.build_names(property.as_ref(), group.name()) {
                    Ok(names) => names,
                    Err(error) => {
                        problems.add(ConstructionProblem::InvalidName {
                            property: PropertyRef {
                                id: property.id(),
                                name: property.name().to_string(),
                                group: group.name().to_string(),
                            },
                            error,
                        });
                        continue;
                    }
                };

                let index = entries.len();
                let entry = RegistryEntry {
                    property: Arc::clone(property),
                    group: group_index,
                    group_name: group.name().to_string(),
                    canonical: names.canonical.clone(),
                    aliases: names.aliases.clone(),
                };

                for name in names.all() {
                    match all_names.get(&name.effective) {
                        // The property repeats one of its own names.
                        Some(&owner) if owner == index => {}
                        Some(&owner) => {
                            problems.add(ConstructionProblem::NonUniqueNames {
                                ref_property: entries[owner].property_ref(),
                                bad_property: entry.property_ref(),
                                conflict_name: name.actual.clone(),
                            });
                        }
                        None => {
                            all_names.insert(name.effective.clone(), index);
                            if name.direction.is_in() {
                                in_names.insert(name.effective.clone(), index);
                            }
                        }
                    }
                }

                if let Err(message) = property.check_default() {
                    problems.add(ConstructionProblem::InvalidDefaultValue {
                        property: entry.property_ref(),
                        default: property.default_raw().unwrap_or_default(),
                        message,
                    });
                }

                for message in property.invalid_validator_specs() {
                    problems.add(ConstructionProblem::InvalidValidator {
                        property: entry.property_ref(),
                        message,
                    });
                }

                by_id.insert(property.id(), index);
                members.push(property.id());
                entries.push(entry);
            }

            groups.push(GroupEntry {
                name: group.name().to_string(),
                members,
                at_least_one_required: group.is_at_least_one_required(),
            });
        }

        debug!(
            properties = entries.len(),
            groups = groups.len(),
            problems = problems.len(),
            "property registry built"
        );

        let registry = PropertyRegistry {
            naming,
            entries,
            by_id,
            in_names,
            groups,
        };
        (registry, problems)
    }
}
