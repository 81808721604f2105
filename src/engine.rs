//! The resolution engine: registry construction, the loader pipeline,
//! validation and requirement checks.
//!
//! Resolution runs in fixed phases:
//!
//! 1. Build the registry. Naming collisions, duplicate properties, invalid
//!    defaults and misconfigured validators are construction problems.
//! 2. Check the pipeline itself: duplicate loader instances, forced values
//!    for unregistered properties. Any construction problem stops here and
//!    no loader runs.
//! 3. Seed forced values, then run every loader in order. The first claim of
//!    a property wins; later claims are duplicate-property problems.
//! 4. Validate every claimed value, then check required properties and groups.
//!
//! Every problem is collected; nothing short-circuits after phase 2.

use crate::group::PropertyGroup;
use crate::lifecycle::{InitOrigin, LifecycleGuard};
use crate::loader::{Environment, LoadContext, LoadedEntry, Loader, SystemEnvironment};
use crate::naming::{CaseInsensitiveNaming, NamingStrategy};
use crate::problem::{
    ConstructionProblem, LoaderProblem, LoaderProblemKind, LoaderRef, ProblemList,
    RequirementProblem, ValueProblem,
};
use crate::property::{DynProperty, ErasedValue, Property, PropertyType};
use crate::registry::{PropertyRegistry, RegistryBuilder};
use crate::values::{ClaimedValue, ForcedValues, LoadedValues, ValueMap, ValueSource};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

const DEFAULT_LABEL: &str = "configuration";

/// Outcome of one resolution.
#[derive(Debug, Clone)]
pub struct Resolution {
    values: Option<ValueMap>,
    problems: ProblemList,
}

impl Resolution {
    fn failed(problems: ProblemList) -> Self {
        Self {
            values: None,
            problems,
        }
    }

    pub fn is_success(&self) -> bool {
        self.problems.is_empty()
    }

    /// The value map, only when resolution found no problems.
    pub fn values(&self) -> Option<&ValueMap> {
        if self.is_success() {
            self.values.as_ref()
        } else {
            None
        }
    }

    /// Whatever was loaded, problems or not. `None` when loading never started.
    pub fn partial_values(&self) -> Option<&ValueMap> {
        self.values.as_ref()
    }

    pub fn problems(&self) -> &ProblemList {
        &self.problems
    }

    pub fn into_result(self) -> Result<ValueMap, ProblemList> {
        match self.values {
            Some(values) if self.problems.is_empty() => Ok(values),
            _ => Err(self.problems),
        }
    }
}

/// A configured resolution pipeline. Reusable: every call to
/// [`resolve`](Resolver::resolve) builds a fresh registry and value set.
pub struct Resolver {
    groups: Vec<PropertyGroup>,
    loaders: Vec<Arc<dyn Loader>>,
    naming: Arc<dyn NamingStrategy>,
    environment: Arc<dyn Environment>,
    forced: ForcedValues,
    guard: Option<Arc<LifecycleGuard>>,
    label: String,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("label", &self.label)
            .field("groups", &self.groups.len())
            .field("loaders", &self.loaders)
            .field("naming", &self.naming)
            .field("forced", &self.forced.len())
            .finish()
    }
}

impl Resolver {
    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::new()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Run the pipeline. When a lifecycle guard is attached, a reentrant call
    /// (from a loader, for instance) fails with an initiation-loop problem.
    pub fn resolve(&self) -> Resolution {
        let Some(guard) = &self.guard else {
            return self.run();
        };
        let ticket = match guard.begin(InitOrigin::capture(&self.label)) {
            Ok(ticket) => ticket,
            Err(problem) => return Resolution::failed(problem.into()),
        };
        let resolution = self.run();
        ticket.complete(resolution.is_success());
        resolution
    }

    /// The pipeline without lifecycle bookkeeping.
    pub(crate) fn run(&self) -> Resolution {
        info!(
            label = %self.label,
            groups = self.groups.len(),
            loaders = self.loaders.len(),
            "resolving configuration"
        );

        let (registry, construction) = RegistryBuilder::new()
            .naming(Arc::clone(&self.naming))
            .groups(self.groups.iter().cloned())
            .build();
        let mut problems = ProblemList::new();
        problems.add_all(construction);
        self.check_loaders(&mut problems);
        self.check_forced(&registry, &mut problems);

        if !problems.is_empty() {
            warn!(
                label = %self.label,
                problems = problems.len(),
                "configuration is invalid; no loader was run"
            );
            return Resolution::failed(problems);
        }

        let registry = Arc::new(registry);
        let mut loaded = LoadedValues::new();
        for (property, value) in self.forced.entries() {
            let claimed = ClaimedValue {
                value: Arc::clone(value),
                source: ValueSource::Forced,
                raw: None,
                name: None,
            };
            // Forced values are unique per property.
            let _ = loaded.claim(property.id(), claimed);
        }

        self.run_loaders(&registry, &mut loaded, &mut problems);
        validate_values(&registry, &loaded, &mut problems);
        check_requirements(&registry, &loaded, &mut problems);

        info!(
            label = %self.label,
            values = loaded.len(),
            problems = problems.len(),
            "configuration resolved"
        );
        Resolution {
            values: Some(ValueMap::new(registry, loaded)),
            problems,
        }
    }

    fn check_loaders(&self, problems: &mut ProblemList) {
        for (position, loader) in self.loaders.iter().enumerate() {
            let first = self.loaders[..position]
                .iter()
                .position(|earlier| std::ptr::addr_eq(Arc::as_ptr(earlier), Arc::as_ptr(loader)));
            if let Some(first_position) = first {
                problems.add(ConstructionProblem::DuplicateLoader {
                    loader: LoaderRef {
                        position,
                        description: loader.specific_load_description(),
                    },
                    first_position,
                });
            }
        }
    }

    fn check_forced(&self, registry: &PropertyRegistry, problems: &mut ProblemList) {
        for (property, _) in self.forced.entries() {
            if !registry.contains(property.id()) {
                problems.add(ConstructionProblem::UnregisteredForcedValue {
                    property: registry.property_ref(property.as_ref()),
                });
            }
        }
    }

    fn run_loaders(&self, registry: &PropertyRegistry, loaded: &mut LoadedValues, problems: &mut ProblemList) {
        for (position, loader) in self.loaders.iter().enumerate() {
            let loader_ref = LoaderRef {
                position,
                description: loader.specific_load_description(),
            };
            debug!(loader = %loader_ref, "running loader");

            let output = {
                let ctx = LoadContext::new(registry, self.environment.as_ref(), loaded);
                loader.load(&ctx)
            };
            debug!(
                loader = %loader_ref,
                entries = output.entries.len(),
                problems = output.problems.len(),
                "loader finished"
            );

            for kind in output.problems {
                problems.add(LoaderProblem {
                    loader: loader_ref.clone(),
                    kind,
                });
            }
            let mut claims = Claims {
                registry,
                loaded: &mut *loaded,
                problems: &mut *problems,
                loader: &loader_ref,
                report_unknown: loader.reports_unknown_properties(),
            };
            for entry in output.entries {
                claims.apply(entry);
            }
        }

        for loader in &self.loaders {
            loader.release_resources();
        }
    }
}

/// Applies one loader's entries to the accumulated values.
struct Claims<'a> {
    registry: &'a PropertyRegistry,
    loaded: &'a mut LoadedValues,
    problems: &'a mut ProblemList,
    loader: &'a LoaderRef,
    report_unknown: bool,
}

impl Claims<'_> {
    fn report(&mut self, kind: LoaderProblemKind) {
        self.problems.add(LoaderProblem {
            loader: self.loader.clone(),
            kind,
        });
    }

    fn unknown(&mut self, name: String) {
        if self.report_unknown {
            self.report(LoaderProblemKind::UnknownProperty { name });
        } else {
            trace!(loader = %self.loader, name = %name, "ignoring unknown name");
        }
    }

    fn parse(&mut self, property: &DynProperty, raw: &str, name: Option<&str>) -> Option<ErasedValue> {
        match property.parse_value(raw) {
            Ok(value) => Some(value),
            Err(error) => {
                self.report(LoaderProblemKind::Parse {
                    property: self.registry.property_ref(property.as_ref()),
                    name: name.map(str::to_string),
                    error,
                });
                None
            }
        }
    }

    fn apply(&mut self, entry: LoadedEntry) {
        let (property, value, raw, name) = match entry {
            LoadedEntry::Named { name, raw } => {
                let Some(found) = self.registry.entry_for_name(&name) else {
                    self.unknown(name);
                    return;
                };
                let property = Arc::clone(found.property());
                let Some(value) = self.parse(&property, &raw, Some(&name)) else {
                    return;
                };
                (property, value, Some(raw), Some(name))
            }
            LoadedEntry::Raw { property, raw, name } => {
                if !self.registry.contains(property.id()) {
                    self.unknown(name.unwrap_or_else(|| property.name().to_string()));
                    return;
                }
                let Some(value) = self.parse(&property, &raw, name.as_deref()) else {
                    return;
                };
                (property, value, Some(raw), name)
            }
            LoadedEntry::Value { property, value } => {
                if !self.registry.contains(property.id()) {
                    self.unknown(property.name().to_string());
                    return;
                }
                (property, value, None, None)
            }
        };

        let claimed = ClaimedValue {
            value,
            source: ValueSource::Loader {
                loader: self.loader.clone(),
            },
            raw,
            name: name.clone(),
        };
        let first_source = match self.loaded.claim(property.id(), claimed) {
            Ok(()) => {
                trace!(loader = %self.loader, property = %property.name(), "value claimed");
                return;
            }
            Err(first) => first.source.clone(),
        };

        if first_source == ValueSource::Forced {
            debug!(
                loader = %self.loader,
                property = %property.name(),
                "property has a forced value; loader value ignored"
            );
            return;
        }
        debug!(
            loader = %self.loader,
            property = %property.name(),
            first = %first_source,
            "duplicate value skipped"
        );
        self.report(LoaderProblemKind::DuplicateProperty {
            property: self.registry.property_ref(property.as_ref()),
            name,
            first_source,
        });
    }
}

/// Run each claimed value through its validators, in registration order.
fn validate_values(registry: &PropertyRegistry, loaded: &LoadedValues, problems: &mut ProblemList) {
    for entry in registry.entries() {
        let property = entry.property();
        let Some(claimed) = loaded.claimed(property.id()) else {
            continue;
        };
        if let Err(message) = property.check_value(&claimed.value) {
            let value = claimed
                .raw
                .clone()
                .or_else(|| property.raw_value(&claimed.value))
                .unwrap_or_default();
            problems.add(ValueProblem {
                property: entry.property_ref(),
                value,
                supplied_by: claimed.source.clone(),
                message,
            });
        }
    }
}

/// Required properties need an explicit value or a default; flagged groups
/// need at least one explicit value.
fn check_requirements(registry: &PropertyRegistry, loaded: &LoadedValues, problems: &mut ProblemList) {
    for entry in registry.entries() {
        let property = entry.property();
        if property.is_required() && !property.has_default() && !loaded.contains(property.id()) {
            problems.add(RequirementProblem::RequiredProperty {
                property: entry.property_ref(),
            });
        }
    }

    for group in registry.groups() {
        if group.at_least_one_required && !group.members.iter().any(|id| loaded.contains(*id)) {
            problems.add(RequirementProblem::RequiredGroup {
                group: group.name.clone(),
            });
        }
    }
}

/// Builder for [`Resolver`].
#[derive(Default)]
pub struct ResolverBuilder {
    groups: Vec<PropertyGroup>,
    loaders: Vec<Arc<dyn Loader>>,
    naming: Option<Arc<dyn NamingStrategy>>,
    environment: Option<Arc<dyn Environment>>,
    forced: ForcedValues,
    guard: Option<Arc<LifecycleGuard>>,
    label: Option<String>,
}

impl ResolverBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group(mut self, group: PropertyGroup) -> Self {
        self.groups.push(group);
        self
    }

    pub fn groups(mut self, groups: impl IntoIterator<Item = PropertyGroup>) -> Self {
        self.groups.extend(groups);
        self
    }

    /// Append a loader. Loaders run in the order they are added.
    pub fn loader(self, loader: impl Loader + 'static) -> Self {
        self.shared_loader(Arc::new(loader))
    }

    /// Append a loader instance that may also be held elsewhere.
    pub fn shared_loader(mut self, loader: Arc<dyn Loader>) -> Self {
        self.loaders.push(loader);
        self
    }

    pub fn naming(mut self, naming: impl NamingStrategy + 'static) -> Self {
        self.naming = Some(Arc::new(naming));
        self
    }

    pub fn environment(mut self, environment: impl Environment + 'static) -> Self {
        self.environment = Some(Arc::new(environment));
        self
    }

    /// Force a value that overrides every loader.
    pub fn force<T: PropertyType>(mut self, property: &Property<T>, value: T) -> Self {
        self.forced = self.forced.set(property, value);
        self
    }

    pub fn forced(mut self, forced: ForcedValues) -> Self {
        self.forced = forced;
        self
    }

    /// Share a lifecycle guard to detect reentrant resolution.
    pub fn guard(mut self, guard: Arc<LifecycleGuard>) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Description of this configuration used in diagnostics.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn build(self) -> Resolver {
        Resolver {
            groups: self.groups,
            loaders: self.loaders,
            naming: self.naming.unwrap_or_else(|| Arc::new(CaseInsensitiveNaming)),
            environment: self.environment.unwrap_or_else(|| Arc::new(SystemEnvironment)),
            forced: self.forced,
            guard: self.guard,
            label: self.label.unwrap_or_else(|| DEFAULT_LABEL.to_string()),
        }
    }

    /// Build and resolve in one step.
    pub fn resolve(self) -> Resolution {
        self.build().resolve()
    }
}

/// Resolve `groups` from `loaders` with the given naming and forced values.
pub fn resolve(
    groups: impl IntoIterator<Item = PropertyGroup>,
    loaders: impl IntoIterator<Item = Arc<dyn Loader>>,
    naming: impl NamingStrategy + 'static,
    forced: ForcedValues,
) -> Result<ValueMap, ProblemList> {
    let mut builder = ResolverBuilder::new().groups(groups).naming(naming).forced(forced);
    for loader in loaders {
        builder = builder.shared_loader(loader);
    }
    builder.resolve().into_result()
}
