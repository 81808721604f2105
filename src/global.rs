//! Process-wide configuration accessor.
//!
//! Prefer passing a [`ValueMap`] explicitly. This module exists for code that
//! cannot: a locator callback installed once with [`set_locator`] describes
//! the pipeline, and [`instance`] resolves it on first use and caches the
//! result. Construction is serialized by a mutex; a call from inside the
//! construction itself (the locator or a loader asking for the
//! configuration) is detected and reported instead of deadlocking.

use crate::engine::ResolverBuilder;
use crate::lifecycle::{InitOrigin, LifecycleGuard, LifecycleState};
use crate::problem::{ConstructionProblem, ProblemList};
use crate::property::{Property, PropertyType};
use crate::values::ValueMap;
use arc_swap::ArcSwapOption;
use std::sync::{Arc, LazyLock, Mutex, RwLock};
use tracing::{debug, warn};

type Locator = Arc<dyn Fn() -> ResolverBuilder + Send + Sync>;

static GUARD: LazyLock<LifecycleGuard> = LazyLock::new(LifecycleGuard::new);
static INSTANCE: LazyLock<ArcSwapOption<ValueMap>> = LazyLock::new(ArcSwapOption::empty);
static BUILD: Mutex<()> = Mutex::new(());
static LOCATOR: RwLock<Option<Locator>> = RwLock::new(None);

const ORIGIN_LABEL: &str = "global configuration";

/// Failure to produce the global configuration.
#[derive(Debug, thiserror::Error)]
pub enum GlobalError {
    #[error("no configuration locator installed; call global::set_locator first")]
    NoLocator,

    #[error(transparent)]
    Problems(#[from] ProblemList),
}

impl GlobalError {
    pub fn problems(&self) -> Option<&ProblemList> {
        match self {
            GlobalError::Problems(problems) => Some(problems),
            GlobalError::NoLocator => None,
        }
    }
}

/// Install the callback that describes the global pipeline.
///
/// Takes effect for the next construction; an already built instance is kept.
pub fn set_locator<F>(locator: F)
where
    F: Fn() -> ResolverBuilder + Send + Sync + 'static,
{
    let mut slot = LOCATOR.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    *slot = Some(Arc::new(locator));
}

/// The global configuration, built on first call.
pub fn instance() -> Result<Arc<ValueMap>, GlobalError> {
    if let Some(values) = INSTANCE.load_full() {
        return Ok(values);
    }

    let origin = InitOrigin::capture(ORIGIN_LABEL);
    // Same-thread reentry would block on the build mutex forever.
    if let Some(original) = GUARD.initializing_origin() {
        if original.is_current_thread() {
            warn!(original = %original, "global configuration requested while it is being built");
            let problem = ConstructionProblem::InitiationLoop {
                original,
                reentrant: origin,
            };
            return Err(GlobalError::Problems(problem.into()));
        }
    }

    let _build = BUILD.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(values) = INSTANCE.load_full() {
        return Ok(values);
    }

    let locator = LOCATOR
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
        .ok_or(GlobalError::NoLocator)?;

    let ticket = GUARD
        .begin(origin)
        .map_err(|problem| GlobalError::Problems(problem.into()))?;
    let resolution = locator().build().run();
    let success = resolution.is_success();
    ticket.complete(success);

    let values = Arc::new(resolution.into_result()?);
    INSTANCE.store(Some(Arc::clone(&values)));
    debug!("global configuration installed");
    Ok(values)
}

/// Effective value of `property` in the global configuration.
pub fn value<T: PropertyType + Clone>(property: &Property<T>) -> Result<Option<T>, GlobalError> {
    Ok(instance()?.effective_value(property).cloned())
}

pub fn is_initialized() -> bool {
    INSTANCE.load().is_some()
}

/// Lifecycle state of the global construction.
pub fn state() -> LifecycleState {
    GUARD.state()
}

/// Forget the instance, the locator and the lifecycle state.
///
/// For test harnesses only; production code never rebuilds configuration.
pub fn reset_for_tests() {
    let _build = BUILD.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    INSTANCE.store(None);
    GUARD.reset();
    let mut slot = LOCATOR.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    *slot = None;
}
