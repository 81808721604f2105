//! Integration tests for the process-wide accessor and reentrancy detection.
//!
//! The global state is shared by every test in this file, so each test holds
//! `SERIAL` and starts from `reset_for_tests`.

use prop_resolve::global::{self, GlobalError};
use prop_resolve::lifecycle::{InitOrigin, LifecycleGuard};
use prop_resolve::loaders::FixedValueLoader;
use prop_resolve::problem::ConstructionProblem;
use prop_resolve::{LoadContext, Loader, LoaderValues, Property, PropertyGroup, Resolver, ResolverBuilder};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};

static SERIAL: Mutex<()> = Mutex::new(());

static PORT: LazyLock<Property<u16>> =
    LazyLock::new(|| Property::<u16>::builder("PORT").default_value(80).build());

fn serial() -> MutexGuard<'static, ()> {
    let guard = SERIAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    global::reset_for_tests();
    guard
}

fn base_builder() -> ResolverBuilder {
    Resolver::builder().group(PropertyGroup::new("net").with(&*PORT))
}

fn initiation_loop(err: &GlobalError) -> Option<(&InitOrigin, &InitOrigin)> {
    err.problems()?.construction().find_map(|p| match p {
        ConstructionProblem::InitiationLoop { original, reentrant } => Some((original, reentrant)),
        _ => None,
    })
}

#[test]
fn test_no_locator() {
    let _serial = serial();
    assert!(matches!(global::instance(), Err(GlobalError::NoLocator)));
    assert!(!global::is_initialized());
}

#[test]
fn test_instance_is_built_once() {
    let _serial = serial();
    let builds = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&builds);
    global::set_locator(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        base_builder().loader(FixedValueLoader::new("fixed").with_name("net.port", "8080"))
    });

    assert_eq!(global::value(&*PORT).unwrap(), Some(8080));
    let first = global::instance().unwrap();
    let second = global::instance().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert_eq!(global::state().name(), "initialized");
}

#[test]
fn test_locator_reentry_is_reported_not_deadlocked() {
    let _serial = serial();
    let inner: Arc<Mutex<Option<GlobalError>>> = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&inner);
    global::set_locator(move || {
        if let Err(err) = global::instance() {
            *slot.lock().unwrap() = Some(err);
        }
        base_builder()
    });

    // The outer attempt still completes on its own terms.
    assert!(global::instance().is_ok());

    let err = inner.lock().unwrap().take().expect("nested call must fail");
    let (original, reentrant) = initiation_loop(&err).expect("initiation loop problem");
    assert_eq!(original.label, "global configuration");
    assert_eq!(reentrant.label, "global configuration");
    assert!(original.started_at <= reentrant.started_at);
    assert_eq!(original.thread_id, reentrant.thread_id);
}

/// A loader that asks for the global configuration while it is being built.
struct ReentrantLoader {
    failures: AtomicUsize,
}

impl Loader for ReentrantLoader {
    fn load(&self, _ctx: &LoadContext<'_>) -> LoaderValues {
        if let Err(err) = global::instance() {
            if initiation_loop(&err).is_some() {
                self.failures.fetch_add(1, Ordering::SeqCst);
            }
        }
        LoaderValues::new()
    }

    fn specific_load_description(&self) -> String {
        "reentrant".to_string()
    }
}

#[test]
fn test_loader_reentry_is_reported() {
    let _serial = serial();
    let loader = Arc::new(ReentrantLoader {
        failures: AtomicUsize::new(0),
    });
    let shared = Arc::clone(&loader);
    global::set_locator(move || base_builder().shared_loader(shared.clone()));

    assert!(global::instance().is_ok());
    assert_eq!(loader.failures.load(Ordering::SeqCst), 1);
}

#[test]
fn test_failed_build_can_be_retried() {
    let _serial = serial();
    let name = Property::<String>::builder("NAME").required().build();
    let required = name.clone();
    global::set_locator(move || Resolver::builder().group(PropertyGroup::new("app").with(&required)));

    let err = global::instance().unwrap_err();
    assert_eq!(err.problems().map(|p| p.len()), Some(1));
    assert_eq!(global::state().name(), "failed");

    let retry = name.clone();
    global::set_locator(move || {
        Resolver::builder()
            .group(PropertyGroup::new("app").with(&retry))
            .force(&retry, "bob".to_string())
    });
    assert_eq!(global::value(&name).unwrap().as_deref(), Some("bob"));
}

#[test]
fn test_shared_guard_detects_nested_resolver() {
    let _serial = serial();
    let guard = Arc::new(LifecycleGuard::new());

    struct Nested {
        guard: Arc<LifecycleGuard>,
        nested_failed: AtomicUsize,
    }
    impl Loader for Nested {
        fn load(&self, _ctx: &LoadContext<'_>) -> LoaderValues {
            let nested = Resolver::builder().guard(Arc::clone(&self.guard)).label("nested").resolve();
            if nested.problems().construction().any(|p| {
                matches!(p, ConstructionProblem::InitiationLoop { original, reentrant }
                    if original.label == "outer" && reentrant.label == "nested")
            }) {
                self.nested_failed.fetch_add(1, Ordering::SeqCst);
            }
            LoaderValues::new()
        }
        fn specific_load_description(&self) -> String {
            "nested".to_string()
        }
    }

    let loader = Arc::new(Nested {
        guard: Arc::clone(&guard),
        nested_failed: AtomicUsize::new(0),
    });
    let outer = Resolver::builder()
        .guard(Arc::clone(&guard))
        .label("outer")
        .shared_loader(loader.clone())
        .resolve();

    assert!(outer.is_success());
    assert_eq!(loader.nested_failed.load(Ordering::SeqCst), 1);
    assert_eq!(guard.state().name(), "initialized");
}
