//! Lifecycle guard for configuration construction.
//!
//! The guard records whether construction is in progress and where it was
//! started. It detects *reentrant* construction (a locator callback or loader
//! that itself asks for the configuration while it is being built); it is not
//! a lock and never blocks. Callers that may race from several threads must
//! serialize construction themselves.
//!
//! ```text
//! Unset ──begin──▶ Initializing ──succeed──▶ Initialized
//!   ▲                   │
//!   └──── Failed ◀──fail┘   (a fresh attempt may begin from Failed)
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::backtrace::Backtrace;
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::thread::{self, ThreadId};
use tracing::{debug, warn};

use crate::problem::ConstructionProblem;

/// Where and when an initialization attempt started.
#[derive(Debug, Clone, Serialize)]
pub struct InitOrigin {
    /// Description of the configuration being built.
    pub label: String,
    pub started_at: DateTime<Utc>,
    /// Name (or id) of the thread that started the attempt.
    pub thread: String,
    #[serde(skip)]
    pub thread_id: ThreadId,
    /// Captured call stack; empty unless `RUST_BACKTRACE` enables capture.
    pub backtrace: String,
}

impl InitOrigin {
    /// Record the current call site.
    pub fn capture(label: impl Into<String>) -> Self {
        let current = thread::current();
        let thread_id = current.id();
        let thread = current
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{thread_id:?}"));
        let backtrace = Backtrace::capture().to_string();
        Self {
            label: label.into(),
            started_at: Utc::now(),
            thread,
            thread_id,
            backtrace,
        }
    }

    /// Whether the attempt was started on the calling thread.
    pub fn is_current_thread(&self) -> bool {
        self.thread_id == thread::current().id()
    }
}

impl PartialEq for InitOrigin {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label
            && self.started_at == other.started_at
            && self.thread_id == other.thread_id
    }
}

impl Eq for InitOrigin {}

impl fmt::Display for InitOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' started at {} on thread {}",
            self.label,
            self.started_at.to_rfc3339(),
            self.thread
        )
    }
}

/// Current state of the guarded construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleState {
    Unset,
    Initializing(InitOrigin),
    Initialized(InitOrigin),
    Failed(InitOrigin),
}

impl LifecycleState {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleState::Unset => "unset",
            LifecycleState::Initializing(_) => "initializing",
            LifecycleState::Initialized(_) => "initialized",
            LifecycleState::Failed(_) => "failed",
        }
    }
}

/// Reentrancy detector shared by everything building one configuration.
#[derive(Debug)]
pub struct LifecycleGuard {
    state: Mutex<LifecycleState>,
}

impl Default for LifecycleGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleGuard {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LifecycleState::Unset),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LifecycleState> {
        // The lock is only held for state swaps, so a poisoned value is still consistent.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> LifecycleState {
        self.lock().clone()
    }

    /// Origin of the attempt in progress, if any.
    pub fn initializing_origin(&self) -> Option<InitOrigin> {
        match &*self.lock() {
            LifecycleState::Initializing(origin) => Some(origin.clone()),
            _ => None,
        }
    }

    /// Start an attempt. Fails without changing state if one is already in
    /// progress or construction already succeeded.
    pub fn begin(&self, origin: InitOrigin) -> Result<InitTicket<'_>, ConstructionProblem> {
        let mut state = self.lock();
        if let LifecycleState::Initializing(original) = &*state {
            warn!(
                original = %original,
                reentrant = %origin,
                "reentrant configuration initialization detected"
            );
            return Err(ConstructionProblem::InitiationLoop {
                original: original.clone(),
                reentrant: origin,
            });
        }
        if let LifecycleState::Initialized(original) = &*state {
            return Err(ConstructionProblem::AlreadyInitialized {
                original: original.clone(),
                attempted: origin,
            });
        }

        debug!(origin = %origin, from = state.name(), "configuration initialization started");
        *state = LifecycleState::Initializing(origin);
        Ok(InitTicket {
            guard: self,
            finished: false,
        })
    }

    /// Return to `Unset`. Intended for test harnesses that rebuild configuration.
    pub fn reset(&self) {
        *self.lock() = LifecycleState::Unset;
    }

    fn finish(&self, success: bool) {
        let mut state = self.lock();
        let next = match std::mem::replace(&mut *state, LifecycleState::Unset) {
            LifecycleState::Initializing(origin) if success => LifecycleState::Initialized(origin),
            LifecycleState::Initializing(origin) => LifecycleState::Failed(origin),
            // Reset while the attempt was running: leave it reset.
            other => other,
        };
        debug!(state = next.name(), "configuration initialization finished");
        *state = next;
    }
}

/// Proof of an attempt in progress. Dropping it unfinished marks the attempt failed.
#[derive(Debug)]
pub struct InitTicket<'a> {
    guard: &'a LifecycleGuard,
    finished: bool,
}

impl InitTicket<'_> {
    pub fn succeed(mut self) {
        self.finished = true;
        self.guard.finish(true);
    }

    pub fn fail(mut self) {
        self.finished = true;
        self.guard.finish(false);
    }

    /// Finish as success or failure.
    pub fn complete(self, success: bool) {
        if success { self.succeed() } else { self.fail() }
    }
}

impl Drop for InitTicket<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.guard.finish(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_succeed() {
        let guard = LifecycleGuard::new();
        let ticket = guard.begin(InitOrigin::capture("app")).unwrap();
        assert_eq!(guard.state().name(), "initializing");
        ticket.succeed();
        assert_eq!(guard.state().name(), "initialized");
    }

    #[test]
    fn test_reentrant_begin_reports_both_origins() {
        let guard = LifecycleGuard::new();
        let _ticket = guard.begin(InitOrigin::capture("outer")).unwrap();

        let problem = guard.begin(InitOrigin::capture("inner")).unwrap_err();
        match problem {
            ConstructionProblem::InitiationLoop { original, reentrant } => {
                assert_eq!(original.label, "outer");
                assert_eq!(reentrant.label, "inner");
            }
            other => panic!("unexpected problem: {other:?}"),
        }
        // The outer attempt is untouched.
        assert_eq!(guard.initializing_origin().unwrap().label, "outer");
    }

    #[test]
    fn test_failed_attempt_allows_retry() {
        let guard = LifecycleGuard::new();
        guard.begin(InitOrigin::capture("first")).unwrap().fail();
        assert_eq!(guard.state().name(), "failed");

        let ticket = guard.begin(InitOrigin::capture("second")).unwrap();
        ticket.succeed();
        assert_eq!(guard.state().name(), "initialized");
    }

    #[test]
    fn test_dropped_ticket_marks_failed() {
        let guard = LifecycleGuard::new();
        {
            let _ticket = guard.begin(InitOrigin::capture("dropped")).unwrap();
        }
        assert_eq!(guard.state().name(), "failed");
    }

    #[test]
    fn test_initialized_rejects_until_reset() {
        let guard = LifecycleGuard::new();
        guard.begin(InitOrigin::capture("once")).unwrap().succeed();

        let problem = guard.begin(InitOrigin::capture("twice")).unwrap_err();
        assert!(matches!(problem, ConstructionProblem::AlreadyInitialized { .. }));

        guard.reset();
        assert!(guard.begin(InitOrigin::capture("again")).is_ok());
    }
}
