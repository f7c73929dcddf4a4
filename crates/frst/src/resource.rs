//! Resource limiting for the evaluator.
//!
//! Grounded on the teacher's `resource.rs`: a `ResourceTracker` trait with a
//! no-limit and a limited implementation, scaled down to what a
//! tree-walking evaluator actually needs bounded — native call recursion,
//! since a closure call recurses directly on the Rust stack with no
//! trampolining (§9 "Shared mutable graph avoidance" design note covers
//! cycles; this covers depth).

use std::cell::{Cell, RefCell};
use std::fmt;

use crate::error::{EvalError, EvalResult};

/// Recommended recursion limit if the embedder installs no explicit limit.
pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 1000;

/// Configurable limits for one evaluation session.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvalLimits {
    pub max_recursion_depth: Option<usize>,
}

impl EvalLimits {
    #[must_use]
    pub fn max_recursion_depth(mut self, limit: usize) -> Self {
        self.max_recursion_depth = Some(limit);
        self
    }
}

/// Enforces recursion limits during evaluation.
pub trait ResourceTracker: fmt::Debug {
    /// Called before pushing a new closure call frame.
    ///
    /// Returns `Err` if `current_depth` has already reached the limit.
    fn check_recursion_depth(&self, current_depth: usize) -> EvalResult<()>;
}

/// No limits at all: always permits another call frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLimitTracker;

impl ResourceTracker for NoLimitTracker {
    fn check_recursion_depth(&self, _current_depth: usize) -> EvalResult<()> {
        Ok(())
    }
}

/// Enforces [`EvalLimits`], falling back to [`DEFAULT_MAX_RECURSION_DEPTH`]
/// when no explicit limit is configured.
#[derive(Debug, Clone, Copy)]
pub struct LimitedTracker {
    limits: EvalLimits,
}

impl LimitedTracker {
    #[must_use]
    pub fn new(limits: EvalLimits) -> Self {
        Self { limits }
    }
}

impl ResourceTracker for LimitedTracker {
    fn check_recursion_depth(&self, current_depth: usize) -> EvalResult<()> {
        let max = self.limits.max_recursion_depth.unwrap_or(DEFAULT_MAX_RECURSION_DEPTH);
        if current_depth >= max {
            Err(EvalError::user(format!(
                "maximum recursion depth exceeded ({max} nested calls)"
            )))
        } else {
            Ok(())
        }
    }
}

thread_local! {
    static ACTIVE: RefCell<Box<dyn ResourceTracker>> =
        RefCell::new(Box::new(LimitedTracker::new(EvalLimits::default())));
    static DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Installs `tracker` as the active resource tracker for this thread's
/// subsequent evaluation. Call once at startup.
pub fn install_tracker(tracker: Box<dyn ResourceTracker>) {
    ACTIVE.with(|active| *active.borrow_mut() = tracker);
}

/// A RAII marker for one nested call frame. Decrements the depth counter on
/// drop so depth is restored correctly even when a call returns through an
/// early `?`.
pub struct CallDepthGuard(());

impl Drop for CallDepthGuard {
    fn drop(&mut self) {
        DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

/// Checks the active tracker's recursion limit and records one nested call
/// frame. Used by `Closure::call` (§4.F) before executing a closure body.
pub fn enter_call() -> EvalResult<CallDepthGuard> {
    let depth = DEPTH.with(Cell::get);
    ACTIVE.with(|active| active.borrow().check_recursion_depth(depth))?;
    DEPTH.with(|d| d.set(depth + 1));
    Ok(CallDepthGuard(()))
}

/// The current nesting depth, for diagnostics (tracer hooks, etc.).
pub fn current_depth() -> usize {
    DEPTH.with(Cell::get)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_limit_tracker_never_errors() {
        assert!(NoLimitTracker.check_recursion_depth(usize::MAX - 1).is_ok());
    }

    #[test]
    fn limited_tracker_rejects_at_configured_depth() {
        let tracker = LimitedTracker::new(EvalLimits::default().max_recursion_depth(3));
        assert!(tracker.check_recursion_depth(2).is_ok());
        assert!(tracker.check_recursion_depth(3).is_err());
    }

    #[test]
    fn enter_call_guard_restores_depth_on_drop() {
        install_tracker(Box::new(NoLimitTracker));
        let before = current_depth();
        {
            let _guard = enter_call().unwrap();
            assert_eq!(current_depth(), before + 1);
        }
        assert_eq!(current_depth(), before);
        install_tracker(Box::new(LimitedTracker::new(EvalLimits::default())));
    }
}
