//! Evaluator execution tracing.
//!
//! Grounded on the teacher's `tracer.rs`: a trait with no-op default hooks so
//! [`NoopTracer`] compiles away to nothing, plus a human-readable
//! [`StderrTracer`] for interactive debugging. Scaled down from the
//! teacher's bytecode-level hooks (opcode dispatch, cell load/store) to the
//! tree-walker's call boundary, the only point with no direct source
//! location available to a REPL user otherwise.

use std::cell::RefCell;
use std::fmt;

/// Hook points fired at closure call boundaries. All methods default to
/// no-ops, so a custom tracer only needs to override what it cares about.
pub trait EvalTracer: fmt::Debug {
    /// Fired immediately before a closure body starts executing.
    fn on_call(&mut self, _name: &str, _depth: usize) {}

    /// Fired immediately after a closure body finishes (successfully or
    /// with an error propagating out).
    fn on_return(&mut self, _name: &str, _depth: usize) {}
}

/// Zero-cost production default: every hook is the empty default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl EvalTracer for NoopTracer {}

/// Prints a human-readable call/return log to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrTracer;

impl EvalTracer for StderrTracer {
    fn on_call(&mut self, name: &str, depth: usize) {
        eprintln!("  >>> CALL {name:<20} depth={depth}");
    }

    fn on_return(&mut self, name: &str, depth: usize) {
        eprintln!("  <<< RETURN {name:<20} depth={depth}");
    }
}

thread_local! {
    static ACTIVE: RefCell<Box<dyn EvalTracer>> = RefCell::new(Box::new(NoopTracer));
}

/// Installs `tracer` as the active tracer for this thread's subsequent
/// evaluation. Call once at startup (e.g. from `frst-cli` under `--trace`).
pub fn install_tracer(tracer: Box<dyn EvalTracer>) {
    ACTIVE.with(|active| *active.borrow_mut() = tracer);
}

/// Fires [`EvalTracer::on_call`] on the active tracer.
pub fn trace_call(name: &str, depth: usize) {
    ACTIVE.with(|active| active.borrow_mut().on_call(name, depth));
}

/// Fires [`EvalTracer::on_return`] on the active tracer.
pub fn trace_return(name: &str, depth: usize) {
    ACTIVE.with(|active| active.borrow_mut().on_return(name, depth));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_tracer_accepts_default_hooks() {
        let mut tracer = NoopTracer;
        tracer.on_call("f", 1);
        tracer.on_return("f", 1);
    }

    #[test]
    fn install_and_trace_do_not_panic() {
        install_tracer(Box::new(NoopTracer));
        trace_call("f", 0);
        trace_return("f", 0);
    }
}
