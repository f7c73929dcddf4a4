//! The `Callable` interface shared by built-ins, user closures, and the
//! weak self-reference closure used to break recursive ownership cycles.
//!
//! Grounded on the teacher's `Builtins` dispatch enum (`builtins/mod.rs`):
//! a single `call` entry point plus a debug-dump formatter, with arity
//! enforced by the callable itself rather than by the caller.

use std::fmt;
use std::rc::Rc;

use crate::error::{EvalError, EvalResult};
use crate::value::Value;

/// Minimum and (optional) maximum argument count a callable accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    pub max: Option<usize>,
}

impl Arity {
    pub const fn exact(n: usize) -> Self {
        Self { min: n, max: Some(n) }
    }

    pub const fn at_least(min: usize) -> Self {
        Self { min, max: None }
    }

    pub const fn range(min: usize, max: usize) -> Self {
        Self { min, max: Some(max) }
    }

    /// Checks `count` against this arity, producing the exact error messages
    /// specified for `Callable::call` in §4.E.
    pub fn check(&self, name: &str, count: usize) -> EvalResult<()> {
        if let Some(max) = self.max {
            if count > max {
                return Err(EvalError::user(format!(
                    "Function {name} called with too many arguments. Called with {count} but accepts no more than {max}."
                )));
            }
        }
        if count < self.min {
            return Err(EvalError::user(format!(
                "Function {name} called with insufficient arguments. Called with {count} but requires at least {}.",
                self.min
            )));
        }
        Ok(())
    }
}

/// Anything that can be invoked as a `Function` value.
pub trait Callable: fmt::Debug {
    /// Invokes the callable. May return a recoverable (`EvalError::User`)
    /// error; arity must be enforced here.
    fn call(&self, args: Vec<Value>) -> EvalResult<Value>;

    /// A human-readable dump used by diagnostics, not semantics.
    fn debug_dump(&self) -> String;

    /// The callable's declared name, used in arity-error messages.
    /// Anonymous closures report `"<lambda>"`.
    fn name(&self) -> &str {
        "<anonymous>"
    }

    /// If this callable is a weak self-reference (`crate::closure::WeakSelfClosure`),
    /// returns the strong promotion of the referenced closure, or an error if
    /// the closure has since been dropped. Every other callable returns
    /// `None`. Used by Lambda construction (§4.F step 2) to promote a
    /// captured self-reference to strong when a nested lambda captures it.
    fn promote_weak_self(&self) -> Option<EvalResult<Rc<dyn Callable>>> {
        None
    }
}

/// Promotes a captured value's weak self-reference callable (if any) to
/// strong, leaving every other value unchanged. See
/// [`Callable::promote_weak_self`].
pub fn promote_captured_value(value: Value) -> EvalResult<Value> {
    if let Value::Function(f) = &value {
        if let Some(promoted) = f.promote_weak_self() {
            return Ok(Value::Function(promoted?));
        }
    }
    Ok(value)
}

/// A native function implemented in the host language.
pub struct BuiltinFn {
    name: &'static str,
    arity: Arity,
    #[allow(clippy::type_complexity)]
    f: Box<dyn Fn(Vec<Value>) -> EvalResult<Value>>,
}

impl BuiltinFn {
    pub fn new(
        name: &'static str,
        arity: Arity,
        f: impl Fn(Vec<Value>) -> EvalResult<Value> + 'static,
    ) -> Self {
        Self { name, arity, f: Box::new(f) }
    }
}

impl fmt::Debug for BuiltinFn {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("BuiltinFn").field("name", &self.name).finish()
    }
}

impl Callable for BuiltinFn {
    fn call(&self, args: Vec<Value>) -> EvalResult<Value> {
        self.arity.check(self.name, args.len())?;
        (self.f)(args)
    }

    fn debug_dump(&self) -> String {
        format!("<builtin:{}>", self.name)
    }

    fn name(&self) -> &str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_rejects_too_few() {
        let err = Arity::range(1, 2).check("f", 0).unwrap_err();
        assert!(err.message().contains("insufficient arguments"));
    }

    #[test]
    fn arity_rejects_too_many() {
        let err = Arity::range(1, 2).check("f", 3).unwrap_err();
        assert!(err.message().contains("too many arguments"));
    }

    #[test]
    fn arity_accepts_in_range() {
        assert!(Arity::range(1, 2).check("f", 1).is_ok());
        assert!(Arity::at_least(0).check("f", 50).is_ok());
    }
}
