//! Control-flow built-ins: `try_call`, `pack_call`, `and_then`, `or_else`,
//! `assert`, `mutable_cell` (§4.I).
//!
//! `try_call` turns a recoverable [`EvalError::User`] into an ordinary Map
//! value instead of propagating it, the only way `frst` code can observe
//! and react to a failure. `and_then`/`or_else` chain on that Map the way
//! `Result::and_then`/`Result::or_else` chain in the host language.

use std::cell::RefCell;
use std::rc::Rc;

use super::{builtin, define};
use crate::callable::{Arity, BuiltinFn, Callable};
use crate::error::{EvalError, EvalResult};
use crate::symbol_table::SymbolTable;
use crate::value::{Value, ValueMap};

const OK_KEY: &str = "ok";
const VALUE_KEY: &str = "value";
const ERROR_KEY: &str = "error";

fn ok_result(value: Value) -> Value {
    Value::map(ValueMap::from_trusted_pairs(vec![
        (Value::string(OK_KEY), Value::Bool(true)),
        (Value::string(VALUE_KEY), value),
    ]))
}

fn err_result(message: &str) -> Value {
    Value::map(ValueMap::from_trusted_pairs(vec![
        (Value::string(OK_KEY), Value::Bool(false)),
        (Value::string(ERROR_KEY), Value::string(message)),
    ]))
}

/// Calls `callable` with `args`, catching a recoverable error into a result
/// Map. Unrecoverable/internal errors still propagate (§4.C: only `User`
/// errors are catchable).
fn try_call_value(callable: &Rc<dyn Callable>, args: Vec<Value>) -> EvalResult<Value> {
    match callable.call(args) {
        Ok(v) => Ok(ok_result(v)),
        Err(e) if e.is_catchable() => Ok(err_result(e.message())),
        Err(e) => Err(e),
    }
}

pub fn register(table: &Rc<SymbolTable>) {
    define(
        table,
        "try_call",
        builtin("try_call", Arity::exact(2), |a| {
            let callable = a[0].as_callable()?;
            let args = a[1].as_array()?.as_ref().clone();
            try_call_value(callable, args)
        }),
    );

    define(
        table,
        "pack_call",
        builtin("pack_call", Arity::exact(2), |a| {
            let callable = a[0].as_callable()?;
            let args = a[1].as_array()?.as_ref().clone();
            callable.call(args)
        }),
    );

    define(
        table,
        "and_then",
        builtin("and_then", Arity::exact(2), |a| {
            let result = a[0].as_map()?;
            let ok = result.get(&Value::string(OK_KEY)).map(Value::truthy).unwrap_or(false);
            if !ok {
                return Ok(a[0].clone());
            }
            let value = result.get(&Value::string(VALUE_KEY)).cloned().unwrap_or(Value::Null);
            let f = a[1].as_callable()?;
            try_call_value(f, vec![value])
        }),
    );

    define(
        table,
        "or_else",
        builtin("or_else", Arity::exact(2), |a| {
            let result = a[0].as_map()?;
            let ok = result.get(&Value::string(OK_KEY)).map(Value::truthy).unwrap_or(false);
            if ok {
                return Ok(a[0].clone());
            }
            let error = result.get(&Value::string(ERROR_KEY)).cloned().unwrap_or(Value::Null);
            let f = a[1].as_callable()?;
            try_call_value(f, vec![error])
        }),
    );

    define(
        table,
        "assert",
        builtin("assert", Arity::range(1, 2), |mut a| {
            let message = if a.len() == 2 { a.pop().unwrap() } else { Value::string("Assertion failed") };
            let cond = a.remove(0);
            if cond.truthy() {
                Ok(Value::Null)
            } else {
                Err(EvalError::user(message.to_display_string()))
            }
        }),
    );

    define(table, "mutable_cell", builtin("mutable_cell", Arity::exact(1), mutable_cell));
}

/// Returns a two-element Array `[get, set]`: `get()` reads the cell's
/// current value, `set(v)` replaces it and returns `null`. The only
/// in-place mutation primitive in the language (§9 design note: every
/// other value is structurally immutable once constructed).
fn mutable_cell(mut args: Vec<Value>) -> EvalResult<Value> {
    let initial = args.remove(0);
    let cell = Rc::new(RefCell::new(initial));

    let get_cell = Rc::clone(&cell);
    let getter = BuiltinFn::new("<cell-get>", Arity::exact(0), move |_| Ok(get_cell.borrow().clone()));

    let set_cell = Rc::clone(&cell);
    let setter = BuiltinFn::new("<cell-set>", Arity::exact(1), move |mut args| {
        *set_cell.borrow_mut() = args.remove(0);
        Ok(Value::Null)
    });

    Ok(Value::array(vec![
        Value::function(Rc::new(getter)),
        Value::function(Rc::new(setter)),
    ]))
}
