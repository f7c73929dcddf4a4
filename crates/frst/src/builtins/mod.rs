//! Built-in function surface (§4.I).
//!
//! Grounded on the teacher's one-dispatch-enum-per-builtin-family shape
//! (`builtins/` split by concern), re-expressed here as one registration
//! function per submodule that inserts `BuiltinFn` values into the global
//! [`SymbolTable`] rather than matching on a closed `Builtins` enum —
//! there's no bytecode dispatch table to index into once calls go through
//! the `Callable` trait object directly.

mod base64_mod;
mod collections;
mod control;
mod conversions;
mod format;
mod json_mod;
mod operators;
mod predicates;
mod regex_mod;

use std::rc::Rc;

use crate::callable::{Arity, BuiltinFn, Callable};
use crate::error::EvalResult;
use crate::symbol_table::SymbolTable;
use crate::value::Value;

/// Builds the top-level scope every program and module executes against:
/// every built-in function bound by name, no failover parent.
pub fn install_builtins() -> Rc<SymbolTable> {
    let table = SymbolTable::new();
    predicates::register(&table);
    conversions::register(&table);
    collections::register(&table);
    control::register(&table);
    operators::register(&table);
    format::register(&table);
    json_mod::register(&table);
    base64_mod::register(&table);
    regex_mod::register(&table);
    table
}

/// Wraps a plain closure as a named `Value::Function` with the given arity.
fn builtin(name: &'static str, arity: Arity, f: impl Fn(Vec<Value>) -> EvalResult<Value> + 'static) -> Value {
    Value::function(Rc::new(BuiltinFn::new(name, arity, f)) as Rc<dyn Callable>)
}

fn define(table: &Rc<SymbolTable>, name: &'static str, value: Value) {
    table.define(name, value).expect("builtin names are unique by construction");
}
