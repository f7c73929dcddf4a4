//! Explicit conversion built-ins: `to_int`, `to_float`, `to_string`,
//! `to_pretty_string` (§4.I, §4.A "explicit string conversions").

use std::rc::Rc;

use super::{builtin, define};
use crate::callable::Arity;
use crate::symbol_table::SymbolTable;
use crate::value::Value;

pub fn register(table: &Rc<SymbolTable>) {
    define(table, "to_int", builtin("to_int", Arity::exact(1), |a| a[0].to_int()));
    define(table, "to_float", builtin("to_float", Arity::exact(1), |a| a[0].to_float()));
    define(
        table,
        "to_string",
        builtin("to_string", Arity::exact(1), |a| Ok(Value::string(a[0].to_display_string()))),
    );
    define(
        table,
        "to_pretty_string",
        builtin("to_pretty_string", Arity::exact(1), |a| Ok(Value::string(a[0].to_pretty_string()))),
    );
}
