//! Arithmetic/comparison wrapper built-ins (§4.I): thin arity-2 delegations
//! to the `Value` operators in §4.A, for callers that need a function value
//! rather than inline operator syntax (e.g. passed to `do_reduce`/`do_map`,
//! or `try_call`'d directly as in §8.2.7's `try_call(divide, [1, 0])`).

use std::rc::Rc;

use super::{builtin, define};
use crate::callable::Arity;
use crate::symbol_table::SymbolTable;
use crate::value::Value;

pub fn register(table: &Rc<SymbolTable>) {
    define(table, "plus", builtin("plus", Arity::exact(2), |a| a[0].add(&a[1])));
    define(table, "minus", builtin("minus", Arity::exact(2), |a| a[0].sub(&a[1])));
    define(table, "times", builtin("times", Arity::exact(2), |a| a[0].mul(&a[1])));
    define(table, "divide", builtin("divide", Arity::exact(2), |a| a[0].div(&a[1])));
    define(table, "mod", builtin("mod", Arity::exact(2), |a| a[0].modulus(&a[1])));
    define(table, "equal", builtin("equal", Arity::exact(2), |a| Ok(Value::Bool(a[0].eq(&a[1])))));
    define(
        table,
        "not_equal",
        builtin("not_equal", Arity::exact(2), |a| Ok(Value::Bool(a[0].not_equal(&a[1])))),
    );
    define(
        table,
        "less_than",
        builtin("less_than", Arity::exact(2), |a| a[0].compare(&a[1]).map(|o| Value::Bool(o.is_lt()))),
    );
    define(
        table,
        "less_than_or_equal",
        builtin("less_than_or_equal", Arity::exact(2), |a| {
            a[0].compare(&a[1]).map(|o| Value::Bool(o.is_le()))
        }),
    );
    define(
        table,
        "greater_than",
        builtin("greater_than", Arity::exact(2), |a| a[0].compare(&a[1]).map(|o| Value::Bool(o.is_gt()))),
    );
    define(
        table,
        "greater_than_or_equal",
        builtin("greater_than_or_equal", Arity::exact(2), |a| {
            a[0].compare(&a[1]).map(|o| Value::Bool(o.is_ge()))
        }),
    );
    define(
        table,
        "deep_equal",
        builtin("deep_equal", Arity::exact(2), |a| Ok(Value::Bool(a[0].deep_equal(&a[1])))),
    );
}
