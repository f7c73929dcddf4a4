//! Type-predicate built-ins: `is_null`, `is_int`, ..., `is_primitive`,
//! `is_structured` (§4.I).

use std::rc::Rc;

use super::{builtin, define};
use crate::callable::Arity;
use crate::symbol_table::SymbolTable;
use crate::value::Value;

pub fn register(table: &Rc<SymbolTable>) {
    define(table, "is_null", builtin("is_null", Arity::exact(1), |a| Ok(Value::Bool(matches!(a[0], Value::Null)))));
    define(table, "is_int", builtin("is_int", Arity::exact(1), |a| Ok(Value::Bool(matches!(a[0], Value::Int(_))))));
    define(
        table,
        "is_float",
        builtin("is_float", Arity::exact(1), |a| Ok(Value::Bool(matches!(a[0], Value::Float(_))))),
    );
    define(table, "is_bool", builtin("is_bool", Arity::exact(1), |a| Ok(Value::Bool(matches!(a[0], Value::Bool(_))))));
    define(
        table,
        "is_string",
        builtin("is_string", Arity::exact(1), |a| Ok(Value::Bool(matches!(a[0], Value::String(_))))),
    );
    define(
        table,
        "is_array",
        builtin("is_array", Arity::exact(1), |a| Ok(Value::Bool(matches!(a[0], Value::Array(_))))),
    );
    define(table, "is_map", builtin("is_map", Arity::exact(1), |a| Ok(Value::Bool(matches!(a[0], Value::Map(_))))));
    define(
        table,
        "is_function",
        builtin("is_function", Arity::exact(1), |a| Ok(Value::Bool(matches!(a[0], Value::Function(_))))),
    );
    define(
        table,
        "is_primitive",
        builtin("is_primitive", Arity::exact(1), |a| Ok(Value::Bool(a[0].is_primitive()))),
    );
    define(
        table,
        "is_structured",
        builtin("is_structured", Arity::exact(1), |a| Ok(Value::Bool(a[0].is_structured()))),
    );
    define(
        table,
        "is_numeric",
        builtin("is_numeric", Arity::exact(1), |a| Ok(Value::Bool(a[0].is_numeric()))),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicates_distinguish_tags() {
        let table = SymbolTable::new();
        register(&table);
        let is_int = table.lookup("is_int").unwrap();
        let callable = is_int.as_callable().unwrap();
        assert!(matches!(callable.call(vec![Value::Int(1)]).unwrap(), Value::Bool(true)));
        assert!(matches!(callable.call(vec![Value::Float(1.0)]).unwrap(), Value::Bool(false)));
    }
}
