//! Collection built-ins: `len`, `keys`, `values`, `has`, `nulls`, `id`,
//! `clone` (§4.I).

use std::rc::Rc;

use super::{builtin, define};
use crate::callable::Arity;
use crate::error::EvalError;
use crate::symbol_table::SymbolTable;
use crate::value::Value;

pub fn register(table: &Rc<SymbolTable>) {
    define(
        table,
        "len",
        builtin("len", Arity::exact(1), |a| {
            let n = match &a[0] {
                Value::String(s) => s.chars().count(),
                Value::Array(items) => items.len(),
                Value::Map(map) => map.len(),
                other => return Err(EvalError::user(format!("Cannot take len() of {}", other.type_name()))),
            };
            Ok(Value::Int(n as i64))
        }),
    );

    define(
        table,
        "keys",
        builtin("keys", Arity::exact(1), |a| {
            let map = a[0].as_map()?;
            Ok(Value::array(map.keys().cloned().collect()))
        }),
    );

    define(
        table,
        "values",
        builtin("values", Arity::exact(1), |a| {
            let map = a[0].as_map()?;
            Ok(Value::array(map.values().cloned().collect()))
        }),
    );

    define(
        table,
        "has",
        builtin("has", Arity::exact(2), |a| match &a[0] {
            Value::Map(map) => Ok(Value::Bool(map.has(&a[1]))),
            Value::Array(items) => {
                let key = a[1].as_int()?;
                let len = items.len() as i64;
                let i = if key < 0 { key + len } else { key };
                Ok(Value::Bool(i >= 0 && i < len))
            }
            other => Err(EvalError::user(format!("Cannot check has() on {}", other.type_name()))),
        }),
    );

    define(
        table,
        "nulls",
        builtin("nulls", Arity::exact(1), |a| {
            let count = match &a[0] {
                Value::Array(items) => items.iter().filter(|v| matches!(v, Value::Null)).count(),
                Value::Map(map) => map.values().filter(|v| matches!(v, Value::Null)).count(),
                other => return Err(EvalError::user(format!("Cannot count nulls() in {}", other.type_name()))),
            };
            Ok(Value::Int(count as i64))
        }),
    );

    define(
        table,
        "id",
        builtin("id", Arity::exact(1), |a| match a[0].handle_identity() {
            Some(ptr) => Ok(Value::Int(ptr as i64)),
            None => Err(EvalError::user(format!("{} has no stable identity", a[0].type_name()))),
        }),
    );

    define(table, "clone", builtin("clone", Arity::exact(1), |a| Ok(a[0].deep_clone())));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueMap;

    fn table_with_collections() -> Rc<SymbolTable> {
        let table = SymbolTable::new();
        register(&table);
        table
    }

    #[test]
    fn len_reports_utf8_char_count_not_bytes() {
        let table = table_with_collections();
        let len = table.lookup("len").unwrap();
        let result = len.as_callable().unwrap().call(vec![Value::string("héllo")]).unwrap();
        assert!(matches!(result, Value::Int(5)));
    }

    #[test]
    fn id_is_stable_across_cheap_clones_but_not_deep_clone() {
        let table = table_with_collections();
        let id = table.lookup("id").unwrap();
        let callable = id.as_callable().unwrap();
        let original = Value::array(vec![Value::Int(1)]);
        let shared = original.clone();
        let deep = original.deep_clone();
        let Value::Int(id_a) = callable.call(vec![original]).unwrap() else { panic!("expected Int") };
        let Value::Int(id_b) = callable.call(vec![shared]).unwrap() else { panic!("expected Int") };
        let Value::Int(id_c) = callable.call(vec![deep]).unwrap() else { panic!("expected Int") };
        assert_eq!(id_a, id_b);
        assert_ne!(id_a, id_c);
    }

    #[test]
    fn id_rejects_primitives_without_a_handle() {
        let table = table_with_collections();
        let id = table.lookup("id").unwrap();
        assert!(id.as_callable().unwrap().call(vec![Value::Int(1)]).is_err());
    }

    #[test]
    fn has_checks_array_bounds_by_negative_index() {
        let table = table_with_collections();
        let has = table.lookup("has").unwrap();
        let arr = Value::array(vec![Value::Int(1), Value::Int(2)]);
        let result = has.as_callable().unwrap().call(vec![arr, Value::Int(-1)]).unwrap();
        assert!(matches!(result, Value::Bool(true)));
    }

    #[test]
    fn nulls_counts_only_null_entries() {
        let table = table_with_collections();
        let nulls = table.lookup("nulls").unwrap();
        let map = Value::map(ValueMap::from_trusted_pairs(vec![
            (Value::string("a"), Value::Null),
            (Value::string("b"), Value::Int(1)),
        ]));
        let result = nulls.as_callable().unwrap().call(vec![map]).unwrap();
        assert!(matches!(result, Value::Int(1)));
    }
}
