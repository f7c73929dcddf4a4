//! `mformat`: renders a format-string template against an explicit Map of
//! values instead of the lexical scope that the `${...}` string-literal
//! grammar reads from (§4.G, §4.I). Useful when the substitution values
//! come from data rather than local bindings.

use std::rc::Rc;

use super::{builtin, define};
use crate::callable::Arity;
use crate::error::EvalError;
use crate::format_string::{parse_format_string, FormatSegment};
use crate::symbol_table::SymbolTable;
use crate::value::Value;

pub fn register(table: &Rc<SymbolTable>) {
    define(
        table,
        "mformat",
        builtin("mformat", Arity::exact(2), |a| {
            let template = a[0].as_str()?;
            let values = a[1].as_map()?;
            let segments = parse_format_string(template)?;
            let mut out = String::new();
            for segment in &segments {
                match segment {
                    FormatSegment::Literal(lit) => out.push_str(lit),
                    FormatSegment::Placeholder(name) => {
                        let value = values.get(&Value::string(name.as_ref())).ok_or_else(|| {
                            EvalError::user(format!("mformat: '{name}' not found in values map"))
                        })?;
                        out.push_str(&value.to_display_string());
                    }
                }
            }
            Ok(Value::string(out))
        }),
    );
}
