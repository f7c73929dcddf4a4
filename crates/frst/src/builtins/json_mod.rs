//! JSON library built-ins: `to_json`, `parse_json` (§8.3 library-contract
//! scenarios). Grounded on `serde_json`, the teacher's own JSON crate
//! (`ouros` round-trips VM values through it for its REPL snapshot format).

use std::rc::Rc;

use serde_json::Value as Json;

use super::{builtin, define};
use crate::callable::Arity;
use crate::error::{EvalError, EvalResult};
use crate::symbol_table::SymbolTable;
use crate::value::{Value, ValueMap};

pub fn register(table: &Rc<SymbolTable>) {
    define(
        table,
        "to_json",
        builtin("to_json", Arity::exact(1), |a| {
            let json = value_to_json(&a[0])?;
            serde_json::to_string(&json).map(Value::string).map_err(|e| EvalError::user(e.to_string()))
        }),
    );

    define(
        table,
        "parse_json",
        builtin("parse_json", Arity::exact(1), |a| {
            let text = a[0].as_str()?;
            let json: Json = serde_json::from_str(text).map_err(|e| EvalError::user(format!("Invalid JSON: {e}")))?;
            json_to_value(&json)
        }),
    );
}

fn value_to_json(value: &Value) -> EvalResult<Json> {
    Ok(match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(n) => Json::Number((*n).into()),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(Json::Number)
            .ok_or_else(|| EvalError::user("Cannot represent non-finite Float as JSON"))?,
        Value::String(s) => Json::String(s.to_string()),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items.iter() {
                out.push(value_to_json(item)?);
            }
            Json::Array(out)
        }
        Value::Map(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map.iter() {
                out.insert(k.to_display_string(), value_to_json(v)?);
            }
            Json::Object(out)
        }
        Value::Function(_) => return Err(EvalError::user("Cannot represent Function as JSON")),
    })
}

fn json_to_value(json: &Json) -> EvalResult<Value> {
    Ok(match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().ok_or_else(|| EvalError::user("JSON number out of range"))?)
            }
        }
        Json::String(s) => Value::string(s.as_str()),
        Json::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(json_to_value(item)?);
            }
            Value::array(out)
        }
        Json::Object(map) => {
            let mut pairs = Vec::with_capacity(map.len());
            for (k, v) in map {
                pairs.push((Value::string(k.as_str()), json_to_value(v)?));
            }
            Value::map(ValueMap::from_trusted_pairs(pairs))
        }
    })
}
