//! Statement nodes (§4.D, §3.6): `execute` applies side effects to a scope
//! and returns any bindings the statement `export`s; `symbol_sequence`
//! replays the definitions/usages a hypothetical execution would perform.

use std::rc::Rc;

use super::{Expr, ExportBindings, SymAction};
use crate::error::{EvalError, EvalResult};
use crate::symbol_table::SymbolTable;
use crate::value::Value;

/// An Array_Destructure binding target: a fixed prefix of names plus an
/// optional `...rest` collecting the remainder (§3.6).
#[derive(Debug)]
pub struct ArrayPattern {
    pub names: Vec<Rc<str>>,
    pub rest: Option<Rc<str>>,
}

/// A Map_Destructure binding target: each entry pulls `map[key]` into a
/// local name.
#[derive(Debug)]
pub struct MapPattern {
    pub bindings: Vec<(Value, Rc<str>)>,
}

#[derive(Debug)]
pub enum Stmt {
    Expr(Expr),
    Define(Rc<str>, Expr, bool),
    ArrayDestructure(ArrayPattern, Expr, bool),
    MapDestructure(MapPattern, Expr, bool),
}

impl Stmt {
    pub fn define(name: impl Into<Rc<str>>, value_expr: Expr, export: bool) -> Stmt {
        Stmt::Define(name.into(), value_expr, export)
    }

    pub fn array_destructure(names: Vec<Rc<str>>, rest: Option<Rc<str>>, value_expr: Expr, export: bool) -> Stmt {
        Stmt::ArrayDestructure(ArrayPattern { names, rest }, value_expr, export)
    }

    pub fn map_destructure(bindings: Vec<(Value, Rc<str>)>, value_expr: Expr, export: bool) -> Stmt {
        Stmt::MapDestructure(MapPattern { bindings }, value_expr, export)
    }

    /// Executes the statement against `scope`, returning the bindings it
    /// exports (empty unless the statement's `export` flag is set).
    pub fn execute(&self, scope: &Rc<SymbolTable>) -> EvalResult<ExportBindings> {
        match self {
            Stmt::Expr(expr) => {
                expr.evaluate(scope)?;
                Ok(Vec::new())
            }
            Stmt::Define(name, value_expr, export) => {
                let value = value_expr.evaluate(scope)?;
                scope.define(Rc::clone(name), value.clone())?;
                Ok(if *export { vec![(Rc::clone(name), value)] } else { Vec::new() })
            }
            Stmt::ArrayDestructure(pattern, value_expr, export) => {
                let value = value_expr.evaluate(scope)?;
                let items = value.as_array()?;
                if pattern.rest.is_none() && items.len() != pattern.names.len() {
                    return Err(EvalError::user(format!(
                        "Array destructure expects exactly {} element(s), got {}",
                        pattern.names.len(),
                        items.len()
                    )));
                }
                if items.len() < pattern.names.len() {
                    return Err(EvalError::user(format!(
                        "Array destructure expects at least {} element(s), got {}",
                        pattern.names.len(),
                        items.len()
                    )));
                }

                let mut exported = Vec::new();
                for (name, item) in pattern.names.iter().zip(items.iter()) {
                    scope.define(Rc::clone(name), item.clone())?;
                    if *export {
                        exported.push((Rc::clone(name), item.clone()));
                    }
                }
                if let Some(rest_name) = &pattern.rest {
                    let rest_items: Vec<Value> = items[pattern.names.len()..].to_vec();
                    let rest_value = Value::array(rest_items);
                    scope.define(Rc::clone(rest_name), rest_value.clone())?;
                    if *export {
                        exported.push((Rc::clone(rest_name), rest_value));
                    }
                }
                Ok(exported)
            }
            Stmt::MapDestructure(pattern, value_expr, export) => {
                let value = value_expr.evaluate(scope)?;
                let map = value.as_map()?;
                let mut exported = Vec::new();
                for (key, local_name) in &pattern.bindings {
                    if matches!(key, Value::Null) || !key.is_primitive() {
                        return Err(EvalError::user(format!(
                            "Map destructure key must be a non-null primitive, got {}",
                            key.type_name()
                        )));
                    }
                    let bound = map.get(key).cloned().unwrap_or(Value::Null);
                    scope.define(Rc::clone(local_name), bound.clone())?;
                    if *export {
                        exported.push((Rc::clone(local_name), bound));
                    }
                }
                Ok(exported)
            }
        }
    }

    pub fn symbol_sequence(&self, out: &mut Vec<SymAction>) {
        match self {
            Stmt::Expr(expr) => expr.symbol_sequence(out),
            Stmt::Define(name, value_expr, _) => {
                value_expr.symbol_sequence(out);
                out.push(SymAction::Definition(Rc::clone(name)));
            }
            Stmt::ArrayDestructure(pattern, value_expr, _) => {
                value_expr.symbol_sequence(out);
                for name in &pattern.names {
                    out.push(SymAction::Definition(Rc::clone(name)));
                }
                if let Some(rest_name) = &pattern.rest {
                    out.push(SymAction::Definition(Rc::clone(rest_name)));
                }
            }
            Stmt::MapDestructure(pattern, value_expr, _) => {
                value_expr.symbol_sequence(out);
                for (_, local_name) in &pattern.bindings {
                    out.push(SymAction::Definition(Rc::clone(local_name)));
                }
            }
        }
    }
}
