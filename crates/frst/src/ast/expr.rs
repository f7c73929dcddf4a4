//! Expression nodes (§4.D): `evaluate` produces a [`Value`]; `symbol_sequence`
//! replays the name definitions/usages a hypothetical execution would
//! perform, used by [`crate::closure::LambdaDef`] to compute free variables
//! without actually running the body.

use std::rc::Rc;

use super::{SymAction, Stmt};
use crate::closure::{Closure, LambdaDef};
use crate::error::{EvalError, EvalResult};
use crate::format_string::{parse_format_string, FormatSegment};
use crate::symbol_table::SymbolTable;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

#[derive(Debug)]
pub enum Expr {
    Literal(Value),
    NameLookup(Rc<str>),
    Binop(Box<Expr>, BinOp, Box<Expr>),
    Unop(UnOp, Box<Expr>),
    If(Box<Expr>, Box<Expr>, Option<Box<Expr>>),
    ArrayConstructor(Vec<Expr>),
    MapConstructor(Vec<(Expr, Expr)>),
    Index(Box<Expr>, Box<Expr>),
    Call(Box<Expr>, Vec<Expr>),
    FormatString(Rc<[FormatSegment]>),
    Lambda(Rc<LambdaDef>, Rc<str>),
    Map(Box<Expr>, Box<Expr>),
    Filter(Box<Expr>, Box<Expr>),
    Reduce(Box<Expr>, Box<Expr>, Option<Box<Expr>>),
    Foreach(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn literal(value: Value) -> Expr {
        Expr::Literal(value)
    }

    pub fn name_lookup(name: impl Into<Rc<str>>) -> Expr {
        Expr::NameLookup(name.into())
    }

    pub fn binop(lhs: Expr, op: BinOp, rhs: Expr) -> Expr {
        Expr::Binop(Box::new(lhs), op, Box::new(rhs))
    }

    pub fn unop(op: UnOp, operand: Expr) -> Expr {
        Expr::Unop(op, Box::new(operand))
    }

    pub fn if_expr(cond: Expr, then_branch: Expr, else_branch: Option<Expr>) -> Expr {
        Expr::If(Box::new(cond), Box::new(then_branch), else_branch.map(Box::new))
    }

    pub fn array_constructor(items: Vec<Expr>) -> Expr {
        Expr::ArrayConstructor(items)
    }

    pub fn map_constructor(pairs: Vec<(Expr, Expr)>) -> Expr {
        Expr::MapConstructor(pairs)
    }

    pub fn index(base: Expr, key: Expr) -> Expr {
        Expr::Index(Box::new(base), Box::new(key))
    }

    pub fn call(callee: Expr, args: Vec<Expr>) -> Expr {
        Expr::Call(Box::new(callee), args)
    }

    /// Parses `template` once at construction time (§4.G).
    pub fn format_string(template: &str) -> EvalResult<Expr> {
        let segments = parse_format_string(template)?;
        Ok(Expr::FormatString(Rc::from(segments)))
    }

    /// Builds a named Lambda expression; `name` is used only for
    /// diagnostics (arity-error messages, `debug_dump`). Anonymous lambdas
    /// should pass `"<lambda>"`.
    pub fn lambda(params: Vec<Rc<str>>, vararg: Option<Rc<str>>, body: Vec<Stmt>) -> EvalResult<Expr> {
        Self::named_lambda(Rc::from("<lambda>"), params, vararg, body)
    }

    pub fn named_lambda(
        name: Rc<str>,
        params: Vec<Rc<str>>,
        vararg: Option<Rc<str>>,
        body: Vec<Stmt>,
    ) -> EvalResult<Expr> {
        let def = LambdaDef::new(params, vararg, body)?;
        Ok(Expr::Lambda(Rc::new(def), name))
    }

    /// `Map(structure, fn)` — delegates to [`Value::do_map`] (§4.D/§4.A).
    pub fn iter_map(structure: Expr, func: Expr) -> Expr {
        Expr::Map(Box::new(structure), Box::new(func))
    }

    /// `Filter(structure, fn)` — delegates to [`Value::do_filter`].
    pub fn iter_filter(structure: Expr, func: Expr) -> Expr {
        Expr::Filter(Box::new(structure), Box::new(func))
    }

    /// `Reduce(structure, fn, init?)` — delegates to [`Value::do_reduce`].
    pub fn iter_reduce(structure: Expr, func: Expr, init: Option<Expr>) -> Expr {
        Expr::Reduce(Box::new(structure), Box::new(func), init.map(Box::new))
    }

    /// `Foreach(structure, fn)` — delegates to [`Value::foreach`].
    pub fn iter_foreach(structure: Expr, func: Expr) -> Expr {
        Expr::Foreach(Box::new(structure), Box::new(func))
    }

    pub fn evaluate(&self, scope: &Rc<SymbolTable>) -> EvalResult<Value> {
        match self {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::NameLookup(name) => scope.lookup(name),
            Expr::Binop(lhs, op, rhs) => eval_binop(lhs, *op, rhs, scope),
            Expr::Unop(op, operand) => {
                let v = operand.evaluate(scope)?;
                match op {
                    UnOp::Neg => v.negate(),
                    UnOp::Not => Ok(v.logical_not()),
                }
            }
            Expr::If(cond, then_branch, else_branch) => {
                if cond.evaluate(scope)?.truthy() {
                    then_branch.evaluate(scope)
                } else {
                    match else_branch {
                        Some(e) => e.evaluate(scope),
                        None => Ok(Value::Null),
                    }
                }
            }
            Expr::ArrayConstructor(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(item.evaluate(scope)?);
                }
                Ok(Value::array(out))
            }
            Expr::MapConstructor(pairs) => {
                let mut out = Vec::with_capacity(pairs.len());
                for (k, v) in pairs {
                    out.push((k.evaluate(scope)?, v.evaluate(scope)?));
                }
                Value::create_map(out)
            }
            Expr::Index(base, key) => {
                let base_val = base.evaluate(scope)?;
                let key_val = key.evaluate(scope)?;
                match &base_val {
                    Value::Array(items) => match &key_val {
                        Value::Int(idx) => Ok(Value::index_array(items, *idx)),
                        _ => Err(EvalError::user(format!(
                            "Array index must be Int, got {}",
                            key_val.type_name()
                        ))),
                    },
                    Value::Map(map) => Value::index_map(map, &key_val),
                    _ => Err(EvalError::user(format!(
                        "Cannot index into {}",
                        base_val.type_name()
                    ))),
                }
            }
            Expr::Call(callee, arg_exprs) => {
                let callee_val = callee.evaluate(scope)?;
                let callable = callee_val.as_callable()?;
                let mut args = Vec::with_capacity(arg_exprs.len());
                for a in arg_exprs {
                    args.push(a.evaluate(scope)?);
                }
                callable.call(args)
            }
            Expr::FormatString(segments) => {
                let mut out = String::new();
                for segment in segments.iter() {
                    match segment {
                        FormatSegment::Literal(lit) => out.push_str(lit),
                        FormatSegment::Placeholder(name) => {
                            let value = scope.lookup(name)?;
                            out.push_str(&value.to_display_string());
                        }
                    }
                }
                Ok(Value::string(out))
            }
            Expr::Lambda(def, name) => Closure::construct(Rc::clone(def), scope, Rc::clone(name)),
            Expr::Map(structure, func) => {
                let structure_val = structure.evaluate(scope)?;
                let func_val = func.evaluate(scope)?;
                structure_val.do_map(func_val.as_callable()?)
            }
            Expr::Filter(structure, func) => {
                let structure_val = structure.evaluate(scope)?;
                let func_val = func.evaluate(scope)?;
                structure_val.do_filter(func_val.as_callable()?)
            }
            Expr::Reduce(structure, func, init) => {
                let structure_val = structure.evaluate(scope)?;
                let func_val = func.evaluate(scope)?;
                let init_val = match init {
                    Some(e) => Some(e.evaluate(scope)?),
                    None => None,
                };
                structure_val.do_reduce(func_val.as_callable()?, init_val)
            }
            Expr::Foreach(structure, func) => {
                let structure_val = structure.evaluate(scope)?;
                let func_val = func.evaluate(scope)?;
                structure_val.foreach(func_val.as_callable()?)
            }
        }
    }

    pub fn symbol_sequence(&self, out: &mut Vec<SymAction>) {
        match self {
            Expr::Literal(_) => {}
            Expr::NameLookup(name) => out.push(SymAction::Usage(Rc::clone(name))),
            Expr::Binop(lhs, _, rhs) => {
                lhs.symbol_sequence(out);
                rhs.symbol_sequence(out);
            }
            Expr::Unop(_, operand) => operand.symbol_sequence(out),
            Expr::If(cond, then_branch, else_branch) => {
                cond.symbol_sequence(out);
                then_branch.symbol_sequence(out);
                if let Some(e) = else_branch {
                    e.symbol_sequence(out);
                }
            }
            Expr::ArrayConstructor(items) => {
                for item in items {
                    item.symbol_sequence(out);
                }
            }
            Expr::MapConstructor(pairs) => {
                for (k, v) in pairs {
                    k.symbol_sequence(out);
                    v.symbol_sequence(out);
                }
            }
            Expr::Index(base, key) => {
                base.symbol_sequence(out);
                key.symbol_sequence(out);
            }
            Expr::Call(callee, args) => {
                callee.symbol_sequence(out);
                for a in args {
                    a.symbol_sequence(out);
                }
            }
            Expr::FormatString(segments) => {
                for segment in segments.iter() {
                    if let FormatSegment::Placeholder(name) = segment {
                        out.push(SymAction::Usage(Rc::clone(name)));
                    }
                }
            }
            // A nested lambda's own parameters are local to it; only its
            // free variables (already computed) are a usage from the
            // perspective of the enclosing lambda.
            Expr::Lambda(def, _) => {
                for cap in &def.captures {
                    out.push(SymAction::Usage(Rc::clone(cap)));
                }
            }
            Expr::Map(structure, func) | Expr::Filter(structure, func) | Expr::Foreach(structure, func) => {
                structure.symbol_sequence(out);
                func.symbol_sequence(out);
            }
            Expr::Reduce(structure, func, init) => {
                structure.symbol_sequence(out);
                func.symbol_sequence(out);
                if let Some(e) = init {
                    e.symbol_sequence(out);
                }
            }
        }
    }
}

fn eval_binop(lhs: &Expr, op: BinOp, rhs: &Expr, scope: &Rc<SymbolTable>) -> EvalResult<Value> {
    // `&&`/`||` short-circuit (§4.D); every other operator evaluates both
    // operands first.
    if op == BinOp::And {
        let l = lhs.evaluate(scope)?;
        return if !l.truthy() { Ok(l) } else { rhs.evaluate(scope) };
    }
    if op == BinOp::Or {
        let l = lhs.evaluate(scope)?;
        return if l.truthy() { Ok(l) } else { rhs.evaluate(scope) };
    }

    let l = lhs.evaluate(scope)?;
    let r = rhs.evaluate(scope)?;
    match op {
        BinOp::Add => l.add(&r),
        BinOp::Sub => l.sub(&r),
        BinOp::Mul => l.mul(&r),
        BinOp::Div => l.div(&r),
        BinOp::Mod => l.modulus(&r),
        BinOp::Eq => Ok(Value::Bool(l.eq(&r))),
        BinOp::NotEq => Ok(Value::Bool(l.not_equal(&r))),
        BinOp::Lt => l.compare(&r).map(|o| Value::Bool(o.is_lt())),
        BinOp::Le => l.compare(&r).map(|o| Value::Bool(o.is_le())),
        BinOp::Gt => l.compare(&r).map(|o| Value::Bool(o.is_gt())),
        BinOp::Ge => l.compare(&r).map(|o| Value::Bool(o.is_ge())),
        BinOp::And | BinOp::Or => unreachable!("handled above"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_circuit_and_does_not_evaluate_rhs() {
        let scope = SymbolTable::new();
        let expr = Expr::binop(Expr::literal(Value::Bool(false)), BinOp::And, Expr::name_lookup("missing"));
        assert!(matches!(expr.evaluate(&scope).unwrap(), Value::Bool(false)));
    }

    #[test]
    fn short_circuit_or_does_not_evaluate_rhs() {
        let scope = SymbolTable::new();
        let expr = Expr::binop(Expr::literal(Value::Bool(true)), BinOp::Or, Expr::name_lookup("missing"));
        assert!(matches!(expr.evaluate(&scope).unwrap(), Value::Bool(true)));
    }

    #[test]
    fn if_without_else_is_null() {
        let scope = SymbolTable::new();
        let expr = Expr::if_expr(Expr::literal(Value::Bool(false)), Expr::literal(Value::Int(1)), None);
        assert!(matches!(expr.evaluate(&scope).unwrap(), Value::Null));
    }

    #[test]
    fn array_index_out_of_range_is_null_not_error() {
        let scope = SymbolTable::new();
        let expr = Expr::index(
            Expr::array_constructor(vec![Expr::literal(Value::Int(1))]),
            Expr::literal(Value::Int(99)),
        );
        assert!(matches!(expr.evaluate(&scope).unwrap(), Value::Null));
    }

    #[test]
    fn format_string_interpolates_named_scope_values() {
        let scope = SymbolTable::new();
        scope.define("name", Value::string("Ada")).unwrap();
        scope.define("amount", Value::Int(5)).unwrap();
        let expr = Expr::format_string("Hello ${name}! You owe $${amount}").unwrap();
        assert!(matches!(expr.evaluate(&scope).unwrap(), Value::String(s) if &*s == "Hello Ada! You owe $5"));
    }

    #[test]
    fn array_index_with_non_int_key_is_a_recoverable_error() {
        let scope = SymbolTable::new();
        let expr = Expr::index(
            Expr::array_constructor(vec![Expr::literal(Value::Int(1))]),
            Expr::literal(Value::Float(0.0)),
        );
        let err = expr.evaluate(&scope).unwrap_err();
        assert!(err.is_catchable());
        assert!(err.message().contains("Array index must be Int"));
    }

    fn double_lambda() -> Expr {
        Expr::lambda(
            vec![Rc::from("n")],
            None,
            vec![Stmt::Expr(Expr::binop(Expr::name_lookup("n"), BinOp::Mul, Expr::literal(Value::Int(2))))],
        )
        .unwrap()
    }

    #[test]
    fn map_op_applies_fn_to_each_array_element() {
        let scope = SymbolTable::new();
        let arr = Expr::array_constructor(vec![Expr::literal(Value::Int(1)), Expr::literal(Value::Int(2))]);
        let expr = Expr::iter_map(arr, double_lambda());
        let result = expr.evaluate(&scope).unwrap();
        let items = result.as_array().unwrap();
        assert!(matches!(items[0], Value::Int(2)));
        assert!(matches!(items[1], Value::Int(4)));
    }

    #[test]
    fn filter_op_retains_truthy_elements_in_order() {
        let scope = SymbolTable::new();
        let is_positive = Expr::lambda(
            vec![Rc::from("n")],
            None,
            vec![Stmt::Expr(Expr::binop(Expr::name_lookup("n"), BinOp::Gt, Expr::literal(Value::Int(0))))],
        )
        .unwrap();
        let arr = Expr::array_constructor(vec![
            Expr::literal(Value::Int(-1)),
            Expr::literal(Value::Int(2)),
            Expr::literal(Value::Int(-3)),
        ]);
        let result = Expr::iter_filter(arr, is_positive).evaluate(&scope).unwrap();
        let items = result.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Value::Int(2)));
    }

    #[test]
    fn reduce_op_without_init_folds_with_head_as_seed() {
        let scope = SymbolTable::new();
        let add = Expr::lambda(
            vec![Rc::from("acc"), Rc::from("n")],
            None,
            vec![Stmt::Expr(Expr::binop(Expr::name_lookup("acc"), BinOp::Add, Expr::name_lookup("n")))],
        )
        .unwrap();
        let arr = Expr::array_constructor(vec![
            Expr::literal(Value::Int(1)),
            Expr::literal(Value::Int(2)),
            Expr::literal(Value::Int(3)),
        ]);
        let result = Expr::iter_reduce(arr, add, None).evaluate(&scope).unwrap();
        assert!(matches!(result, Value::Int(6)));
    }

    #[test]
    fn foreach_op_returns_null_and_breaks_on_truthy() {
        let scope = SymbolTable::new();
        let is_two = Expr::lambda(
            vec![Rc::from("n")],
            None,
            vec![Stmt::Expr(Expr::binop(Expr::name_lookup("n"), BinOp::Eq, Expr::literal(Value::Int(2))))],
        )
        .unwrap();
        let arr = Expr::array_constructor(vec![
            Expr::literal(Value::Int(1)),
            Expr::literal(Value::Int(2)),
            Expr::literal(Value::Int(3)),
        ]);
        let result = Expr::iter_foreach(arr, is_two).evaluate(&scope).unwrap();
        assert!(matches!(result, Value::Null));
    }

    #[test]
    fn map_constructor_last_wins_on_duplicate_key() {
        let scope = SymbolTable::new();
        let expr = Expr::map_constructor(vec![
            (Expr::literal(Value::string("a")), Expr::literal(Value::Int(1))),
            (Expr::literal(Value::string("a")), Expr::literal(Value::Int(2))),
        ]);
        let map_val = expr.evaluate(&scope).unwrap();
        let map = map_val.as_map().unwrap();
        assert_eq!(map.len(), 1);
        assert!(matches!(map.get(&Value::string("a")), Some(Value::Int(2))));
    }
}
