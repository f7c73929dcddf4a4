//! Closures, Lambda static analysis, and the weak self-reference callable
//! used to break the recursive ownership cycle (§4.F).
//!
//! Grounded on the teacher's `function.rs` (closures carry captures + a
//! compiled body) reshaped around the spec's name-based capture sets
//! instead of slot indices, and on the "Shared mutable graph avoidance"
//! design note in `spec.md` §9: an exclusive owner of the closure's body
//! and captures, with `self` as a weak back-reference promoted at call
//! time.

use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::ast::{Expr, SymAction, Stmt};
use crate::callable::{Arity, Callable, promote_captured_value};
use crate::error::{EvalError, EvalResult};
use crate::symbol_table::SymbolTable;
use crate::value::Value;

/// Parameter/body/capture analysis for a Lambda expression, computed once
/// at construction time (§4.F, steps 1-5).
#[derive(Debug)]
pub struct LambdaDef {
    pub params: Vec<Rc<str>>,
    pub vararg: Option<Rc<str>>,
    pub prefix: Vec<Stmt>,
    pub final_expr: Box<Expr>,
    /// Free variables of the body, in first-usage order.
    pub captures: Vec<Rc<str>>,
}

impl LambdaDef {
    pub fn new(params: Vec<Rc<str>>, vararg: Option<Rc<str>>, mut body: Vec<Stmt>) -> EvalResult<Self> {
        let self_name: Rc<str> = Rc::from("self");

        // 2 + 3: reject `self` as a parameter, reject duplicate parameters.
        let mut reserved: HashSet<Rc<str>> = HashSet::new();
        for p in params.iter().chain(vararg.iter()) {
            if p.as_ref() == "self" {
                return Err(EvalError::unrecoverable(
                    "'self' is reserved and cannot be used as a parameter name",
                ));
            }
            if !reserved.insert(p.clone()) {
                return Err(EvalError::unrecoverable(format!("duplicate parameter name '{p}'")));
            }
        }
        reserved.insert(self_name.clone());

        // 4: reject an empty body; the last statement must be an Expression.
        if body.is_empty() {
            return Err(EvalError::unrecoverable("lambda body must not be empty"));
        }
        let final_stmt = body.pop().expect("checked non-empty above");
        let Stmt::Expr(final_expr) = final_stmt else {
            return Err(EvalError::unrecoverable(
                "the last statement of a lambda body must be an expression",
            ));
        };

        // 5: walk the body's symbol_sequence to reject illegal local
        // definitions and collect the capture set.
        let mut actions = Vec::new();
        for stmt in &body {
            stmt.symbol_sequence(&mut actions);
        }
        final_expr.symbol_sequence(&mut actions);

        let mut defined_so_far = reserved.clone();
        let mut captures = Vec::new();
        let mut capture_seen = HashSet::new();
        for action in actions {
            match action {
                SymAction::Definition(name) => {
                    if reserved.contains(&name) {
                        return Err(EvalError::unrecoverable(format!(
                            "'{name}' shadows a parameter or 'self' within the same lambda body"
                        )));
                    }
                    defined_so_far.insert(name);
                }
                SymAction::Usage(name) => {
                    if name.as_ref() != "self"
                        && !defined_so_far.contains(&name)
                        && capture_seen.insert(name.clone())
                    {
                        captures.push(name);
                    }
                }
            }
        }

        Ok(Self {
            params,
            vararg,
            prefix: body,
            final_expr: Box::new(final_expr),
            captures,
        })
    }
}

/// A callable bound to captures and a body AST (§4.F).
pub struct Closure {
    name: Rc<str>,
    def: Rc<LambdaDef>,
    capture_table: Rc<SymbolTable>,
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("name", &self.name)
            .field("params", &self.def.params)
            .field("captures", &self.def.captures)
            .finish()
    }
}

impl Closure {
    /// Builds a closure value at Lambda-evaluation time (§4.F "At
    /// evaluation time"): resolves captures against `enclosing`, promotes
    /// any captured weak self-reference to strong, and injects a fresh
    /// weak self-reference under `self`.
    pub fn construct(def: Rc<LambdaDef>, enclosing: &Rc<SymbolTable>, name: Rc<str>) -> EvalResult<Value> {
        let mut captured_values = Vec::with_capacity(def.captures.len());
        for cap_name in &def.captures {
            let value = enclosing
                .lookup(cap_name)
                .map_err(|_| EvalError::unrecoverable(format!("lambda capture '{cap_name}' is not defined")))?;
            captured_values.push((cap_name.clone(), promote_captured_value(value)?));
        }

        let closure_rc: Rc<Closure> = Rc::new_cyclic(|weak: &Weak<Closure>| {
            let table = SymbolTable::new();
            for (cap_name, value) in captured_values {
                table
                    .define(cap_name, value)
                    .expect("capture names are unique by construction");
            }
            let weak_self = Rc::new(WeakSelfClosure {
                inner: Weak::clone(weak),
                name: name.clone(),
            });
            table
                .define("self", Value::Function(weak_self))
                .expect("'self' cannot collide with a capture name");
            Closure { name, def, capture_table: table }
        });
        Ok(Value::Function(closure_rc))
    }
}

impl Callable for Closure {
    fn call(&self, args: Vec<Value>) -> EvalResult<Value> {
        let arity = match &self.def.vararg {
            Some(_) => Arity::at_least(self.def.params.len()),
            None => Arity::exact(self.def.params.len()),
        };
        arity.check(&self.name, args.len())?;

        let _depth_guard = crate::resource::enter_call()?;
        let depth = crate::resource::current_depth();
        crate::tracer::trace_call(&self.name, depth);

        let call_table = SymbolTable::with_failover(Rc::clone(&self.capture_table));
        let mut args = args.into_iter();
        for param in &self.def.params {
            let value = args.next().expect("arity already checked");
            call_table
                .define(param.clone(), value)
                .expect("parameter names are unique by construction");
        }
        if let Some(vararg_name) = &self.def.vararg {
            let rest: Vec<Value> = args.collect();
            call_table
                .define(vararg_name.clone(), Value::array(rest))
                .expect("vararg name is unique by construction");
        }

        let result = (|| {
            for stmt in &self.def.prefix {
                stmt.execute(&call_table)?;
            }
            self.def.final_expr.evaluate(&call_table)
        })();
        crate::tracer::trace_return(&self.name, depth);
        result
    }

    fn debug_dump(&self) -> String {
        let mut out = format!("<closure {}(", self.name);
        out.push_str(&self.def.params.join(", "));
        if let Some(vararg) = &self.def.vararg {
            if !self.def.params.is_empty() {
                out.push_str(", ");
            }
            out.push_str("...");
            out.push_str(vararg);
        }
        out.push_str(")\n  captures: [");
        out.push_str(&self.def.captures.join(", "));
        out.push_str("]>");
        out
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A callable holding a weak handle to a user closure, used solely to break
/// the ownership cycle `closure -> capture_table -> self(strong) ->
/// closure`.
#[derive(Debug)]
pub struct WeakSelfClosure {
    inner: Weak<Closure>,
    name: Rc<str>,
}

impl WeakSelfClosure {
    fn upgrade(&self) -> EvalResult<Rc<Closure>> {
        self.inner
            .upgrade()
            .ok_or_else(|| EvalError::user("self-reference used after its closure was dropped"))
    }
}

impl Callable for WeakSelfClosure {
    fn call(&self, args: Vec<Value>) -> EvalResult<Value> {
        self.upgrade()?.call(args)
    }

    fn debug_dump(&self) -> String {
        format!("<weak-self:{}>", self.name)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn promote_weak_self(&self) -> Option<EvalResult<Rc<dyn Callable>>> {
        Some(self.upgrade().map(|strong| strong as Rc<dyn Callable>))
    }
}
