//! Name-keyed symbol table with optional failover parent (§3.5, §4.B).
//!
//! Grounded on the teacher's `namespace.rs` *responsibility* (own bindings,
//! consult a failover on miss) but re-expressed as a name-keyed map instead
//! of a slot-indexed `Vec<Value>`: the teacher's slot layout is a
//! bytecode-compiler optimization with no counterpart once lookups are
//! dynamic and scopes are arbitrary-failover chains rather than statically
//! resolved frames. Internals use `hashbrown`/`ahash`, matching the
//! teacher's choice of hash map for its own internal tables.

use std::cell::RefCell;
use std::rc::Rc;

use ahash::RandomState;
use hashbrown::HashMap;

use crate::error::{EvalError, EvalResult};
use crate::value::Value;

type Bindings = HashMap<Rc<str>, Value, RandomState>;

/// A single lexical scope: its own bindings plus an optional failover
/// parent consulted on lookup miss.
#[derive(Debug)]
pub struct SymbolTable {
    bindings: RefCell<Bindings>,
    failover: Option<Rc<SymbolTable>>,
}

impl SymbolTable {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            bindings: RefCell::new(Bindings::default()),
            failover: None,
        })
    }

    pub fn with_failover(failover: Rc<SymbolTable>) -> Rc<Self> {
        Rc::new(Self {
            bindings: RefCell::new(Bindings::default()),
            failover: Some(failover),
        })
    }

    /// Hint only: pre-sizes the local binding map.
    pub fn reserve(&self, n: usize) {
        self.bindings.borrow_mut().reserve(n);
    }

    /// Fails if `name` is already defined *in this table* (no redefinition
    /// within the same scope; shadowing a parent name in a child scope is
    /// fine).
    pub fn define(&self, name: impl Into<Rc<str>>, value: Value) -> EvalResult<()> {
        let name = name.into();
        let mut bindings = self.bindings.borrow_mut();
        if bindings.contains_key(&name) {
            return Err(EvalError::user(format!("'{name}' is already defined")));
        }
        bindings.insert(name, value);
        Ok(())
    }

    /// Looks up `name`, recursing to the failover chain on miss.
    pub fn lookup(&self, name: &str) -> EvalResult<Value> {
        if let Some(v) = self.bindings.borrow().get(name) {
            return Ok(v.clone());
        }
        match &self.failover {
            Some(parent) => parent.lookup(name),
            None => Err(EvalError::user(format!("Name '{name}' is not defined"))),
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.bindings.borrow().contains_key(name)
            || self.failover.as_ref().is_some_and(|parent| parent.has(name))
    }
}
