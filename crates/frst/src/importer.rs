//! Module import and caching (§4.H).
//!
//! Grounded on the teacher's module-loading responsibility (resolve a name
//! to source text, execute it once, cache the result) but with the actual
//! text-to-AST step pulled out behind a [`Parser`] seam: turning `frst`
//! source text into [`Stmt`]s is explicitly out of scope of this crate, so
//! the importer is generic over whoever supplies that step (`frst-cli`'s
//! own minimal parser, or a test double).

use std::cell::RefCell;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use crate::ast::Stmt;
use crate::error::{EvalError, EvalResult};
use crate::symbol_table::SymbolTable;
use crate::value::Value;

/// Seam between this crate's evaluator and whatever turns `frst` source text
/// into statements. Parsing itself is out of scope here (§1 Non-goals).
pub trait Parser {
    fn parse_module(&self, source: &str, module_name: &str) -> Result<Vec<Stmt>, String>;
}

/// The `FROST_MODULE_PATH` environment variable: a `:`-separated list of
/// directories searched, in order, for `<module_name>.frst`.
pub const MODULE_PATH_ENV_VAR: &str = "FROST_MODULE_PATH";

/// Resolves module names to source files, parses and executes each module
/// exactly once, and caches the resulting export Map by name.
pub struct Importer<P: Parser> {
    parser: P,
    search_path: Vec<PathBuf>,
    cache: RefCell<hashbrown::HashMap<String, Value, ahash::RandomState>>,
    in_progress: RefCell<HashSet<String>>,
}

impl<P: Parser> Importer<P> {
    pub fn new(parser: P) -> Self {
        Self {
            parser,
            search_path: search_path_from_env(),
            cache: RefCell::new(hashbrown::HashMap::default()),
            in_progress: RefCell::new(HashSet::new()),
        }
    }

    pub fn with_search_path(parser: P, search_path: Vec<PathBuf>) -> Self {
        Self {
            parser,
            search_path,
            cache: RefCell::new(hashbrown::HashMap::default()),
            in_progress: RefCell::new(HashSet::new()),
        }
    }

    /// Imports `module_name`, executing it against `globals` (e.g. the
    /// built-ins table) as its failover scope, and returns a Map of its
    /// exported bindings. Subsequent imports of the same name return the
    /// cached Map without re-executing the module.
    pub fn import(&self, module_name: &str, globals: &Rc<SymbolTable>) -> EvalResult<Value> {
        if let Some(cached) = self.cache.borrow().get(module_name) {
            return Ok(cached.clone());
        }
        if !self.in_progress.borrow_mut().insert(module_name.to_string()) {
            return Err(EvalError::unrecoverable(format!(
                "Circular import detected while loading '{module_name}'"
            )));
        }

        let result = self.load_and_execute(module_name, globals);
        self.in_progress.borrow_mut().remove(module_name);
        let exports = result?;
        self.cache.borrow_mut().insert(module_name.to_string(), exports.clone());
        Ok(exports)
    }

    fn load_and_execute(&self, module_name: &str, globals: &Rc<SymbolTable>) -> EvalResult<Value> {
        let source = self.read_source(module_name)?;
        let stmts = self
            .parser
            .parse_module(&source, module_name)
            .map_err(|msg| EvalError::unrecoverable(format!("Failed to parse module '{module_name}': {msg}")))?;

        let module_scope = SymbolTable::with_failover(Rc::clone(globals));
        let mut exported = Vec::new();
        for stmt in &stmts {
            exported.extend(stmt.execute(&module_scope)?);
        }

        let pairs = exported.into_iter().map(|(name, value)| (Value::string(name), value)).collect();
        Value::create_map(pairs)
    }

    fn read_source(&self, module_name: &str) -> EvalResult<String> {
        for dir in &self.search_path {
            let candidate = dir.join(format!("{module_name}.frst"));
            if let Ok(source) = fs::read_to_string(&candidate) {
                return Ok(source);
            }
        }
        Err(EvalError::user(format!(
            "Module '{module_name}' not found on FROST_MODULE_PATH"
        )))
    }
}

fn search_path_from_env() -> Vec<PathBuf> {
    std::env::var_os(MODULE_PATH_ENV_VAR)
        .map(|raw| std::env::split_paths(&raw).collect())
        .unwrap_or_default()
}
