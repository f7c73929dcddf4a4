//! Core evaluator for the `frst` scripting language: value model, symbol
//! tables, closures, AST nodes and their `evaluate`/`execute` contracts, the
//! module importer, and the built-in function library.
//!
//! Parsing source text into [`ast::Stmt`]/[`ast::Expr`] trees is out of
//! scope for this crate; callers (the CLI, embedders) supply a
//! [`importer::Parser`] implementation and otherwise construct AST nodes
//! directly.
#![expect(clippy::too_many_arguments, reason = "closure construction mirrors the teacher's wide call APIs")]

mod ast;
mod builtins;
mod callable;
mod closure;
mod error;
mod format_string;
mod importer;
mod resource;
mod symbol_table;
mod tracer;
mod value;

pub use ast::{BinOp, Expr, ExportBindings, SymAction, Stmt, UnOp};
pub use builtins::install_builtins;
pub use callable::{Arity, BuiltinFn, Callable};
pub use closure::{Closure, LambdaDef, WeakSelfClosure};
pub use error::{EvalError, EvalResult};
pub use format_string::{parse_format_string, FormatSegment};
pub use importer::{Importer, Parser, MODULE_PATH_ENV_VAR};
pub use resource::{
    install_tracker, CallDepthGuard, EvalLimits, LimitedTracker, NoLimitTracker, ResourceTracker,
    DEFAULT_MAX_RECURSION_DEPTH,
};
pub use symbol_table::SymbolTable;
pub use tracer::{install_tracer, EvalTracer, NoopTracer, StderrTracer};
pub use value::{Value, ValueMap};
