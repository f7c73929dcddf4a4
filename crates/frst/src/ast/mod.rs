//! AST nodes (§4.D): the closed set of Statement/Expression variants and
//! their `evaluate`/`execute`/`symbol_sequence` contracts.
//!
//! Grounded on the teacher's `expressions.rs`: a closed algebraic data type
//! with a method per operation, matched exhaustively, in place of an open
//! visitor hierarchy (per the "Polymorphic expression dispatch" design note
//! in `spec.md` §9).

pub mod expr;
pub mod stmt;

pub use expr::{BinOp, Expr, UnOp};
pub use stmt::Stmt;

use std::rc::Rc;

/// One action in a statement or expression's lazy `symbol_sequence`: a name
/// definition or a name usage, in the exact order they occur during
/// hypothetical execution (§3.6). Used by the Lambda static analyzer
/// (`crate::closure`) to compute free variables at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymAction {
    Definition(Rc<str>),
    Usage(Rc<str>),
}

/// An export binding produced by executing a `Define`/`Array_Destructure`/
/// `Map_Destructure` statement with its `export` modifier set (§3.6).
pub type ExportBindings = Vec<(Rc<str>, crate::value::Value)>;
