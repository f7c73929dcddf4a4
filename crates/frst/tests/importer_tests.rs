//! Module resolution, caching and circular-import detection, exercised
//! through a tiny line-oriented stand-in `Parser` (text-to-AST parsing
//! itself is out of scope; see `frst::importer::Parser`).

use std::fs;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use frst::{Arity, BuiltinFn, Callable, Expr, Importer, Parser, Stmt, SymbolTable, Value};

struct LineParser;

impl Parser for LineParser {
    fn parse_module(&self, source: &str, _module_name: &str) -> Result<Vec<Stmt>, String> {
        let mut stmts = Vec::new();
        for line in source.lines() {
            if let Some(rest) = line.strip_prefix("export:") {
                let (name, value) = rest.split_once('=').ok_or("malformed export line")?;
                let value: i64 = value.parse().map_err(|_| "malformed export value")?;
                stmts.push(Stmt::define(name, Expr::literal(Value::Int(value)), true));
            } else if let Some(other) = line.strip_prefix("import:") {
                stmts.push(Stmt::Expr(Expr::call(
                    Expr::name_lookup("import"),
                    vec![Expr::literal(Value::string(other))],
                )));
            }
        }
        Ok(stmts)
    }
}

fn globals_with_import(importer: Rc<Importer<LineParser>>) -> Rc<SymbolTable> {
    let globals = SymbolTable::new();
    let globals_for_closure = Rc::clone(&globals);
    let import_fn = BuiltinFn::new("import", Arity::exact(1), move |args| {
        let name = args[0].as_str()?;
        importer.import(name, &globals_for_closure)
    });
    globals.define("import", Value::function(Rc::new(import_fn) as Rc<dyn Callable>)).unwrap();
    globals
}

fn temp_dir() -> std::path::PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let dir = std::env::temp_dir().join(format!("frst-importer-integration-{}", COUNTER.fetch_add(1, Ordering::Relaxed)));
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn repeated_import_returns_the_same_cached_handle() {
    let dir = temp_dir();
    fs::write(dir.join("mathy.frst"), "export:answer=42").unwrap();

    let importer = Rc::new(Importer::with_search_path(LineParser, vec![dir.clone()]));
    let globals = globals_with_import(Rc::clone(&importer));

    let first = importer.import("mathy", &globals).unwrap();
    let second = importer.import("mathy", &globals).unwrap();
    assert!(first.eq(&second));
    assert!(matches!(first.as_map().unwrap().get(&Value::string("answer")), Some(Value::Int(42))));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn circular_import_is_detected_and_unrecoverable() {
    let dir = temp_dir();
    fs::write(dir.join("a.frst"), "import:b\nexport:from_a=1").unwrap();
    fs::write(dir.join("b.frst"), "import:a\nexport:from_b=2").unwrap();

    let importer = Rc::new(Importer::with_search_path(LineParser, vec![dir.clone()]));
    let globals = globals_with_import(Rc::clone(&importer));

    let err = importer.import("a", &globals).unwrap_err();
    assert!(!err.is_catchable(), "circular import must be unrecoverable, not catchable by try_call");
    assert!(err.message().contains("Circular import"));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn module_not_on_search_path_is_a_catchable_error() {
    let importer = Importer::with_search_path(LineParser, vec![]);
    let globals = SymbolTable::new();
    let err = importer.import("nowhere", &globals).unwrap_err();
    assert!(err.is_catchable());
}
