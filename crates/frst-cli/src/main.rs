use std::io::{self, BufRead, Write};
use std::rc::Rc;
use std::{env, fs, process::ExitCode, time::Instant};

use frst::{install_builtins, Arity, BuiltinFn, Callable, Importer, SymbolTable, Value};

mod lexer;
mod parser;

use parser::{parse_program, FrstParser};

/// Builds the built-ins table plus an `import` binding closing over one
/// shared [`Importer`], so every program (and every module it imports, via
/// the scope failover chain) shares a single module cache (§4.H step 1).
fn build_globals() -> Rc<SymbolTable> {
    let globals = install_builtins();
    let importer = Rc::new(Importer::new(FrstParser));
    let globals_for_import = Rc::clone(&globals);
    let import_fn = BuiltinFn::new("import", Arity::exact(1), move |args| {
        let name = args[0].as_str()?;
        importer.import(name, &globals_for_import)
    });
    globals
        .define("import", Value::function(Rc::new(import_fn) as Rc<dyn Callable>))
        .expect("import is bound once at startup");
    globals
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    match args.get(1) {
        Some(file_path) => run_file(file_path),
        None => run_repl(),
    }
}

fn run_file(file_path: &str) -> ExitCode {
    let code = match fs::read_to_string(file_path) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: could not read {file_path}: {err}");
            return ExitCode::FAILURE;
        }
    };

    let stmts = match parse_program(&code) {
        Ok(stmts) => stmts,
        Err(err) => {
            eprintln!("parse error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let globals = build_globals();
    let scope = SymbolTable::with_failover(globals);

    let start = Instant::now();
    for stmt in &stmts {
        if let Err(err) = stmt.execute(&scope) {
            let elapsed = start.elapsed();
            eprintln!("{} after {elapsed:?}", err.top_level_display());
            return ExitCode::FAILURE;
        }
    }
    let elapsed = start.elapsed();
    eprintln!("success after: {elapsed:?}");
    ExitCode::SUCCESS
}

fn run_repl() -> ExitCode {
    let globals = build_globals();
    let scope = SymbolTable::with_failover(globals);
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!(">>> ");
        let _ = io::stdout().flush();
        let Some(first) = lines.next() else {
            return ExitCode::SUCCESS;
        };
        let Ok(first) = first else {
            return ExitCode::SUCCESS;
        };

        let mut buffer = first;
        while needs_continuation(&buffer) {
            if buffer.ends_with('\\') {
                buffer.pop();
            }
            print!("... ");
            let _ = io::stdout().flush();
            match lines.next() {
                Some(Ok(next)) => {
                    buffer.push('\n');
                    buffer.push_str(&next);
                }
                _ => break,
            }
        }

        if buffer.trim().is_empty() {
            continue;
        }

        match parse_program(&buffer) {
            Ok(stmts) => run_repl_statements(&scope, &stmts),
            Err(err) => eprintln!("parse error: {err}"),
        }
    }
}

fn run_repl_statements(scope: &Rc<SymbolTable>, stmts: &[frst::Stmt]) {
    for (i, stmt) in stmts.iter().enumerate() {
        let is_last = i + 1 == stmts.len();
        if is_last {
            if let frst::Stmt::Expr(expr) = stmt {
                match expr.evaluate(scope) {
                    Ok(value) => println!("{}", display_result(&value)),
                    Err(err) => eprintln!("{}", err.top_level_display()),
                }
                continue;
            }
        }
        if let Err(err) = stmt.execute(scope) {
            eprintln!("{}", err.top_level_display());
            return;
        }
    }
}

fn display_result(value: &Value) -> String {
    value.to_pretty_string()
}

/// A continuation is needed when unmatched brackets remain open, or the
/// line ends with `:`, `->`, or a line-continuation backslash.
fn needs_continuation(buffer: &str) -> bool {
    let trimmed = buffer.trim_end();
    if trimmed.ends_with('\\') || trimmed.ends_with(':') || trimmed.ends_with("->") {
        return true;
    }
    bracket_depth(buffer) > 0
}

fn bracket_depth(source: &str) -> i32 {
    let mut depth = 0;
    let mut in_string: Option<char> = None;
    let mut escaped = false;
    for c in source.chars() {
        if let Some(quote) = in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == quote {
                in_string = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => in_string = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            _ => {}
        }
    }
    depth
}

