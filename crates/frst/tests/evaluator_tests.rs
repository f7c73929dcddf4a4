//! End-to-end evaluator scenarios built directly from AST constructors
//! (parsing text is out of scope; see `frst_cli::parser` for the reference
//! binary's own grammar).

use frst::{BinOp, Expr, Stmt, SymbolTable, Value, ValueMap};

#[test]
fn arithmetic_coerces_int_and_float() {
    let scope = SymbolTable::new();
    let expr = Expr::binop(Expr::literal(Value::Int(2)), BinOp::Add, Expr::literal(Value::Float(0.5)));
    assert!(matches!(expr.evaluate(&scope).unwrap(), Value::Float(f) if (f - 2.5).abs() < f64::EPSILON));
}

#[test]
fn division_by_zero_is_a_recoverable_error() {
    let scope = SymbolTable::new();
    let expr = Expr::binop(Expr::literal(Value::Int(1)), BinOp::Div, Expr::literal(Value::Int(0)));
    let err = expr.evaluate(&scope).unwrap_err();
    assert!(err.is_catchable());
}

#[test]
fn and_short_circuits_without_evaluating_rhs() {
    let scope = SymbolTable::new();
    // An undefined name on the RHS would error if evaluated; short-circuit
    // means it never is.
    let expr = Expr::binop(Expr::literal(Value::Bool(false)), BinOp::And, Expr::name_lookup("undefined"));
    assert!(matches!(expr.evaluate(&scope).unwrap(), Value::Bool(false)));
}

#[test]
fn map_constructor_union_keeps_last_assignment_on_collision() {
    let scope = SymbolTable::new();
    let expr = Expr::map_constructor(vec![
        (Expr::literal(Value::string("a")), Expr::literal(Value::Int(1))),
        (Expr::literal(Value::string("a")), Expr::literal(Value::Int(2))),
    ]);
    let result = expr.evaluate(&scope).unwrap();
    let map = result.as_map().unwrap();
    assert!(matches!(map.get(&Value::string("a")), Some(Value::Int(2))));
}

#[test]
fn two_maps_union_last_wins_on_key_collision() {
    let a = ValueMap::from_trusted_pairs(vec![(Value::string("x"), Value::Int(1)), (Value::string("y"), Value::Int(2))]);
    let b = ValueMap::from_trusted_pairs(vec![(Value::string("x"), Value::Int(99))]);
    let union = ValueMap::union(&a, &b);
    assert!(matches!(union.get(&Value::string("x")), Some(Value::Int(99))));
    assert!(matches!(union.get(&Value::string("y")), Some(Value::Int(2))));
}

#[test]
fn format_string_interpolates_scope_bindings() {
    let scope = SymbolTable::new();
    scope.define("name", Value::string("Ada")).unwrap();
    scope.define("amount", Value::Int(5)).unwrap();
    let expr = Expr::format_string("Hello ${name}! You owe $${amount}").unwrap();
    let result = expr.evaluate(&scope).unwrap();
    assert!(matches!(result, Value::String(s) if &*s == "Hello Ada! You owe $5"));
}

#[test]
fn array_destructure_with_rest_binds_prefix_and_remainder() {
    let scope = SymbolTable::new();
    let arr = Expr::array_constructor(vec![
        Expr::literal(Value::Int(1)),
        Expr::literal(Value::Int(2)),
        Expr::literal(Value::Int(3)),
        Expr::literal(Value::Int(4)),
    ]);
    let stmt = Stmt::array_destructure(
        vec![std::rc::Rc::from("first"), std::rc::Rc::from("second")],
        Some(std::rc::Rc::from("rest")),
        arr,
        false,
    );
    stmt.execute(&scope).unwrap();
    assert!(matches!(scope.lookup("first").unwrap(), Value::Int(1)));
    assert!(matches!(scope.lookup("second").unwrap(), Value::Int(2)));
    let rest = scope.lookup("rest").unwrap();
    assert_eq!(rest.as_array().unwrap().len(), 2);
}

#[test]
fn export_bindings_are_only_reported_when_flagged() {
    let scope = SymbolTable::new();
    let exported = Stmt::define("visible", Expr::literal(Value::Int(1)), true).execute(&scope).unwrap();
    let not_exported = Stmt::define("hidden", Expr::literal(Value::Int(2)), false).execute(&scope).unwrap();
    assert_eq!(exported.len(), 1);
    assert!(not_exported.is_empty());
}

#[test]
fn index_out_of_range_on_array_is_null() {
    let scope = SymbolTable::new();
    let arr = Expr::array_constructor(vec![Expr::literal(Value::Int(1))]);
    let expr = Expr::index(arr, Expr::literal(Value::Int(10)));
    assert!(matches!(expr.evaluate(&scope).unwrap(), Value::Null));
}
