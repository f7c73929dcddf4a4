//! The tagged value model (§3, §4.A).
//!
//! Grounded on the teacher's `value.rs` (tagged enum with a shared,
//! reference-counted handle) and `heap.rs` (refcount bookkeeping), reshaped
//! around `std::rc::Rc`/`std::rc::Weak` directly instead of a hand-rolled
//! arena: the spec's Non-goals exclude anything beyond "reference-counted
//! sharing with explicit weak references for self-loops", which `Rc`/`Weak`
//! already give us.

use std::cmp::Ordering;
use std::fmt::Write as _;
use std::rc::Rc;

use crate::callable::Callable;
use crate::error::{EvalError, EvalResult};

/// A shared handle to a frst value.
///
/// `Value` is cheap to clone (it's a tagged enum over primitives and `Rc`
/// handles); that cheap clone is the "assignment never copies" behavior of
/// §3.1. [`Value::deep_clone`] is the other, more expensive, operation: it
/// rebuilds every contained entity with a fresh identity, as specified for
/// the language's `clone()` semantics.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    String(Rc<str>),
    Array(Rc<Vec<Value>>),
    Map(Rc<ValueMap>),
    Function(Rc<dyn Callable>),
}

/// The eight value variants, in the fixed tag order used by [`Value::key_order`]
/// and hence by Map key iteration order. This is an open question in the
/// original spec (§9); `Null < Bool < Int < Float < String < Array < Map <
/// Function` is the fixed, documented choice (see `DESIGN.md`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Tag {
    Null = 0,
    Bool = 1,
    Int = 2,
    Float = 3,
    String = 4,
    Array = 5,
    Map = 6,
    Function = 7,
}

impl Value {
    pub fn tag(&self) -> Tag {
        match self {
            Self::Null => Tag::Null,
            Self::Bool(_) => Tag::Bool,
            Self::Int(_) => Tag::Int,
            Self::Float(_) => Tag::Float,
            Self::String(_) => Tag::String,
            Self::Array(_) => Tag::Array,
            Self::Map(_) => Tag::Map,
            Self::Function(_) => Tag::Function,
        }
    }

    /// The type name used in error messages (`Int`, `Float`, ... `Function`).
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Bool(_) => "Bool",
            Self::Int(_) => "Int",
            Self::Float(_) => "Float",
            Self::String(_) => "String",
            Self::Array(_) => "Array",
            Self::Map(_) => "Map",
            Self::Function(_) => "Function",
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Self::Null | Self::Int(_) | Self::Float(_) | Self::Bool(_) | Self::String(_)
        )
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Array(_) | Self::Map(_))
    }

    /// `Int` and `Float` only — `Bool` is explicitly not numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    /// *Everything* is truthy except `null` and `false` (§3.1).
    pub fn truthy(&self) -> bool {
        !matches!(self, Self::Null | Self::Bool(false))
    }

    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Self::String(s.into())
    }

    pub fn array(items: Vec<Value>) -> Self {
        Self::Array(Rc::new(items))
    }

    pub fn map(map: ValueMap) -> Self {
        Self::Map(Rc::new(map))
    }

    pub fn function(callable: Rc<dyn Callable>) -> Self {
        Self::Function(callable)
    }

    /// An opaque, process-unique identity for `id(v)`. Primitives (other
    /// than strings/arrays/maps/functions, which carry a handle) have no
    /// stable identity of their own; callers needing that contract should
    /// restrict `id()` to handle-carrying variants, which the `id` builtin
    /// does per its contract in `builtins/collections.rs`.
    pub fn handle_identity(&self) -> Option<usize> {
        match self {
            Self::String(s) => Some(Rc::as_ptr(s) as *const u8 as usize),
            Self::Array(a) => Some(Rc::as_ptr(a) as *const u8 as usize),
            Self::Map(m) => Some(Rc::as_ptr(m) as *const u8 as usize),
            Self::Function(f) => Some(Rc::as_ptr(f) as *const u8 as usize),
            Self::Null | Self::Int(_) | Self::Float(_) | Self::Bool(_) => None,
        }
    }

    /// Deep copy with fresh identity for every contained entity (§3.3).
    /// Functions share their underlying callable by pointer; only the
    /// enclosing `Value::Function` handle is distinguishable by the caller
    /// via the handle stored alongside it elsewhere (the callable itself is
    /// never duplicated).
    pub fn deep_clone(&self) -> Self {
        match self {
            Self::Null => Self::Null,
            Self::Int(n) => Self::Int(*n),
            Self::Float(f) => Self::Float(*f),
            Self::Bool(b) => Self::Bool(*b),
            Self::String(s) => Self::String(Rc::from(s.as_ref())),
            Self::Array(items) => {
                Self::Array(Rc::new(items.iter().map(Value::deep_clone).collect()))
            }
            Self::Map(map) => Self::Map(Rc::new(ValueMap {
                entries: map
                    .entries
                    .iter()
                    .map(|(k, v)| (k.deep_clone(), v.deep_clone()))
                    .collect(),
            })),
            Self::Function(f) => Self::Function(Rc::clone(f)),
        }
    }

    // ---- construction with key validation (§3.3) ----------------------

    /// Builds an Array from untrusted input. Arrays place no constraints on
    /// their elements beyond being values, so this is infallible; it exists
    /// to mirror the `Value::create` naming from the spec.
    pub fn create_array(items: Vec<Value>) -> Self {
        Self::array(items)
    }

    /// Builds a Map from untrusted input, validating that every key is a
    /// non-null primitive (§3.2 invariant). Last-assignment-wins for
    /// duplicate keys (§4.D `Map_Constructor`).
    pub fn create_map(pairs: Vec<(Value, Value)>) -> EvalResult<Self> {
        Ok(Self::map(ValueMap::from_validated_pairs(pairs)?))
    }

    // ---- operators (§4.A) ----------------------------------------------

    pub fn add(&self, rhs: &Value) -> EvalResult<Value> {
        match (self, rhs) {
            (Self::Int(a), Self::Int(b)) => Ok(Self::Int(a.wrapping_add(*b))),
            (a, b) if a.is_numeric() && b.is_numeric() => Ok(Self::Float(a.as_f64() + b.as_f64())),
            (Self::String(a), Self::String(b)) => {
                let mut s = String::with_capacity(a.len() + b.len());
                s.push_str(a);
                s.push_str(b);
                Ok(Self::string(s))
            }
            (Self::Array(a), Self::Array(b)) => {
                let mut items = Vec::with_capacity(a.len() + b.len());
                items.extend(a.iter().cloned());
                items.extend(b.iter().cloned());
                Ok(Self::array(items))
            }
            (Self::Map(a), Self::Map(b)) => Ok(Self::map(ValueMap::union(a, b))),
            _ => Err(binop_type_error("add", "+", self, rhs)),
        }
    }

    pub fn sub(&self, rhs: &Value) -> EvalResult<Value> {
        self.numeric_binop(rhs, "subtract", "-", i64::wrapping_sub, |a, b| a - b)
    }

    pub fn mul(&self, rhs: &Value) -> EvalResult<Value> {
        self.numeric_binop(rhs, "multiply", "*", i64::wrapping_mul, |a, b| a * b)
    }

    pub fn div(&self, rhs: &Value) -> EvalResult<Value> {
        match (self, rhs) {
            (Self::Int(_), Self::Int(0)) => Err(EvalError::user("Division by zero")),
            (Self::Int(a), Self::Int(b)) => Ok(Self::Int(a.wrapping_div(*b))),
            (a, b) if a.is_numeric() && b.is_numeric() => Ok(Self::Float(a.as_f64() / b.as_f64())),
            _ => Err(binop_type_error("divide", "/", self, rhs)),
        }
    }

    pub fn modulus(&self, rhs: &Value) -> EvalResult<Value> {
        match (self, rhs) {
            (Self::Int(_), Self::Int(0)) => Err(EvalError::user("Modulus by zero")),
            (Self::Int(a), Self::Int(b)) => {
                if *a == i64::MIN && *b == -1 {
                    Err(EvalError::user("Invalid modulus operands"))
                } else {
                    Ok(Self::Int(a % b))
                }
            }
            _ => Err(binop_type_error("take modulus of", "%", self, rhs)),
        }
    }

    fn numeric_binop(
        &self,
        rhs: &Value,
        verb: &str,
        glyph: &str,
        int_op: fn(i64, i64) -> i64,
        float_op: fn(f64, f64) -> f64,
    ) -> EvalResult<Value> {
        match (self, rhs) {
            (Self::Int(a), Self::Int(b)) => Ok(Self::Int(int_op(*a, *b))),
            (a, b) if a.is_numeric() && b.is_numeric() => Ok(Self::Float(float_op(a.as_f64(), b.as_f64()))),
            _ => Err(binop_type_error(verb, glyph, self, rhs)),
        }
    }

    fn as_f64(&self) -> f64 {
        match self {
            Self::Int(n) => *n as f64,
            Self::Float(f) => *f,
            _ => unreachable!("as_f64 called on non-numeric Value"),
        }
    }

    pub fn negate(&self) -> EvalResult<Value> {
        match self {
            Self::Int(n) => Ok(Self::Int(n.wrapping_neg())),
            Self::Float(f) => Ok(Self::Float(-f)),
            _ => Err(EvalError::user("Invalid operand for unary -")),
        }
    }

    pub fn logical_not(&self) -> Value {
        Self::Bool(!self.truthy())
    }

    /// `eq` (§4.A): deep-equal for primitives, identity for
    /// structured/function, `false` across different tags.
    pub fn eq(&self, other: &Value) -> bool {
        if self.tag() != other.tag() {
            return false;
        }
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => Rc::ptr_eq(a, b),
            (Self::Map(a), Self::Map(b)) => Rc::ptr_eq(a, b),
            (Self::Function(a), Self::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn not_equal(&self, other: &Value) -> bool {
        !self.eq(other)
    }

    /// Structural equality: recurses into Array/Map contents instead of
    /// comparing handle identity.
    pub fn deep_equal(&self, other: &Value) -> bool {
        if let (Some(a), Some(b)) = (self.handle_identity(), other.handle_identity()) {
            if a == b && self.tag() == other.tag() {
                return true;
            }
        }
        if self.tag() != other.tag() {
            return false;
        }
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Function(a), Self::Function(b)) => Rc::ptr_eq(a, b),
            (Self::Array(a), Self::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.deep_equal(y))
            }
            (Self::Map(a), Self::Map(b)) => {
                a.entries.len() == b.entries.len()
                    && a.entries
                        .iter()
                        .zip(b.entries.iter())
                        .all(|((ka, va), (kb, vb))| ka.deep_equal(kb) && va.deep_equal(vb))
            }
            _ => false,
        }
    }

    /// Relative order for `<`, `<=`, `>`, `>=`: natural order on same-tag
    /// primitives in `{Int, Float, String}`, numeric cross-comparison,
    /// error otherwise.
    pub fn compare(&self, other: &Value) -> EvalResult<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Ok(a.cmp(b)),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                a.as_f64().partial_cmp(&b.as_f64()).ok_or_else(|| EvalError::user("Cannot compare NaN"))
            }
            (Self::String(a), Self::String(b)) => Ok(a.as_bytes().cmp(b.as_bytes())),
            _ => Err(EvalError::user(format!(
                "Cannot compare incompatible types: {} ? {}",
                self.type_name(),
                other.type_name()
            ))),
        }
    }

    /// The total key-order relation of §3.2: tag first, then natural order
    /// for same-tag primitives, then pointer identity.
    pub fn key_order(&self, other: &Value) -> Ordering {
        match self.tag().cmp(&other.tag()) {
            Ordering::Equal => {}
            non_equal => return non_equal,
        }
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Self::String(a), Self::String(b)) => a.as_bytes().cmp(b.as_bytes()),
            _ => self
                .handle_identity()
                .unwrap_or(0)
                .cmp(&other.handle_identity().unwrap_or(0)),
        }
    }

    // ---- coercions (`as<T>`) -------------------------------------------

    pub fn as_null(&self) -> EvalResult<()> {
        match self {
            Self::Null => Ok(()),
            _ => Err(coerce_error(self, "Null")),
        }
    }

    pub fn as_int(&self) -> EvalResult<i64> {
        match self {
            Self::Int(n) => Ok(*n),
            Self::Float(f) => {
                if *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                    Ok(f.trunc() as i64)
                } else {
                    Err(EvalError::user("Float out of range for Int"))
                }
            }
            _ => Err(coerce_error(self, "Int")),
        }
    }

    pub fn as_float(&self) -> EvalResult<f64> {
        match self {
            Self::Int(n) => Ok(*n as f64),
            Self::Float(f) => Ok(*f),
            _ => Err(coerce_error(self, "Float")),
        }
    }

    /// Coercion to Bool is total: the truthiness rule.
    pub fn as_bool(&self) -> bool {
        self.truthy()
    }

    pub fn as_str(&self) -> EvalResult<&str> {
        match self {
            Self::String(s) => Ok(s),
            _ => Err(coerce_error(self, "String")),
        }
    }

    pub fn as_array(&self) -> EvalResult<&Rc<Vec<Value>>> {
        match self {
            Self::Array(items) => Ok(items),
            _ => Err(coerce_error(self, "Array")),
        }
    }

    pub fn as_map(&self) -> EvalResult<&Rc<ValueMap>> {
        match self {
            Self::Map(map) => Ok(map),
            _ => Err(coerce_error(self, "Map")),
        }
    }

    pub fn as_callable(&self) -> EvalResult<&Rc<dyn Callable>> {
        match self {
            Self::Function(f) => Ok(f),
            _ => Err(coerce_error(self, "Function")),
        }
    }

    // ---- explicit string conversions ------------------------------------

    /// `to_int(s)`: strict signed-decimal parse, whole string consumed, no
    /// leading `+`, no whitespace, no hex/exponent. Returns `Null` on
    /// failure. `to_int(Float)` truncates.
    pub fn to_int(&self) -> EvalResult<Value> {
        match self {
            Self::String(s) => Ok(parse_strict_int(s).map_or(Value::Null, Value::Int)),
            Self::Float(_) => self.as_int().map(Value::Int),
            Self::Int(n) => Ok(Value::Int(*n)),
            _ => Err(EvalError::user(format!("Cannot convert {} to Int", self.type_name()))),
        }
    }

    /// `to_float(s)`: IEEE-754 decimal parse, scientific notation accepted,
    /// leading `+` not accepted. Returns `Null` on failure.
    pub fn to_float(&self) -> EvalResult<Value> {
        match self {
            Self::String(s) => Ok(parse_strict_float(s).map_or(Value::Null, Value::Float)),
            Self::Int(n) => Ok(Value::Float(*n as f64)),
            Self::Float(f) => Ok(Value::Float(*f)),
            _ => Err(EvalError::user(format!("Cannot convert {} to Float", self.type_name()))),
        }
    }

    /// Single-line human-readable form (raw, unquoted strings at top level).
    pub fn to_display_string(&self) -> String {
        let mut out = String::new();
        self.write_string(&mut out, false, false);
        out
    }

    /// `to_pretty_string`: newline + 4-space indentation per nesting level.
    pub fn to_pretty_string(&self) -> String {
        let mut out = String::new();
        self.write_pretty(&mut out, 0, false);
        out
    }

    fn write_string(&self, out: &mut String, nested: bool, _pretty: bool) {
        match self {
            Self::Null => out.push_str("null"),
            Self::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Self::Int(n) => {
                let _ = write!(out, "{n}");
            }
            Self::Float(f) => out.push_str(&format_float(*f)),
            Self::String(s) => {
                if nested {
                    write_quoted(out, s);
                } else {
                    out.push_str(s);
                }
            }
            Self::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    } else {
                        out.push(' ');
                    }
                    item.write_string(out, true, false);
                }
                if !items.is_empty() {
                    out.push(' ');
                }
                out.push(']');
            }
            Self::Map(map) => {
                out.push('{');
                for (i, (k, v)) in map.entries.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    } else {
                        out.push(' ');
                    }
                    out.push('[');
                    k.write_string(out, true, false);
                    out.push_str("]: ");
                    v.write_string(out, true, false);
                }
                if !map.entries.is_empty() {
                    out.push(' ');
                }
                out.push('}');
            }
            Self::Function(_) => out.push_str("<Function>"),
        }
    }

    fn write_pretty(&self, out: &mut String, depth: usize, nested: bool) {
        match self {
            Self::Array(items) if !items.is_empty() => {
                out.push_str("[\n");
                for (i, item) in items.iter().enumerate() {
                    push_indent(out, depth + 1);
                    item.write_pretty(out, depth + 1, true);
                    if i + 1 < items.len() {
                        out.push(',');
                    }
                    out.push('\n');
                }
                push_indent(out, depth);
                out.push(']');
            }
            Self::Map(map) if !map.entries.is_empty() => {
                out.push_str("{\n");
                for (i, (k, v)) in map.entries.iter().enumerate() {
                    push_indent(out, depth + 1);
                    out.push('[');
                    k.write_string(out, true, false);
                    out.push_str("]: ");
                    v.write_pretty(out, depth + 1, true);
                    if i + 1 < map.entries.len() {
                        out.push(',');
                    }
                    out.push('\n');
                }
                push_indent(out, depth);
                out.push('}');
            }
            _ => self.write_string(out, nested, true),
        }
    }

    // ---- indexing (§4.A) ------------------------------------------------

    pub fn index_array(items: &[Value], index: i64) -> Value {
        let len = items.len() as i64;
        let i = if index < 0 { index + len } else { index };
        if i < 0 || i >= len {
            Value::Null
        } else {
            items[i as usize].clone()
        }
    }

    pub fn index_map(map: &ValueMap, key: &Value) -> EvalResult<Value> {
        if matches!(key, Value::Null) || !key.is_primitive() {
            return Err(EvalError::user("Map index must be a non-null primitive"));
        }
        Ok(map.get(key).cloned().unwrap_or(Value::Null))
    }

    // ---- iterative ops (§4.A, invoked by the Map/Filter/Reduce/Foreach AST nodes) ----

    /// `do_map(structure, fn)`. Array: applies `fn(elem)` to each element in
    /// order. Map: applies `fn(k, v)` to each entry in key-relation order;
    /// every result must itself be a Map, and the intermediates are merged
    /// with duplicate-key detection (recoverable error on collision). Empty
    /// input returns the same handle for both shapes.
    pub fn do_map(&self, f: &Rc<dyn Callable>) -> EvalResult<Value> {
        match self {
            Self::Array(items) => {
                if items.is_empty() {
                    return Ok(Self::Array(Rc::clone(items)));
                }
                let mut out = Vec::with_capacity(items.len());
                for item in items.iter() {
                    out.push(f.call(vec![item.clone()])?);
                }
                Ok(Self::array(out))
            }
            Self::Map(map) => {
                if map.is_empty() {
                    return Ok(Self::Map(Rc::clone(map)));
                }
                let mut pieces = Vec::with_capacity(map.len());
                for (k, v) in map.iter() {
                    let result = f.call(vec![k.clone(), v.clone()])?;
                    let piece = result.as_map()?;
                    pieces.push(ValueMap::from_trusted_pairs(
                        piece.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                    ));
                }
                Ok(Self::map(ValueMap::merge_distinct(pieces)?))
            }
            _ => Err(EvalError::user(format!("do_map requires Array or Map, got {}", self.type_name()))),
        }
    }

    /// `do_filter(structure, fn)`. Array: retains elements whose predicate is
    /// truthy, preserving order. Map: retains entries where `fn(k, v)` is
    /// truthy.
    pub fn do_filter(&self, f: &Rc<dyn Callable>) -> EvalResult<Value> {
        match self {
            Self::Array(items) => {
                let mut out = Vec::new();
                for item in items.iter() {
                    if f.call(vec![item.clone()])?.truthy() {
                        out.push(item.clone());
                    }
                }
                Ok(Self::array(out))
            }
            Self::Map(map) => {
                let mut entries = Vec::new();
                for (k, v) in map.iter() {
                    if f.call(vec![k.clone(), v.clone()])?.truthy() {
                        entries.push((k.clone(), v.clone()));
                    }
                }
                Ok(Self::map(ValueMap::from_trusted_pairs(entries)))
            }
            _ => Err(EvalError::user(format!("do_filter requires Array or Map, got {}", self.type_name()))),
        }
    }

    /// `do_reduce(structure, fn, init?)`. Array with `init`: left fold
    /// `acc = fn(acc, elem)`. Array without `init`: left fold over the tail
    /// with the head as the initial accumulator; empty array returns `Null`.
    /// Map always requires `init`: fold with `acc = fn(acc, k, v)`.
    pub fn do_reduce(&self, f: &Rc<dyn Callable>, init: Option<Value>) -> EvalResult<Value> {
        match self {
            Self::Array(items) => {
                let mut iter = items.iter();
                let mut acc = match init {
                    Some(v) => v,
                    None => match iter.next() {
                        Some(head) => head.clone(),
                        None => return Ok(Value::Null),
                    },
                };
                for item in iter {
                    acc = f.call(vec![acc, item.clone()])?;
                }
                Ok(acc)
            }
            Self::Map(map) => {
                let mut acc = init.ok_or_else(|| EvalError::user("do_reduce over a Map requires an init value"))?;
                for (k, v) in map.iter() {
                    acc = f.call(vec![acc, k.clone(), v.clone()])?;
                }
                Ok(acc)
            }
            _ => Err(EvalError::user(format!("do_reduce requires Array or Map, got {}", self.type_name()))),
        }
    }

    /// `foreach(structure, fn)`: calls `fn` with 1 (Array) or 2 (Map) args
    /// per element/entry; a truthy result breaks early. Always returns
    /// `Null`.
    pub fn foreach(&self, f: &Rc<dyn Callable>) -> EvalResult<Value> {
        match self {
            Self::Array(items) => {
                for item in items.iter() {
                    if f.call(vec![item.clone()])?.truthy() {
                        break;
                    }
                }
                Ok(Value::Null)
            }
            Self::Map(map) => {
                for (k, v) in map.iter() {
                    if f.call(vec![k.clone(), v.clone()])?.truthy() {
                        break;
                    }
                }
                Ok(Value::Null)
            }
            _ => Err(EvalError::user(format!("foreach requires Array or Map, got {}", self.type_name()))),
        }
    }
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("    ");
    }
}

fn write_quoted(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
}

fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf".to_string() } else { "-inf".to_string() };
    }
    let mut buf = ryu::Buffer::new();
    buf.format(f).to_string()
}

fn parse_strict_int(s: &str) -> Option<i64> {
    if s.is_empty() {
        return None;
    }
    let bytes = s.as_bytes();
    let (neg, digits) = if bytes[0] == b'-' { (true, &s[1..]) } else { (false, s) };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let magnitude: i128 = digits.parse().ok()?;
    let value = if neg { -magnitude } else { magnitude };
    i64::try_from(value).ok()
}

fn parse_strict_float(s: &str) -> Option<f64> {
    if s.is_empty() || s.starts_with('+') || s.chars().next().is_some_and(char::is_whitespace) {
        return None;
    }
    s.parse::<f64>().ok()
}

fn coerce_error(v: &Value, target: &str) -> EvalError {
    EvalError::user(format!("Cannot convert {} to {target}", v.type_name()))
}

fn binop_type_error(verb: &str, glyph: &str, lhs: &Value, rhs: &Value) -> EvalError {
    EvalError::user(format!(
        "Cannot {verb} incompatible types: {} {glyph} {}",
        lhs.type_name(),
        rhs.type_name()
    ))
}

/// An immutable, key-ordered Map (§3.2). Entries are always stored sorted
/// by [`Value::key_order`] with unique keys; iteration therefore follows the
/// key relation rather than insertion order.
#[derive(Debug)]
pub struct ValueMap {
    entries: Vec<(Value, Value)>,
}

impl ValueMap {
    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    /// Validates that every key is a non-null primitive, then builds the
    /// sorted, deduplicated (last-wins) entry list.
    pub fn from_validated_pairs(pairs: Vec<(Value, Value)>) -> EvalResult<Self> {
        for (key, _) in &pairs {
            if matches!(key, Value::Null) || !key.is_primitive() {
                return Err(EvalError::user(format!(
                    "Map key must be a non-null primitive, got {}",
                    key.type_name()
                )));
            }
        }
        Ok(Self::from_trusted_pairs(pairs))
    }

    /// Builds a sorted, deduplicated (last-wins) entry list without
    /// validating keys; callers must already know every key is a valid Map
    /// key.
    pub fn from_trusted_pairs(pairs: Vec<(Value, Value)>) -> Self {
        Self { entries: last_wins_sorted(pairs) }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries
            .binary_search_by(|(k, _)| k.key_order(key))
            .ok()
            .map(|idx| &self.entries[idx].1)
    }

    pub fn has(&self, key: &Value) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    /// `A + B`: union with right-hand collision precedence (§4.A).
    pub fn union(a: &ValueMap, b: &ValueMap) -> ValueMap {
        let mut pairs = Vec::with_capacity(a.entries.len() + b.entries.len());
        pairs.extend(a.entries.iter().cloned());
        pairs.extend(b.entries.iter().cloned());
        ValueMap::from_trusted_pairs(pairs)
    }

    /// Merges maps produced by `do_map`, erroring on duplicate keys instead
    /// of last-wins (the opposite policy from `union`/`Map_Constructor`).
    pub fn merge_distinct(maps: Vec<ValueMap>) -> EvalResult<ValueMap> {
        let mut pairs: Vec<(Value, Value)> = maps.into_iter().flat_map(|m| m.entries).collect();
        pairs.sort_by(|(ka, _), (kb, _)| ka.key_order(kb));
        for pair in pairs.windows(2) {
            if pair[0].0.key_order(&pair[1].0) == Ordering::Equal {
                return Err(EvalError::user(format!(
                    "Duplicate key produced by map: {}",
                    pair[0].0.to_display_string()
                )));
            }
        }
        Ok(ValueMap { entries: pairs })
    }
}

/// Builds the sorted, last-assignment-wins entry list used by both
/// `Map_Constructor` and Map union. Stable w.r.t. input order: later pairs
/// in `pairs` win over earlier pairs with an equal key.
fn last_wins_sorted(pairs: Vec<(Value, Value)>) -> Vec<(Value, Value)> {
    let mut indexed: Vec<(usize, (Value, Value))> = pairs.into_iter().enumerate().collect();
    indexed.sort_by(|(ia, (ka, _)), (ib, (kb, _))| ka.key_order(kb).then(ia.cmp(ib)));

    let mut result = Vec::with_capacity(indexed.len());
    let mut i = 0;
    while i < indexed.len() {
        let mut j = i;
        while j + 1 < indexed.len() && indexed[j + 1].1 .0.key_order(&indexed[i].1 .0) == Ordering::Equal {
            j += 1;
        }
        result.push(indexed[j].1.clone());
        i = j + 1;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_is_total() {
        assert!(!Value::Null.truthy());
        assert!(!Value::Bool(false).truthy());
        assert!(Value::Bool(true).truthy());
        assert!(Value::Int(0).truthy());
        assert!(Value::string("").truthy());
        assert!(Value::array(vec![]).truthy());
        assert!(Value::map(ValueMap::empty()).truthy());
    }

    #[test]
    fn add_coerces_to_float_when_mixed() {
        let v = Value::Int(3).add(&Value::Float(2.5)).unwrap();
        assert!(matches!(v, Value::Float(f) if f == 5.5));
    }

    #[test]
    fn map_union_collision_rhs_wins() {
        let a = ValueMap::from_trusted_pairs(vec![
            (Value::string("a"), Value::Int(1)),
            (Value::string("b"), Value::Int(2)),
        ]);
        let b = ValueMap::from_trusted_pairs(vec![
            (Value::string("b"), Value::Int(20)),
            (Value::string("c"), Value::Int(3)),
        ]);
        let union = ValueMap::union(&a, &b);
        assert_eq!(union.len(), 3);
        assert!(matches!(union.get(&Value::string("b")), Some(Value::Int(20))));
    }

    #[test]
    fn array_concat_preserves_order_and_length() {
        let a = Value::array(vec![Value::Int(1), Value::Int(2)]);
        let b = Value::array(vec![Value::Int(3)]);
        let sum = a.add(&b).unwrap();
        let items = sum.as_array().unwrap();
        assert_eq!(items.len(), 3);
        assert!(matches!(items[2], Value::Int(3)));
    }

    #[test]
    fn eq_is_identity_for_structured_deep_equal_is_structural() {
        let a = Value::array(vec![Value::Int(1)]);
        let b = Value::array(vec![Value::Int(1)]);
        assert!(!a.eq(&b));
        assert!(a.deep_equal(&b));
        let c = a.clone();
        assert!(a.eq(&c));
    }

    #[test]
    fn array_index_negative_and_out_of_range() {
        let items = vec![Value::Int(10), Value::Int(20), Value::Int(30)];
        assert!(matches!(Value::index_array(&items, -1), Value::Int(30)));
        assert!(matches!(Value::index_array(&items, 3), Value::Null));
        assert!(matches!(Value::index_array(&items, -4), Value::Null));
    }

    #[test]
    fn map_rejects_null_key() {
        let err = Value::create_map(vec![(Value::Null, Value::Int(1))]).unwrap_err();
        assert!(err.message().contains("Map key"));
    }

    #[test]
    fn to_int_requires_whole_string_consumed() {
        assert!(matches!(Value::string("42").to_int().unwrap(), Value::Int(42)));
        assert!(matches!(Value::string("+42").to_int().unwrap(), Value::Null));
        assert!(matches!(Value::string("42x").to_int().unwrap(), Value::Null));
        assert!(matches!(Value::string(" 42").to_int().unwrap(), Value::Null));
    }

    #[test]
    fn to_display_string_quotes_nested_strings_only() {
        let v = Value::array(vec![Value::string("hi")]);
        assert_eq!(v.to_display_string(), "[ \"hi\" ]");
        assert_eq!(Value::string("hi").to_display_string(), "hi");
    }

    #[test]
    fn empty_structures_are_single_token() {
        assert_eq!(Value::array(vec![]).to_pretty_string(), "[]");
        assert_eq!(Value::map(ValueMap::empty()).to_pretty_string(), "{}");
    }

    #[test]
    fn deep_clone_gives_fresh_identity() {
        let original = Value::array(vec![Value::string("x")]);
        let cloned = original.deep_clone();
        assert!(original.deep_equal(&cloned));
        assert!(!original.eq(&cloned));
    }

    #[test]
    fn key_order_sorts_by_tag_then_value() {
        let mut keys = vec![Value::Int(2), Value::Bool(true), Value::Int(1), Value::Null];
        keys.sort_by(Value::key_order);
        assert!(matches!(keys[0], Value::Null));
        assert!(matches!(keys[1], Value::Bool(true)));
        assert!(matches!(keys[2], Value::Int(1)));
        assert!(matches!(keys[3], Value::Int(2)));
    }

    fn double_fn() -> Rc<dyn Callable> {
        use crate::callable::{Arity, BuiltinFn};
        Rc::new(BuiltinFn::new("double", Arity::exact(1), |mut a| a.remove(0).mul(&Value::Int(2))))
    }

    #[test]
    fn do_map_over_empty_array_returns_same_handle() {
        let empty = Value::array(vec![]);
        let items = empty.as_array().unwrap();
        let before = Rc::as_ptr(items);
        let result = empty.do_map(&double_fn()).unwrap();
        assert_eq!(before, Rc::as_ptr(result.as_array().unwrap()));
    }

    #[test]
    fn do_map_over_array_applies_fn_in_order() {
        let arr = Value::array(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        let result = arr.do_map(&double_fn()).unwrap();
        let items = result.as_array().unwrap();
        assert!(matches!(items[0], Value::Int(2)));
        assert!(matches!(items[2], Value::Int(6)));
    }

    #[test]
    fn do_map_over_map_merges_and_rejects_duplicate_keys() {
        use crate::callable::{Arity, BuiltinFn};
        let identity_map = Rc::new(BuiltinFn::new("wrap", Arity::exact(2), |a| {
            Value::create_map(vec![(a[0].clone(), a[1].clone())])
        })) as Rc<dyn Callable>;
        let m = Value::map(ValueMap::from_trusted_pairs(vec![
            (Value::string("a"), Value::Int(1)),
            (Value::string("b"), Value::Int(2)),
        ]));
        let result = m.do_map(&identity_map).unwrap();
        assert_eq!(result.as_map().unwrap().len(), 2);

        let always_same_key = Rc::new(BuiltinFn::new("collide", Arity::exact(2), |_| {
            Value::create_map(vec![(Value::string("x"), Value::Int(0))])
        })) as Rc<dyn Callable>;
        let err = m.do_map(&always_same_key).unwrap_err();
        assert!(err.message().contains("Duplicate key"));
    }

    #[test]
    fn do_filter_preserves_order_on_array_and_map() {
        let arr = Value::array(vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)]);
        use crate::callable::{Arity, BuiltinFn};
        let is_even = Rc::new(BuiltinFn::new("is_even", Arity::exact(1), |a| {
            Ok(Value::Bool(a[0].as_int()? % 2 == 0))
        })) as Rc<dyn Callable>;
        let result = arr.do_filter(&is_even).unwrap();
        let items = result.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert!(matches!(items[0], Value::Int(2)));
        assert!(matches!(items[1], Value::Int(4)));
    }

    #[test]
    fn do_reduce_without_init_folds_tail_with_head_as_init() {
        use crate::callable::{Arity, BuiltinFn};
        let add = Rc::new(BuiltinFn::new("add", Arity::exact(2), |a| a[0].add(&a[1]))) as Rc<dyn Callable>;
        let arr = Value::array(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert!(matches!(arr.do_reduce(&add, None).unwrap(), Value::Int(6)));
        assert!(matches!(Value::array(vec![]).do_reduce(&add, None).unwrap(), Value::Null));
    }

    #[test]
    fn do_reduce_over_map_requires_init() {
        use crate::callable::{Arity, BuiltinFn};
        let add = Rc::new(BuiltinFn::new("add", Arity::exact(2), |mut a| {
            let v = a.remove(2);
            a[0].add(&v)
        })) as Rc<dyn Callable>;
        let m = Value::map(ValueMap::from_trusted_pairs(vec![(Value::string("a"), Value::Int(1))]));
        let err = m.do_reduce(&add, None).unwrap_err();
        assert!(err.message().contains("requires an init value"));
    }

    #[test]
    fn foreach_breaks_on_truthy_result_and_always_returns_null() {
        use crate::callable::{Arity, BuiltinFn};
        use std::cell::RefCell;
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_for_fn = Rc::clone(&seen);
        let stop_at_two = Rc::new(BuiltinFn::new("stop_at_two", Arity::exact(1), move |a| {
            let n = a[0].as_int()?;
            seen_for_fn.borrow_mut().push(n);
            Ok(Value::Bool(n == 2))
        })) as Rc<dyn Callable>;
        let arr = Value::array(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        let result = arr.foreach(&stop_at_two).unwrap();
        assert!(matches!(result, Value::Null));
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }
}
