//! `re`: a Map of regex built-ins (`is_match`, `scan_matches`, `replace`),
//! grouped under one name rather than three top-level functions so regex
//! support reads as a small library, not core syntax (§8.3 library-contract
//! scenarios). Backed by `fancy-regex` for lookaround support; named
//! groups are accepted in the `(?<name>...)` spelling and rewritten to
//! `fancy-regex`'s `(?P<name>...)` before compiling.

use std::rc::Rc;

use fancy_regex::Regex;

use super::{builtin, define};
use crate::callable::Arity;
use crate::error::{EvalError, EvalResult};
use crate::symbol_table::SymbolTable;
use crate::value::{Value, ValueMap};

pub fn register(table: &Rc<SymbolTable>) {
    let re_map = Value::map(ValueMap::from_trusted_pairs(vec![
        (Value::string("is_match"), builtin("re.is_match", Arity::exact(2), is_match)),
        (Value::string("scan_matches"), builtin("re.scan_matches", Arity::exact(2), scan_matches)),
        (Value::string("replace"), builtin("re.replace", Arity::exact(3), replace)),
    ]));
    define(table, "re", re_map);
}

fn compile(pattern: &str) -> EvalResult<Regex> {
    let rewritten = rewrite_named_groups(pattern);
    Regex::new(&rewritten).map_err(|e| EvalError::user(format!("Invalid regex '{pattern}': {e}")))
}

fn is_match(args: Vec<Value>) -> EvalResult<Value> {
    let re = compile(args[0].as_str()?)?;
    let text = args[1].as_str()?;
    let matched = re.is_match(text).map_err(|e| EvalError::user(format!("Regex execution failed: {e}")))?;
    Ok(Value::Bool(matched))
}

fn scan_matches(args: Vec<Value>) -> EvalResult<Value> {
    let re = compile(args[0].as_str()?)?;
    let text = args[1].as_str()?;
    let names: Vec<&str> = re.capture_names().flatten().collect();

    let mut out = Vec::new();
    for attempt in re.captures_iter(text) {
        let captures = attempt.map_err(|e| EvalError::user(format!("Regex execution failed: {e}")))?;
        let whole = captures.get(0).expect("capture group 0 always matches");
        let mut groups = Vec::with_capacity(names.len());
        for name in &names {
            let value = captures.name(name).map_or(Value::Null, |m| Value::string(m.as_str()));
            groups.push((Value::string(*name), value));
        }
        out.push(Value::create_map(vec![
            (Value::string("match"), Value::string(whole.as_str())),
            (Value::string("start"), Value::Int(whole.start() as i64)),
            (Value::string("groups"), Value::map(ValueMap::from_trusted_pairs(groups))),
        ])?);
    }
    Ok(Value::array(out))
}

fn replace(args: Vec<Value>) -> EvalResult<Value> {
    let re = compile(args[0].as_str()?)?;
    let text = args[1].as_str()?;
    let replacement = args[2].as_str()?;
    Ok(Value::string(re.replace_all(text, replacement).into_owned()))
}

/// Rewrites `(?<name>...)` named-group syntax to `fancy-regex`'s
/// `(?P<name>...)` spelling, leaving `(?<=...)` lookbehind and `(?<!...)`
/// negative lookbehind untouched.
fn rewrite_named_groups(pattern: &str) -> String {
    let bytes = pattern.as_bytes();
    let mut out = String::with_capacity(pattern.len() + 4);
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 1 < bytes.len() {
            out.push_str(&pattern[i..i + 2]);
            i += 2;
            continue;
        }
        if pattern[i..].starts_with("(?<") {
            let lookbehind = matches!(bytes.get(i + 3), Some(b'=') | Some(b'!'));
            if lookbehind {
                out.push_str("(?<");
            } else {
                out.push_str("(?P<");
            }
            i += 3;
            continue;
        }
        let ch_len = utf8_char_len(bytes[i]);
        out.push_str(&pattern[i..i + ch_len]);
        i += ch_len;
    }
    out
}

fn utf8_char_len(lead: u8) -> usize {
    if lead & 0x80 == 0 {
        1
    } else if lead & 0xE0 == 0xC0 {
        2
    } else if lead & 0xF0 == 0xE0 {
        3
    } else {
        4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(name: &str, table: &Rc<SymbolTable>) -> Rc<dyn crate::callable::Callable> {
        let re = table.lookup("re").unwrap();
        let map = re.as_map().unwrap();
        map.get(&Value::string(name)).unwrap().as_callable().unwrap().clone()
    }

    #[test]
    fn is_match_basic() {
        let table = SymbolTable::new();
        register(&table);
        let is_match = group("is_match", &table);
        assert!(matches!(is_match.call(vec![Value::string(r"\d+"), Value::string("abc123")]).unwrap(), Value::Bool(true)));
        assert!(matches!(is_match.call(vec![Value::string(r"^\d+$"), Value::string("abc123")]).unwrap(), Value::Bool(false)));
    }

    #[test]
    fn named_groups_are_rewritten_and_returned() {
        let table = SymbolTable::new();
        register(&table);
        let scan = group("scan_matches", &table);
        let result = scan
            .call(vec![Value::string(r"(?<year>\d{4})-(?<month>\d{2})"), Value::string("2026-07")])
            .unwrap();
        let items = result.as_array().unwrap();
        assert_eq!(items.len(), 1);
        let entry = items[0].as_map().unwrap();
        let groups = entry.get(&Value::string("groups")).unwrap().as_map().unwrap();
        assert!(matches!(groups.get(&Value::string("year")), Some(Value::String(s)) if &**s == "2026"));
    }

    #[test]
    fn lookbehind_syntax_is_preserved() {
        assert_eq!(rewrite_named_groups(r"(?<=foo)bar"), r"(?<=foo)bar");
        assert_eq!(rewrite_named_groups(r"(?<!foo)bar"), r"(?<!foo)bar");
        assert_eq!(rewrite_named_groups(r"(?<name>bar)"), r"(?P<name>bar)");
    }

    #[test]
    fn replace_substitutes_all_occurrences() {
        let table = SymbolTable::new();
        register(&table);
        let replace_fn = group("replace", &table);
        let result = replace_fn
            .call(vec![Value::string(r"\s+"), Value::string("a   b  c"), Value::string(" ")])
            .unwrap();
        assert!(matches!(result, Value::String(s) if &*s == "a b c"));
    }
}
