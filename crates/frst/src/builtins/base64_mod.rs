//! Base64 library built-ins: `b64_encode`, `b64_decode`, `b64_urlencode`,
//! `b64_urldecode` (RFC 4648, §8.3 library-contract scenarios).

use std::rc::Rc;

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine as _;

use super::{builtin, define};
use crate::callable::Arity;
use crate::error::EvalError;
use crate::symbol_table::SymbolTable;
use crate::value::Value;

pub fn register(table: &Rc<SymbolTable>) {
    define(
        table,
        "b64_encode",
        builtin("b64_encode", Arity::exact(1), |a| {
            let s = a[0].as_str()?;
            Ok(Value::string(STANDARD.encode(s.as_bytes())))
        }),
    );

    define(
        table,
        "b64_decode",
        builtin("b64_decode", Arity::exact(1), |a| {
            let s = a[0].as_str()?;
            let bytes = STANDARD.decode(s).map_err(|e| EvalError::user(format!("Invalid base64: {e}")))?;
            String::from_utf8(bytes)
                .map(Value::string)
                .map_err(|_| EvalError::user("Decoded base64 is not valid UTF-8"))
        }),
    );

    define(
        table,
        "b64_urlencode",
        builtin("b64_urlencode", Arity::exact(1), |a| {
            let s = a[0].as_str()?;
            Ok(Value::string(URL_SAFE.encode(s.as_bytes())))
        }),
    );

    define(
        table,
        "b64_urldecode",
        builtin("b64_urldecode", Arity::exact(1), |a| {
            let s = a[0].as_str()?;
            let bytes = URL_SAFE.decode(s).map_err(|e| EvalError::user(format!("Invalid base64url: {e}")))?;
            String::from_utf8(bytes)
                .map(Value::string)
                .map_err(|_| EvalError::user("Decoded base64url is not valid UTF-8"))
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_standard_alphabet() {
        let table = SymbolTable::new();
        register(&table);
        let encode = table.lookup("b64_encode").unwrap();
        let decode = table.lookup("b64_decode").unwrap();
        let encoded = encode.as_callable().unwrap().call(vec![Value::string("hello?>>")]).unwrap();
        assert!(matches!(&encoded, Value::String(s) if s.contains('+') || s.contains('/') || !s.contains(['-', '_'])));
        let decoded = decode.as_callable().unwrap().call(vec![encoded]).unwrap();
        assert!(matches!(decoded, Value::String(s) if &*s == "hello?>>"));
    }

    #[test]
    fn url_safe_alphabet_avoids_plus_and_slash() {
        let table = SymbolTable::new();
        register(&table);
        let encode = table.lookup("b64_urlencode").unwrap();
        let decode = table.lookup("b64_urldecode").unwrap();
        let encoded = encode.as_callable().unwrap().call(vec![Value::string("hello?>>")]).unwrap();
        if let Value::String(s) = &encoded {
            assert!(!s.contains('+') && !s.contains('/'));
        }
        let decoded = decode.as_callable().unwrap().call(vec![encoded]).unwrap();
        assert!(matches!(decoded, Value::String(s) if &*s == "hello?>>"));
    }

    #[test]
    fn decode_rejects_invalid_input() {
        let table = SymbolTable::new();
        register(&table);
        let decode = table.lookup("b64_decode").unwrap();
        assert!(decode.as_callable().unwrap().call(vec![Value::string("not valid base64!!")]).is_err());
    }
}
