//! Compiles JSON call arguments into a push-only program.
//!
//! Input is an array of single-key objects such as
//! `[{"integer": 5}, {"string": "hi"}, {"array": [{"boolean": true}]}]`.
//! Values are type checked once while decoding; encoding itself cannot fail.
//! Arguments are pushed last-declared first so the callee pops them in
//! declaration order.

use serde_json::Value;
use thiserror::Error;

use super::program::{op, ProgramBuilder};
use super::ParameterType;
use crate::crypto::keys::validate_public_key;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("invalid parameter json: {0}")]
    InvalidJson(String),

    #[error("parameter entry must have exactly one key, found {0}")]
    MalformedEntry(usize),

    #[error("unknown parameter type {0:?}")]
    UnknownType(String),

    #[error("parameter type {0:?} cannot be passed as an argument")]
    Unsupported(String),

    #[error("parameter {tag:?} expects {expected}, got {found}")]
    TypeMismatch {
        tag: String,
        expected: &'static str,
        found: String,
    },

    #[error("invalid hex for parameter {tag:?}: {value}")]
    InvalidHex { tag: String, value: String },

    #[error("invalid public key {0}")]
    InvalidPublicKey(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterValue {
    Bool(bool),
    Int(i64),
    Str(String),
    Bytes(Vec<u8>),
    Array(Vec<Parameter>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub ty: ParameterType,
    pub value: ParameterValue,
}

fn json_kind(v: &Value) -> String {
    match v {
        Value::Null => "null".into(),
        Value::Bool(_) => "boolean".into(),
        Value::Number(n) => format!("number {}", n),
        Value::String(_) => "string".into(),
        Value::Array(_) => "array".into(),
        Value::Object(_) => "object".into(),
    }
}

impl Parameter {
    pub fn from_json(entry: &Value) -> Result<Self, EncodingError> {
        let map = entry.as_object().ok_or_else(|| EncodingError::TypeMismatch {
            tag: "<entry>".into(),
            expected: "an object",
            found: json_kind(entry),
        })?;
        if map.len() != 1 {
            return Err(EncodingError::MalformedEntry(map.len()));
        }
        let Some((tag, raw)) = map.iter().next() else {
            return Err(EncodingError::MalformedEntry(0));
        };
        let ty = ParameterType::from_name(tag)
            .ok_or_else(|| EncodingError::UnknownType(tag.clone()))?;

        let mismatch = |expected: &'static str| EncodingError::TypeMismatch {
            tag: tag.clone(),
            expected,
            found: json_kind(raw),
        };
        let hex_value = || -> Result<Vec<u8>, EncodingError> {
            let s = raw.as_str().ok_or_else(|| mismatch("a hex string"))?;
            hex::decode(s).map_err(|_| EncodingError::InvalidHex {
                tag: tag.clone(),
                value: s.to_string(),
            })
        };

        let value = match ty {
            ParameterType::Boolean => {
                ParameterValue::Bool(raw.as_bool().ok_or_else(|| mismatch("a boolean"))?)
            }
            ParameterType::Integer => {
                ParameterValue::Int(json_integer(raw).ok_or_else(|| mismatch("an integer"))?)
            }
            ParameterType::String => {
                ParameterValue::Str(raw.as_str().ok_or_else(|| mismatch("a string"))?.to_string())
            }
            ParameterType::PublicKey => {
                let bytes = hex_value()?;
                validate_public_key(&bytes)
                    .map_err(|_| EncodingError::InvalidPublicKey(hex::encode(&bytes)))?;
                ParameterValue::Bytes(bytes)
            }
            ParameterType::Hash160 => {
                let mut bytes = hex_value()?;
                if bytes.len() == 21 {
                    bytes.remove(0);
                }
                ParameterValue::Bytes(bytes)
            }
            ParameterType::ByteArray
            | ParameterType::Hash256
            | ParameterType::Hash168
            | ParameterType::Signature => ParameterValue::Bytes(hex_value()?),
            ParameterType::Array => {
                let items = raw.as_array().ok_or_else(|| mismatch("an array"))?;
                ParameterValue::Array(parse(items)?)
            }
            ParameterType::InteropInterface | ParameterType::Void => {
                return Err(EncodingError::Unsupported(tag.clone()))
            }
        };
        Ok(Parameter { ty, value })
    }
}

/// Whole JSON numbers that fit in an `i64`. `5.0` is accepted, `5.5` is not.
fn json_integer(v: &Value) -> Option<i64> {
    let Value::Number(n) = v else {
        return None;
    };
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    let f = n.as_f64()?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

pub fn parse(entries: &[Value]) -> Result<Vec<Parameter>, EncodingError> {
    entries.iter().map(Parameter::from_json).collect()
}

pub fn parse_json(json: &str) -> Result<Vec<Parameter>, EncodingError> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| EncodingError::InvalidJson(e.to_string()))?;
    let entries = value
        .as_array()
        .ok_or_else(|| EncodingError::InvalidJson("expected an array of parameters".into()))?;
    parse(entries)
}

pub fn encode(params: &[Parameter]) -> Vec<u8> {
    let mut builder = ProgramBuilder::new();
    emit_params(&mut builder, params);
    builder.into_bytes()
}

pub fn encode_json(json: &str) -> Result<Vec<u8>, EncodingError> {
    Ok(encode(&parse_json(json)?))
}

fn emit_params(builder: &mut ProgramBuilder, params: &[Parameter]) {
    for param in params.iter().rev() {
        match &param.value {
            ParameterValue::Bool(b) => {
                builder.push_bool(*b);
            }
            ParameterValue::Int(i) => {
                builder.push_integer(*i);
            }
            ParameterValue::Str(s) => {
                builder.push_bytes(s.as_bytes());
            }
            ParameterValue::Bytes(b) => {
                builder.push_bytes(b);
            }
            ParameterValue::Array(items) => {
                emit_params(builder, items);
                builder.push_integer(items.len() as i64);
                builder.emit(op::PACK);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::KeyPair;
    use rstest::rstest;

    #[test]
    fn reverses_declared_order() {
        let program = encode_json(r#"[{"integer": 1}, {"string": "hi"}]"#).unwrap();
        assert_eq!(program, vec![0x02, b'h', b'i', 0x51]);
    }

    #[test]
    fn nested_array() {
        let program = encode_json(r#"[{"array": [{"integer": 1}, {"integer": 2}]}]"#).unwrap();
        assert_eq!(program, vec![0x52, 0x51, 0x52, op::PACK]);

        let nested =
            encode_json(r#"[{"array": [{"boolean": true}, {"array": [{"integer": 3}]}]}]"#)
                .unwrap();
        assert_eq!(
            nested,
            vec![0x53, 0x51, op::PACK, op::PUSHT, 0x52, op::PACK]
        );
    }

    #[test]
    fn hash160_drops_prefix_only_at_21_bytes() {
        let twenty = "11".repeat(20);
        let twenty_one = format!("21{}", twenty);
        let a = encode_json(&format!(r#"[{{"hash160": "{}"}}]"#, twenty)).unwrap();
        let b = encode_json(&format!(r#"[{{"hash160": "{}"}}]"#, twenty_one)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0], 20);
        assert_eq!(a.len(), 21);
    }

    #[test]
    fn public_keys_are_validated() {
        let key = hex::encode(KeyPair::generate().public_key_bytes());
        let program = encode_json(&format!(r#"[{{"publickey": "{}"}}]"#, key)).unwrap();
        assert_eq!(program[0], 33);

        let err = encode_json(r#"[{"publickey": "04aa"}]"#).unwrap_err();
        assert!(matches!(err, EncodingError::InvalidPublicKey(_)));
    }

    #[rstest]
    #[case(r#"[{}]"#)]
    #[case(r#"[{"integer": 1, "string": "x"}]"#)]
    #[case(r#"[{"Integer": 1}]"#)]
    #[case(r#"[{"integer": "1"}]"#)]
    #[case(r#"[{"integer": 1.5}]"#)]
    #[case(r#"[{"boolean": 1}]"#)]
    #[case(r#"[{"bytearray": "zz"}]"#)]
    #[case(r#"[{"void": null}]"#)]
    #[case(r#"[{"array": {"integer": 1}}]"#)]
    #[case(r#"{"integer": 1}"#)]
    #[case(r#"[1]"#)]
    #[case(r#"not json"#)]
    fn rejects_bad_entries(#[case] json: &str) {
        assert!(encode_json(json).is_err());
    }

    #[test]
    fn whole_floats_are_integers() {
        assert_eq!(encode_json(r#"[{"integer": 5.0}]"#).unwrap(), vec![0x55]);
        assert_eq!(
            encode_json(r#"[{"integer": -1}, {"boolean": false}]"#).unwrap(),
            vec![op::PUSHF, op::PUSHM1]
        );
    }

    #[test]
    fn decoded_values_are_typed() {
        let params = parse_json(r#"[{"signature": "0a0b"}, {"string": "s"}]"#).unwrap();
        assert_eq!(params[0].ty, ParameterType::Signature);
        assert_eq!(params[0].value, ParameterValue::Bytes(vec![0x0a, 0x0b]));
        assert_eq!(params[1].value, ParameterValue::Str("s".into()));
    }

    /// Pops values off a simulated stack; arrays come back in declared order.
    #[test]
    fn stack_simulation_recovers_declared_order() {
        #[derive(Debug, PartialEq)]
        enum Item {
            Int(i64),
            Bytes(Vec<u8>),
            List(Vec<Item>),
        }

        let program =
            encode_json(r#"[{"integer": 7}, {"string": "ab"}, {"array": [{"integer": 2}, {"integer": 3}]}]"#)
                .unwrap();

        let mut stack: Vec<Item> = Vec::new();
        let mut i = 0;
        while i < program.len() {
            let b = program[i];
            i += 1;
            match b {
                op::PUSH0 => stack.push(Item::Int(0)),
                op::PUSH1..=op::PUSH16 => stack.push(Item::Int((b - op::PUSH1 + 1) as i64)),
                op::PACK => {
                    let Item::Int(n) = stack.pop().unwrap() else { panic!("count") };
                    let items = (0..n).map(|_| stack.pop().unwrap()).collect();
                    stack.push(Item::List(items));
                }
                len @ 0x01..=0x4b => {
                    stack.push(Item::Bytes(program[i..i + len as usize].to_vec()));
                    i += len as usize;
                }
                other => panic!("unexpected opcode {:x}", other),
            }
        }

        let popped: Vec<Item> = std::iter::from_fn(|| stack.pop()).collect();
        assert_eq!(
            popped,
            vec![
                Item::Int(7),
                Item::Bytes(b"ab".to_vec()),
                Item::List(vec![Item::Int(2), Item::Int(3)]),
            ]
        );
    }
}
