// Path: crates/services/src/ton/encoder.rs
//! Converts loosely-typed agent parameters into the tagged stack format of
//! `runGetMethod`, and decodes single-integer result stacks.

use aether_types::app::{StackEntry, StackTag};
use aether_types::error::GatewayError;
use serde_json::Value;

const U64_BOUND: f64 = 18_446_744_073_709_551_616.0;
const I64_MIN: f64 = -9_223_372_036_854_775_808.0;

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) => match n.as_f64() {
            // Integer literals beyond 64 bits only survive parsing as f64.
            Some(f) if f.fract() == 0.0 && (f >= U64_BOUND || f <= I64_MIN) => {
                "integer out of range"
            }
            _ => "float",
        },
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Encodes `params` in order. Integers become `num` entries and strings become
/// `str` entries; the first element of any other kind fails the whole call.
pub fn encode_stack(params: &[Value]) -> Result<Vec<StackEntry>, GatewayError> {
    params
        .iter()
        .enumerate()
        .map(|(index, value)| match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(StackEntry::num(i))
                } else if let Some(u) = n.as_u64() {
                    Ok(StackEntry::num(u))
                } else {
                    Err(GatewayError::UnsupportedParamType {
                        index,
                        kind: kind_of(value),
                    })
                }
            }
            Value::String(s) => Ok(StackEntry::str(s.clone())),
            other => Err(GatewayError::UnsupportedParamType {
                index,
                kind: kind_of(other),
            }),
        })
        .collect()
}

/// Parses a stack integer (`"0x1f"`, `"-0x1"` or plain decimal) into decimal text.
fn parse_stack_int(raw: &str) -> Option<String> {
    let (negative, digits) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };
    let magnitude = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => u128::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<u128>().ok()?,
    };
    if negative && magnitude != 0 {
        Some(format!("-{magnitude}"))
    } else {
        Some(magnitude.to_string())
    }
}

/// Returns the decimal value of a result whose `stack` holds exactly one `num` entry.
pub fn decode_single_num(result: &Value) -> Option<String> {
    let stack = result.get("stack")?.as_array()?;
    let [entry] = stack.as_slice() else {
        return None;
    };
    let pair = entry.as_array()?;
    let [tag, raw] = pair.as_slice() else {
        return None;
    };
    let tag: StackTag = serde_json::from_value(tag.clone()).ok()?;
    if tag != StackTag::Num {
        return None;
    }
    parse_stack_int(raw.as_str()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn encodes_in_order() {
        let stack = encode_stack(&[json!(42), json!("abc")]).unwrap();
        assert_eq!(
            serde_json::to_value(&stack).unwrap(),
            json!([["num", "42"], ["str", "abc"]])
        );
    }

    #[test]
    fn keeps_strings_verbatim_and_large_integers_exact() {
        let stack = encode_stack(&[json!(" 0x10 "), json!(u64::MAX), json!(-7)]).unwrap();
        assert_eq!(stack[0], StackEntry::str(" 0x10 "));
        assert_eq!(stack[1], StackEntry::num("18446744073709551615"));
        assert_eq!(stack[2], StackEntry::num("-7"));
    }

    #[test]
    fn rejects_everything_else_with_position() {
        let cases = [
            (json!(1.5), "float"),
            (json!(null), "null"),
            (json!(true), "bool"),
            (json!([1]), "array"),
            (json!({"a": 1}), "object"),
        ];
        for (bad, kind) in cases {
            let err = encode_stack(&[json!(1), json!("x"), bad]).unwrap_err();
            assert_eq!(err, GatewayError::UnsupportedParamType { index: 2, kind });
        }
    }

    #[test]
    fn oversized_integers_are_not_called_floats() {
        let too_big: Value = serde_json::from_str("18446744073709551616").unwrap();
        let too_small: Value = serde_json::from_str("-9223372036854775809").unwrap();
        for bad in [too_big, too_small] {
            let err = encode_stack(&[bad]).unwrap_err();
            assert_eq!(
                err,
                GatewayError::UnsupportedParamType {
                    index: 0,
                    kind: "integer out of range"
                }
            );
        }
        let err = encode_stack(&[json!(1.0)]).unwrap_err();
        assert_eq!(err, GatewayError::UnsupportedParamType { index: 0, kind: "float" });
    }

    #[test]
    fn empty_params_encode_to_empty_stack() {
        assert!(encode_stack(&[]).unwrap().is_empty());
    }

    #[test]
    fn decodes_single_num_stacks() {
        let hex = json!({"stack": [["num", "0x59682f00"]], "exit_code": 0});
        assert_eq!(decode_single_num(&hex).as_deref(), Some("1500000000"));

        let dec = json!({"stack": [["num", "1500000000"]]});
        assert_eq!(decode_single_num(&dec).as_deref(), Some("1500000000"));

        let neg = json!({"stack": [["num", "-0x1"]]});
        assert_eq!(decode_single_num(&neg).as_deref(), Some("-1"));
    }

    #[test]
    fn ignores_other_shapes() {
        assert_eq!(decode_single_num(&json!({"stack": []})), None);
        assert_eq!(
            decode_single_num(&json!({"stack": [["num", "1"], ["num", "2"]]})),
            None
        );
        assert_eq!(decode_single_num(&json!({"stack": [["cell", {}]]})), None);
        assert_eq!(decode_single_num(&json!({"stack": [["num", "zz"]]})), None);
        assert_eq!(decode_single_num(&json!("nope")), None);
    }
}
