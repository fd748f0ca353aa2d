// devnet-rpc/src/convert.rs

use serde_json::Value;

/// Rewrite every integer in `value` as a lowercase `0x` hex string.
///
/// Recurses through arrays and objects. Floats, strings, booleans and null
/// are left alone, so applying it twice gives the same result as once.
pub fn integers_to_hex(value: Value) -> Value {
    match value {
        Value::Number(number) => {
            if let Some(unsigned) = number.as_u64() {
                Value::String(format!("{:#x}", unsigned))
            } else if let Some(signed) = number.as_i64() {
                Value::String(format!("-{:#x}", signed.unsigned_abs()))
            } else {
                Value::Number(number)
            }
        }
        Value::Array(items) => Value::Array(items.into_iter().map(integers_to_hex).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, integers_to_hex(value)))
                .collect(),
        ),
        other => other,
    }
}
