// devnet-rpc/src/validator.rs

//! Required-field checks run before a request reaches the backend.

use crate::{Method, RpcError, RpcResult};
use devnet_crypto::{Address, AddressKind};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    /// `hx` address
    Account,
    /// `hx` or `cx` address
    AnyAddress,
    /// `0x`-prefixed hex integer string
    HexInteger,
    Text,
    Object,
}

impl Shape {
    fn matches(&self, value: &Value) -> bool {
        match self {
            Shape::Account => as_address(value).map_or(false, |a| a.kind() == AddressKind::Account),
            Shape::AnyAddress => as_address(value).is_some(),
            Shape::HexInteger => value.as_str().map_or(false, is_hex_integer),
            Shape::Text => value.is_string(),
            Shape::Object => value.is_object(),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Shape::Account => "an hx address",
            Shape::AnyAddress => "an hx or cx address",
            Shape::HexInteger => "a 0x-prefixed hex integer",
            Shape::Text => "a string",
            Shape::Object => "an object",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Field {
    name: &'static str,
    shape: Shape,
    required: bool,
}

const fn required(name: &'static str, shape: Shape) -> Field {
    Field { name, shape, required: true }
}

const fn optional(name: &'static str, shape: Shape) -> Field {
    Field { name, shape, required: false }
}

const SEND_TRANSACTION: &[Field] = &[
    required("from", Shape::Account),
    required("to", Shape::AnyAddress),
    optional("value", Shape::HexInteger),
    optional("fee", Shape::HexInteger),
    optional("nonce", Shape::HexInteger),
    optional("timestamp", Shape::HexInteger),
    optional("signature", Shape::Text),
];

const CALL: &[Field] = &[
    required("to", Shape::AnyAddress),
    optional("from", Shape::Account),
    optional("dataType", Shape::Text),
    optional("data", Shape::Object),
];

const GET_BALANCE: &[Field] = &[required("address", Shape::AnyAddress)];

const GET_TOTAL_SUPPLY: &[Field] = &[];

fn schema(method: Method) -> Option<&'static [Field]> {
    match method {
        Method::SendTransaction => Some(SEND_TRANSACTION),
        Method::Call => Some(CALL),
        Method::GetBalance => Some(GET_BALANCE),
        Method::GetTotalSupply => Some(GET_TOTAL_SUPPLY),
        Method::GetTransactionResult | Method::ServerExit => None,
    }
}

/// Check `params` against the schema of `method`.
///
/// A bad field yields `InvalidParams` naming it. Asking for a method that
/// has no schema is a server-side failure, not a client one.
pub fn validate(method: Method, params: &Map<String, Value>) -> RpcResult<()> {
    let fields = schema(method)
        .ok_or_else(|| RpcError::Server(format!("no parameter schema for {}", method)))?;

    for field in fields {
        check(field, params.get(field.name))?;
    }
    Ok(())
}

fn check(field: &Field, value: Option<&Value>) -> RpcResult<()> {
    let value = match value {
        None | Some(Value::Null) if field.required => {
            return Err(RpcError::invalid_params(
                field.name,
                format!("missing required field '{}'", field.name),
            ));
        }
        None | Some(Value::Null) => return Ok(()),
        Some(value) => value,
    };

    if field.shape.matches(value) {
        Ok(())
    } else {
        Err(RpcError::invalid_params(
            field.name,
            format!("invalid '{}': expected {}", field.name, field.shape.describe()),
        ))
    }
}

fn as_address(value: &Value) -> Option<Address> {
    value.as_str()?.parse().ok()
}

fn is_hex_integer(s: &str) -> bool {
    s.strip_prefix("0x")
        .map_or(false, |body| !body.is_empty() && body.chars().all(|c| c.is_ascii_hexdigit()))
}
