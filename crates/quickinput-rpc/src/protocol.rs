//! JSON-RPC 2.0 envelopes and the quick input method table

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, RpcError};

pub const JSONRPC_VERSION: &str = "2.0";

/// Method names on both sides of the connection
pub mod methods {
    // Requester -> host
    pub const SHOW: &str = "$show";
    pub const SET_ITEMS: &str = "$setItems";
    pub const SET_ERROR: &str = "$setError";
    pub const INPUT: &str = "$input";
    pub const CREATE_OR_UPDATE: &str = "$createOrUpdate";
    pub const DISPOSE: &str = "$dispose";
    pub const CANCEL_REQUEST: &str = "$cancelRequest";

    // Host -> requester
    pub const ON_ITEM_SELECTED: &str = "$onItemSelected";
    pub const ON_DID_SELECT_ITEMS: &str = "$onDidSelectItems";
    pub const VALIDATE_INPUT: &str = "$validateInput";
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{}", n),
            RequestId::String(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: RequestId, method: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params: None,
        }
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params: Some(params),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: RequestId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: RequestId, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// A missing or `null` result is a successful `null`
    pub fn into_result(self) -> Result<Value> {
        match self.error {
            Some(error) => Err(RpcError::Remote(error)),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    /// Failures raised by the mediators
    pub const SERVER_ERROR: i32 = -32000;

    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn invalid_request() -> Self {
        Self::new(Self::INVALID_REQUEST, "Invalid Request")
    }

    pub fn method_not_found() -> Self {
        Self::new(Self::METHOD_NOT_FOUND, "Method not found")
    }

    pub fn invalid_params(detail: impl fmt::Display) -> Self {
        Self::new(Self::INVALID_PARAMS, format!("Invalid params: {}", detail))
    }

    pub fn internal_error(detail: impl fmt::Display) -> Self {
        Self::new(Self::INTERNAL_ERROR, format!("Internal error: {}", detail))
    }
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

/// Any message that can arrive on the wire
#[derive(Debug, Clone)]
pub enum Message {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
    Response(JsonRpcResponse),
}

impl Message {
    /// Classify a raw JSON value by the members it carries
    pub fn parse(value: Value) -> Result<Self> {
        let has_method = value.get("method").is_some();
        let has_id = value.get("id").is_some_and(|id| !id.is_null());

        let message = match (has_method, has_id) {
            (true, true) => Message::Request(serde_json::from_value(value)?),
            (true, false) => Message::Notification(serde_json::from_value(value)?),
            (false, true) => Message::Response(serde_json::from_value(value)?),
            (false, false) => {
                return Err(RpcError::Protocol(
                    "message has neither a method nor an id".to_string(),
                ));
            }
        };
        Ok(message)
    }
}

/// Positional argument `index` of a request.
///
/// Params may be an array of arguments or, for the first argument, the bare
/// value itself. Missing arguments read as `null`.
pub fn param<T: DeserializeOwned>(
    params: Option<&Value>,
    index: usize,
) -> std::result::Result<T, JsonRpcError> {
    let value = match params {
        Some(Value::Array(args)) => args.get(index).cloned().unwrap_or(Value::Null),
        Some(other) if index == 0 => other.clone(),
        _ => Value::Null,
    };
    serde_json::from_value(value).map_err(JsonRpcError::invalid_params)
}
