use crate::method::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub const JSONRPC_VERSION: &str = "2.0";

/// Version tag carried by messages that could not be parsed at all.
/// Callers must branch on `Message::is_malformed` before typed conversion.
pub const MALFORMED_VERSION: &str = "malformed";

fn default_jsonrpc() -> String {
    JSONRPC_VERSION.to_string()
}

/// Correlation id linking a response to its originating request.
///
/// The wire allows string or number ids; the server never invents ids, it
/// only echoes them back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{n}"),
            RequestId::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for RequestId {
    fn from(value: i64) -> Self {
        RequestId::Number(value)
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        RequestId::Text(value.to_string())
    }
}

impl From<String> for RequestId {
    fn from(value: String) -> Self {
        RequestId::Text(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ResponseError {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    pub const REQUEST_CANCELLED: i64 = -32800;

    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn method_not_found(name: &str) -> Self {
        Self::new(Self::METHOD_NOT_FOUND, format!("method not found: {name}"))
    }

    pub fn invalid_params(detail: impl fmt::Display) -> Self {
        Self::new(Self::INVALID_PARAMS, format!("invalid params: {detail}"))
    }

    pub fn cancelled() -> Self {
        Self::new(Self::REQUEST_CANCELLED, "request cancelled")
    }

    pub fn internal(detail: impl fmt::Display) -> Self {
        Self::new(Self::INTERNAL_ERROR, detail.to_string())
    }
}

/// Wire-level envelope: one JSON object per frame, request, response or
/// notification depending on which fields are populated. Absent optional
/// fields are omitted on the wire, never emitted as null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default = "default_jsonrpc")]
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

impl Message {
    fn empty() -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: None,
            method: None,
            params: Value::Null,
            result: None,
            error: None,
        }
    }

    pub fn request(method: Method, id: RequestId, params: Value) -> Self {
        Self {
            id: Some(id),
            method: Some(method.as_str().to_string()),
            params,
            ..Self::empty()
        }
    }

    pub fn notification(method: Method, params: Value) -> Self {
        Self {
            method: Some(method.as_str().to_string()),
            params,
            ..Self::empty()
        }
    }

    pub fn response(id: RequestId, result: Value) -> Self {
        Self {
            id: Some(id),
            result: Some(result),
            ..Self::empty()
        }
    }

    pub fn error_response(id: RequestId, error: ResponseError) -> Self {
        Self {
            id: Some(id),
            error: Some(error),
            ..Self::empty()
        }
    }

    /// Degenerate message standing in for input that could not be parsed.
    pub fn malformed() -> Self {
        Self {
            jsonrpc: MALFORMED_VERSION.to_string(),
            ..Self::empty()
        }
    }

    pub fn is_malformed(&self) -> bool {
        self.jsonrpc == MALFORMED_VERSION
    }

    /// Classifies the method name against the closed catalog. Absent or
    /// unrecognized names map to `Method::Unknown`, never an error.
    pub fn classify(&self) -> Method {
        match self.method.as_deref() {
            Some(name) => Method::from_name(name),
            None => Method::Unknown,
        }
    }

    /// Requests without an id expect no response and cannot be cancelled.
    pub fn is_notification(&self) -> bool {
        self.method.is_some() && self.id.is_none()
    }

    pub fn is_response(&self) -> bool {
        self.method.is_none() && (self.result.is_some() || self.error.is_some())
    }
}

/// A message specialized with a known method and a typed payload.
#[derive(Debug, Clone)]
pub struct Request<P> {
    pub method: Method,
    pub id: Option<RequestId>,
    pub params: P,
}

/// A typed result or an error, never both, correlated to the originating
/// request by id.
#[derive(Debug, Clone)]
pub struct Response<R> {
    pub id: RequestId,
    pub result: Option<R>,
    pub error: Option<ResponseError>,
}

impl<R> Response<R> {
    pub fn ok(id: RequestId, result: R) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: RequestId, error: ResponseError) -> Self {
        Self {
            id,
            result: None,
            error: Some(error),
        }
    }
}
