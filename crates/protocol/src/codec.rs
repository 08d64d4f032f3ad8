use crate::envelope::Message;
use crate::envelope::{Request, Response};
use crate::error::{ProtocolError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Converts raw text into an envelope. Never fails: anything that is not a
/// JSON object of the expected shape becomes a sentinel malformed message,
/// so a hostile or buggy client cannot crash the read loop.
pub fn parse_message(raw: &str) -> Message {
    match serde_json::from_str::<Message>(raw) {
        Ok(msg) => msg,
        Err(err) => {
            log::debug!("degrading unparsable message to sentinel: {err}");
            Message::malformed()
        }
    }
}

/// Reifies the untyped payload as `P`. The payload type is not known at
/// parse time, it depends on the method, so each handler supplies its own
/// `P` here. Shape mismatches are surfaced, not swallowed.
pub fn to_request<P: DeserializeOwned>(msg: &Message) -> Result<Request<P>> {
    let method = msg.classify();
    let params =
        serde_json::from_value(msg.params.clone()).map_err(|source| ProtocolError::TypeConversion {
            method: method.as_str().to_string(),
            source,
        })?;
    Ok(Request {
        method,
        id: msg.id.clone(),
        params,
    })
}

/// Symmetric to `to_request`, for decoding a result payload.
pub fn to_response<R: DeserializeOwned>(msg: &Message) -> Result<Response<R>> {
    let id = msg.id.clone().ok_or_else(|| {
        ProtocolError::Decode("response message carries no correlation id".to_string())
    })?;
    let result = match &msg.result {
        Some(value) => Some(serde_json::from_value(value.clone()).map_err(|source| {
            ProtocolError::TypeConversion {
                method: "<response>".to_string(),
                source,
            }
        })?),
        None => None,
    };
    Ok(Response {
        id,
        result,
        error: msg.error.clone(),
    })
}

/// Serializes an outgoing value. Failure here is a programming error, fatal
/// to the one response being written, never to the process.
pub fn serialize<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Hover content that travels as either a plain string or a structured
/// `{language, value}` record. Decoding accepts both shapes; encoding
/// preserves whichever shape the value was built with, structured when a
/// language tag is present and plain otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MarkedText {
    Block { language: String, value: String },
    Plain(String),
}

impl MarkedText {
    pub fn plain(value: impl Into<String>) -> Self {
        MarkedText::Plain(value.into())
    }

    pub fn with_language(language: impl Into<String>, value: impl Into<String>) -> Self {
        MarkedText::Block {
            language: language.into(),
            value: value.into(),
        }
    }

    pub fn value(&self) -> &str {
        match self {
            MarkedText::Block { value, .. } => value,
            MarkedText::Plain(value) => value,
        }
    }
}
