use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProtocolError>;

#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Malformed wire input. Recovered locally into a sentinel message by
    /// `parse_message`; surfaces only from the framing layer.
    #[error("malformed wire input: {0}")]
    Decode(String),

    /// The untyped payload does not match the shape the method requires.
    #[error("payload for `{method}` does not match the expected shape: {source}")]
    TypeConversion {
        method: String,
        #[source]
        source: serde_json::Error,
    },

    /// An outgoing value could not be represented as JSON. Fatal to the
    /// response that carried it, never to the process.
    #[error("unserializable outgoing value: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("method not found: {0}")]
    MethodNotFound(String),
}
