mod codec;
mod envelope;
mod error;
mod framing;
mod method;

pub use codec::{parse_message, serialize, to_request, to_response, MarkedText};
pub use envelope::{Message, Request, RequestId, Response, ResponseError, MALFORMED_VERSION};
pub use error::{ProtocolError, Result};
pub use framing::{FrameReader, FrameWriter};
pub use method::Method;
