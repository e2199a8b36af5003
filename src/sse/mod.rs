//! Server-sent event stream transport

mod connector;
mod frame;

pub use connector::{ConnectError, Connector, FrameSource, HttpConnector};
pub use frame::{Frame, FrameStream, FrameStreamError, DEFAULT_EVENT_NAME, MAX_LINE_LENGTH};
