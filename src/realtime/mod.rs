//! Realtime update client: one reconnecting connection to the dashboard
//! update stream, dispatching payloads to [`Hooks`](crate::notify::Hooks).

mod backoff;
mod connection;
mod driver;
pub mod message;
mod session;

pub use backoff::Backoff;
pub use connection::StreamError;
pub use driver::RealtimeClient;
pub use message::InboundEvent;
pub use session::{Action, ConnectionState, Session};
