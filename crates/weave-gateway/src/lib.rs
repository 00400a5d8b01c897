//! Best-effort fan-out of room events.
//!
//! Nothing in this crate reports delivery failures to its caller: a
//! [`Publisher`] accepts an event and returns immediately.

pub mod dispatcher;
pub mod http;
pub mod publisher;

pub use dispatcher::{Dispatcher, RoomMessage, RoomSubscription};
pub use http::HttpPublisher;
pub use publisher::{Fanout, NoopPublisher, Publisher};
