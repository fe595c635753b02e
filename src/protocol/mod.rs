pub mod connector;
pub mod listener;
pub mod message;

pub use connector::{ConnectionStep, Connector, HandshakeEvent};
pub use listener::Listener;
pub use message::{Message, MessageKind};
