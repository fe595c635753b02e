use crate::error::Result;
use crate::protocol::message::Message;

/// Receiver of inbound messages, registered with a transport client.
///
/// The client invokes `receive` once per datagram, sequentially and in
/// arrival order. An error returned from `receive` ends the client loop, so
/// implementations only return errors that make the connection unusable.
pub trait Listener: Send {
    fn receive(&mut self, msg: &Message, sub_type: u8) -> Result<()>;
}
