use crate::config::MAX_DATAGRAM_SIZE;
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::message::Message;
use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

/// Datagram codec for use with `UdpFramed`.
///
/// Every datagram is exactly one message, so decoding always consumes the
/// whole buffer.
#[derive(Debug, Default, Clone, Copy)]
pub struct DatagramCodec;

impl Decoder for DatagramCodec {
    type Item = Message;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if src.is_empty() {
            return Ok(None);
        }

        if src.len() > MAX_DATAGRAM_SIZE {
            let len = src.len();
            src.clear();
            return Err(ProtocolError::Decode(format!(
                "{} ({len} bytes)",
                constants::ERR_OVERSIZED_DATAGRAM
            )));
        }

        Ok(Some(Message::classify(src.split().freeze())))
    }
}

impl Encoder<Message> for DatagramCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<()> {
        if item.data().len() > MAX_DATAGRAM_SIZE {
            return Err(ProtocolError::TransportError(format!(
                "{} ({} bytes)",
                constants::ERR_OVERSIZED_DATAGRAM,
                item.data().len()
            )));
        }
        dst.extend_from_slice(item.data());
        Ok(())
    }
}
