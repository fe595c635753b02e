//! Client-side connection handshake.
//!
//! The [`Connector`] drives a client from the first challenge query to a
//! connected session:
//!
//! 1. `initial_message()` produces the `'q'` query carrying the client challenge.
//! 2. The server answers `'A'` with its own challenge. The connector echoes both
//!    challenges back in an authenticated `'k'` packet with an identity ticket.
//! 3. The server answers `'B'` when the credentials are accepted. The connector
//!    sends the client settings packet and is connected.
//!
//! A `'9'` at any point carries the server's refusal reason.
//!
//! The connector never touches the socket. Follow-up packets go through the
//! [`ClientHandle`] given to [`Connector::register`], which does not keep the
//! transport alive.
//!
//! ## Malformed packets
//! A field that fails to decode drops the whole packet: no state changes and
//! nothing is sent. The handshake keeps waiting for a well-formed reply.

use crate::config::{
    COMMAND_TAG_BITS, MAX_REASON_LENGTH, NET_MESSAGE_BITS, SCRATCH_BUFFER_SIZE,
};
use crate::core::bitbuf::{BitReader, BitWriter};
use crate::error::{constants, ProtocolError, Result};
use crate::identity::IdentityProvider;
use crate::protocol::listener::Listener;
use crate::protocol::message::{net_message, packet_type, ConnectRequest, Message};
use crate::transport::udp::ClientHandle;

use tracing::{debug, info, instrument, warn};

/// Sign-on state announced right after authentication
const SIGNON_STATE_CONNECTED: u8 = 2;

/// Console commands sent with the client settings packet
const SETTINGS_COMMANDS: [&[u8]; 2] = [b"VModEnable 1", b"vban 0 0 0 0"];

/// Handshake progress. Only ever moves forward, except for the late
/// challenge acknowledgement described on [`Connector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConnectionStep {
    AwaitingChallenge,
    Authenticating,
    Connected,
}

/// Outcome of processing one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeEvent {
    /// Challenge received, authenticated connect sent
    Challenged { server_challenge: i32 },
    /// Credentials accepted, client settings sent
    Authenticated,
    /// Server refused the connection
    Refused(String),
    /// Nothing to do for this message
    Ignored,
}

/// Handshake state machine for one connection attempt.
///
/// A challenge acknowledgement is honoured in every state, so a duplicated or
/// delayed `'A'` re-submits credentials and moves a connected session back to
/// `Authenticating`. This is logged but not prevented.
pub struct Connector<I> {
    player_name: String,
    password: String,
    game_version: String,

    client_challenge: i32,
    server_challenge: Option<i32>,

    connection_step: ConnectionStep,
    refusal_reason: Option<String>,
    refusal_bytes: Option<Vec<u8>>,

    active_client: Option<ClientHandle>,
    identity: I,
}

impl<I: IdentityProvider> Connector<I> {
    pub fn new(
        player_name: impl Into<String>,
        password: impl Into<String>,
        game_version: impl Into<String>,
        client_challenge: i32,
        identity: I,
    ) -> Self {
        Self {
            player_name: player_name.into(),
            password: password.into(),
            game_version: game_version.into(),
            client_challenge,
            server_challenge: None,
            connection_step: ConnectionStep::AwaitingChallenge,
            refusal_reason: None,
            refusal_bytes: None,
            active_client: None,
            identity,
        }
    }

    /// Attach the client used for follow-up packets. Must happen before the
    /// first reply arrives.
    pub fn register(&mut self, client: ClientHandle) {
        self.active_client = Some(client);
    }

    /// The `'q'` query opening the handshake
    pub fn initial_message(&self) -> Message {
        Message::connectionless_query(self.client_challenge)
    }

    pub fn connection_step(&self) -> ConnectionStep {
        self.connection_step
    }

    pub fn client_challenge(&self) -> i32 {
        self.client_challenge
    }

    /// `None` until the first challenge acknowledgement
    pub fn server_challenge(&self) -> Option<i32> {
        self.server_challenge
    }

    /// Reason from the most recent refusal, if any
    pub fn refusal_reason(&self) -> Option<&str> {
        self.refusal_reason.as_deref()
    }

    /// The most recent refusal reason exactly as the server sent it
    pub fn refusal_reason_bytes(&self) -> Option<&[u8]> {
        self.refusal_bytes.as_deref()
    }

    /// Process one inbound message.
    ///
    /// Connected messages go to the in-session hook first. Every message,
    /// connected or not, then goes through the connectionless handler, which
    /// decides by the packet type byte alone.
    ///
    /// # Errors
    /// `Decode` for a malformed packet (nothing was changed or sent).
    /// `Identity`, `BufferOverflow`, `NotRegistered` and `ChannelClosed` when
    /// an authenticated reply could not be produced. In every error case the
    /// challenges and the step are left as they were.
    #[instrument(skip(self, msg), fields(step = ?self.connection_step, len = msg.data().len()))]
    pub fn process(&mut self, msg: &Message, sub_type: u8) -> Result<HandshakeEvent> {
        if !msg.connectionless() {
            self.handle_connected(msg, sub_type);
        }

        self.handle_connectionless(msg)
    }

    fn handle_connectionless(&mut self, msg: &Message) -> Result<HandshakeEvent> {
        let mut packet = BitReader::new(msg.data());

        packet
            .read_i32()
            .map_err(|_| ProtocolError::Decode(constants::ERR_MISSING_HEADER.into()))?;

        let kind = packet
            .read_u8()
            .map_err(|_| ProtocolError::Decode(constants::ERR_MISSING_TYPE.into()))?;

        match kind {
            packet_type::S2C_CHALLENGE => self.on_challenge(&mut packet),
            packet_type::S2C_CONNECTION => self.on_connection(),
            packet_type::S2C_CONNREJECT => self.on_reject(&mut packet),
            other => {
                debug!(packet_type = other, "Ignoring unknown connectionless packet");
                Ok(HandshakeEvent::Ignored)
            }
        }
    }

    fn on_challenge(&mut self, packet: &mut BitReader<'_>) -> Result<HandshakeEvent> {
        let _reserved = packet.read_i32()?;
        let server_challenge = packet.read_i32()?;
        let client_challenge = packet.read_i32()?;

        if self.connection_step != ConnectionStep::AwaitingChallenge {
            warn!(
                step = ?self.connection_step,
                "Challenge acknowledgement after authentication started, re-submitting credentials"
            );
        }

        let client = self.active_client.as_ref().ok_or(ProtocolError::NotRegistered)?;

        let identity_id = self.identity.identity_id();
        let ticket = self.identity.create_ticket()?;

        // The server's echo wins over our seed. Nothing is stored until the
        // connect packet is on its way.
        let connect = Message::connectionless_connect(&ConnectRequest {
            client_challenge,
            server_challenge,
            player_name: &self.player_name,
            password: &self.password,
            game_version: &self.game_version,
            identity_id,
            ticket: &ticket,
        })?;

        client.send_message(connect, false)?;

        self.server_challenge = Some(server_challenge);
        self.client_challenge = client_challenge;
        self.connection_step = ConnectionStep::Authenticating;

        debug!(server_challenge, client_challenge, "Sent authenticated connect");
        Ok(HandshakeEvent::Challenged { server_challenge })
    }

    fn on_connection(&mut self) -> Result<HandshakeEvent> {
        if self.connection_step != ConnectionStep::Authenticating {
            debug!(step = ?self.connection_step, "Ignoring connection accept");
            return Ok(HandshakeEvent::Ignored);
        }

        let client = self.active_client.as_ref().ok_or(ProtocolError::NotRegistered)?;

        info!(player = %self.player_name, "Connected successfully");

        client.send_message(Message::generic(client_settings_packet()?), false)?;
        self.connection_step = ConnectionStep::Connected;

        Ok(HandshakeEvent::Authenticated)
    }

    fn on_reject(&mut self, packet: &mut BitReader<'_>) -> Result<HandshakeEvent> {
        let _challenge = packet.read_i32()?;
        let raw = packet.read_cstring_bytes(MAX_REASON_LENGTH)?;

        // The event and log carry text, so invalid UTF-8 is replaced there.
        // The untouched bytes stay available through refusal_reason_bytes().
        let reason = String::from_utf8_lossy(&raw).into_owned();

        warn!(%reason, "Connection refused");
        self.refusal_reason = Some(reason.clone());
        self.refusal_bytes = Some(raw);

        Ok(HandshakeEvent::Refused(reason))
    }

    // In-session sign-on phase; nothing to do yet.
    fn handle_connected(&mut self, _msg: &Message, sub_type: u8) {
        if u32::from(sub_type) != net_message::NET_SIGNON_STATE {
            return;
        }
        debug!("Sign-on state message received");
    }
}

impl<I: IdentityProvider> Listener for Connector<I> {
    fn receive(&mut self, msg: &Message, sub_type: u8) -> Result<()> {
        match self.process(msg, sub_type) {
            Ok(_) => Ok(()),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) if msg.connectionless() => {
                warn!(error = %e, "Dropping malformed connectionless packet");
                Ok(())
            }
            Err(e) => {
                debug!(error = %e, "Connected payload is not a handshake packet");
                Ok(())
            }
        }
    }
}

/// Client settings sent once the server accepts the credentials.
///
/// A sign-on state message announcing state 2, then two string commands
/// enabling voice and clearing the voice ban list.
pub fn client_settings_packet() -> Result<Vec<u8>> {
    let mut w = BitWriter::with_capacity(SCRATCH_BUFFER_SIZE);

    w.write_bits(net_message::NET_SIGNON_STATE, NET_MESSAGE_BITS)?;
    w.write_u8(SIGNON_STATE_CONNECTED)?;
    w.write_i32(-1)?;

    for command in SETTINGS_COMMANDS {
        w.write_bits(net_message::NET_STRING_CMD, COMMAND_TAG_BITS)?;
        w.write_cstring(command)?;
    }

    Ok(w.into_bytes())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::identity::StaticIdentity;
    use crate::transport::udp::Outbound;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn connector(challenge: i32) -> (Connector<StaticIdentity>, UnboundedReceiver<Outbound>) {
        let (handle, rx) = ClientHandle::channel();
        let mut c = Connector::new(
            "player",
            "pw",
            "4630212",
            challenge,
            StaticIdentity::new(7, vec![1, 2, 3, 4]),
        );
        c.register(handle);
        (c, rx)
    }

    fn connectionless(kind: u8, body: &[i32]) -> Message {
        let mut data = (-1i32).to_le_bytes().to_vec();
        data.push(kind);
        for v in body {
            data.extend_from_slice(&v.to_le_bytes());
        }
        Message::classify(data)
    }

    #[test]
    fn test_truncated_challenge_is_dropped() {
        let (mut c, mut rx) = connector(5);
        let msg = connectionless(b'A', &[0, 42]);

        let err = c.process(&msg, 0).unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
        assert_eq!(c.connection_step(), ConnectionStep::AwaitingChallenge);
        assert_eq!(c.server_challenge(), None);
        assert_eq!(c.client_challenge(), 5);
        assert!(rx.try_recv().is_err());

        // The listener entry point swallows it
        assert!(c.receive(&msg, 0).is_ok());
    }

    #[test]
    fn test_challenge_without_registration_is_fatal() {
        let mut c = Connector::new("p", "", "1", 5, StaticIdentity::new(7, vec![1]));
        let err = c.process(&connectionless(b'A', &[0, 42, 5]), 0).unwrap_err();
        assert!(matches!(err, ProtocolError::NotRegistered));
        assert_eq!(c.connection_step(), ConnectionStep::AwaitingChallenge);
    }

    #[test]
    fn test_ticket_failure_propagates_from_receive() {
        let (handle, mut rx) = ClientHandle::channel();
        let mut c = Connector::new("p", "", "1", 5, StaticIdentity::new(7, Vec::new()));
        c.register(handle);

        let err = c.receive(&connectionless(b'A', &[0, 42, 99]), 0).unwrap_err();
        assert!(matches!(err, ProtocolError::Identity(_)));
        assert_eq!(c.connection_step(), ConnectionStep::AwaitingChallenge);
        assert_eq!(c.server_challenge(), None);
        assert_eq!(c.client_challenge(), 5);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_oversized_connect_is_fatal_and_changes_nothing() {
        let (handle, mut rx) = ClientHandle::channel();
        let password = "x".repeat(2100);
        let mut c = Connector::new("p", password, "1", 5, StaticIdentity::new(7, vec![1]));
        c.register(handle);

        let err = c.receive(&connectionless(b'A', &[0, 42, 99]), 0).unwrap_err();
        assert!(matches!(err, ProtocolError::BufferOverflow { .. }));
        assert!(err.is_fatal());
        assert_eq!(c.connection_step(), ConnectionStep::AwaitingChallenge);
        assert_eq!(c.server_challenge(), None);
        assert_eq!(c.client_challenge(), 5);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_refusal_keeps_raw_reason_bytes() {
        let (mut c, _rx) = connector(5);
        let mut data = connectionless(b'9', &[0]).into_bytes().to_vec();
        data.extend_from_slice(&[b'b', b'a', 0xE9, b'd', 0]);

        let event = c.process(&Message::classify(data), 0).unwrap();
        assert_eq!(event, HandshakeEvent::Refused("ba\u{FFFD}d".into()));
        assert_eq!(c.refusal_reason(), Some("ba\u{FFFD}d"));
        assert_eq!(c.refusal_reason_bytes(), Some(&[b'b', b'a', 0xE9, b'd'][..]));
    }

    #[test]
    fn test_late_challenge_restarts_authentication() {
        let (mut c, mut rx) = connector(5);
        c.process(&connectionless(b'A', &[0, 42, 5]), 0).unwrap();
        c.process(&connectionless(b'B', &[]), 0).unwrap();
        assert_eq!(c.connection_step(), ConnectionStep::Connected);

        let event = c.process(&connectionless(b'A', &[0, 43, 6]), 0).unwrap();
        assert_eq!(event, HandshakeEvent::Challenged { server_challenge: 43 });
        assert_eq!(c.connection_step(), ConnectionStep::Authenticating);
        assert_eq!(c.server_challenge(), Some(43));

        let mut sent = 0;
        while rx.try_recv().is_ok() {
            sent += 1;
        }
        assert_eq!(sent, 3);
    }

    #[test]
    fn test_short_connected_payload_is_not_an_error() {
        let (mut c, _rx) = connector(5);
        let msg = Message::classify(vec![0x06, 0x02]);
        assert!(!msg.connectionless());
        assert!(c.receive(&msg, msg.sub_type()).is_ok());
        assert_eq!(c.connection_step(), ConnectionStep::AwaitingChallenge);
    }

    #[test]
    fn test_client_settings_layout() {
        let bytes = client_settings_packet().unwrap();
        let mut r = BitReader::new(&bytes);
        assert_eq!(r.read_bits(6).unwrap(), 6);
        assert_eq!(r.read_u8().unwrap(), 2);
        assert_eq!(r.read_i32().unwrap(), -1);
        assert_eq!(r.read_bits(4).unwrap(), 4);
        assert_eq!(r.read_bytes(13).unwrap(), b"VModEnable 1\0".to_vec());
        assert_eq!(r.read_bits(4).unwrap(), 4);
        assert_eq!(r.read_bytes(13).unwrap(), b"vban 0 0 0 0\0".to_vec());
        assert!(r.bits_remaining() < 8);
    }
}
