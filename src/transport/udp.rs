//! UDP transport client.
//!
//! The [`Client`] owns the socket. It delivers every datagram from the server
//! to its registered listeners and sends whatever is queued through a
//! [`ClientHandle`]. Handles are cheap to clone and do not keep the client
//! alive: once the client is dropped, sending through a handle fails with
//! `ProtocolError::ChannelClosed`.

use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::{lookup_host, UdpSocket};
use tokio::sync::mpsc;
use tokio_util::udp::UdpFramed;
use tracing::{debug, info, instrument, trace, warn};

use crate::config::ClientConfig;
use crate::core::codec::DatagramCodec;
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::listener::Listener;
use crate::protocol::message::Message;
use crate::utils::timeout::with_timeout;

/// A queued outbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub message: Message,
    pub reliable: bool,
}

/// Non-owning sending side of a [`Client`]
#[derive(Debug, Clone)]
pub struct ClientHandle {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ClientHandle {
    /// Handle backed by a bare channel, for driving a listener without a socket
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue `message` for sending. Fire-and-forget.
    pub fn send_message(&self, message: Message, reliable: bool) -> Result<()> {
        self.tx
            .send(Outbound { message, reliable })
            .map_err(|_| ProtocolError::ChannelClosed)
    }
}

/// UDP client connected to a single game server
pub struct Client {
    framed: UdpFramed<DatagramCodec>,
    server: SocketAddr,
    listeners: Vec<Box<dyn Listener>>,
    outbound_tx: mpsc::UnboundedSender<Outbound>,
    outbound_rx: mpsc::UnboundedReceiver<Outbound>,
}

impl Client {
    /// Resolve `address` and bind a local socket for talking to it.
    ///
    /// # Errors
    /// `Timeout` when resolution takes longer than `config.resolve_timeout`,
    /// `TransportError` when nothing resolves, `Io` when binding fails.
    #[instrument(skip(config), fields(bind = %config.bind_address))]
    pub async fn connect(address: &str, config: &ClientConfig) -> Result<Self> {
        let server = with_timeout(config.resolve_timeout, lookup_host(address))
            .await??
            .next()
            .ok_or_else(|| {
                ProtocolError::TransportError(format!("{}: {address}", constants::ERR_NO_ADDRESS))
            })?;

        let socket = UdpSocket::bind(config.bind_address.as_str()).await?;
        info!(local = %socket.local_addr()?, %server, "Client socket ready");

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        Ok(Self {
            framed: UdpFramed::new(socket, DatagramCodec),
            server,
            listeners: Vec::new(),
            outbound_tx,
            outbound_rx,
        })
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.framed.get_ref().local_addr()?)
    }

    pub fn add_listener<L: Listener + 'static>(&mut self, listener: L) {
        self.listeners.push(Box::new(listener));
    }

    pub fn handle(&self) -> ClientHandle {
        ClientHandle {
            tx: self.outbound_tx.clone(),
        }
    }

    /// Queue a message; it goes out once [`Client::run`] is polled
    pub fn send_message(&self, message: Message, reliable: bool) -> Result<()> {
        self.handle().send_message(message, reliable)
    }

    /// Pump inbound and outbound traffic until `shutdown` fires.
    ///
    /// Datagrams from addresses other than the server are dropped. A listener
    /// error or a fatal socket error ends the loop with that error.
    #[instrument(skip(self, shutdown), fields(server = %self.server))]
    pub async fn run(&mut self, mut shutdown: mpsc::Receiver<()>) -> Result<()> {
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Shutting down client");
                    return Ok(());
                }

                Some(outbound) = self.outbound_rx.recv() => {
                    self.transmit(outbound).await?;
                }

                inbound = self.framed.next() => match inbound {
                    Some(Ok((msg, from))) if from == self.server => self.dispatch(&msg)?,
                    Some(Ok((_, from))) => {
                        debug!(%from, "Dropping datagram from unknown peer");
                    }
                    Some(Err(e)) if !e.is_fatal() => {
                        warn!(error = %e, "Dropping unreadable datagram");
                    }
                    Some(Err(e)) => return Err(e),
                    None => return Err(ProtocolError::TransportError("socket closed".into())),
                },
            }
        }
    }

    /// Send `message` immediately and drop the client
    #[instrument(skip(self, message))]
    pub async fn disconnect(mut self, message: Message) -> Result<()> {
        self.framed.send((message, self.server)).await?;
        info!("Disconnected");
        Ok(())
    }

    fn dispatch(&mut self, msg: &Message) -> Result<()> {
        trace!(len = msg.data().len(), connectionless = msg.connectionless(), "Inbound");
        let sub_type = msg.sub_type();
        for listener in &mut self.listeners {
            listener.receive(msg, sub_type)?;
        }
        Ok(())
    }

    async fn transmit(&mut self, outbound: Outbound) -> Result<()> {
        if outbound.reliable {
            // No net channel yet; reliable sends go out as plain datagrams.
            trace!("Sending reliable message unreliably");
        }
        trace!(len = outbound.message.data().len(), "Outbound");
        self.framed.send((outbound.message, self.server)).await
    }
}
