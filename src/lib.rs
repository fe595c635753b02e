//! # Source Connector
//!
//! Client-side connection handshake for legacy Source engine game servers.
//!
//! The handshake runs over connectionless UDP packets:
//!
//! ```text
//! client                              server
//!   | 'q' client challenge             |
//!   |--------------------------------->|
//!   |      'A' server challenge (echo) |
//!   |<---------------------------------|
//!   | 'k' challenges, credentials,     |
//!   |     identity ticket              |
//!   |--------------------------------->|
//!   |                 'B' accepted     |
//!   |<---------------------------------|
//!   | client settings (sign-on state)  |
//!   |--------------------------------->|
//! ```
//!
//! A `'9'` reply at any point refuses the connection with a reason.
//!
//! ## Modules
//! - [`protocol::connector`]: the handshake state machine
//! - [`protocol::message`]: message tagging and packet factories
//! - [`core::bitbuf`]: bit-level reader and writer
//! - [`transport::udp`]: tokio UDP client dispatching to listeners
//! - [`identity`]: identity ticket providers
//! - [`config`]: TOML and environment configuration
//!
//! ## Example
//! ```no_run
//! use source_connector::config::ConnectConfig;
//! use source_connector::identity::StaticIdentity;
//! use source_connector::protocol::connector::Connector;
//! use source_connector::transport::udp::Client;
//!
//! # async fn run() -> source_connector::error::Result<()> {
//! let config = ConnectConfig::default();
//! let mut client = Client::connect("127.0.0.1:27015", &config.client).await?;
//!
//! let mut connector = Connector::new(
//!     "player",
//!     "",
//!     "4630212",
//!     167_679_079,
//!     StaticIdentity::new(76_561_198_000_000_001, vec![0xAB; 16]),
//! );
//! connector.register(client.handle());
//! client.send_message(connector.initial_message(), false)?;
//! client.add_listener(connector);
//!
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::mpsc::channel(1);
//! client.run(shutdown_rx).await
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod identity;
pub mod protocol;
pub mod transport;
pub mod utils;
