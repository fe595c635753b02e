//! Connect to a game server and hold the session until Enter or Ctrl-C.
//!
//! Settings come from an optional TOML file, then `SOURCE_CONNECTOR_*`
//! environment variables, then command line flags.
//!
//! ```text
//! source-connect --config connect.toml --address 203.0.113.7:27015
//! ```

use clap::Parser;
use source_connector::config::ConnectConfig;
use source_connector::error::{ProtocolError, Result};
use source_connector::protocol::{Connector, Message};
use source_connector::transport::Client;
use source_connector::utils::logging::init_logging;
use std::path::PathBuf;
use std::str::FromStr;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, Level};

const DISCONNECT_REASON: &str = "Disconnect by User.";

#[derive(Parser, Debug)]
#[command(name = "source-connect", version, about = "Run the connection handshake against a game server")]
struct CliArgs {
    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Server address, host:port.
    #[arg(long)]
    address: Option<String>,

    /// Player name.
    #[arg(long)]
    name: Option<String>,

    /// Server password.
    #[arg(long)]
    password: Option<String>,

    /// Game version string the server expects.
    #[arg(long)]
    game_version: Option<String>,

    /// Client challenge seed (random when unset).
    #[arg(long, allow_hyphen_values = true)]
    challenge: Option<i32>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    log_level: Option<String>,

    /// Print an example configuration and exit.
    #[arg(long)]
    print_config: bool,
}

impl CliArgs {
    fn apply_overrides(&self, config: &mut ConnectConfig) -> Result<()> {
        if let Some(ref addr) = self.address {
            config.client.address = addr.clone();
        }
        if let Some(ref name) = self.name {
            config.player.name = name.clone();
        }
        if let Some(ref password) = self.password {
            config.player.password = password.clone();
        }
        if let Some(ref version) = self.game_version {
            config.player.game_version = version.clone();
        }
        if let Some(challenge) = self.challenge {
            config.player.client_challenge = Some(challenge);
        }
        if let Some(ref level) = self.log_level {
            config.logging.log_level = Level::from_str(level)
                .map_err(|_| ProtocolError::ConfigError(format!("Invalid log level: {level}")))?;
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    if args.print_config {
        println!("{}", ConnectConfig::example_config());
        return Ok(());
    }

    let mut config = match args.config {
        Some(ref path) => {
            let mut config = ConnectConfig::from_file(path)?;
            config.apply_env();
            config
        }
        None => ConnectConfig::from_env()?,
    };
    args.apply_overrides(&mut config)?;

    init_logging(&config.logging)?;
    config.validate_strict()?;

    let identity = config.identity.to_provider()?;
    let challenge = config.player.challenge_or_random();

    let mut client = Client::connect(&config.client.address, &config.client).await?;

    let mut connector = Connector::new(
        config.player.name.as_str(),
        config.player.password.as_str(),
        config.player.game_version.as_str(),
        challenge,
        identity,
    );
    connector.register(client.handle());
    client.send_message(connector.initial_message(), false)?;
    client.add_listener(connector);

    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
    tokio::spawn(async move {
        info!("Press Enter to disconnect");
        let mut line = String::new();
        let mut stdin = BufReader::new(tokio::io::stdin());
        tokio::select! {
            _ = stdin.read_line(&mut line) => {}
            Ok(()) = tokio::signal::ctrl_c() => {
                info!("Received CTRL+C signal, shutting down");
            }
        }
        let _ = shutdown_tx.send(()).await;
    });

    let outcome = client.run(shutdown_rx).await;
    client.disconnect(Message::disconnect(DISCONNECT_REASON)?).await?;
    outcome
}
