//! Encrypted TCP Chat Relay - Entry Point
//!
//! Dispatches to the relay server, the terminal client or key generation.

use std::process::ExitCode;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use relay_chat::cli::{Cli, Command};
use relay_chat::config::load_cipher;
use relay_chat::{client, ChatServer, SharedKey};

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=relay_chat=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("relay_chat=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => {
            let config = args.into_config()?;
            let cipher = config.cipher()?;

            let server = ChatServer::bind(config, cipher).await?;
            info!("TCP Chat Server started on {}", server.local_addr()?);

            server.run().await;
            Ok(ExitCode::SUCCESS)
        }
        Command::Connect(args) => {
            let cipher = load_cipher(!args.plaintext, args.key_file.as_deref())?;
            let exit = client::run(args.server, cipher, args.max_frame_len).await?;
            Ok(exit.code())
        }
        Command::Keygen => {
            println!("{}", SharedKey::generate().to_base64());
            Ok(ExitCode::SUCCESS)
        }
    }
}
