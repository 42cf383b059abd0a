//! Tessera CLI - Pairing codes and relay session tools
//!
//! Encodes and decodes the QR pairing URIs exchanged between devices and
//! drives the relay barriers by hand, which is handy when debugging a
//! ceremony that stalls during peer discovery or completion.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::RngCore;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tessera_ceremony::CoordinatorConfig;
use tessera_core::{
    CancelSignal, CeremonyKind, Chain, PartyId, SessionId, CHAIN_CODE_SIZE, ENCRYPTION_KEY_SIZE,
};
use tessera_qr::{render, PairingCodec, QrPairingPayload};
use tessera_relay::{
    CompletionBarrier, HttpSessionClient, MemberOrdering, PeerBarrier, PollSettings,
    SessionClient,
};

#[derive(Parser)]
#[command(name = "tessera")]
#[command(about = "Threshold key ceremony pairing and relay tools", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to $TESSERA_CONFIG, then built-in defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Relay server URL, overriding the configuration
    #[arg(long, global = true)]
    relay_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// QR pairing codes
    #[command(subcommand)]
    Pair(PairCommands),

    /// Relay session inspection and barriers
    #[command(subcommand)]
    Session(SessionCommands),
}

#[derive(Subcommand)]
enum PairCommands {
    /// Build a pairing URI for a new session
    Encode {
        /// Session id (random UUID when omitted)
        #[arg(long)]
        session_id: Option<String>,

        /// Hex encryption key (random when omitted)
        #[arg(long)]
        encryption_key: Option<String>,

        /// Hex chain code (random when omitted)
        #[arg(long)]
        chain_code: Option<String>,

        /// Party id of the initiating device
        #[arg(long)]
        initiator: String,

        /// Vault name shown to joining devices
        #[arg(long)]
        vault_name: String,

        /// Chains to create keys for, comma separated
        #[arg(long, value_delimiter = ',')]
        chains: Vec<Chain>,

        /// Key import instead of fresh keygen
        #[arg(long)]
        import: bool,

        /// Parties meet on a local relay
        #[arg(long)]
        no_relay: bool,

        /// Print the QR code to the terminal
        #[arg(long)]
        show: bool,

        /// Also write the QR code as PNG
        #[arg(long)]
        png: Option<PathBuf>,
    },

    /// Decode a pairing URI into JSON
    Decode {
        /// URI scanned from the QR code
        uri: String,
    },
}

#[derive(Subcommand)]
enum SessionCommands {
    /// List the distinct members of a session
    Members {
        session_id: String,
    },

    /// Wait until enough parties joined and print the ordered member list
    Wait {
        session_id: String,

        /// Local party id
        #[arg(long)]
        party: String,

        /// Parties required, local party included
        #[arg(long)]
        required: usize,

        /// Use the joiner (sorted) member order
        #[arg(long)]
        joiner: bool,

        /// Give up after this many seconds (default from configuration)
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Signal completion and wait for the given peers to confirm
    Complete {
        session_id: String,

        /// Local party id
        #[arg(long)]
        party: String,

        /// Peers expected to confirm, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        peers: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so command output stays machine readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tessera=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.clone(), cli.relay_url.clone())?;

    match cli.command {
        Commands::Pair(cmd) => handle_pair_command(cmd, &config),
        Commands::Session(cmd) => handle_session_command(cmd, &config).await,
    }
}

fn load_config(path: Option<PathBuf>, relay_url: Option<String>) -> Result<CoordinatorConfig> {
    let path = path.or_else(|| std::env::var_os("TESSERA_CONFIG").map(PathBuf::from));
    let mut config = match path {
        Some(path) => CoordinatorConfig::load(&path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => CoordinatorConfig::default(),
    };
    if let Some(url) = relay_url {
        config.relay_url = url;
    }
    config.validate()?;
    Ok(config)
}

fn handle_pair_command(cmd: PairCommands, config: &CoordinatorConfig) -> Result<()> {
    let codec = PairingCodec::new(config.pairing_scheme.clone());

    match cmd {
        PairCommands::Encode {
            session_id,
            encryption_key,
            chain_code,
            initiator,
            vault_name,
            chains,
            import,
            no_relay,
            show,
            png,
        } => {
            let payload = QrPairingPayload {
                session_id: SessionId::new(
                    session_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                ),
                encryption_key: encryption_key.unwrap_or_else(|| random_hex(ENCRYPTION_KEY_SIZE)),
                chain_code: chain_code.unwrap_or_else(|| random_hex(CHAIN_CODE_SIZE)),
                initiator_party_id: PartyId::new(initiator),
                vault_name,
                chains,
                kind: if import {
                    CeremonyKind::KeyImport
                } else {
                    CeremonyKind::FreshKeygen
                },
                use_relay: !no_relay,
            };

            let uri = codec.encode(&payload)?;
            println!("{}", uri);

            if show {
                println!("\n{}", render::to_unicode(&uri)?);
            }
            if let Some(path) = png {
                let bytes = render::to_png(&uri, 512)?;
                std::fs::write(&path, bytes)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                eprintln!("✓ QR code written to {}", path.display());
            }
        }

        PairCommands::Decode { uri } => {
            let payload = codec.decode(&uri)?;
            let json = serde_json::json!({
                "session_id": payload.session_id.as_str(),
                "encryption_key": payload.encryption_key,
                "chain_code": payload.chain_code,
                "initiator_party_id": payload.initiator_party_id.as_str(),
                "vault_name": payload.vault_name,
                "chains": payload.chains.iter().map(|c| c.name()).collect::<Vec<_>>(),
                "kind": payload.kind,
                "use_relay": payload.use_relay,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }

    Ok(())
}

async fn handle_session_command(cmd: SessionCommands, config: &CoordinatorConfig) -> Result<()> {
    let client = HttpSessionClient::new(config.relay_url.clone())?;
    let cancel = cancel_on_ctrl_c();

    match cmd {
        SessionCommands::Members { session_id } => {
            let listing = client.list_members(&SessionId::new(session_id)).await?;
            let mut seen = std::collections::HashSet::new();
            for member in listing.into_iter().filter(|m| seen.insert(m.clone())) {
                println!("{}", member);
            }
        }

        SessionCommands::Wait {
            session_id,
            party,
            required,
            joiner,
            timeout,
        } => {
            let session_id = SessionId::new(session_id);
            let party = PartyId::new(party);
            let timeout = timeout
                .map(std::time::Duration::from_secs)
                .unwrap_or_else(|| {
                    config.join_timeout(u16::try_from(required).unwrap_or(u16::MAX))
                });
            let ordering = if joiner {
                MemberOrdering::Lexicographic
            } else {
                MemberOrdering::LocalFirst
            };

            client.join_session(&session_id, &party).await?;
            let barrier =
                PeerBarrier::new(&client, PollSettings::new(config.poll_interval(), timeout));
            let members = barrier
                .wait(&session_id, &party, required, ordering, &cancel, |event| {
                    eprintln!(
                        "  + {} ({}/{})",
                        event.party_id, event.total_joined, event.required_count
                    );
                })
                .await?;

            for member in members {
                println!("{}", member);
            }
        }

        SessionCommands::Complete {
            session_id,
            party,
            peers,
        } => {
            let session_id = SessionId::new(session_id);
            let peers: Vec<PartyId> = peers.into_iter().map(PartyId::new).collect();
            let barrier = CompletionBarrier::new(&client, config.poll_interval());

            barrier.signal(&session_id, &PartyId::new(party)).await?;
            let report = barrier
                .wait_all(&session_id, &peers, config.completion_timeout(), &cancel)
                .await?;
            println!("✓ {} peers confirmed completion", report.confirmed.len());
        }
    }

    Ok(())
}

/// Cancellation signal fired by Ctrl-C
fn cancel_on_ctrl_c() -> CancelSignal {
    let cancel = CancelSignal::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            trigger.cancel();
        }
    });
    cancel
}

fn random_hex(size: usize) -> String {
    let mut bytes = vec![0u8; size];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
