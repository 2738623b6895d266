//! Nonceframe command-line tool.
//!
//! Message text is read from stdin. Envelopes are written to stdout as raw
//! bytes, or as hex with `--hex`. Logs always go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Print this context's public key, creating keys on first use
//! nonceframe --key-dir keys public-key --context alice
//!
//! # Symmetric round trip
//! echo "hello" | nonceframe encrypt --context alice > msg.bin
//! nonceframe decrypt --context alice < msg.bin
//!
//! # Public-key round trip between two contexts sharing a key directory
//! echo "hello" | nonceframe encrypt --context alice --peer bob --hex > msg.hex
//! nonceframe decrypt --context bob --peer alice --hex < msg.hex
//! ```

use std::io::{self, Read, Write};

use clap::{Args as ClapArgs, Parser, Subcommand};
use nonceframe_crypto::{
    CryptoEngine, DEFAULT_KEY_DIR, EngineConfig, FileKeyStore, KeyKind, KeyStore, Message,
    SystemRandom, VerificationEngine, sanitize_identifier,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Nonceframe authenticated message encryption
#[derive(Parser, Debug)]
#[command(name = "nonceframe")]
#[command(about = "Encrypt and decrypt framed messages with stored keys")]
#[command(version)]
struct Args {
    /// Directory holding key files
    #[arg(long, default_value = DEFAULT_KEY_DIR)]
    key_dir: String,

    /// Counter value for the first encryption in this process.
    ///
    /// The counter is not saved between runs. Encrypting again under existing
    /// keys from the same starting value reuses a nonce, so pass the number of
    /// messages already encrypted under this context.
    #[arg(long, default_value = "0")]
    initial_counter: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the context's public key as hex
    PublicKey {
        /// Context whose keys to use
        #[arg(long)]
        context: String,
    },

    /// Encrypt stdin into an envelope on stdout
    Encrypt {
        /// Context whose keys to use
        #[arg(long)]
        context: String,

        /// Application-defined message type
        #[arg(long = "type", default_value = "0")]
        message_type: i32,

        #[command(flatten)]
        peer: PeerArgs,

        /// Write the envelope as hex instead of raw bytes
        #[arg(long = "hex")]
        as_hex: bool,
    },

    /// Decrypt an envelope from stdin and print its text
    Decrypt {
        /// Context whose keys to use
        #[arg(long)]
        context: String,

        #[command(flatten)]
        peer: PeerArgs,

        /// Read the envelope as hex instead of raw bytes
        #[arg(long = "hex")]
        as_hex: bool,
    },
}

/// Peer selection for the public-key path. Neither flag means symmetric.
#[derive(ClapArgs, Debug)]
#[group(multiple = false)]
struct PeerArgs {
    /// Peer context whose public key is in the key directory
    #[arg(long)]
    peer: Option<String>,

    /// Peer public key as 64 hex characters
    #[arg(long)]
    peer_key: Option<String>,
}

impl PeerArgs {
    fn resolve(
        &self,
        store: &FileKeyStore,
    ) -> Result<Option<VerificationEngine>, Box<dyn std::error::Error>> {
        if let Some(context) = &self.peer {
            let peer = VerificationEngine::from_context(context, store)?;
            if peer.is_empty() {
                return Err(format!("no public key stored for {context}").into());
            }
            return Ok(Some(peer));
        }

        if let Some(key) = &self.peer_key {
            let bytes = hex::decode(key.trim())?;
            return Ok(Some(VerificationEngine::from_key(&bytes)?));
        }

        Ok(None)
    }
}

/// Warn when encrypting under keys from an earlier run at the default counter.
///
/// The first nonce of this run is then the first nonce of every earlier run.
fn warn_on_counter_reuse(context: &str, store: &FileKeyStore, config: &EngineConfig) {
    let secret_id = KeyKind::Secret.identifier(&sanitize_identifier(context));
    if config.initial_counter == 0 && store.exists(&secret_id) {
        tracing::warn!(
            "Encrypting under existing keys for {} from counter 0: nonces from earlier runs \
             are reused unless --initial-counter is set past them",
            context
        );
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    let config =
        EngineConfig { initial_counter: args.initial_counter, key_dir: args.key_dir.into() };
    let store = FileKeyStore::open(&config.key_dir)?;

    let mut stdout = io::stdout().lock();

    match args.command {
        Command::PublicKey { context } => {
            let engine = CryptoEngine::init_with(&context, &store, &SystemRandom::new(), &config)?;
            writeln!(stdout, "{}", hex::encode(engine.public_key()))?;
        },
        Command::Encrypt { context, message_type, peer, as_hex } => {
            warn_on_counter_reuse(&context, &store, &config);
            let engine = CryptoEngine::init_with(&context, &store, &SystemRandom::new(), &config)?;
            let peer = peer.resolve(&store)?;

            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            let message = Message::new(text.trim_end_matches(['\r', '\n']), message_type)?;

            let envelope = match peer {
                Some(peer) => engine.encrypt_with_public_key(&message, &peer)?,
                None => engine.encrypt(&message)?,
            };
            tracing::info!(
                "Encrypted {} bytes at counter {}",
                envelope.length(),
                engine.counter() - 1
            );

            let wire = envelope.to_bytes()?;
            if as_hex {
                writeln!(stdout, "{}", hex::encode(wire))?;
            } else {
                stdout.write_all(&wire)?;
            }
        },
        Command::Decrypt { context, peer, as_hex } => {
            let engine = CryptoEngine::init_with(&context, &store, &SystemRandom::new(), &config)?;
            let peer = peer.resolve(&store)?;

            let mut input = Vec::new();
            io::stdin().read_to_end(&mut input)?;
            let wire = if as_hex { hex::decode(input.trim_ascii())? } else { input };

            let message = match peer {
                Some(peer) => engine.decrypt_with_public_key(&wire, &peer)?,
                None => engine.decrypt(&wire)?,
            };
            tracing::info!(
                "Decrypted message version {} type {}",
                message.version(),
                message.message_type()
            );

            writeln!(stdout, "{}", message.text())?;
        },
    }

    stdout.flush()?;
    Ok(())
}
