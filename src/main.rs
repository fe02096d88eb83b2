//! anon-irc - interactive IRC client with optional Tor (SOCKS5) routing.

use std::path::PathBuf;

use anon_irc::config::Config;
use anon_irc::console::Console;
use anon_irc::identity::IdentityStore;
use anon_irc::session::{Session, SessionOptions};
use anyhow::Context;
use clap::Parser;
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "anon-irc.toml";

#[derive(Debug, Parser)]
#[command(name = "anon-irc", version, about = "Connect to IRC, optionally through Tor")]
struct Cli {
    /// Configuration file (defaults to ./anon-irc.toml when present).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Nickname to register with.
    #[arg(short, long)]
    nickname: Option<String>,

    /// Channel to join after connecting.
    #[arg(long)]
    channel: Option<String>,

    /// Route the connection through the SOCKS5 proxy (Tor).
    #[arg(long)]
    tor: bool,

    /// Server directory number or host[:port].
    #[arg(short, long)]
    server: Option<String>,
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG);
            if !default.exists() {
                return Ok(Config::default());
            }
            default
        }
    };
    Config::load(&path).with_context(|| format!("loading {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let mut config = load_config(&cli).map_err(|e| {
        error!(error = %e, "failed to load config");
        e
    })?;
    if cli.tor {
        config.client.use_proxy = true;
    }

    let identities = match &config.client.identities_path {
        Some(path) => IdentityStore::open(path)
            .with_context(|| format!("opening identities {}", path.display()))?,
        None => IdentityStore::new(),
    };

    info!(
        use_proxy = config.client.use_proxy,
        proxy = %format!("{}:{}", config.proxy.host, config.proxy.port),
        "starting anon-irc"
    );
    if config.client.use_proxy {
        println!(
            "Routing through SOCKS5 proxy at {}:{}",
            config.proxy.host, config.proxy.port
        );
    }

    let opts = SessionOptions {
        nickname: cli.nickname,
        server: cli.server,
        channel: cli.channel,
    };
    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(async {
        let stdin = BufReader::new(tokio::io::stdin());
        Session::new(config, identities, stdin, Console::stdout())
            .run(opts)
            .await
    });
    // The stdin reader thread may still be parked in a blocking read.
    runtime.shutdown_background();
    Ok(result?)
}
