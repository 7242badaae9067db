//! photoport CLI - import a cloud photo library through a photoport backend.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use photoport_lib::{ClientConfig, IdentityConfig, ImportLimit};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod auth;
mod commands;
mod display;

#[derive(Parser)]
#[command(name = "photoport")]
#[command(about = "Import a cloud photo library through a photoport backend", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress progress output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Base URL of the import backend
    #[arg(long, env = "PHOTOPORT_API_URL", global = true)]
    api_url: Option<String>,

    /// API key of the identity service
    #[arg(long, env = "PHOTOPORT_IDENTITY_API_KEY", global = true, hide_env_values = true)]
    api_key: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in, start an import and follow it to the end
    Import {
        /// Email of the photoport account (prompted if omitted)
        #[arg(long)]
        account: Option<String>,

        /// Sign in through a third-party identity provider (e.g. google.com)
        #[arg(long, value_name = "PROVIDER_ID")]
        federated: Option<String>,

        /// Start the import without signing in
        #[arg(long, conflicts_with_all = ["account", "federated"])]
        anonymous: bool,

        /// Email of the cloud photo account (prompted if omitted)
        #[arg(short, long)]
        email: Option<String>,

        /// Destination folder on the backend host (prompted if omitted)
        #[arg(short, long)]
        destination: Option<String>,

        /// Number of files to import: 50, 500, 5000 or all (prompted if omitted)
        #[arg(short, long)]
        limit: Option<ImportLimit>,

        /// Directory to save downloaded files in
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Show the status of an import session
    Status {
        /// Session ID returned when the import started
        session_id: String,

        /// Follow/watch mode (refresh every N seconds)
        #[arg(short, long)]
        follow: Option<u64>,
    },

    /// Stop a running import session
    Stop {
        /// Session ID to stop
        session_id: String,
    },

    /// Resume a stopped import session
    Resume {
        /// Session ID to resume
        session_id: String,
    },

    /// Download one file produced by an import session
    Download {
        /// Session ID the file belongs to
        session_id: String,

        /// Download token of the file
        token: String,

        /// Path of the file as reported by the status command
        #[arg(short, long)]
        path: Option<String>,

        /// Directory to save the file in
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },
}

/// Connection settings shared by all commands.
pub(crate) struct Settings {
    pub(crate) client: ClientConfig,
    pub(crate) identity: IdentityConfig,
    pub(crate) quiet: bool,
}

impl Settings {
    fn from_cli(cli: &Cli) -> Self {
        let mut client = ClientConfig::default();
        if let Some(url) = &cli.api_url {
            client.base_url.clone_from(url);
        }
        let mut identity = IdentityConfig::default();
        if cli.api_key.is_some() {
            identity.api_key.clone_from(&cli.api_key);
        }
        Self {
            client,
            identity,
            quiet: cli.quiet,
        }
    }
}

/// Installs the stderr log subscriber. `RUST_LOG` overrides the verbosity flags.
fn init_tracing(verbose: u8, quiet: bool) {
    let default = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);
    let settings = Settings::from_cli(&cli);

    // Show help if no command provided
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Import {
            account,
            federated,
            anonymous,
            email,
            destination,
            limit,
            output_dir,
        } => {
            let sign_in = match (anonymous, federated) {
                (true, _) => auth::SignIn::Anonymous,
                (false, Some(provider_id)) => auth::SignIn::Federated(provider_id),
                (false, None) => auth::SignIn::Password(account),
            };
            commands::import::import(
                &settings,
                commands::import::ImportArgs {
                    sign_in,
                    email,
                    destination,
                    limit,
                    output_dir,
                },
            )
            .await
        }
        Commands::Status { session_id, follow } => {
            commands::session::status(&settings, &session_id, follow).await
        }
        Commands::Stop { session_id } => commands::session::stop(&settings, &session_id).await,
        Commands::Resume { session_id } => {
            commands::session::resume(&settings, &session_id).await
        }
        Commands::Download {
            session_id,
            token,
            path,
            output_dir,
        } => {
            commands::session::download(&settings, &session_id, &token, path.as_deref(), &output_dir)
                .await
        }
    }
}
