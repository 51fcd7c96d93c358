mod commands;

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use kt_cli::{Config, HttpGateway};
use tracing_subscriber::EnvFilter;

use commands::Context;

#[derive(Parser)]
#[command(name = "kt-cli")]
#[command(version)]
#[command(about = "ktCloud storage client with end-to-end encryption", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Access token (saved to the config unless --no-save)
    #[arg(long, global = true, env = "KT_CLI_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Password for encryption and decryption
    #[arg(long, global = true, env = "KT_CLI_PASSWD", hide_env_values = true)]
    passwd: Option<String>,

    /// Never ask for input, use default answers
    #[arg(long, global = true)]
    no_interactive: bool,

    /// Do not save the config file on exit (including the token)
    #[arg(long, global = true)]
    no_save: bool,

    /// Verbose logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check if the API is alive
    Ping,

    /// Validate an access token and store it
    Login,

    /// Call an API method and print its result
    Call {
        /// Method name, e.g. `files.get`
        method: String,

        /// Parameters as key=value pairs
        params: Vec<String>,

        /// Pretty-print the JSON result
        #[arg(long)]
        pretty: bool,
    },

    /// List files on a disk
    Files {
        /// Disk id (default disk when omitted)
        #[arg(default_value = "")]
        disk: String,
    },

    /// Upload a file ("-" reads stdin)
    Upload {
        path: PathBuf,

        /// Remote file name (required for stdin)
        #[arg(short, long)]
        name: Option<String>,

        /// Target disk (default disk when omitted)
        #[arg(long, default_value = "")]
        disk: String,

        /// Target folder
        #[arg(long, default_value = "")]
        folder: String,

        /// Upload content type (guessed from the name when omitted)
        #[arg(long)]
        mime: Option<String>,

        /// Upload without encryption
        #[arg(long)]
        plain: bool,
    },

    /// Download a file by id
    Download {
        file_id: String,

        /// Output file or directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Save a disk's key pair to files
    ExportKeys {
        /// Disk id (default disk when omitted)
        #[arg(default_value = "")]
        disk: String,

        /// Public key output path
        #[arg(long, default_value = "public_key.pub")]
        public: PathBuf,

        /// Private key output path
        #[arg(long, default_value = "private_key.asc")]
        private: PathBuf,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let gateway = HttpGateway::new(config.clone())?;

    let mut ctx = Context {
        token: cli
            .token
            .filter(|t| !t.trim().is_empty())
            .or_else(|| Some(config.token.clone()).filter(|t| !t.is_empty())),
        password: cli.passwd.filter(|p| !p.is_empty()),
        interactive: !cli.no_interactive && std::io::stdin().is_terminal(),
        config,
        gateway,
    };

    let result = match cli.command {
        Commands::Ping => commands::ping(&ctx),
        Commands::Login => commands::login(&mut ctx),
        Commands::Call {
            method,
            params,
            pretty,
        } => commands::call(&ctx, &method, &params.join(" "), pretty),
        Commands::Files { disk } => commands::files(&ctx, &disk),
        Commands::Upload {
            path,
            name,
            disk,
            folder,
            mime,
            plain,
        } => commands::upload(
            &ctx,
            commands::UploadArgs {
                path: &path,
                name: name.as_deref(),
                disk: &disk,
                folder: &folder,
                mime: mime.as_deref(),
                plain,
            },
        ),
        Commands::Download { file_id, output } => commands::download(&ctx, &file_id, &output),
        Commands::ExportKeys {
            disk,
            public,
            private,
        } => commands::export_keys(&ctx, &disk, &public, &private),
    };

    if !cli.no_save {
        if let Some(token) = &ctx.token {
            ctx.config.token = token.clone();
        }
        ctx.config
            .save(&config_path)
            .with_context(|| format!("saving {}", config_path.display()))?;
    }

    Ok(result?)
}

fn init_logging(debug: bool) {
    let default = if debug { "kt_cli=debug" } else { "kt_cli=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
