use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod client;
pub mod config;
pub mod io;
pub mod keygen;
pub mod logging;
pub mod server;
pub mod version;

use blindset::crypto::GroupId;
use config::BlindsetConfig;

#[derive(Parser)]
#[command(name = "blindset")]
#[command(author = "Blindset Project")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Private set intersection with commutative encryption", long_about = None)]
pub struct Cli {
    /// Path to config file (default: ~/.config/blindset/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a commented default config file
    InitConfig {
        /// Replace an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Generate a masking key file
    Keygen {
        /// Group: ristretto255, p256, p384 or p521 (default: from config)
        #[arg(long)]
        group: Option<GroupId>,

        /// Derive the key from this file's contents instead of randomly
        #[arg(long)]
        seed_file: Option<PathBuf>,

        /// Output path for the key file
        #[arg(long)]
        out: PathBuf,
    },

    /// Server step 1: mask the server set and publish it
    ServerSetup {
        /// Server key file
        #[arg(long)]
        key: PathBuf,

        /// Server set, one element per line
        #[arg(long)]
        input: PathBuf,

        /// Output path for the setup message
        #[arg(long)]
        out: PathBuf,
    },

    /// Client step 2: mask the client set
    ClientRequest {
        /// Client key file
        #[arg(long)]
        key: PathBuf,

        /// Client set, one element per line
        #[arg(long)]
        input: PathBuf,

        /// Output path for the request message
        #[arg(long)]
        out: PathBuf,
    },

    /// Server step 3: re-mask a client request
    ServerRespond {
        /// Server key file
        #[arg(long)]
        key: PathBuf,

        /// Request message from the client
        #[arg(long)]
        request: PathBuf,

        /// Output path for the response message
        #[arg(long)]
        out: PathBuf,
    },

    /// Client step 4: compute the intersection
    ClientFinish {
        /// Client key file
        #[arg(long)]
        key: PathBuf,

        /// Client set, the same file used for client-request
        #[arg(long)]
        input: PathBuf,

        /// Setup message from the server
        #[arg(long)]
        setup: PathBuf,

        /// Response message from the server
        #[arg(long)]
        response: PathBuf,

        /// Print a JSON report instead of one element per line
        #[arg(long)]
        json: bool,
    },

    /// Display version information
    Version,
}

pub fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::InitConfig { force } => {
            let path = cli.config.unwrap_or_else(config::default_config_path);
            init_config(&path, force)
        }
        Commands::Version => {
            version::execute();
            Ok(())
        }
        command => {
            let config = BlindsetConfig::load_or_default(cli.config.as_deref())?;
            logging::init(&config.logging.level)?;
            run(command, &config)
        }
    }
}

fn run(command: Commands, config: &BlindsetConfig) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Keygen {
            group,
            seed_file,
            out,
        } => {
            let group = match group {
                Some(group) => group,
                None => config.group_id()?,
            };
            keygen::execute(group, &config.tag(group), seed_file, out)
        }
        Commands::ServerSetup { key, input, out } => server::setup(config, key, input, out),
        Commands::ClientRequest { key, input, out } => client::request(config, key, input, out),
        Commands::ServerRespond { key, request, out } => {
            server::respond(config, key, request, out)
        }
        Commands::ClientFinish {
            key,
            input,
            setup,
            response,
            json,
        } => client::finish(config, key, input, setup, response, json),
        Commands::InitConfig { .. } | Commands::Version => Ok(()),
    }
}

fn init_config(path: &std::path::Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() && !force {
        return Err(format!(
            "Config file '{}' already exists (use --force to replace it)",
            path.display()
        )
        .into());
    }
    BlindsetConfig::create_default(path)?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}
