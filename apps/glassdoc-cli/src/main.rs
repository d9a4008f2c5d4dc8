use clap::{Parser, Subcommand};
use glassdoc_sdk::ApiError;
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;
mod config;
mod logging;

use commands::{
    ApplicationsArgs, CompaniesArgs, DownloadArgs, GenerateArgs, SessionArgs, TemplatesArgs,
    UploadArgs,
};
use config::{CliConfig, CliOverrides};

/// Client for the glass certification document backend
#[derive(Parser)]
#[command(name = "glassdoc")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Backend URL (overrides config and environment)
    #[arg(long, global = true)]
    server_url: Option<String>,

    /// Backend port, used when the URL has none
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resolved backend URL
    Endpoint,
    /// Check backend health
    Health,
    Applications(ApplicationsArgs),
    Companies(CompaniesArgs),
    Templates(TemplatesArgs),
    /// Upload a file
    Upload(UploadArgs),
    Session(SessionArgs),
    /// Generate a document for a session
    Generate(GenerateArgs),
    /// Download a generated document
    Download(DownloadArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let overrides = CliOverrides {
        server_url: cli.server_url,
        backend_port: cli.port,
    };
    let config = CliConfig::load(cli.config.as_deref(), &overrides)?;

    match cli.command {
        Commands::Endpoint => commands::endpoint(&config),
        Commands::Health => commands::health(&config.gateway()?).await,
        Commands::Applications(args) => args.run(&config.gateway()?).await,
        Commands::Companies(args) => args.run(&config.gateway()?).await,
        Commands::Templates(args) => args.run(&config.gateway()?).await,
        Commands::Upload(args) => args.run(&config.gateway()?).await,
        Commands::Session(args) => args.run(&config.gateway()?).await,
        Commands::Generate(args) => args.run(&config.gateway()?).await,
        Commands::Download(args) => args.run(&config.gateway()?).await,
    }
}

fn report(err: &anyhow::Error) {
    match err.downcast_ref::<ApiError>() {
        Some(api) => match api.status() {
            Some(status) => eprintln!("error [{}] (HTTP {status}): {}", api.code(), api.message()),
            None => eprintln!("error [{}]: {}", api.code(), api.message()),
        },
        None => eprintln!("error: {err:#}"),
    }
}
