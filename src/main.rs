use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Serialize;

use lambda_loader::commands::{self, EXIT_FAILURE, EXIT_OK};
use lambda_loader::core::downloader::Downloader;
use lambda_loader::core::logging;
use lambda_loader::core::maven::LAMBDA_MAVEN;
use lambda_loader::{Config, LoaderOptions, Startup};

#[derive(Parser)]
#[command(name = "lambda-loader")]
#[command(about = "Fetch, verify and load Lambda Client builds", version)]
struct Cli {
    /// Working directory holding cache/ and config/
    #[arg(long, global = true, default_value = "lambda")]
    root: PathBuf,

    /// Maven repository base URL
    #[arg(long, global = true, default_value = LAMBDA_MAVEN)]
    repository: String,

    /// HTTP request timeout in seconds
    #[arg(long, global = true, default_value_t = 30)]
    timeout_secs: u64,

    /// Only accept client builds made for this game version
    #[arg(long, global = true)]
    minecraft_version: Option<String>,

    /// Settings file (default: <root>/config/modules.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// File to self-update instead of this executable
    #[arg(long, global = true)]
    executable: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Self-update, then fetch and load the client; prints the launch plan
    Run,
    /// Resolve and cache the client build; prints its path
    Fetch,
    /// Look for a newer loader build
    CheckUpdate,
    /// Check for and apply a loader update, rolling back on failure
    Update,
    /// Put the backed-up loader build back in place
    Restore,
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}

fn report<T: Serialize>(result: Result<T, String>, code: impl FnOnce(&T) -> u8) -> u8 {
    match result {
        Ok(value) => {
            print_json(&value);
            code(&value)
        }
        Err(e) => {
            eprintln!("error: {}", e);
            EXIT_FAILURE
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| Config::default_path(&cli.root));
    let config = Config::load(&config_path);
    logging::init(config.debug);

    let options = LoaderOptions {
        root_dir: cli.root.clone(),
        repository_url: cli.repository.clone(),
        http_timeout: Duration::from_secs(cli.timeout_secs),
        minecraft_version: cli.minecraft_version.clone(),
        ..LoaderOptions::default()
    };

    let downloader = match Downloader::new(options.http_timeout) {
        Ok(downloader) => downloader,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    let mut startup = Startup::new(options, config, Arc::new(downloader));
    if let Some(path) = &cli.executable {
        startup = startup.with_executable(path);
    }

    let code = match cli.command {
        Command::Run => {
            let response = commands::run(&startup).await;
            print_json(&response);
            response.exit_code()
        }
        Command::Fetch => report(commands::fetch(&startup).await, |r| {
            if r.path.is_some() {
                EXIT_OK
            } else {
                EXIT_FAILURE
            }
        }),
        Command::CheckUpdate => report(commands::check_update(&startup).await, |_| EXIT_OK),
        Command::Update => report(commands::update(&startup).await, |r| r.exit_code()),
        Command::Restore => report(commands::restore(&startup).await, |r| {
            if r.restored {
                EXIT_OK
            } else {
                EXIT_FAILURE
            }
        }),
    };

    ExitCode::from(code)
}
