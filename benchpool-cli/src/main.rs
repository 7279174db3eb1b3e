mod commands;

use anyhow::Result;
use benchpool_transport::{run_server_app, run_standalone_app, run_worker_app, AppArgs};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "benchpool")]
#[command(about = "Run untrusted Go snippets on a pool of benchmark workers")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone)]
pub struct CommonArgs {
    /// Config file (default: ./benchpool.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Redis URL for the shared store and bus
    #[arg(long)]
    redis: Option<String>,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl CommonArgs {
    fn into_app_args(self, bind: Option<String>) -> AppArgs {
        AppArgs {
            config_path: self.config,
            redis_url: self.redis,
            bind_addr: bind,
            verbose: self.verbose,
            log_file: self.log_file,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Accept submissions over HTTP and merge finished results
    Server {
        #[command(flatten)]
        common: CommonArgs,

        /// Address to listen on
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Execute jobs published by servers
    Worker {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Server and one worker in a single process, nothing persisted
    Standalone {
        #[command(flatten)]
        common: CommonArgs,

        /// Address to listen on
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Print the effective configuration, or write it to a file
    Config {
        /// Config file to read (default: ./benchpool.toml when present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the configuration here instead of printing it
        #[arg(short, long)]
        write: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Server { common, bind } => run_server_app(common.into_app_args(bind)).await,
        Commands::Worker { common } => run_worker_app(common.into_app_args(None)).await,
        Commands::Standalone { common, bind } => {
            run_standalone_app(common.into_app_args(bind)).await
        }
        Commands::Config { config, write } => commands::execute_config(config, write),
    }
}
