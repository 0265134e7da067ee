use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "idr",
    about = "Identity reconciliation: link emails and phone numbers into one customer identity",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Resolve one email/phone pair against a contact journal
    Identify(IdentifyArgs),
    /// Load the demo identity group into a contact journal
    Seed(DataArgs),
    /// List every record in a contact journal
    Show(DataArgs),
    /// Print the effective server configuration as TOML
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Address to listen on (overrides the config file)
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// Contact journal (overrides the config file)
    #[arg(long)]
    pub data: Option<PathBuf>,
    /// fsync the journal after every write
    #[arg(long)]
    pub sync: bool,
}

#[derive(Args)]
pub struct IdentifyArgs {
    #[arg(long)]
    pub data: PathBuf,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
}

#[derive(Args)]
pub struct DataArgs {
    #[arg(long)]
    pub data: PathBuf,
}

#[derive(Args)]
pub struct ConfigArgs {
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
