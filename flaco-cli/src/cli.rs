//! Command-line definition.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use flaco_toolkit::{DnsQueryType, Protocol, parse_port};

#[derive(Debug, Parser)]
#[command(name = "flaco", version)]
#[command(about = "Host diagnostics and batch SSH command dispatch.")]
pub struct Cli {
    /// Configuration file (defaults to <config dir>/flaco/config.toml)
    #[arg(long, global = true, env = "FLACO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve a name (or reverse-resolve an address)
    Dns {
        host: String,
        /// Name server IP; repeat for several (default from config)
        #[arg(short, long = "server")]
        servers: Vec<String>,
        /// A, CNAME, MX or PTR
        #[arg(short = 't', long = "type", default_value = "A")]
        query_type: DnsQueryType,
    },
    /// Send ICMP echo requests and print the statistics
    Ping {
        host: String,
        /// Number of echo requests (default from config)
        #[arg(short, long)]
        count: Option<u32>,
    },
    /// Check a TCP or UDP port
    Socket {
        host: String,
        #[arg(value_parser = parse_port)]
        port: u16,
        #[arg(short, long, default_value = "tcp")]
        protocol: Protocol,
    },
    /// Fetch a URL and print its HTTP status
    Url { url: String },
    /// Run every configured element profile
    Check {
        /// Only run the profile with this name
        #[arg(long)]
        element: Option<String>,
    },
    /// Run commands on every host of a device list
    #[command(alias = "d")]
    Dispatch {
        /// File with one host per line
        #[arg(short, long)]
        devices: PathBuf,
        /// Job file the transcripts are appended to
        #[arg(short, long)]
        output: PathBuf,
        /// Command to run; repeat or separate with commas
        #[arg(short, long = "command", value_delimiter = ',', required = true)]
        commands: Vec<String>,
        #[command(flatten)]
        ssh: SshArgs,
    },
    /// Copy a remote file over scp
    Fetch {
        host: String,
        source: String,
        destination: PathBuf,
        #[command(flatten)]
        ssh: SshArgs,
    },
}

#[derive(Debug, Args)]
pub struct SshArgs {
    /// SSH user (default from config)
    #[arg(short, long)]
    pub username: Option<String>,
    #[arg(long, env = "FLACO_SSH_PASSWORD", hide_env_values = true)]
    pub password: String,
    /// SSH port (default from config)
    #[arg(long)]
    pub port: Option<u16>,
}
