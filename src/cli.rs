//! CLI argument definitions using clap derive macros.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

use fileshare_core::DEFAULT_CONCURRENCY;
use fileshare_core::config::{DEFAULT_LEDGER_FILE, DEFAULT_PORT, DEFAULT_SERVER_URL};

/// Share a directory tree over HTTP and mirror it from another machine.
#[derive(Parser, Debug)]
#[command(name = "fileshare")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve a directory read-only over HTTP
    Server(ServerArgs),
    /// List or download files from a running server
    Client(ClientArgs),
}

#[derive(ClapArgs, Debug)]
pub struct ServerArgs {
    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Directory to serve
    #[arg(short = 'd', long, default_value = ".")]
    pub path: PathBuf,

    /// Address to bind
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,
}

#[derive(ClapArgs, Debug)]
pub struct ClientArgs {
    /// Server base URL
    #[arg(short, long, default_value = DEFAULT_SERVER_URL)]
    pub server: String,

    /// Directory downloaded files are saved under
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Concurrent downloads for downloaddir (1-100)
    #[arg(short = 'c', long, default_value_t = DEFAULT_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: u8,

    /// File recording completed downloads
    #[arg(short = 'r', long, default_value = DEFAULT_LEDGER_FILE)]
    pub resume: PathBuf,

    #[command(subcommand)]
    pub action: ClientAction,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum ClientAction {
    /// Download a single file
    Download {
        /// File path relative to the server root
        path: String,
    },
    /// Download every file under a directory
    #[command(name = "downloaddir")]
    DownloadDir {
        /// Directory path relative to the server root
        path: String,
    },
    /// Show the directories available under a path
    List {
        /// Directory path relative to the server root
        #[arg(default_value = ".")]
        path: String,
    },
}
