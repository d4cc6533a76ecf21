//! CLI entry point for the fileshare tool.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use fileshare_core::protocol::directories;
use fileshare_core::{
    BatchDownloader, BatchOutcome, ClientConfig, FileServer, FileTransfer, HttpClient,
    LedgerHandle, LedgerStore, ServerConfig, Transfer, TransferOutcome,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

mod cli;

use cli::{Args, ClientAction, ClientArgs, Command, ServerArgs};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let cancel = CancellationToken::new();
    spawn_ctrl_c_handler(cancel.clone());

    match args.command {
        Command::Server(server_args) => run_server(server_args, cancel).await,
        Command::Client(client_args) => run_client(client_args, cancel).await,
    }
}

fn spawn_ctrl_c_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupt received, shutting down");
                cancel.cancel();
            }
            Err(e) => warn!(error = %e, "failed to install Ctrl-C handler"),
        }
    });
}

async fn run_server(args: ServerArgs, cancel: CancellationToken) -> Result<()> {
    let config = ServerConfig::new(args.port, args.path).with_host(args.host);
    let server = FileServer::new(&config)?;
    info!(
        addr = %config.bind_addr(),
        root = %config.root.display(),
        "starting file server"
    );
    server.serve(config.bind_addr(), cancel).await
}

async fn run_client(args: ClientArgs, cancel: CancellationToken) -> Result<()> {
    let config = ClientConfig::new(
        &args.server,
        args.output,
        usize::from(args.concurrency),
        args.resume,
    )?;
    let client = HttpClient::new(config.server_url())?;

    match args.action {
        ClientAction::List { path } => list_directories(&client, &path, &cancel).await,
        ClientAction::Download { path } => {
            let (ledger, ledger_task) =
                LedgerHandle::spawn(LedgerStore::new(config.ledger_path()));
            let transfer = FileTransfer::new(client, config.save_dir(), ledger);

            match transfer.transfer(&path, &cancel).await {
                Ok(TransferOutcome::Downloaded { path: saved, bytes }) => {
                    info!(path = %saved.display(), bytes, "downloaded");
                }
                Ok(TransferOutcome::Skipped { path: saved, .. }) => {
                    info!(path = %saved.display(), "already complete, skipped");
                }
                Err(e) => error!(path = %path, error = %e, "download failed"),
            }

            drop(transfer);
            ledger_task.await?;
            Ok(())
        }
        ClientAction::DownloadDir { path } => {
            let (ledger, ledger_task) =
                LedgerHandle::spawn(LedgerStore::new(config.ledger_path()));
            let transfer: Arc<dyn Transfer> =
                Arc::new(FileTransfer::new(client.clone(), config.save_dir(), ledger));
            let engine = BatchDownloader::new(config.concurrency())?;

            match engine
                .download_directory(&client, &path, transfer, &cancel)
                .await
            {
                Ok(BatchOutcome::Empty) => info!(dir = %path, "directory is empty or missing"),
                Ok(BatchOutcome::Finished { listed, dispatched }) => {
                    info!(dir = %path, listed, dispatched, "directory download complete");
                }
                Ok(BatchOutcome::Cancelled { listed, dispatched }) => {
                    warn!(dir = %path, listed, dispatched, "directory download cancelled");
                }
                Err(e) => error!(dir = %path, error = %e, "directory download failed"),
            }

            ledger_task.await?;
            Ok(())
        }
    }
}

async fn list_directories(
    client: &HttpClient,
    path: &str,
    cancel: &CancellationToken,
) -> Result<()> {
    let files = match client.list_directory(path, cancel).await {
        Ok(files) => files,
        Err(e) => {
            error!(dir = %path, error = %e, "failed to fetch directory listing");
            return Ok(());
        }
    };

    println!("Available directories:");
    for dir in directories(&files) {
        println!("- {dir}");
    }
    Ok(())
}
