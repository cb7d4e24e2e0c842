use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{ControllerOptions, DocumentChat, HttpDocumentService, UploadFile};
use shared::domain::DocumentId;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod view;

use commands::{parse_line, Command, OpenTarget, HELP};
use view::TerminalView;

#[derive(Parser, Debug)]
#[command(name = "docchat", about = "Chat with uploaded documents from the terminal")]
struct Args {
    /// Base URL of the document server.
    #[arg(long)]
    server_url: Option<String>,
    /// Settings file; defaults to ./docchat.toml, then the user config dir.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Document id to open at start.
    #[arg(long)]
    document: Option<String>,
    /// Send one message, print the answer and exit.
    #[arg(long)]
    message: Option<String>,
    /// Refuse to chat until a document is open.
    #[arg(long)]
    require_document: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = config::load_settings(args.config.as_deref())?;
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }
    if args.require_document {
        settings.require_document = true;
    }
    init_tracing(&settings.log_filter);

    let service = HttpDocumentService::new(&settings.server_url, settings.request_timeout())
        .with_context(|| format!("invalid server url '{}'", settings.server_url))?;
    let chat = DocumentChat::new(
        Arc::new(service),
        Arc::new(TerminalView),
        settings.controller_options(),
    );

    if let Err(err) = chat.start(args.document.map(DocumentId::new)).await {
        warn!("start-up incomplete: {err}");
    }

    if let Some(message) = args.message {
        chat.send(&message).await.context("message failed")?;
        return Ok(());
    }

    run_repl(chat).await
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_repl(chat: Arc<DocumentChat>) -> Result<()> {
    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let command = match parse_line(&line) {
            Ok(command) => command,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };

        match command {
            Command::Nothing => {}
            Command::Help => println!("{HELP}"),
            Command::Quit => break,
            Command::List => print_catalog(&chat).await,
            Command::Status => print_status(&chat, chat.options()).await,
            Command::Close => {
                chat.clear_selection().await;
            }
            Command::Reset => {
                chat.reset_conversation().await;
            }
            Command::Open(target) => open(&chat, target).await,
            Command::Upload(path) => {
                let chat = chat.clone();
                tokio::spawn(async move {
                    match read_upload(&path).await {
                        Ok(file) => {
                            if let Err(err) = chat.upload(Some(file)).await {
                                debug!("upload ended with error: {err}");
                            }
                        }
                        Err(err) => println!("[error] {err:#}"),
                    }
                });
            }
            Command::Message(text) => {
                let chat = chat.clone();
                tokio::spawn(async move {
                    if let Err(err) = chat.send(&text).await {
                        debug!("send ended with error: {err}");
                    }
                });
            }
        }
    }
    Ok(())
}

async fn open(chat: &DocumentChat, target: OpenTarget) {
    let result = match target {
        OpenTarget::Id(id) => chat.open_document(&id).await,
        OpenTarget::Position(position) => {
            match chat.catalog().await.get(position - 1).map(|doc| doc.id.clone()) {
                Some(id) => chat.select_document(&id).await,
                None => {
                    println!("no document at position #{position}, try /list");
                    return;
                }
            }
        }
    };
    if let Err(err) = result {
        debug!("open ended with error: {err}");
    }
}

async fn read_upload(path: &Path) -> Result<UploadFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .context("upload path has no file name")?
        .to_string();
    let content_type = mime_guess::from_path(path).first_raw().map(str::to_string);
    Ok(UploadFile {
        filename,
        content_type,
        bytes,
    })
}

async fn print_catalog(chat: &DocumentChat) {
    let catalog = chat.catalog().await;
    if catalog.is_empty() {
        println!("no documents");
        return;
    }
    let active = chat.active_document().await.map(|doc| doc.id);
    for (index, doc) in catalog.iter().enumerate() {
        let marker = if active.as_ref() == Some(&doc.id) { "*" } else { " " };
        println!(
            "{marker} #{:<3} {:<24} {:>10} B  {}  ({})",
            index + 1,
            doc.filename,
            doc.size_bytes,
            doc.updated_at.format("%Y-%m-%d %H:%M"),
            doc.id
        );
    }
}

async fn print_status(chat: &DocumentChat, options: ControllerOptions) {
    match chat.active_document().await {
        Some(doc) => println!("document: {} ({})", doc.filename, doc.id),
        None => println!("document: none"),
    }
    println!("thread:   {}", chat.thread_id().await);
    println!("preview:  {:?}", chat.preview().await.mode());
    println!("messages: {}", chat.history().await.len());
    println!("upload:   {:?}", chat.upload_phase().await);
    println!("waiting:  {}", chat.outstanding_sends());
    if options.require_document {
        println!("policy:   a document is required to chat");
    }
}
