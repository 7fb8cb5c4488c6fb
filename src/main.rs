// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Parser;
use fabstir_doc_chat::{ChatCompletionClient, ChatSession, RagConfig, Retriever};
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Terminal chat grounded in an uploaded PDF document.
#[derive(Parser)]
#[command(name = "fabstir-doc-chat", version)]
struct Args {
    /// PDF to ingest before the first prompt
    #[arg(long)]
    document: Option<PathBuf>,

    /// Fragments retrieved per question (overrides RETRIEVAL_TOP_K)
    #[arg(long)]
    top_k: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut config = RagConfig::from_env()?;
    if let Some(top_k) = args.top_k {
        config.top_k = top_k;
    }

    let embedder = config.build_embedder()?;
    let completion = Arc::new(ChatCompletionClient::new(&config.completion)?);
    let retriever = Arc::new(Retriever::new(embedder, config.chunk.clone())?);
    let session = ChatSession::new(retriever, completion, config.top_k);

    println!("📚 Fabstir document chat");
    println!(
        "   embedding backend: {} ({}, {}d)",
        config.embedding.provider, config.embedding.model, config.embedding.dimension
    );
    println!("   completion model: {}", config.completion.model);
    println!("   commands: /load <pdf>, /clear, /quit");
    println!();

    if let Some(path) = &args.document {
        load_document(&session, path).await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = match lines.next_line().await? {
            Some(line) => line,
            None => break,
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        if input == "/quit" {
            break;
        } else if input == "/clear" {
            match session.clear_document().await {
                Some(name) => println!("🗑️  Cleared document '{name}'"),
                None => println!("No document loaded"),
            }
        } else if let Some(path) = input.strip_prefix("/load ") {
            load_document(&session, Path::new(path.trim())).await;
        } else {
            match session.send_message(input).await {
                Ok(turn) => {
                    if let Some(warning) = &turn.warning {
                        eprintln!("⚠️  {warning}");
                    }
                    println!("{}", turn.reply);
                }
                Err(e) => eprintln!("⚠️  {e}"),
            }
        }
    }

    println!("Bye!");
    Ok(())
}

async fn load_document(session: &ChatSession, path: &Path) {
    let bytes = match tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
    {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("⚠️  {e:#}");
            return;
        }
    };

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    match session.attach_document(bytes, &file_name).await {
        Ok(report) => println!(
            "📄 Loaded '{}': {} fragments ({}d vectors)",
            report.file_name, report.fragment_count, report.dimension
        ),
        Err(e) => eprintln!("⚠️  PDF processing failed: {e}"),
    }
}
