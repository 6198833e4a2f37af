use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser as _;
use docqa_rag::{
    Answer, Document, DocumentAnalysis, FileKind, LexiconSentimentScorer, QaPipeline,
    extract_text,
};
use docqa_server::{ServerConfig, SessionLimits, run_server};
use serde::Serialize;

mod cli;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; real environment variables still apply.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    if cli.json_logs {
        let _ = docqa_telemetry::init_json("docqa-cli");
    } else {
        let _ = docqa_telemetry::init_telemetry("docqa-cli");
    }

    match cli.command {
        Commands::Serve { host, port, max_sessions, session_ttl_secs } => {
            let pipeline = Arc::new(QaPipeline::from_env()?);
            let session_limits = SessionLimits {
                max_sessions,
                idle_ttl: chrono::Duration::seconds(session_ttl_secs),
            };
            let config = ServerConfig { host, port, session_limits, ..ServerConfig::default() };
            run_server(config, pipeline).await?;
        }
        Commands::Ask { file, question, top_k, summary, json } => {
            handle_ask(&file, &question, top_k, summary, json).await?;
        }
        Commands::Summarize { file } => {
            let pipeline = Arc::new(QaPipeline::from_env()?);
            let session = pipeline.open(load_document(&file).await?)?;
            println!("{}", session.summarize().await?);
        }
        Commands::Stats { file, json } => {
            handle_stats(&file, json).await?;
        }
    }

    Ok(())
}

async fn load_document(path: &Path) -> Result<Document> {
    let kind = FileKind::from_path(path)?;
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let text = tokio::task::spawn_blocking(move || extract_text(&bytes, kind)).await??;
    tracing::info!(path = %path.display(), chars = text.chars().count(), "loaded document");

    let document = Document::new(text);
    Ok(match path.file_name().and_then(|name| name.to_str()) {
        Some(name) => document.with_name(name),
        None => document,
    })
}

#[derive(Serialize)]
struct AskOutput {
    answer: Answer,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
}

async fn handle_ask(
    path: &Path,
    question: &str,
    top_k: Option<usize>,
    with_summary: bool,
    json: bool,
) -> Result<()> {
    let pipeline = Arc::new(QaPipeline::from_env()?);
    let session = pipeline.open(load_document(path).await?)?;

    let summary = if with_summary {
        let (summary, index) = session.summarize_and_index().await;
        index?;
        Some(summary?)
    } else {
        None
    };
    let answer = session.ask(question, top_k).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&AskOutput { answer, summary })?);
        return Ok(());
    }

    if let Some(summary) = summary {
        println!("Summary:\n{summary}\n");
    }
    println!("{}", answer.text);
    if !answer.sources.is_empty() {
        println!("\nSources:");
        for source in &answer.sources {
            let preview: String = source.segment.text.chars().take(80).collect();
            println!(
                "  [{}] offset {} score {:.3}: {}",
                source.segment.index,
                source.segment.offset,
                source.score,
                preview.replace('\n', " ")
            );
        }
    }
    Ok(())
}

async fn handle_stats(path: &Path, json: bool) -> Result<()> {
    let document = load_document(path).await?;
    let analysis = DocumentAnalysis::of(document.text(), &LexiconSentimentScorer);

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        println!("Words:        {}", analysis.stats.word_count);
        println!("Reading time: {} min", analysis.stats.reading_time_minutes);
        println!(
            "Sentiment:    {:?} ({:+.2})",
            analysis.sentiment.label, analysis.sentiment.polarity
        );
    }
    Ok(())
}
