use clap::{Parser, Subcommand};
use docqa_server::session::{DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_TTL_SECS};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docqa", version)]
#[command(about = "Ask questions of a single document", long_about = None)]
pub struct Cli {
    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP API")]
    Serve {
        #[arg(long, env = "DOCQA_HOST", default_value = "127.0.0.1", help = "Address to bind")]
        host: String,

        #[arg(long, env = "DOCQA_PORT", default_value_t = 8080, help = "Port to bind")]
        port: u16,

        #[arg(
            long,
            env = "DOCQA_MAX_SESSIONS",
            default_value_t = DEFAULT_MAX_SESSIONS,
            help = "Live sessions kept before the least recently used is evicted"
        )]
        max_sessions: usize,

        #[arg(
            long,
            env = "DOCQA_SESSION_TTL_SECS",
            default_value_t = DEFAULT_SESSION_TTL_SECS,
            value_parser = clap::value_parser!(i64).range(1..),
            help = "Seconds a session may sit unused before it is discarded"
        )]
        session_ttl_secs: i64,
    },

    #[command(about = "Answer a question about a .txt or .pdf file")]
    Ask {
        #[arg(help = "Document to read")]
        file: PathBuf,

        #[arg(help = "The question to answer")]
        question: String,

        #[arg(short = 'k', long, help = "Number of segments to retrieve")]
        top_k: Option<usize>,

        #[arg(long, help = "Also summarize the document while the index builds")]
        summary: bool,

        #[arg(long, help = "Print the result as JSON")]
        json: bool,
    },

    #[command(about = "Summarize a .txt or .pdf file")]
    Summarize {
        #[arg(help = "Document to read")]
        file: PathBuf,
    },

    #[command(about = "Show word count, reading time, and sentiment without calling any service")]
    Stats {
        #[arg(help = "Document to read")]
        file: PathBuf,

        #[arg(long, help = "Print the result as JSON")]
        json: bool,
    },
}
