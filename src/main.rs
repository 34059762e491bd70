mod runtime;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use ragmem_chat::{ChatConfig, ConversationalRag, PolicyKind, QueryPolicy, ui};
use ragmem_index::RouterQueryEngine;

use crate::runtime::{EmbedderKind, PolicyArg, Runtime, ToolSpec, report_indexing};

#[derive(Parser)]
#[command(name = "ragmem")]
#[command(about = "Conversational question answering over your documents", long_about = None)]
struct Cli {
    /// Embedding backend
    #[arg(long, value_enum, default_value = "gemini", global = true)]
    embedder: EmbedderKind,

    /// Qdrant server URL; an in-memory store is used when absent
    #[arg(long, env = "QDRANT_URL", global = true)]
    qdrant_url: Option<String>,

    /// Number of chunks retrieved per query
    #[arg(long, default_value_t = 2, global = true)]
    top_k: usize,

    /// Prefix chunks with model-written context while indexing
    #[arg(long, global = true)]
    contextual: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load, chunk, embed and store documents
    Index {
        /// Files or directories to ingest
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Collection to store the chunks in
        #[arg(long, default_value = "ragmem")]
        collection: String,

        /// Remove everything in the collection before indexing
        #[arg(long)]
        reset: bool,
    },
    /// Answer one question from the documents
    Ask {
        query: String,

        /// Files or directories to search
        #[arg(long = "data")]
        data: Vec<PathBuf>,

        #[arg(long, default_value = "ragmem")]
        collection: String,
    },
    /// Interactive chat that remembers earlier questions and answers
    Chat {
        #[arg(long = "data")]
        data: Vec<PathBuf>,

        #[arg(long, default_value = "ragmem")]
        collection: String,

        /// How follow-up questions are combined with the conversation
        #[arg(long, value_enum, default_value = "template")]
        policy: PolicyArg,

        /// Most recent question/answer pairs used for follow-ups
        #[arg(long)]
        history_window: Option<usize>,

        /// Seconds to wait for each retrieval or rewrite call
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Route a question to the best matching document set
    Route {
        query: String,

        /// Tool as NAME=DESCRIPTION=PATH; repeat for each document set
        #[arg(long = "tool", required = true)]
        tools: Vec<ToolSpec>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut runtime = Runtime::new(cli.embedder, cli.qdrant_url, cli.top_k)?.contextual(cli.contextual);

    match cli.command {
        Commands::Index { paths, collection, reset } => {
            let store = runtime.persistent_store(&collection).await?;
            if reset {
                store.clear().await?;
            }
            let result = runtime.index(store, &paths).await?;
            report_indexing(&result);
        }
        Commands::Ask { query, data, collection } => {
            let engine = runtime.engine(&collection, &data).await?;
            let response = engine.query(&query).await?;
            ui::print_answer(&response);
        }
        Commands::Chat {
            data,
            collection,
            policy,
            history_window,
            timeout,
        } => {
            let engine = runtime.engine(&collection, &data).await?;
            let chat_model = runtime.chat_model()?;

            let policy = match PolicyKind::from(policy) {
                PolicyKind::Template => QueryPolicy::Template,
                PolicyKind::Rewrite => QueryPolicy::Rewrite(chat_model.clone()),
            };
            let mut config = ChatConfig::default();
            if let Some(pairs) = history_window {
                config = config.with_history_window(pairs);
            }
            if let Some(secs) = timeout {
                config = config.with_call_timeout(Duration::from_secs(secs));
            }

            ui::display_banner(policy.kind(), chat_model.model_id());
            run_chat(ConversationalRag::new(engine, policy, config)).await?;
        }
        Commands::Route { query, tools } => {
            let tools = runtime.tools(&tools).await?;
            let router = RouterQueryEngine::new(tools, runtime.chat_model()?)?;

            let tool = router.select(&query).await?;
            println!("{} {}", "→".green(), tool.name.bold());
            let response = tool.engine.query(&query).await?;
            ui::print_answer(&response);
        }
    }

    Ok(())
}

async fn run_chat(session: ConversationalRag) -> Result<()> {
    let mut history = Vec::new();

    loop {
        let input = ui::read_input_with_history(&mut history)?;

        if input.is_empty() {
            continue;
        }

        let input_lower = input.to_lowercase();

        if input_lower == "exit" || input_lower == "quit" {
            println!("{}", "👋 Goodbye!".green());
            break;
        }

        if input_lower == "help" {
            ui::print_help();
            continue;
        }

        if input_lower == "history" {
            print!("{}", ui::format_history(&session.history().await));
            continue;
        }

        if let Some(question) = ui::explain_question(&input) {
            match session.effective_query(question.trim()).await {
                Ok(effective) => println!("{}\n{}\n", "Effective query:".bold(), effective),
                Err(e) => ui::print_error(&e),
            }
            continue;
        }

        println!("{} Thinking...", "🤖".blue());
        match session.answer_with_sources(&input).await {
            Ok(response) => ui::print_answer(&response),
            Err(e) => ui::print_error(&e),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedder_defaults_to_gemini() {
        let cli = Cli::try_parse_from(["ragmem", "ask", "What is the revenue?"]).unwrap();
        assert_eq!(cli.embedder, EmbedderKind::Gemini);

        let cli = Cli::try_parse_from(["ragmem", "ask", "q", "--embedder", "hash"]).unwrap();
        assert_eq!(cli.embedder, EmbedderKind::Hash);
    }

    #[test]
    fn test_index_reset_flag() {
        let cli = Cli::try_parse_from(["ragmem", "index", "data", "--reset"]).unwrap();
        match cli.command {
            Commands::Index { paths, reset, .. } => {
                assert_eq!(paths, vec![PathBuf::from("data")]);
                assert!(reset);
            }
            _ => panic!("expected the index command"),
        }
    }
}
