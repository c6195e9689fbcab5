mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "finrag")]
#[command(about = "Financial sentiment RAG assistant")]
struct Cli {
    /// Print results as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Wipe the collection and rebuild it from the corpus file
    Build {
        /// Corpus file to load (defaults to DATA_PATH)
        #[arg(long)]
        data: Option<PathBuf>,
    },
    /// Show the sentences most similar to a query
    Search {
        query: String,

        #[arg(long, default_value_t = 5)]
        top_k: usize,
    },
    /// Answer a question from the index with the language model
    Query {
        question: String,

        /// Also score retrieval and answer similarity
        #[arg(long)]
        evaluate: bool,
    },
    /// Report vector store reachability and collection size
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = finrag_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Build { data } => {
            let path = data.unwrap_or_else(|| config.data_path.clone());
            commands::run_build(&config, &path, cli.json).await
        }
        Commands::Search { query, top_k } => {
            commands::run_search(&config, &query, top_k, cli.json).await
        }
        Commands::Query { question, evaluate } => {
            commands::run_query(&config, &question, evaluate, cli.json).await
        }
        Commands::Status => commands::run_status(&config, cli.json).await,
    }
}
