use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

use reposearch_core::SearchConfig;

mod commands;
mod documents;

use commands::{compile_query, render_query, search_content, validate_query};

#[derive(Parser, Debug)]
#[command(name = "reposearch")]
#[command(about = "Render, validate and compile content-repository queries", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to REPOSEARCH_CONFIG and the standard locations)
    #[arg(long, global = true, env = "REPOSEARCH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the canonical statement of a JSON query
    Render {
        /// Query document
        #[arg(long)]
        query: PathBuf,
    },

    /// Check a query against a schema
    Validate {
        /// Query document
        #[arg(long)]
        query: PathBuf,

        /// Schema document
        #[arg(long)]
        schema: PathBuf,
    },

    /// Print the compiled plan of a query as JSON
    Compile {
        /// Query document
        #[arg(long)]
        query: PathBuf,

        /// Schema document
        #[arg(long)]
        schema: PathBuf,

        /// Values for the query's bind variables
        #[arg(long)]
        bindings: Option<PathBuf>,
    },

    /// Index a content document in memory and run a query against it
    Search {
        /// Query document
        #[arg(long)]
        query: PathBuf,

        /// Schema document
        #[arg(long)]
        schema: PathBuf,

        /// Content entries to index
        #[arg(long)]
        content: PathBuf,

        /// Values for the query's bind variables
        #[arg(long)]
        bindings: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => SearchConfig::from_file(path)?,
        None => SearchConfig::load()?,
    };

    let output = match cli.command {
        Commands::Render { query } => render_query(&query),
        Commands::Validate { query, schema } => validate_query(&query, &schema, &config),
        Commands::Compile {
            query,
            schema,
            bindings,
        } => compile_query(&query, &schema, bindings.as_deref(), &config),
        Commands::Search {
            query,
            schema,
            content,
            bindings,
        } => search_content(&query, &schema, &content, bindings.as_deref(), config).await,
    };

    match output {
        Ok(text) => {
            println!("{text}");
            Ok(())
        }
        Err(e) => {
            error!("{e}");
            Err(e.into())
        }
    }
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
