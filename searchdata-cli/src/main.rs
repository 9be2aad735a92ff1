use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use searchdata::bulk::parse_bulk_requests;
use searchdata::schema::{translate_es_payload, DocumentSchema};
use searchdata::transport::password::obfuscate;
use searchdata::{DocumentStore, ElasticSearchConfig};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "searchdata")]
#[command(about = "Document store tools for Elasticsearch-compatible engines")]
#[command(version)]
struct Cli {
    /// Connection configuration (.toml or .properties)
    #[arg(short, long, env = "SEARCHDATA_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an index from a document schema
    CreateIndex {
        index: String,

        /// Document schema JSON file
        #[arg(short, long)]
        schema: PathBuf,
    },

    /// Create an index from a raw engine settings/mappings payload
    CreateIndexRaw {
        index: String,

        /// Engine payload JSON file
        #[arg(short, long)]
        payload: PathBuf,
    },

    DeleteIndex {
        index: String,
    },

    IndexExists {
        index: String,
    },

    /// Fetch one document
    Get {
        index: String,
        id: String,
    },

    /// Search an index with a query string or a query payload
    Search {
        index: String,

        /// Query string
        #[arg(short, long, conflicts_with = "payload")]
        query: Option<String>,

        /// Query payload JSON file
        #[arg(short, long)]
        payload: Option<PathBuf>,
    },

    /// Run a batch of bulk requests from a JSON file
    Bulk {
        file: PathBuf,
    },

    /// Migrate a legacy index payload and print the result
    Translate {
        file: PathBuf,
    },

    /// Obfuscate a store password for use in configuration
    Obfuscate {
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();

    // Offline commands need no engine connection
    match &cli.command {
        Commands::Translate { file } => {
            let translated = translate_es_payload(&read(file)?)?;
            let value: serde_json::Value = serde_json::from_str(&translated)?;
            println!("{}", serde_json::to_string_pretty(&value)?);
            return Ok(());
        }
        Commands::Obfuscate { password } => {
            println!("{}", obfuscate(password));
            return Ok(());
        }
        _ => {}
    }

    let config = match &cli.config {
        Some(path) => ElasticSearchConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ElasticSearchConfig::default(),
    };
    tracing::debug!("Using engine at {}", config.base_url());
    let store = DocumentStore::new(config)?;

    let success = match cli.command {
        Commands::CreateIndex { index, schema } => {
            let schema = DocumentSchema::from_json(&read(&schema)?)?;
            print(&store.create_index(&index, &schema).await)?
        }
        Commands::CreateIndexRaw { index, payload } => {
            print(&store.create_index_from_payload(&index, &read(&payload)?).await)?
        }
        Commands::DeleteIndex { index } => print(&store.delete_index(&index).await)?,
        Commands::IndexExists { index } => print(&store.index_exists(&index).await)?,
        Commands::Get { index, id } => {
            let result = store.get_document(&index, &id).await;
            print_json(&result)?;
            result.is_success()
        }
        Commands::Search {
            index,
            query,
            payload,
        } => {
            let result = match (query, payload) {
                (_, Some(payload)) => store.search_with_payload(&index, &read(&payload)?).await,
                (Some(query), None) => store.search(&index, &query).await,
                (None, None) => store.search(&index, "*").await,
            };
            print_json(&result)?;
            result.is_success()
        }
        Commands::Bulk { file } => {
            let requests = parse_bulk_requests(&read(&file)?)?;
            tracing::info!("Submitting {} bulk requests", requests.len());
            print(&store.perform_bulk_operations(&requests).await)?
        }
        Commands::Translate { .. } | Commands::Obfuscate { .. } => true,
    };

    if !success {
        std::process::exit(1);
    }
    Ok(())
}

fn init_tracing() {
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,searchdata=debug".into()),
        ))
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Print a result envelope as JSON; returns whether it reports success.
fn print(result: &searchdata::OperationResult) -> Result<bool> {
    print_json(result)?;
    Ok(result.is_success())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
