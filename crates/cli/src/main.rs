use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use pageforge_engine::Engine;
use pageforge_llm::LlmClient;
use pageforge_storage::{SqliteStore, StateStore};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "pageforge")]
#[command(about = "Streamed multi-variant document generation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate N style variants for one prompt
    Generate {
        prompt: String,
        #[arg(short = 'n', long, default_value = "3")]
        variants: usize,
        /// Reference image URL or data URL, sent inline with every call
        #[arg(long)]
        image_url: Option<String>,
        /// Replicate the reference closely instead of designing freely
        #[arg(long)]
        clone_mode: bool,
        /// Directory the finished variants are written to
        #[arg(short, long, default_value = "pageforge-out")]
        out: PathBuf,
        /// Publish the first complete variant after generation
        #[arg(long)]
        publish: bool,
    },
    /// Generate a multi-page site, pages strictly in order
    Site {
        prompt: String,
        /// Page names in order; the first is the home page
        #[arg(short, long, value_delimiter = ',', default_value = "Home,About,Contact")]
        pages: Vec<String>,
        #[arg(long)]
        image_url: Option<String>,
        #[arg(short, long, default_value = "pageforge-out")]
        out: PathBuf,
    },
    /// List persisted sessions
    Sessions,
    /// List persisted versions of one artifact
    Versions { artifact_id: String },
    /// Show the autosaved draft
    Draft {
        /// Discard the draft instead of showing it
        #[arg(long)]
        discard: bool,
    },
}

fn get_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pageforge")
        .join("pageforge.db")
}

fn get_api_key() -> Result<String> {
    std::env::var("PAGEFORGE_API_KEY")
        .map_err(|_| anyhow::anyhow!("PAGEFORGE_API_KEY environment variable must be set"))
}

fn get_base_url() -> String {
    std::env::var("PAGEFORGE_API_URL")
        .unwrap_or_else(|_| "https://openrouter.ai/api".to_string())
}

fn open_store() -> Result<SqliteStore> {
    let db_path = get_db_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(SqliteStore::new(&db_path)?)
}

fn build_engine(store: &SqliteStore) -> Result<Engine> {
    let client = LlmClient::new(get_api_key()?, get_base_url())?;
    let persist: Arc<dyn StateStore> = Arc::new(store.clone());
    Ok(Engine::new(Arc::new(client), persist))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = open_store()?;
    tracing::debug!("store ready at {}", get_db_path().display());

    match cli.command {
        Commands::Generate { prompt, variants, image_url, clone_mode, out, publish } => {
            let engine = build_engine(&store)?;
            commands::generate::run(&engine, &prompt, variants, image_url, clone_mode, &out, publish)
                .await
        },
        Commands::Site { prompt, pages, image_url, out } => {
            let engine = build_engine(&store)?;
            commands::site::run(&engine, &prompt, &pages, image_url, &out).await
        },
        Commands::Sessions => commands::inspect::sessions(&store).await,
        Commands::Versions { artifact_id } => commands::inspect::versions(&store, &artifact_id).await,
        Commands::Draft { discard } => commands::inspect::draft(&store, discard).await,
    }
}
