//! CLI entry point for semdex.
//!
//! Every search command loads the `.txt` and `.md` files under a directory
//! into an in-process index, then runs semantic or hybrid search, k-means
//! clustering, or duplicate detection over the chunks.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, bail};
use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use tracing::debug;
use walkdir::WalkDir;

use semdex::config::{CONFIG_DIR, CONFIG_FILE};
use semdex::display::{
    THEME, clusters_table, create_progress_bar, create_spinner, duplicates_table,
    search_results_table, track_embedding_batches,
};
use semdex::{
    ChunkStrategy, Chunker, ClusterOptions, DistanceMetric, EngineError, Metadata, SearchEngine,
    SearchQuery, Settings, logging,
};

/// Name of the index the CLI loads files into.
const INDEX: &str = "files";
const EXTENSIONS: [&str; 2] = ["txt", "md"];

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Semantic search over text files
#[derive(Parser)]
#[command(
    name = "semdex",
    version = env!("CARGO_PKG_VERSION"),
    about = "Semantic and hybrid search over text files",
    long_about = "Chunk, embed and search text files. Supports keyword-blended ranking, clustering and near-duplicate detection.",
    next_line_help = true,
    styles = clap_cargo_style()
)]
struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Set up .semdex directory with a default settings.toml
    Init {
        /// Overwrite an existing settings file
        #[arg(short, long)]
        force: bool,
    },

    /// Display active settings
    Config,

    /// Split a file into chunks and print them
    Chunk {
        file: PathBuf,

        /// fixed-size, paragraph, sentence or recursive
        #[arg(short, long)]
        strategy: Option<ChunkStrategy>,

        /// Maximum chunk length in characters
        #[arg(long)]
        size: Option<usize>,

        /// Characters shared by consecutive fixed-size chunks
        #[arg(long)]
        overlap: Option<usize>,
    },

    /// Search the files under a directory
    Search {
        dir: PathBuf,
        query: String,

        /// Number of results
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Blend keyword (BM25) scores into the ranking
        #[arg(long)]
        hybrid: bool,

        /// Weight of semantic similarity in hybrid mode
        #[arg(long)]
        semantic_weight: Option<f32>,

        /// Weight of keyword relevance in hybrid mode
        #[arg(long)]
        keyword_weight: Option<f32>,

        /// Re-rank the top hybrid results lexically
        #[arg(long)]
        rerank: bool,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Group the chunks under a directory into k clusters
    Cluster {
        dir: PathBuf,

        /// Number of clusters
        #[arg(short, long)]
        k: usize,

        #[arg(long)]
        max_iterations: Option<usize>,

        /// Seed for reproducible centroid selection
        #[arg(long)]
        seed: Option<u64>,
    },

    /// List near-duplicate chunks under a directory
    Duplicates {
        dir: PathBuf,

        /// Minimum cosine similarity for a pair
        #[arg(short, long)]
        threshold: Option<f32>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = if let Some(config_path) = &cli.config {
        match Settings::load_from(config_path) {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!(
                    "Configuration error loading from {}: {e}",
                    config_path.display()
                );
                return ExitCode::FAILURE;
            }
        }
    } else {
        Settings::load().unwrap_or_else(|e| {
            eprintln!("Configuration error: {e}");
            eprintln!("Using default configuration for now.");
            Settings::default()
        })
    };
    logging::init(cli.debug || settings.debug);

    match run(cli, settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", THEME.error_with_icon(&format!("{e:#}")));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, settings: Settings) -> anyhow::Result<()> {
    match cli.command {
        Commands::Init { force } => {
            let path = cli
                .config
                .unwrap_or_else(|| Path::new(CONFIG_DIR).join(CONFIG_FILE));
            let path =
                Settings::init_config_file(&path, force).map_err(|e| anyhow::anyhow!("{e}"))?;
            println!(
                "{}",
                THEME.success_with_icon(&format!(
                    "Created configuration file at: {}",
                    path.display()
                ))
            );
            println!("Edit this file to customize your settings.");
        }

        Commands::Config => {
            println!("{}", THEME.apply(&THEME.header, "Current Configuration:"));
            println!("{}", "=".repeat(50));
            println!("{}", toml::to_string_pretty(&settings)?);
        }

        Commands::Chunk {
            file,
            strategy,
            size,
            overlap,
        } => {
            let content = read_file(&file)?;
            let chunker = Chunker::new(
                size.unwrap_or(settings.chunking.chunk_size),
                overlap.unwrap_or(settings.chunking.overlap),
            )?;
            let strategy = strategy.unwrap_or(settings.chunking.strategy);
            let chunks = chunker.chunk(&content, strategy);

            for (n, chunk) in chunks.iter().enumerate() {
                let heading = format!("[{n}] {} chars", chunk.chars().count());
                println!("{}", THEME.apply(&THEME.header, heading));
                println!("{chunk}\n");
            }
            println!(
                "{} chunks ({strategy})",
                THEME.apply(&THEME.number, chunks.len())
            );
        }

        Commands::Search {
            dir,
            query,
            top_k,
            hybrid,
            semantic_weight,
            keyword_weight,
            rerank,
            json,
        } => {
            let engine = SearchEngine::from_settings(&settings)?;
            load_directory(&engine, &dir).await?;

            let query =
                SearchQuery::new(query).with_top_k(top_k.unwrap_or(settings.search.top_k));
            let hybrid =
                hybrid || rerank || semantic_weight.is_some() || keyword_weight.is_some();

            let response = if hybrid {
                let mut options = settings.search.hybrid_options();
                if let Some(weight) = semantic_weight {
                    options.semantic_weight = weight;
                }
                if let Some(weight) = keyword_weight {
                    options.keyword_weight = weight;
                }
                options.rerank |= rerank;
                engine.hybrid_search(INDEX, &query, options).await?
            } else {
                engine.semantic_search(INDEX, &query).await?
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else if response.is_empty() {
                println!("No results.");
            } else {
                println!("{}", search_results_table(&response));
            }
            if response.degraded {
                eprintln!(
                    "{}",
                    THEME.warning_with_icon(
                        "Query embedding is degraded; the provider was unavailable"
                    )
                );
            }
        }

        Commands::Cluster {
            dir,
            k,
            max_iterations,
            seed,
        } => {
            let engine = SearchEngine::from_settings(&settings)?;
            load_directory(&engine, &dir).await?;

            let mut options = ClusterOptions::new(k)
                .with_max_iterations(max_iterations.unwrap_or(settings.clustering.max_iterations))
                .with_convergence_threshold(settings.clustering.convergence_threshold);
            if let Some(seed) = seed {
                options = options.with_seed(seed);
            }

            let spinner = create_spinner("Clustering");
            let clusters = engine.cluster(INDEX, &options);
            spinner.finish_and_clear();
            let clusters = clusters?;
            println!("{}", clusters_table(&clusters));
        }

        Commands::Duplicates { dir, threshold } => {
            let engine = SearchEngine::from_settings(&settings)?;
            load_directory(&engine, &dir).await?;

            let threshold = threshold.unwrap_or(settings.duplicates.threshold);
            let pairs = engine.find_duplicates(INDEX, threshold)?;
            if pairs.is_empty() {
                println!("No pairs at or above similarity {threshold}.");
            } else {
                println!("{}", duplicates_table(&pairs));
            }
        }
    }

    Ok(())
}

fn read_file(path: &Path) -> Result<String, EngineError> {
    std::fs::read_to_string(path).map_err(|source| EngineError::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

/// `.txt` and `.md` files under `dir`, in path order.
fn collect_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| EXTENSIONS.contains(&ext))
        })
        .map(|entry| entry.into_path())
        .collect()
}

/// Chunks every file under `dir` into the CLI index. Returns the number of
/// chunks stored.
async fn load_directory(engine: &SearchEngine, dir: &Path) -> anyhow::Result<usize> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }
    let files = collect_files(dir);
    if files.is_empty() {
        bail!("No .txt or .md files found under {}", dir.display());
    }

    let mut documents = Vec::new();
    for path in &files {
        let content = read_file(path)?;
        let relative = path.strip_prefix(dir).unwrap_or(path).display().to_string();
        let metadata = Metadata::from([("path".to_string(), relative.clone().into())]);
        let chunks = engine.chunk_documents(&relative, &content, None, &metadata);
        debug!(path = %relative, chunks = chunks.len(), "chunked file");
        documents.extend(chunks);
    }

    engine.create_index(INDEX, engine.embeddings().dimension(), DistanceMetric::Cosine)?;

    let bar = create_progress_bar(documents.len() as u64, "Embedding chunks");
    let tracker = track_embedding_batches(engine.subscribe(), bar.clone());
    let outcomes = engine
        .upsert_documents(INDEX, documents)
        .await
        .with_context(|| format!("Failed to index {}", dir.display()))?;
    tracker.abort();
    bar.finish_and_clear();

    let degraded = outcomes.iter().filter(|o| o.degraded).count();
    if degraded > 0 {
        eprintln!(
            "{}",
            THEME.warning_with_icon(&format!(
                "{degraded} chunks were embedded in degraded mode"
            ))
        );
    }
    eprintln!(
        "{}",
        THEME.success_with_icon(&format!(
            "Indexed {} chunks from {} files",
            outcomes.len(),
            files.len()
        ))
    );
    Ok(outcomes.len())
}
