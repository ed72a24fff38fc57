use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use kgforge_core::embedding::Embedder;
use kgforge_core::extraction::{decode_jsonl, RawTriple};
use kgforge_core::normalize::{EntityNormalizer, RelationNormalizer};
use kgforge_core::{CanonicalRegistry, EntityType, Pipeline, PipelineConfig, TripleStore};

#[derive(Parser)]
#[command(name = "kgforge")]
#[command(about = "Normalize, validate and deduplicate extracted knowledge triples", long_about = None)]
struct Cli {
    /// Config file (defaults to ./kgforge.toml, then the user config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline over a JSON Lines file of raw triples
    Run {
        #[arg(long)]
        input: PathBuf,
        /// Triple store snapshot to diff against and update
        #[arg(long)]
        store: Option<PathBuf>,
        /// Write the run report as JSON
        #[arg(long)]
        output: Option<PathBuf>,
        /// Enable incremental mode regardless of config
        #[arg(long)]
        incremental: bool,
    },
    /// Validate raw triples and print the report
    Validate {
        #[arg(long)]
        input: PathBuf,
    },
    /// Resolve an entity name to its canonical form
    Normalize {
        name: String,
        #[arg(long = "type")]
        entity_type: String,
    },
    /// Resolve a relation name
    Relation { name: String },
    /// Show triple store statistics
    Stats {
        #[arg(long)]
        store: PathBuf,
    },
    /// Print the effective configuration
    Config,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            input,
            store,
            output,
            incremental,
        } => {
            let mut config = config;
            if incremental {
                config.features.incremental = true;
            }
            run(config, &input, store.as_deref(), output.as_deref())
        }
        Commands::Validate { input } => {
            let mut config = config;
            config.features.incremental = false;
            config.features.clustering = false;
            let mut pipeline = Pipeline::new(config, Arc::new(CanonicalRegistry::seeded()), None)?;
            let records = read_records(&input)?;
            let report = pipeline.run(records, None);
            println!("{}", report.validation.render());
            Ok(())
        }
        Commands::Normalize { name, entity_type } => {
            let entity_type = EntityType::parse(&entity_type);
            if entity_type.is_unknown() {
                return Err(eyre!("Unknown entity type: {}", entity_type));
            }

            let mut normalizer = EntityNormalizer::new(Arc::new(CanonicalRegistry::seeded()))
                .with_threshold(config.normalization.similarity_threshold);
            if let Some(embedder) = build_embedder(&config) {
                normalizer = normalizer.with_embedder(embedder);
            }

            let resolution = normalizer.normalize(&name, &entity_type);
            match &resolution.canonical {
                Some(canonical) => {
                    println!("{} -> {}", name, canonical);
                    println!("  Type: {}", entity_type);
                    println!("  Method: {}", resolution.method);
                    println!("  Confidence: {:.3}", resolution.confidence);
                }
                None => println!("{} ({}) has no canonical form", name, entity_type),
            }
            Ok(())
        }
        Commands::Relation { name } => {
            match RelationNormalizer::new().resolve(&name) {
                Some((relation, matched)) => println!("{} -> {} ({:?})", name, relation, matched),
                None => println!("{} does not match any known relation", name),
            }
            Ok(())
        }
        Commands::Stats { store } => {
            let store = TripleStore::load(&store)
                .wrap_err_with(|| format!("Failed to load store {}", store.display()))?;
            let stats = store.stats();
            println!("Total triples: {}", stats.total_triples);
            println!("Total evidence sources: {}", stats.total_evidence_sources);
            println!("Avg evidence per triple: {:.2}", stats.avg_evidence_per_triple);
            Ok(())
        }
        Commands::Config => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let config = match path {
        Some(path) => PipelineConfig::from_file(path)
            .wrap_err_with(|| format!("Failed to load config {}", path.display()))?,
        None => PipelineConfig::load()?,
    };
    Ok(config)
}

fn read_records(path: &Path) -> Result<Vec<RawTriple>> {
    let text = fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
    let batch = decode_jsonl(&text);
    if !batch.quarantined.is_empty() {
        warn!(count = batch.quarantined.len(), "Some lines were quarantined");
    }
    Ok(batch.records)
}

fn run(
    config: PipelineConfig,
    input: &Path,
    store: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let records = read_records(input)?;
    let embedder = build_embedder(&config);
    let mut pipeline = Pipeline::new(config, Arc::new(CanonicalRegistry::seeded()), embedder)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner} {msg}")?);
    spinner.set_message(format!("Processing {} triples...", records.len()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = match store {
        Some(path) => pipeline.run_with_snapshot(records, path),
        None => Ok(pipeline.run(records, None)),
    };
    spinner.finish_and_clear();
    let report = result?;

    println!("Run {}", report.run_id);
    println!("{}", report.validation.render());
    println!();
    println!("Merged triples: {}", report.merged.len());
    println!("Merge conflicts: {}", report.merge_conflicts.len());
    println!("Normalization conflicts: {}", report.normalization_conflicts.len());
    println!("Entity clusters: {}", report.clusters.len());
    if let Some(diff) = &report.diff {
        println!();
        println!("{}", diff.render());
    }
    if let Some(stats) = &report.diff_stats {
        println!(
            "Applied: {} added, {} updated, {} conflicts",
            stats.added, stats.updated, stats.conflicts
        );
    }

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json).wrap_err_with(|| format!("Failed to write {}", path.display()))?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}

#[cfg(feature = "fastembed")]
fn build_embedder(config: &PipelineConfig) -> Option<Arc<dyn Embedder>> {
    use kgforge_core::embedding::FastEmbedder;

    match FastEmbedder::from_name(&config.normalization.embedding_model) {
        Ok(embedder) => Some(Arc::new(embedder)),
        Err(e) => {
            warn!(error = %e, "Failed to load embedding model, using rule-based matching only");
            None
        }
    }
}

#[cfg(not(feature = "fastembed"))]
fn build_embedder(_config: &PipelineConfig) -> Option<Arc<dyn Embedder>> {
    warn!("Built without the fastembed feature, using rule-based matching only");
    None
}
