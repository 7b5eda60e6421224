//! Riffle developer CLI
//!
//! Search or autocomplete over a JSON corpus (or the seed catalog), and
//! generate synthetic catalogs for benchmarking.
//!
//! Run with: cargo run -p riffle-cli -- search "Pottr"

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::prelude::*;
use rand::rngs::StdRng;
use riffle::{
    CatalogSearch, CatalogSearchApi, CorpusProvider, JsonFileCorpus, Record, SearchConfig, SearchQuery,
    StaticCorpus, DEFAULT_LIMIT, DEFAULT_SUGGEST_LIMIT, DEFAULT_THRESHOLD,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "riffle", author, version, about, long_about = None)]
struct Args {
    /// JSON array of records to search (defaults to the seed catalog)
    #[arg(long, global = true)]
    corpus: Option<PathBuf>,

    /// JSON search config (defaults to title 0.5 / author 0.3 / genre 0.2)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ranked fuzzy search
    Search {
        text: String,

        #[arg(short, long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,

        /// Maximum distance (0 = exact only, 1 = anything)
        #[arg(short, long, default_value_t = DEFAULT_THRESHOLD)]
        threshold: f64,
    },
    /// Autocomplete suggestions for partial input
    Suggest {
        text: String,

        #[arg(short, long, default_value_t = DEFAULT_SUGGEST_LIMIT)]
        limit: usize,
    },
    /// Write a synthetic book catalog as JSON records
    Generate {
        #[arg(short, long)]
        count: usize,

        #[arg(short, long, default_value_t = 42)]
        seed: u64,

        #[arg(short, long)]
        output: PathBuf,
    },
}

fn init_tracing(verbose: u8) -> Result<()> {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
}

// ─────────────────────────────────────────────────────────────────────────────
// CORPUS + CONFIG
// ─────────────────────────────────────────────────────────────────────────────

fn load_provider(corpus: Option<&Path>) -> Arc<dyn CorpusProvider> {
    match corpus {
        Some(path) => Arc::new(JsonFileCorpus::new(path)),
        None => Arc::new(StaticCorpus::new(demo_data::records())),
    }
}

fn load_config(path: Option<&Path>) -> Result<SearchConfig> {
    let Some(path) = path else {
        return Ok(SearchConfig::books());
    };
    let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(SearchConfig::from_json(&json)?)
}

// ─────────────────────────────────────────────────────────────────────────────
// SYNTHETIC CATALOG
// ─────────────────────────────────────────────────────────────────────────────

const FIRST_NAMES: &[&str] = &["Ada", "Jane", "George", "Harper", "Paulo", "Ursula", "Toni", "Italo", "Mary", "Kazuo"];
const LAST_NAMES: &[&str] = &["Austen", "Orwell", "Lee", "Coelho", "Le Guin", "Morrison", "Calvino", "Shelley", "Ishiguro", "Tolkien"];

fn generate_catalog(count: usize, seed: u64) -> Vec<Record> {
    let mut rng = StdRng::seed_from_u64(seed);
    (1..=count)
        .map(|id| {
            let words = rng.gen_range(1..=3);
            let mut title: Vec<&str> = Vec::with_capacity(words + 1);
            if rng.gen_bool(0.4) {
                title.push("The");
            }
            for _ in 0..words {
                title.push(demo_data::TITLE_WORDS.choose(&mut rng).copied().unwrap_or("Untitled"));
            }
            let first = FIRST_NAMES.choose(&mut rng).copied().unwrap_or("Anon");
            let last = LAST_NAMES.choose(&mut rng).copied().unwrap_or("Ymous");
            let genre = demo_data::GENRES.choose(&mut rng).copied().unwrap_or("Fiction");

            Record::new(id.to_string())
                .with_field("title", title.join(" "))
                .with_field("author", format!("{} {}", first, last))
                .with_field("genre", genre)
        })
        .collect()
}

fn write_catalog(records: &[Record], output: &Path) -> Result<()> {
    let file = File::create(output).with_context(|| format!("creating {}", output.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), records)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose)?;

    match args.command {
        Command::Generate { count, seed, output } => {
            let records = generate_catalog(count, seed);
            write_catalog(&records, &output)?;
            tracing::info!(count, seed, output = %output.display(), "wrote synthetic catalog");
        }
        Command::Search { text, limit, threshold } => {
            let store = CatalogSearch::new(load_provider(args.corpus.as_deref()), load_config(args.config.as_deref())?)?;
            let query = SearchQuery::new(text).with_limit(limit).with_threshold(threshold);
            let response = store.search(query).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Suggest { text, limit } => {
            let store = CatalogSearch::new(load_provider(args.corpus.as_deref()), load_config(args.config.as_deref())?)?;
            let suggestions = store.suggest(text, limit).await?;
            println!("{}", serde_json::to_string_pretty(&suggestions)?);
        }
    }

    Ok(())
}
