//! Thin inspection tool: load a tree snapshot, apply configuration
//! overrides, report its shape (§13).
//!
//! The core crate is generic over whatever genome type a host simulation
//! provides; this binary has no such host, so it reads snapshots through
//! the scalar demonstration genome exposed by the `test-support` feature
//! (enabled by default on this crate).

use anyhow::{Context, Result};
use clap::Parser;
use phylocore::genome::test_support::ScalarGenome;
use phylocore::{Config, JudgeRule, PhyloTree};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "phylocore-cli", about = "Inspect a phylogenetic tree snapshot")]
struct Args {
    /// Path to a JSON tree snapshot.
    tree: Option<PathBuf>,

    #[arg(long)]
    compatibility_threshold: Option<f64>,

    #[arg(long)]
    avg_compatibility_threshold: Option<f64>,

    #[arg(long)]
    similarity_threshold: Option<f64>,

    #[arg(long)]
    enveloppe_size: Option<usize>,

    #[arg(long)]
    simple_new_species: Option<bool>,

    #[arg(long)]
    ignore_hybrids: Option<bool>,

    #[arg(long)]
    full_continuous: Option<bool>,

    /// One of: max-average, max-min-distance, max-mean-min-stddev, weighted-distance-to-mean.
    #[arg(long)]
    judge_rule: Option<String>,
}

fn apply_overrides(mut config: Config, args: &Args) -> Result<Config> {
    if let Some(v) = args.compatibility_threshold {
        config.compatibility_threshold = v;
    }
    if let Some(v) = args.avg_compatibility_threshold {
        config.avg_compatibility_threshold = v;
    }
    if let Some(v) = args.similarity_threshold {
        config.similarity_threshold = v;
    }
    if let Some(v) = args.enveloppe_size {
        config.enveloppe_size = v;
    }
    if let Some(v) = args.simple_new_species {
        config.simple_new_species = v;
    }
    if let Some(v) = args.ignore_hybrids {
        config.ignore_hybrids = v;
    }
    if let Some(v) = args.full_continuous {
        config.full_continuous = v;
    }
    if let Some(tag) = &args.judge_rule {
        config.judge_rule = parse_judge_rule(tag)?;
    }
    Ok(config)
}

fn parse_judge_rule(tag: &str) -> Result<JudgeRule> {
    serde_json::from_value(serde_json::Value::String(tag.to_string()))
        .with_context(|| format!("unrecognised judge rule '{tag}'"))
}

fn run(tree_path: &PathBuf, args: &Args) -> Result<()> {
    let text = std::fs::read_to_string(tree_path)
        .with_context(|| format!("reading snapshot {}", tree_path.display()))?;

    let config = apply_overrides(Config::default(), args)?;

    let tree = PhyloTree::<ScalarGenome, ()>::load_from_str(&text, config)
        .with_context(|| format!("loading snapshot {}", tree_path.display()))?;

    println!("width: {}", tree.species_count());
    println!("step: {}", tree.current_step());
    println!("hybrids: {}", tree.hybrid_count());

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let Some(tree_path) = args.tree.clone() else {
        eprintln!("error: missing required argument <TREE>");
        return ExitCode::from(1);
    };

    match run(&tree_path, &args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "phylocore-cli failed");
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}
