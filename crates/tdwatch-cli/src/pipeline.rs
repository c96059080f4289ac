//! Pipeline command handlers.

use clap::Subcommand;
use tdwatch_core::AppConfig;
use tdwatch_scoring::{build_pipeline, ProcessingOptions, ProcessingStats};

#[derive(Debug, Subcommand)]
pub enum PipelineCommands {
    /// Process a batch of unprocessed articles
    Run {
        /// Articles to fetch (defaults to TDWATCH_PIPELINE_BATCH_SIZE)
        #[arg(long)]
        batch_size: Option<u32>,

        /// Keep the top N percent of the batch by importance
        #[arg(long)]
        top_percentile: Option<f64>,

        /// Absolute importance floor, 0-100
        #[arg(long)]
        min_importance: Option<f64>,

        /// Score, select, dedup, and extract mentions without writing or
        /// calling the impact analyzer
        #[arg(long)]
        dry_run: bool,
    },
    /// Process one article by id
    Article {
        #[arg(long)]
        id: i64,

        /// Reprocess an already-processed article. Refused once its ratings
        /// have been applied.
        #[arg(long)]
        force: bool,
    },
}

/// Merge CLI overrides onto configured defaults and validate the ranges.
pub(crate) fn batch_options(
    config: &AppConfig,
    batch_size: Option<u32>,
    top_percentile: Option<f64>,
    min_importance: Option<f64>,
    dry_run: bool,
) -> anyhow::Result<ProcessingOptions> {
    let options = ProcessingOptions {
        batch_size: batch_size.unwrap_or(config.pipeline_batch_size),
        top_percentile: top_percentile.unwrap_or(config.pipeline_top_percentile),
        min_importance_score: min_importance.unwrap_or(config.pipeline_min_importance),
        dry_run,
        trigger_source: "cli".to_string(),
    };
    if options.batch_size == 0 {
        anyhow::bail!("--batch-size must be at least 1");
    }
    if !(options.top_percentile > 0.0 && options.top_percentile <= 100.0) {
        anyhow::bail!("--top-percentile must be in (0, 100]");
    }
    if !(0.0..=100.0).contains(&options.min_importance_score) {
        anyhow::bail!("--min-importance must be in [0, 100]");
    }
    Ok(options)
}

fn print_stats(stats: &ProcessingStats, dry_run: bool) {
    let prefix = if dry_run { "dry-run: " } else { "" };
    println!(
        "{prefix}fetched {}, selected {}, skipped {}, duplicates {}, canonical {}",
        stats.fetched,
        stats.selected,
        stats.skipped_low_importance,
        stats.duplicates,
        stats.canonical_processed
    );
    println!(
        "{prefix}mentions: {} found, {} suppressed, {} analyzed, {} failed",
        stats.mentions_found,
        stats.mentions_suppressed,
        stats.mentions_analyzed,
        stats.analyses_failed
    );
    if !dry_run {
        println!(
            "rating changes {}, ideology updates {}, commit failures {}, \
             secondary write failures {}",
            stats.rating_changes,
            stats.ideology_updates,
            stats.commit_failures,
            stats.secondary_write_failures
        );
    }
}

pub(crate) async fn run(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    command: PipelineCommands,
) -> anyhow::Result<()> {
    let pipeline = build_pipeline(config, pool.clone())?;

    match command {
        PipelineCommands::Run {
            batch_size,
            top_percentile,
            min_importance,
            dry_run,
        } => {
            let options =
                batch_options(config, batch_size, top_percentile, min_importance, dry_run)?;
            let stats = pipeline.process_unprocessed_articles(&options).await?;
            print_stats(&stats, dry_run);
            if stats.commit_failures > 0 {
                tracing::warn!(
                    commit_failures = stats.commit_failures,
                    "some articles were left unprocessed and will be retried next run"
                );
            }
        }
        PipelineCommands::Article { id, force } => {
            let stats = pipeline.process_article_by_id(id, force).await?;
            if stats.already_processed > 0 {
                println!("article {id} is already processed; pass --force to reprocess");
            } else {
                print_stats(&stats, false);
            }
        }
    }
    Ok(())
}
