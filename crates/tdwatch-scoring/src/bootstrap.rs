//! Wires a [`Pipeline`] from application config.

use std::sync::Arc;

use sqlx::PgPool;
use tdwatch_core::{load_sources, AnalyzerMode, AppConfig};
use tdwatch_judge::{JudgeClient, JudgeConfig};

use crate::analyzer::{ImpactAnalyzer, PanelAnalyzer, SinglePassAnalyzer};
use crate::backend::CompletionBackend;
use crate::error::ScoringError;
use crate::importance::LlmImportanceScorer;
use crate::pg_store::PgStore;
use crate::pipeline::{Pipeline, PipelineSettings};

/// Build the production pipeline: Postgres store, LLM scorer, and the
/// analyzer selected by `analyzer_mode`.
///
/// # Errors
///
/// Returns [`ScoringError::Config`] if the source reliability file cannot be
/// loaded, or [`ScoringError::Judge`] if the judge client cannot be built.
pub fn build_pipeline(config: &AppConfig, pool: PgPool) -> Result<Pipeline, ScoringError> {
    let sources = load_sources(&config.sources_path)?;
    let client = JudgeClient::new(JudgeConfig::from_app_config(config))?;
    tracing::info!(
        model = client.model(),
        endpoint = %client.endpoint(),
        analyzer = %config.analyzer_mode,
        "judge client ready"
    );
    let backend: Arc<dyn CompletionBackend> = Arc::new(client);

    let analyzer: Arc<dyn ImpactAnalyzer> = match config.analyzer_mode {
        AnalyzerMode::Single => Arc::new(SinglePassAnalyzer::new(Arc::clone(&backend))),
        AnalyzerMode::Panel => Arc::new(PanelAnalyzer::new(Arc::clone(&backend))),
    };

    Ok(Pipeline::new(
        Arc::new(PgStore::new(pool)),
        Arc::new(LlmImportanceScorer::new(backend)),
        analyzer,
        PipelineSettings::from_app_config(config, sources),
    ))
}
