use std::net::SocketAddr;
use std::path::PathBuf;

use crate::domain::AnalyzerMode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub politicians_path: PathBuf,
    pub sources_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub judge_base_url: String,
    pub judge_api_key: Option<String>,
    pub judge_model: String,
    pub judge_temperature: f32,
    pub judge_max_tokens: u32,
    pub judge_timeout_secs: u64,
    pub judge_max_retries: u32,
    pub judge_retry_backoff_base_ms: u64,
    pub analyzer_mode: AnalyzerMode,
    pub pipeline_batch_size: u32,
    pub pipeline_top_percentile: f64,
    pub pipeline_min_importance: f64,
    pub pipeline_max_concurrent_calls: usize,
    pub pipeline_mention_min_confidence: f64,
    pub pipeline_cron: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("politicians_path", &self.politicians_path)
            .field("sources_path", &self.sources_path)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("judge_base_url", &self.judge_base_url)
            .field(
                "judge_api_key",
                &self.judge_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("judge_model", &self.judge_model)
            .field("judge_temperature", &self.judge_temperature)
            .field("judge_max_tokens", &self.judge_max_tokens)
            .field("judge_timeout_secs", &self.judge_timeout_secs)
            .field("judge_max_retries", &self.judge_max_retries)
            .field(
                "judge_retry_backoff_base_ms",
                &self.judge_retry_backoff_base_ms,
            )
            .field("analyzer_mode", &self.analyzer_mode)
            .field("pipeline_batch_size", &self.pipeline_batch_size)
            .field("pipeline_top_percentile", &self.pipeline_top_percentile)
            .field("pipeline_min_importance", &self.pipeline_min_importance)
            .field(
                "pipeline_max_concurrent_calls",
                &self.pipeline_max_concurrent_calls,
            )
            .field(
                "pipeline_mention_min_confidence",
                &self.pipeline_mention_min_confidence,
            )
            .field("pipeline_cron", &self.pipeline_cron)
            .finish()
    }
}
