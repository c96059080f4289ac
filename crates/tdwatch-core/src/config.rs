use crate::app_config::{AppConfig, Environment};
use crate::domain::AnalyzerMode;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files, which keeps it usable in tests
/// or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual environment
/// so it can be tested with a pure `HashMap` lookup, with no `set_var`/`remove_var` needed.
#[allow(clippy::too_many_lines)]
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    // Range-checked float; `min_exclusive` rejects the lower bound itself.
    let parse_f64 = |var: &str,
                     default: &str,
                     min: f64,
                     max: f64,
                     min_exclusive: bool|
     -> Result<f64, ConfigError> {
        let value = or_default(var, default)
            .parse::<f64>()
            .map_err(|e| invalid(var, e.to_string()))?;
        let below = if min_exclusive { value <= min } else { value < min };
        if !value.is_finite() || below || value > max {
            let open = if min_exclusive { "(" } else { "[" };
            return Err(invalid(
                var,
                format!("{value} is outside {open}{min}, {max}]"),
            ));
        }
        Ok(value)
    };

    let database_url = require("DATABASE_URL")?;

    let env = parse_environment(&or_default("TDWATCH_ENV", "development"))?;

    let bind_addr = parse_addr("TDWATCH_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("TDWATCH_LOG_LEVEL", "info");
    let politicians_path = PathBuf::from(or_default(
        "TDWATCH_POLITICIANS_PATH",
        "./config/politicians.yaml",
    ));
    let sources_path = PathBuf::from(or_default("TDWATCH_SOURCES_PATH", "./config/sources.yaml"));

    let db_max_connections = parse_u32("TDWATCH_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("TDWATCH_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("TDWATCH_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let judge_base_url = or_default("TDWATCH_JUDGE_BASE_URL", "https://api.openai.com");
    let judge_api_key = lookup("TDWATCH_JUDGE_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty());
    let judge_model = or_default("TDWATCH_JUDGE_MODEL", "gpt-4o-mini");
    #[allow(clippy::cast_possible_truncation)]
    let judge_temperature = parse_f64("TDWATCH_JUDGE_TEMPERATURE", "0.2", 0.0, 2.0, false)? as f32;
    let judge_max_tokens = parse_u32("TDWATCH_JUDGE_MAX_TOKENS", "1200")?;
    let judge_timeout_secs = parse_u64("TDWATCH_JUDGE_TIMEOUT_SECS", "60")?;
    let judge_max_retries = parse_u32("TDWATCH_JUDGE_MAX_RETRIES", "2")?;
    let judge_retry_backoff_base_ms = parse_u64("TDWATCH_JUDGE_RETRY_BACKOFF_BASE_MS", "1000")?;

    let analyzer_mode = or_default("TDWATCH_ANALYZER_MODE", "single")
        .parse::<AnalyzerMode>()
        .map_err(|e| invalid("TDWATCH_ANALYZER_MODE", e.to_string()))?;

    let pipeline_batch_size = parse_u32("TDWATCH_PIPELINE_BATCH_SIZE", "50")?;
    let pipeline_top_percentile =
        parse_f64("TDWATCH_PIPELINE_TOP_PERCENTILE", "25", 0.0, 100.0, true)?;
    let pipeline_min_importance =
        parse_f64("TDWATCH_PIPELINE_MIN_IMPORTANCE", "40", 0.0, 100.0, false)?;
    let pipeline_max_concurrent_calls = parse_usize("TDWATCH_PIPELINE_MAX_CONCURRENT_CALLS", "5")?;
    if pipeline_max_concurrent_calls == 0 {
        return Err(invalid(
            "TDWATCH_PIPELINE_MAX_CONCURRENT_CALLS",
            "must be at least 1".to_string(),
        ));
    }
    let pipeline_mention_min_confidence =
        parse_f64("TDWATCH_PIPELINE_MENTION_MIN_CONFIDENCE", "0.7", 0.0, 1.0, false)?;
    let pipeline_cron = or_default("TDWATCH_PIPELINE_CRON", "0 0 */6 * * *");

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        politicians_path,
        sources_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        judge_base_url,
        judge_api_key,
        judge_model,
        judge_temperature,
        judge_max_tokens,
        judge_timeout_secs,
        judge_max_retries,
        judge_retry_backoff_base_ms,
        analyzer_mode,
        pipeline_batch_size,
        pipeline_top_percentile,
        pipeline_min_importance,
        pipeline_max_concurrent_calls,
        pipeline_mention_min_confidence,
        pipeline_cron,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test`, or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "TDWATCH_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
