use crate::app_config::{AppConfig, Environment};
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
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Parsing and validation live here, decoupled from the real process
/// environment so tests can drive it with a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_positive_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        let value = raw
            .parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })?;
        if value == 0 {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(value)
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("REVDB_ENV", "development"))?;
    let log_level = or_default("REVDB_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("REVDB_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("REVDB_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("REVDB_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let classifier_url = or_default("REVDB_CLASSIFIER_URL", "https://api.openai.com/v1");
    let classifier_api_key = lookup("REVDB_CLASSIFIER_API_KEY")
        .ok()
        .filter(|key| !key.trim().is_empty());
    let classifier_model = or_default("REVDB_CLASSIFIER_MODEL", "gpt-4o-mini");
    let classifier_timeout_secs = parse_u64("REVDB_CLASSIFIER_TIMEOUT_SECS", "30")?;

    let analysis_workers = parse_positive_usize("REVDB_ANALYSIS_WORKERS", "4")?;
    let analysis_queue_capacity = parse_positive_usize("REVDB_ANALYSIS_QUEUE_CAPACITY", "256")?;
    let analysis_sweep_capacity = parse_positive_usize("REVDB_ANALYSIS_SWEEP_CAPACITY", "32")?;
    let analysis_max_attempts = parse_u32("REVDB_ANALYSIS_MAX_ATTEMPTS", "5")?;
    if analysis_max_attempts == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "REVDB_ANALYSIS_MAX_ATTEMPTS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let analysis_backoff_base_ms = parse_u64("REVDB_ANALYSIS_BACKOFF_BASE_MS", "1000")?;

    let reprocess_cron = or_default("REVDB_REPROCESS_CRON", "0 */15 * * * *");
    let trends_default_top = parse_positive_usize("REVDB_TRENDS_DEFAULT_TOP", "5")?;

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        classifier_url,
        classifier_api_key,
        classifier_model,
        classifier_timeout_secs,
        analysis_workers,
        analysis_queue_capacity,
        analysis_sweep_capacity,
        analysis_max_attempts,
        analysis_backoff_base_ms,
        reprocess_cron,
        trends_default_top,
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
            var: "REVDB_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
