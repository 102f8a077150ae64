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
/// Decoupled from the process environment so tests can feed a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
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

    let database_url = require("DATABASE_URL")?;
    let functions_url = require("COPYDESK_FUNCTIONS_URL")?;
    let functions_anon_key = require("COPYDESK_FUNCTIONS_ANON_KEY")?;

    let env = parse_environment(&or_default("COPYDESK_ENV", "development"))?;

    let bind_addr = or_default("COPYDESK_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("COPYDESK_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("COPYDESK_LOG_LEVEL", "info");
    let prompts_path = lookup("COPYDESK_PROMPTS_PATH").ok().map(PathBuf::from);

    let db_max_connections = parse_u32("COPYDESK_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("COPYDESK_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("COPYDESK_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let pipeline_request_timeout_secs = parse_u64("COPYDESK_PIPELINE_TIMEOUT_SECS", "120")?;
    let pipeline_retry_delay_ms = parse_u64("COPYDESK_PIPELINE_RETRY_DELAY_MS", "1000")?;
    let pricing_url = or_default("COPYDESK_PRICING_URL", "/pricing");

    if db_min_connections > db_max_connections {
        return Err(invalid(
            "COPYDESK_DB_MIN_CONNECTIONS",
            format!("{db_min_connections} exceeds COPYDESK_DB_MAX_CONNECTIONS ({db_max_connections})"),
        ));
    }

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        functions_url: functions_url.trim_end_matches('/').to_string(),
        functions_anon_key,
        prompts_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        pipeline_request_timeout_secs,
        pipeline_retry_delay_ms,
        pricing_url,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "COPYDESK_ENV".to_string(),
            reason: format!("expected development, test, or production; got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
