use std::time::Duration;

use signbank_core::error::CoreError;

/// Worker settings loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Pause between poster sweeps.
    pub sweep_interval: Duration,
    /// Maximum concurrent frame extractions per sweep.
    pub sweep_concurrency: usize,
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                      | Default    |
    /// |------------------------------|------------|
    /// | `DATABASE_URL`               | (required) |
    /// | `POSTER_SWEEP_INTERVAL_SECS` | `300`      |
    /// | `POSTER_SWEEP_CONCURRENCY`   | `4`        |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| CoreError::Validation("DATABASE_URL must be set".into()))?;

        let interval_secs: u64 = parse_or(&lookup, "POSTER_SWEEP_INTERVAL_SECS", 300)?;
        let sweep_concurrency: usize = parse_or(&lookup, "POSTER_SWEEP_CONCURRENCY", 4)?;
        if sweep_concurrency == 0 {
            return Err(CoreError::Validation(
                "POSTER_SWEEP_CONCURRENCY must be at least 1".into(),
            ));
        }

        Ok(Self {
            database_url,
            sweep_interval: Duration::from_secs(interval_secs),
            sweep_concurrency,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, CoreError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| CoreError::Validation(format!("{key} must be a number, got '{raw}'"))),
        None => Ok(default),
    }
}
