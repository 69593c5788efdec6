use anyhow::{bail, Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,

    // Ethereum JSON-RPC (data source)
    pub rpc_url: String,

    // Training window
    pub block_window: u64,
    pub block_step: u64,

    // Fee recommendation
    pub default_priority_gwei: f64,

    // Fetch pipeline
    pub fetch_max_concurrency: usize,
    pub fetch_retries: u32,
    pub fetch_backoff_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_or("PORT", "3000").parse().context("Invalid PORT")?,

            rpc_url: std::env::var("RPC_URL").context("RPC_URL required")?,

            block_window: env_or("BLOCK_WINDOW", "200")
                .parse::<u64>()
                .context("Invalid BLOCK_WINDOW")?
                .max(1),
            block_step: env_or("BLOCK_STEP", "1")
                .parse::<u64>()
                .context("Invalid BLOCK_STEP")?
                .max(1),

            default_priority_gwei: env_or("DEFAULT_PRIORITY_GWEI", "2")
                .parse()
                .context("Invalid DEFAULT_PRIORITY_GWEI")?,

            fetch_max_concurrency: env_or("FETCH_MAX_CONCURRENCY", "2")
                .parse::<usize>()
                .context("Invalid FETCH_MAX_CONCURRENCY")?
                .max(1),
            fetch_retries: env_or("FETCH_RETRIES", "5")
                .parse()
                .context("Invalid FETCH_RETRIES")?,
            fetch_backoff_ms: env_or("FETCH_BACKOFF_MS", "300")
                .parse()
                .context("Invalid FETCH_BACKOFF_MS")?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !self.rpc_url.starts_with("http") {
            bail!("RPC_URL must be HTTP(S) URL");
        }
        if !(self.default_priority_gwei.is_finite() && self.default_priority_gwei > 0.0) {
            bail!("DEFAULT_PRIORITY_GWEI must be a positive number");
        }

        tracing::info!(
            "Configuration validated: window={} step={} concurrency={}",
            self.block_window,
            self.block_step,
            self.fetch_max_concurrency
        );

        Ok(())
    }
}

fn env_or(var: &str, default: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| default.to_string())
}
