use std::time::Duration;

use clap::Parser;

/// Default bound on every individual store call.
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;
/// Compare-and-swap retries after the first attempt.
pub const DEFAULT_CAS_RETRIES: usize = 1;

/// Engine-level knobs consumed by [`crate::sync::CompanySyncService`].
#[derive(Debug, Clone)]
pub struct SyncPolicy {
    /// Upper bound for a single store operation.
    pub store_timeout: Duration,
    /// How many times a lost compare-and-swap is retried from a fresh read.
    pub cas_retries: usize,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
            cas_retries: DEFAULT_CAS_RETRIES,
        }
    }
}

impl SyncPolicy {
    pub fn store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn cas_retries(mut self, retries: usize) -> Self {
        self.cas_retries = retries;
        self
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "company-profile-sync")]
#[command(about = "Delta-driven company profile synchronisation service")]
pub struct AppConfig {
    #[arg(long, env = "APP_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "APP_PORT", default_value_t = 8080)]
    pub port: u16,

    #[arg(long, env = "STORE_TIMEOUT_MS", default_value_t = DEFAULT_STORE_TIMEOUT_MS)]
    pub store_timeout_ms: u64,

    #[arg(long, env = "CAS_RETRIES", default_value_t = DEFAULT_CAS_RETRIES)]
    pub cas_retries: usize,

    /// Resource-changed endpoint; notifications are disabled when unset.
    #[arg(long, env = "RESOURCE_CHANGED_URL")]
    pub notify_url: Option<String>,

    #[arg(long, env = "RESOURCE_CHANGED_API_KEY", hide_env_values = true)]
    pub notify_api_key: Option<String>,

    #[arg(long, env = "NOTIFY_TIMEOUT_MS", default_value_t = 10_000)]
    pub notify_timeout_ms: u64,
}

impl AppConfig {
    /// Loads `.env` (if any) and parses command line arguments, falling back
    /// to environment variables.
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Self::parse()
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn policy(&self) -> SyncPolicy {
        SyncPolicy::default()
            .store_timeout(Duration::from_millis(self.store_timeout_ms.max(1)))
            .cas_retries(self.cas_retries)
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_millis(self.notify_timeout_ms.max(1))
    }
}
