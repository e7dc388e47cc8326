//! Environment-driven configuration.
//!
//! Values are read from the process environment after loading an optional
//! `.env` file. Every section has a `Default` so the library can be used
//! without any environment at all.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::retry::RetryPolicy;

/// Top-level configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub database: Option<DatabaseConfig>,
    pub llm: LlmConfig,
    pub editor: EditorConfig,
    pub generation: GenerationConfig,
    pub loading: LoadConfig,
    pub server: ServerConfig,
}

impl Config {
    /// Load configuration from `.env` and the environment.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let database = std::env::var("DATABASE_URL").ok().map(|url| DatabaseConfig {
            url,
            pool_size: env_or("DATABASE_POOL_SIZE", 10),
        });

        let llm_defaults = LlmConfig::default();
        let llm = LlmConfig {
            base_url: std::env::var("LLM_BASE_URL").unwrap_or(llm_defaults.base_url),
            model: std::env::var("LLM_MODEL").unwrap_or(llm_defaults.model),
            api_key: std::env::var("LLM_API_KEY").ok().map(SecretString::from),
            timeout: Duration::from_secs(env_or("LLM_TIMEOUT_SECS", 120)),
        };

        let editor = EditorConfig {
            autosave_quiet_period: Duration::from_secs(env_or("PROFITPILOT_AUTOSAVE_SECS", 10)),
        };

        let generation = GenerationConfig {
            attempts: env_or("PROFITPILOT_GENERATION_ATTEMPTS", 3),
            backoff: Duration::from_millis(env_or("PROFITPILOT_GENERATION_BACKOFF_MS", 1000)),
        };

        let loading = LoadConfig {
            retries: env_or("PROFITPILOT_LOAD_RETRIES", 2),
            retry_delay: Duration::from_millis(env_or("PROFITPILOT_LOAD_RETRY_DELAY_MS", 1500)),
        };

        let server_defaults = ServerConfig::default();
        let server = ServerConfig {
            bind: env_or("PROFITPILOT_BIND", server_defaults.bind),
            public_url: std::env::var("PROFITPILOT_PUBLIC_URL")
                .unwrap_or(server_defaults.public_url),
        };

        Self {
            database,
            llm,
            editor,
            generation,
            loading,
            server,
        }
    }

    pub fn with_database(mut self, database: DatabaseConfig) -> Self {
        self.database = Some(database);
        self
    }

    pub fn with_bind(mut self, bind: SocketAddr) -> Self {
        self.server.bind = bind;
        self
    }

    pub fn with_public_url(mut self, public_url: impl Into<String>) -> Self {
        self.server.public_url = public_url.into();
        self
    }

    pub fn with_autosave_quiet_period(mut self, period: Duration) -> Self {
        self.editor.autosave_quiet_period = period;
        self
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring unparseable {}={:?}", key, raw);
            default
        }),
        Err(_) => default,
    }
}

/// PostgreSQL connection settings.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: usize,
}

impl DatabaseConfig {
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// OpenAI-compatible generation endpoint.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<SecretString>,
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            timeout: Duration::from_secs(120),
        }
    }
}

/// Bid editing session settings.
#[derive(Debug, Clone)]
pub struct EditorConfig {
    /// Quiet period after the last edit before a draft is autosaved.
    pub autosave_quiet_period: Duration,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            autosave_quiet_period: Duration::from_secs(10),
        }
    }
}

/// Retry settings for AI generation calls.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub attempts: u32,
    /// Linear backoff step: the n-th retry waits `n * backoff`.
    pub backoff: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

impl GenerationConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::linear(self.attempts, self.backoff)
    }
}

/// Retry settings for read paths such as the bid list.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Additional attempts after the first failure.
    pub retries: u32,
    pub retry_delay: Duration,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            retries: 2,
            retry_delay: Duration::from_millis(1500),
        }
    }
}

impl LoadConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.retries + 1, self.retry_delay)
    }
}

/// Public proposal link server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Base URL used when building shareable proposal links.
    pub public_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            public_url: "http://127.0.0.1:8080".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.editor.autosave_quiet_period, Duration::from_secs(10));
        assert_eq!(config.generation.attempts, 3);
        assert_eq!(config.loading.retries, 2);
        assert!(config.database.is_none());
    }

    #[test]
    fn test_builder_overrides() {
        let bind: SocketAddr = "0.0.0.0:9000".parse().unwrap();
        let config = Config::default()
            .with_bind(bind)
            .with_public_url("https://bids.example.com")
            .with_autosave_quiet_period(Duration::from_secs(3));
        assert_eq!(config.server.bind, bind);
        assert_eq!(config.server.public_url, "https://bids.example.com");
        assert_eq!(config.editor.autosave_quiet_period, Duration::from_secs(3));
    }

    #[test]
    fn test_load_policy_counts_first_attempt() {
        let policy = LoadConfig::default().retry_policy();
        assert_eq!(policy.attempts, 3);
    }
}
