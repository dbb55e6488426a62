use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 60;
pub const DEFAULT_BATCH_WORKERS: usize = 3;
pub const DEFAULT_BATCH_SHUTDOWN_GRACE_SECONDS: u64 = 5;
pub const DEFAULT_SERVER_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_key: String,
    pub cache_ttl_seconds: u64,
    pub batch_workers: usize,
    pub batch_shutdown_grace_seconds: u64,
    pub server_port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_service_key: String::new(),
            cache_ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
            batch_workers: DEFAULT_BATCH_WORKERS,
            batch_shutdown_grace_seconds: DEFAULT_BATCH_SHUTDOWN_GRACE_SECONDS,
            server_port: DEFAULT_SERVER_PORT,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, falling back to in-memory store");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_service_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_default(),
            cache_ttl_seconds: parse_or_default("CACHE_TTL_SECONDS", DEFAULT_CACHE_TTL_SECONDS),
            batch_workers: parse_or_default("BATCH_WORKERS", DEFAULT_BATCH_WORKERS),
            batch_shutdown_grace_seconds: parse_or_default(
                "BATCH_SHUTDOWN_GRACE_SECONDS",
                DEFAULT_BATCH_SHUTDOWN_GRACE_SECONDS,
            ),
            server_port: parse_or_default("SERVER_PORT", DEFAULT_SERVER_PORT),
        };

        if config.batch_workers == 0 {
            warn!("BATCH_WORKERS must be at least 1, using {}", DEFAULT_BATCH_WORKERS);
            return Self { batch_workers: DEFAULT_BATCH_WORKERS, ..config };
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }

    /// Key sent as the bearer token to PostgREST. The service role key wins
    /// when present so row-level security does not hide other patients' rows
    /// from the availability check.
    pub fn supabase_bearer_key(&self) -> &str {
        if self.supabase_service_key.is_empty() {
            &self.supabase_anon_key
        } else {
            &self.supabase_service_key
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    pub fn batch_shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.batch_shutdown_grace_seconds)
    }
}

fn parse_or_default<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display + Copy,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.cache_ttl(), Duration::from_secs(60));
        assert_eq!(config.batch_workers, 3);
        assert_eq!(config.batch_shutdown_grace(), Duration::from_secs(5));
        assert!(!config.is_configured());
    }

    #[test]
    fn service_key_preferred_over_anon_key() {
        let mut config = AppConfig {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "anon".to_string(),
            ..AppConfig::default()
        };
        assert!(config.is_configured());
        assert_eq!(config.supabase_bearer_key(), "anon");

        config.supabase_service_key = "service".to_string();
        assert_eq!(config.supabase_bearer_key(), "service");
    }

    const KEYS: [&str; 7] = [
        "SUPABASE_URL",
        "SUPABASE_ANON_PUBLIC_KEY",
        "SUPABASE_SERVICE_ROLE_KEY",
        "CACHE_TTL_SECONDS",
        "BATCH_WORKERS",
        "BATCH_SHUTDOWN_GRACE_SECONDS",
        "SERVER_PORT",
    ];

    fn clear_env() {
        for key in KEYS {
            env::remove_var(key);
        }
    }

    // Environment is process-wide, so every from_env case runs in this one test.
    #[test]
    fn from_env_falls_back_on_missing_and_invalid_values() {
        clear_env();
        let config = AppConfig::from_env();
        assert!(config.supabase_url.is_empty());
        assert!(!config.is_configured());
        assert_eq!(config.cache_ttl_seconds, DEFAULT_CACHE_TTL_SECONDS);
        assert_eq!(config.batch_workers, DEFAULT_BATCH_WORKERS);
        assert_eq!(config.server_port, DEFAULT_SERVER_PORT);

        env::set_var("CACHE_TTL_SECONDS", "soon");
        env::set_var("SERVER_PORT", "99999");
        env::set_var("BATCH_WORKERS", "0");
        let config = AppConfig::from_env();
        assert_eq!(config.cache_ttl_seconds, DEFAULT_CACHE_TTL_SECONDS);
        assert_eq!(config.server_port, DEFAULT_SERVER_PORT);
        assert_eq!(config.batch_workers, DEFAULT_BATCH_WORKERS);

        env::set_var("SUPABASE_URL", "http://localhost:54321");
        env::set_var("SUPABASE_ANON_PUBLIC_KEY", "anon");
        env::set_var("CACHE_TTL_SECONDS", " 30 ");
        env::set_var("BATCH_WORKERS", "5");
        env::set_var("BATCH_SHUTDOWN_GRACE_SECONDS", "2");
        env::set_var("SERVER_PORT", "8080");
        let config = AppConfig::from_env();
        assert!(config.is_configured());
        assert_eq!(config.cache_ttl(), Duration::from_secs(30));
        assert_eq!(config.batch_workers, 5);
        assert_eq!(config.batch_shutdown_grace(), Duration::from_secs(2));
        assert_eq!(config.server_port, 8080);

        clear_env();
    }
}
