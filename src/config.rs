use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::DEFAULT_LOGIN_URL;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub feed: FeedConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Lifetime of the cached index page, in seconds.
    pub index_ttl_secs: u64,
}

impl CacheConfig {
    pub fn index_ttl(&self) -> Duration {
        Duration::from_secs(self.index_ttl_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub posts_per_page: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Header set by the authenticating proxy in front of the service.
    pub user_header: String,
    pub login_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
                max_connections: 1,
            },
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            cache: CacheConfig { index_ttl_secs: 20 },
            feed: FeedConfig { posts_per_page: 10 },
            auth: AuthConfig {
                user_header: "x-remote-user".to_string(),
                login_url: DEFAULT_LOGIN_URL.to_string(),
            },
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let config = Self {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite:yatube.db".to_string()),
                max_connections: env_or("DATABASE_MAX_CONNECTIONS", 5),
            },
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: env_or("SERVER_PORT", defaults.server.port),
            },
            cache: CacheConfig {
                index_ttl_secs: env_or("INDEX_CACHE_TTL_SECS", defaults.cache.index_ttl_secs),
            },
            feed: FeedConfig {
                posts_per_page: env_or("POSTS_PER_PAGE", defaults.feed.posts_per_page),
            },
            auth: AuthConfig {
                user_header: env::var("AUTH_HEADER")
                    .map(|h| h.to_ascii_lowercase())
                    .unwrap_or(defaults.auth.user_header),
                login_url: env::var("LOGIN_URL").unwrap_or(defaults.auth.login_url),
            },
        };

        if config.feed.posts_per_page == 0 {
            anyhow::bail!("POSTS_PER_PAGE must be greater than zero");
        }

        Ok(config)
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.feed.posts_per_page, 10);
        assert_eq!(config.cache.index_ttl(), Duration::from_secs(20));
        assert_eq!(config.auth.login_url, "/auth/login/");
        assert_eq!(config.server_address(), "0.0.0.0:8000");
    }
}
