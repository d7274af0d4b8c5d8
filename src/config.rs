use anyhow::Context;
use serde::Deserialize;

/// Upper bound for `SALT_ROUND`; every hash runs this many Argon2 passes.
pub const MAX_SALT_ROUND: u32 = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub server: ServerConfig,
    /// Argon2 time cost used for every password hash.
    pub salt_round: u32,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;

        let server = ServerConfig {
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: match lookup("APP_PORT").or_else(|| lookup("PORT")) {
                Some(v) => v.parse::<u16>().context("APP_PORT must be a port number")?,
                None => 8000,
            },
        };

        let salt_round = match lookup("SALT_ROUND") {
            Some(v) => v
                .trim()
                .parse::<u32>()
                .context("SALT_ROUND must be a non-negative integer")?,
            None => 2,
        };
        anyhow::ensure!(
            salt_round <= MAX_SALT_ROUND,
            "SALT_ROUND must be at most {MAX_SALT_ROUND}, got {salt_round}"
        );

        let db_max_connections = lookup("DATABASE_MAX_CONNECTIONS")
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);

        Ok(Self {
            database_url,
            db_max_connections,
            server,
            salt_round,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
