use anyhow::{Context, Result, ensure};

const DEFAULT_VOTING_MINUTES: i32 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub api_keys: String,
    /// Voting window for competitions created without one
    pub default_voting_minutes: i32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let default_voting_minutes = match std::env::var("DEFAULT_VOTING_MINUTES") {
            Ok(value) => value
                .parse()
                .context("DEFAULT_VOTING_MINUTES must be a number")?,
            Err(_) => DEFAULT_VOTING_MINUTES,
        };
        ensure!(
            default_voting_minutes > 0,
            "DEFAULT_VOTING_MINUTES must be positive"
        );

        Ok(Self {
            host: std::env::var("HOST").context("Cannot load HOST env variable")?,
            port: std::env::var("PORT")
                .context("PORT must be a number")?
                .parse()?,
            database_url: std::env::var("DATABASE_URL")
                .context("Cannot load DATABASE_URL env variable")?,
            api_keys: std::env::var("API_KEYS").unwrap_or_default(),
            default_voting_minutes,
        })
    }
}
