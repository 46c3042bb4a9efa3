use crate::session::SessionStore;
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub token: String,
}

/// Location of the persisted session. Overridable for tests and for users
/// who keep more than one account.
pub fn session_path() -> PathBuf {
    env::var("CLASSBOARD_SESSION")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(".classboard-session.json"))
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        let api_base_url = env::var("CLASSBOARD_API_URL")
            .context("CLASSBOARD_API_URL not found. Please set it in .env file or environment")?;
        if api_base_url.is_empty() {
            anyhow::bail!("CLASSBOARD_API_URL is empty");
        }

        // Token comes from the environment, or from the saved login session.
        let token = match env::var("CLASSBOARD_TOKEN") {
            Ok(token) if !token.is_empty() => token,
            _ => SessionStore::new(session_path())
                .load()?
                .map(|s| s.token)
                .context("CLASSBOARD_TOKEN not set and no saved session. Run `classboard login` first")?,
        };

        Ok(Config {
            api_base_url,
            token,
        })
    }
}
