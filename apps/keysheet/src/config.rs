use anyhow::Result;

/// Application configuration loaded from environment variables.
/// Everything has a default; a `.env` file is honored if present.
#[derive(Debug, Clone)]
pub struct Config {
    pub rust_log: String,
    /// When set, every emitted `<tr>` carries a `header` or `data` class:
    /// `header` iff some column's current offset lands on a block's header row.
    pub row_classes: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            row_classes: bool_env("KEYSHEET_ROW_CLASSES")?,
        })
    }
}

/// Reads an optional boolean environment variable. Unset means false.
fn bool_env(key: &str) -> Result<bool> {
    match std::env::var(key) {
        Err(_) => Ok(false),
        Ok(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" | "" => Ok(false),
            _ => anyhow::bail!("Environment variable '{key}' must be a boolean, got '{raw}'"),
        },
    }
}
