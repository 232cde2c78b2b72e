mod config;
mod errors;
mod input;
mod layout;
mod render;
mod sheet;

use anyhow::{bail, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Load configuration first, then logging.
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args();
    let program = args.next().unwrap_or_else(|| "keysheet".to_string());
    let basename = match (args.next(), args.next()) {
        (Some(basename), None) => basename,
        _ => {
            bail!(
                "Usage: {program} <basename>\n  \
                 Input is read from <basename>.json\n  \
                 Output is written to <basename>.html"
            );
        }
    };

    info!("keysheet v{}", env!("CARGO_PKG_VERSION"));
    sheet::generate_file(&basename, &config)?;
    Ok(())
}
