use std::env;

use anyhow::Result;
use tracing::info;

pub mod cli;
pub mod commands;
pub mod services;
pub mod settings;
pub mod ux;

use cli::{Cli, Commands};
use settings::{FileSettingsStore, JsonFileSettingsStore, Settings, SettingsStore};

pub struct AppCtx {
    pub settings_store: Box<dyn SettingsStore>,
}

impl AppCtx {
    /// Stored settings with the `BRAND_*` environment variables applied on top.
    pub fn settings(&self) -> Result<Settings> {
        Ok(self
            .settings_store
            .load()?
            .with_env(|key| env::var(key).ok()))
    }
}

#[cfg(not(tarpaulin_include))]
pub async fn run(cli: Cli) -> Result<()> {
    let settings_store: Box<dyn SettingsStore> = match cli.credentials {
        Some(path) => Box::new(JsonFileSettingsStore::new(path)),
        None => Box::new(FileSettingsStore::new()?),
    };
    let ctx = AppCtx { settings_store };

    info!("Welcome to the brand eins kiosk CLI 📰");
    info!("ℹ️ - Version {}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Config(args) => commands::config::handle(args, &ctx).await,
        Commands::Fetch(args) => commands::fetch::handle(args, &ctx).await,
        Commands::Send(args) => commands::send::handle(args, &ctx).await,
    }
}
