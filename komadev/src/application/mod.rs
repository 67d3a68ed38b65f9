pub mod handlers;

use crate::presentation::cli::{CacheCommands, Cli, Commands};
use clap::Parser;
use koma_core::config::KomaConfig;
use koma_core::error::Result;

fn load_config(cli: &Cli) -> Result<KomaConfig> {
    let mut cfg = match &cli.config {
        Some(path) => KomaConfig::from_json_file(path)?,
        None => KomaConfig::from_env()?,
    };
    if let Some(dir) = &cli.cache_dir {
        cfg.cache_dir = dir.clone();
    }
    Ok(cfg)
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let cfg = load_config(&cli)?;
    match cli.command {
        Commands::Key { locator } => handlers::handle_key(&locator),
        Commands::Resolve {
            locators,
            remote_base,
        } => handlers::handle_resolve(cfg, locators, remote_base).await,
        Commands::Chapter { id, api_url } => handlers::handle_chapter(cfg, id, api_url).await,
        Commands::Feed { language, api_url } => {
            handlers::handle_feed(cfg, language, api_url).await
        }
        Commands::Index { archive } => handlers::handle_index(archive).await,
        Commands::Decode {
            archive,
            index,
            out,
        } => handlers::handle_decode(archive, index, out).await,
        Commands::Read {
            archive,
            visible,
            look_ahead,
            look_behind,
        } => handlers::handle_read(cfg, archive, visible, look_ahead, look_behind).await,
        Commands::Scan { dir } => handlers::handle_scan(dir),
        Commands::Cache(cmd) => match cmd {
            CacheCommands::Ls => handlers::handle_cache_ls(cfg).await,
            CacheCommands::Rm { key } => handlers::handle_cache_rm(cfg, key).await,
            CacheCommands::Purge => handlers::handle_cache_purge(cfg).await,
        },
    }
}
