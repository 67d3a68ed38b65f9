use std::path::PathBuf;
use std::sync::Arc;

use koma_core::api::ContentClient;
use koma_core::archive::decode::read_entry;
use koma_core::archive::{ArchiveHandle, decode};
use koma_core::config::KomaConfig;
use koma_core::domain::PageSource;
use koma_core::error::{KomaError, Result};
use koma_core::fetch::HttpFetcher;
use koma_core::key::derive_key;
use koma_core::prefetch::{Prefetcher, SlotState};
use koma_core::resolve::{PageResolver, Resolution};
use koma_core::store::{ByteStore, FsByteStore};
use tracing::info;

async fn resolver_from_config(cfg: &KomaConfig) -> Result<PageResolver> {
    let store = Arc::new(FsByteStore::open(&cfg.cache_dir).await?);
    let fetcher = Arc::new(HttpFetcher::new(cfg.fetch_timeout())?);
    Ok(PageResolver::new(store, fetcher))
}

fn content_client(cfg: &KomaConfig, api_url: Option<String>) -> Result<ContentClient> {
    let url = api_url
        .or_else(|| cfg.api_url.clone())
        .ok_or_else(|| KomaError::Config("no API url: pass --api-url or set KOMA_API_URL".into()))?;
    let http = HttpFetcher::new(cfg.fetch_timeout())?;
    ContentClient::new(&url, http.client().clone())
}

fn print_resolution(r: &Resolution) {
    match r {
        Resolution::Hit { key, uri } => println!("hit      {key:<40} {uri}"),
        Resolution::Fetched { key, uri } => println!("fetched  {key:<40} {uri}"),
        Resolution::Fallback { locator, error } => {
            println!("fallback {locator} ({error})")
        }
    }
}

pub fn handle_key(locator: &str) -> Result<()> {
    println!("{}", derive_key(locator));
    Ok(())
}

pub async fn handle_resolve(
    cfg: KomaConfig,
    locators: Vec<String>,
    remote_base: Option<String>,
) -> Result<()> {
    let base = remote_base.or_else(|| cfg.remote_base.clone());
    let resolver = resolver_from_config(&cfg).await?;
    for l in locators {
        let src = PageSource::remote_in(base.as_deref(), &l)?;
        let r = resolver.resolve_page(&src).await?;
        print_resolution(&r);
    }
    Ok(())
}

pub async fn handle_chapter(cfg: KomaConfig, id: String, api_url: Option<String>) -> Result<()> {
    let client = content_client(&cfg, api_url)?;
    let chapter = client
        .chapter(&id)
        .await?
        .ok_or_else(|| KomaError::Fetch(format!("chapter {id} not found")))?;
    let pages = chapter.page_sources(cfg.remote_base.as_deref())?;
    info!(chapter = %chapter.id, number = chapter.number, pages = pages.len(), "caching chapter");

    let resolver = resolver_from_config(&cfg).await?;
    let mut cached = 0usize;
    for (i, src) in pages.iter().enumerate() {
        let r = resolver.resolve_page(src).await?;
        if r.is_cached() {
            cached += 1;
        }
        print!("{:>4}  ", i + 1);
        print_resolution(&r);
    }
    eprintln!("chapter {}: {cached}/{} pages cached", chapter.number, pages.len());
    Ok(())
}

pub async fn handle_feed(
    cfg: KomaConfig,
    language: Option<String>,
    api_url: Option<String>,
) -> Result<()> {
    let client = content_client(&cfg, api_url)?;
    match language {
        None => {
            for l in client.languages().await? {
                println!("{:<8} {}", l.language, l.count.language);
            }
        }
        Some(lang) => {
            for ch in client.chapters(&lang).await? {
                println!(
                    "{:<8} {:<24} {:>4} pages  {}",
                    ch.number,
                    ch.id,
                    ch.uri.len(),
                    ch.release_date.as_deref().unwrap_or("-")
                );
            }
        }
    }
    Ok(())
}

pub async fn handle_index(archive: PathBuf) -> Result<()> {
    let handle = ArchiveHandle::open_path(&archive).await?;
    for (i, name) in handle.entries().iter().enumerate() {
        println!("{:>4}  {name}", i);
    }
    eprintln!("{}: {} pages", archive.display(), handle.len());
    Ok(())
}

pub async fn handle_decode(archive: PathBuf, index: usize, out: Option<PathBuf>) -> Result<()> {
    let handle = Arc::new(ArchiveHandle::open_path(&archive).await?);
    let entry = handle
        .entry(index)
        .ok_or_else(|| KomaError::Decode {
            entry: index.to_string(),
            reason: format!("archive has {} pages", handle.len()),
        })?
        .to_string();
    match out {
        Some(path) => {
            let h = handle.clone();
            let name = entry.clone();
            let bytes = tokio::task::spawn_blocking(move || read_entry(&h, &name))
                .await
                .map_err(|e| KomaError::Decode {
                    entry: entry.clone(),
                    reason: format!("read task failed: {e}"),
                })??;
            tokio::fs::write(&path, &bytes).await?;
            eprintln!("decode: {entry} -> {} ({} bytes)", path.display(), bytes.len());
        }
        None => {
            let page = decode(handle, entry).await?;
            let head: String = page.payload_uri.chars().take(48).collect();
            println!("source   {}", page.source_key);
            println!("uri      {head}... ({} chars)", page.payload_uri.len());
            if let (Some(w), Some(h)) = (page.width, page.height) {
                println!("size     {w}x{h}");
            }
        }
    }
    Ok(())
}

pub async fn handle_read(
    cfg: KomaConfig,
    archive: PathBuf,
    visible: usize,
    look_ahead: Option<usize>,
    look_behind: Option<usize>,
) -> Result<()> {
    let mut prefetch = cfg.prefetch.clone();
    if let Some(n) = look_ahead {
        prefetch.look_ahead = n;
    }
    if let Some(n) = look_behind {
        prefetch.look_behind = n;
    }
    let handle = Arc::new(ArchiveHandle::open_path(&archive).await?);
    let p = Prefetcher::new(handle.clone(), prefetch);
    let ticket = p.on_visible_index_changed(visible);
    let issued = ticket.issued.clone();
    ticket.settled().await;

    println!("visible {visible}, issued {issued:?}");
    for (i, name) in handle.entries().iter().enumerate() {
        let state = match p.get_decoded_slot(i) {
            SlotState::Empty => continue,
            SlotState::Pending => "pending".to_string(),
            SlotState::Ready(page) => format!("ready ({} chars)", page.payload_uri.len()),
            SlotState::Failed(reason) => format!("failed: {reason}"),
        };
        println!("{:>4}  {name:<32} {state}", i);
    }
    p.close();
    Ok(())
}

pub fn handle_scan(dir: PathBuf) -> Result<()> {
    let mut found = 0usize;
    for entry in walkdir::WalkDir::new(&dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let p = entry.path();
        let is_archive = p
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("cbz") || e.eq_ignore_ascii_case("zip"));
        if !is_archive {
            continue;
        }
        found += 1;
        let bytes = std::fs::read(p)?;
        match koma_core::build_index(&bytes) {
            Ok(pages) => println!("{:>5} pages  {}", pages.len(), p.display()),
            Err(e) => println!("  unreadable  {} ({e})", p.display()),
        }
    }
    eprintln!("scan: {found} archives under {}", dir.display());
    Ok(())
}

pub async fn handle_cache_ls(cfg: KomaConfig) -> Result<()> {
    let store = FsByteStore::open(&cfg.cache_dir).await?;
    let entries = store.entries().await?;
    let mut total = 0u64;
    for e in &entries {
        let flag = if e.is_valid() { "" } else { "  (invalid)" };
        println!("{:>10}  {}{flag}", e.size_bytes, e.key);
        total += e.size_bytes;
    }
    eprintln!("{} entries, {total} bytes in {}", entries.len(), store.root().display());
    Ok(())
}

pub async fn handle_cache_rm(cfg: KomaConfig, key: String) -> Result<()> {
    let store = FsByteStore::open(&cfg.cache_dir).await?;
    store.delete(&key).await?;
    eprintln!("rm: {key}");
    Ok(())
}

pub async fn handle_cache_purge(cfg: KomaConfig) -> Result<()> {
    let store = FsByteStore::open(&cfg.cache_dir).await?;
    let n = store.purge_invalid().await?;
    eprintln!("purge: removed {n} entries");
    Ok(())
}
