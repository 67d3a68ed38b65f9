use std::io::Read;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, instrument};

use super::dims::sniff_dimensions;
use super::handle::ArchiveHandle;
use super::mime::mime_for;
use crate::domain::DecodedPage;
use crate::error::{KomaError, Result};

/// Decompress one entry into a data-URI page. Blocking; see [`decode`].
pub fn decode_entry(handle: &ArchiveHandle, entry: &str) -> Result<DecodedPage> {
    let bytes = read_entry(handle, entry)?;
    let dims = sniff_dimensions(&bytes);
    let payload_uri = data_uri(mime_for(entry), &bytes);
    debug!(entry, len = bytes.len(), "decoded entry");
    Ok(DecodedPage {
        source_key: handle.source_key(entry),
        payload_uri,
        width: dims.map(|d| d.0),
        height: dims.map(|d| d.1),
    })
}

/// [`decode_entry`] on the blocking pool so decompression never stalls the caller's task.
#[instrument(skip(handle), fields(archive = handle.id()))]
pub async fn decode(handle: Arc<ArchiveHandle>, entry: String) -> Result<DecodedPage> {
    let name = entry.clone();
    tokio::task::spawn_blocking(move || decode_entry(&handle, &entry))
        .await
        .map_err(|e| KomaError::decode(&name, format!("decode task failed: {e}")))?
}

/// Largest page accepted from an archive, uncompressed.
pub const MAX_ENTRY_BYTES: u64 = 256 * 1024 * 1024;

/// Raw bytes of one entry. Sizes claimed by the archive headers are never
/// trusted for allocation.
pub fn read_entry(handle: &ArchiveHandle, entry: &str) -> Result<Vec<u8>> {
    let mut zip = handle.reader();
    let f = zip
        .by_name(entry)
        .map_err(|e| KomaError::decode(entry, e))?;
    if f.size() > MAX_ENTRY_BYTES {
        return Err(KomaError::decode(
            entry,
            format!("claims {} bytes, limit is {MAX_ENTRY_BYTES}", f.size()),
        ));
    }
    let mut bytes = Vec::new();
    f.take(MAX_ENTRY_BYTES + 1)
        .read_to_end(&mut bytes)
        .map_err(|e| KomaError::decode(entry, e))?;
    if bytes.len() as u64 > MAX_ENTRY_BYTES {
        return Err(KomaError::decode(entry, "entry exceeds size limit"));
    }
    if bytes.is_empty() {
        return Err(KomaError::decode(entry, "empty entry"));
    }
    Ok(bytes)
}

pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}
