#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use koma_core::error::{KomaError, Result};
use koma_core::fetch::Fetcher;
use koma_core::prefetch::SlotState;
use koma_core::session::ReadingSession;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Build a CBZ in memory. Entries are stored uncompressed so tests can find
/// and damage their bytes.
pub fn cbz(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let opts = FileOptions::default().compression_method(CompressionMethod::Stored);
    let mut w = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in entries {
        w.start_file(*name, opts).unwrap();
        w.write_all(body).unwrap();
    }
    w.finish().unwrap().into_inner()
}

/// Flip the last byte of `payload` inside `archive`; the entry then fails its CRC check.
pub fn corrupt(archive: &mut [u8], payload: &[u8]) {
    let at = archive
        .windows(payload.len())
        .position(|w| w == payload)
        .expect("payload present in archive");
    archive[at + payload.len() - 1] ^= 0xff;
}

pub fn numbered_pages(n: usize) -> Vec<(String, Vec<u8>)> {
    (1..=n)
        .map(|i| (format!("page{i}.jpg"), format!("jpeg-body-{i:03}").into_bytes()))
        .collect()
}

pub fn cbz_owned(entries: &[(String, Vec<u8>)]) -> Vec<u8> {
    let borrowed: Vec<(&str, &[u8])> = entries
        .iter()
        .map(|(n, b)| (n.as_str(), b.as_slice()))
        .collect();
    cbz(&borrowed)
}

/// Serves canned bodies per locator and counts calls.
#[derive(Default)]
pub struct MockFetcher {
    bodies: Mutex<HashMap<String, Vec<u8>>>,
    calls: AtomicUsize,
}

impl MockFetcher {
    pub fn with(pairs: &[(&str, &[u8])]) -> Self {
        let m = Self::default();
        for (l, b) in pairs {
            m.bodies.lock().unwrap().insert(l.to_string(), b.to_vec());
        }
        m
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.bodies
            .lock()
            .unwrap()
            .get(locator)
            .cloned()
            .ok_or_else(|| KomaError::Fetch(format!("{locator}: connection refused")))
    }
}

/// Poll until the slot leaves `Pending`/`Empty`, or give up after two seconds.
pub async fn settle(session: &ReadingSession, index: usize) -> SlotState {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let s = session.get_decoded_slot(index);
        if matches!(s, SlotState::Ready(_) | SlotState::Failed(_)) {
            return s;
        }
        if tokio::time::Instant::now() >= deadline {
            return s;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
