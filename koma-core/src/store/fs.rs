use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use url::Url;

use super::{ByteStore, SlotInfo};
use crate::domain::CacheEntry;
use crate::error::{KomaError, Result};

const PART_SUFFIX: &str = ".part";

/// One file per key under a single cache directory.
///
/// `write` lands in a hidden `.part` file and is renamed over the slot, so a
/// crash mid-write leaves at worst the zero-length slot from `create`, which
/// the resolver treats as invalid and replaces.
#[derive(Clone, Debug)]
pub struct FsByteStore {
    root: PathBuf,
}

impl FsByteStore {
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root)
            .await
            .map_err(|e| KomaError::store(&root.display().to_string(), e))?;
        let root = fs::canonicalize(root)
            .await
            .map_err(|e| KomaError::store(&root.display().to_string(), e))?;
        debug!(root = %root.display(), "opened byte store");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty()
            || key == "."
            || key == ".."
            || key.starts_with('.')
            || key.contains(['/', '\\', '\0'])
        {
            return Err(KomaError::store(
                key,
                std::io::Error::new(ErrorKind::InvalidInput, "unsafe cache key"),
            ));
        }
        Ok(self.root.join(key))
    }

    pub async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let p = self.path_for(key)?;
        fs::read(&p).await.map_err(|e| KomaError::store(key, e))
    }

    /// Every slot currently on disk, valid or not, sorted by key.
    pub async fn entries(&self) -> Result<Vec<CacheEntry>> {
        let root = self.root.display().to_string();
        let mut rd = fs::read_dir(&self.root)
            .await
            .map_err(|e| KomaError::store(&root, e))?;
        let mut out = Vec::new();
        while let Some(de) = rd.next_entry().await.map_err(|e| KomaError::store(&root, e))? {
            let Some(name) = de.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            let md = de.metadata().await.map_err(|e| KomaError::store(&name, e))?;
            if !md.is_file() {
                continue;
            }
            out.push(CacheEntry {
                key: name,
                size_bytes: md.len(),
                path: de.path(),
            });
        }
        out.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(out)
    }

    /// Delete zero-length slots and abandoned `.part` files. Returns how many were removed.
    pub async fn purge_invalid(&self) -> Result<usize> {
        let mut removed = 0;
        for e in self.entries().await? {
            if !e.is_valid() {
                self.delete(&e.key).await?;
                removed += 1;
            }
        }
        let root = self.root.display().to_string();
        let mut rd = fs::read_dir(&self.root)
            .await
            .map_err(|e| KomaError::store(&root, e))?;
        while let Some(de) = rd.next_entry().await.map_err(|e| KomaError::store(&root, e))? {
            let name = de.file_name();
            let name = name.to_string_lossy();
            if name.starts_with('.') && name.ends_with(PART_SUFFIX) {
                match fs::remove_file(de.path()).await {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(KomaError::store(&name, e)),
                }
            }
        }
        if removed > 0 {
            warn!(removed, "purged invalid cache entries");
        }
        Ok(removed)
    }
}

#[async_trait]
impl ByteStore for FsByteStore {
    async fn exists(&self, key: &str) -> Result<bool> {
        let p = self.path_for(key)?;
        fs::try_exists(&p).await.map_err(|e| KomaError::store(key, e))
    }

    async fn inspect(&self, key: &str) -> Result<SlotInfo> {
        let p = self.path_for(key)?;
        let md = fs::metadata(&p).await.map_err(|e| KomaError::store(key, e))?;
        Ok(SlotInfo {
            size_bytes: md.len(),
        })
    }

    async fn create(&self, key: &str, overwrite: bool) -> Result<()> {
        let p = self.path_for(key)?;
        let mut opts = fs::OpenOptions::new();
        opts.write(true);
        if overwrite {
            opts.create(true).truncate(true);
        } else {
            opts.create_new(true);
        }
        opts.open(&p).await.map_err(|e| KomaError::store(key, e))?;
        Ok(())
    }

    async fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let p = self.path_for(key)?;
        let tmp = self
            .root
            .join(format!(".{key}.{}{PART_SUFFIX}", uuid::Uuid::new_v4().simple()));

        let res = async {
            let mut f = fs::File::create(&tmp).await?;
            f.write_all(bytes).await?;
            f.sync_all().await?;
            drop(f);
            fs::rename(&tmp, &p).await
        }
        .await;

        if let Err(e) = res {
            let _ = fs::remove_file(&tmp).await;
            return Err(KomaError::store(key, e));
        }
        debug!(key, len = bytes.len(), "wrote cache slot");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let p = self.path_for(key)?;
        match fs::remove_file(&p).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(KomaError::store(key, e)),
        }
    }

    fn uri_for(&self, key: &str) -> Result<String> {
        let p = self.path_for(key)?;
        Url::from_file_path(&p).map(String::from).map_err(|_| {
            KomaError::store(
                key,
                std::io::Error::new(ErrorKind::InvalidInput, "cache path is not absolute"),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> (tempfile::TempDir, FsByteStore) {
        let dir = tempfile::tempdir().unwrap();
        let s = FsByteStore::open(dir.path().join("cache")).await.unwrap();
        (dir, s)
    }

    #[tokio::test]
    async fn write_then_read_through_uri() {
        let (_d, s) = store().await;
        let bytes = b"\x89PNG\r\n\x1a\nrest-of-image".to_vec();
        s.create("c1_p1.png", true).await.unwrap();
        s.write("c1_p1.png", &bytes).await.unwrap();

        let uri = s.uri_for("c1_p1.png").unwrap();
        assert!(uri.starts_with("file://"));
        let path = Url::parse(&uri).unwrap().to_file_path().unwrap();
        assert_eq!(std::fs::read(path).unwrap(), bytes);
        assert_eq!(s.inspect("c1_p1.png").await.unwrap().size_bytes, bytes.len() as u64);
    }

    #[tokio::test]
    async fn create_allocates_zero_length_slot() {
        let (_d, s) = store().await;
        assert!(!s.exists("k_a").await.unwrap());
        s.create("k_a", false).await.unwrap();
        assert!(s.exists("k_a").await.unwrap());
        assert_eq!(s.inspect("k_a").await.unwrap().size_bytes, 0);
    }

    #[tokio::test]
    async fn create_without_overwrite_refuses_existing_slot() {
        let (_d, s) = store().await;
        s.create("k_a", false).await.unwrap();
        s.write("k_a", b"abc").await.unwrap();
        let err = s.create("k_a", false).await.unwrap_err();
        assert!(err.is_store());

        s.create("k_a", true).await.unwrap();
        assert_eq!(s.inspect("k_a").await.unwrap().size_bytes, 0);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (_d, s) = store().await;
        s.create("k_a", true).await.unwrap();
        s.delete("k_a").await.unwrap();
        s.delete("k_a").await.unwrap();
        assert!(!s.exists("k_a").await.unwrap());
    }

    #[tokio::test]
    async fn unsafe_keys_are_rejected() {
        let (_d, s) = store().await;
        for k in ["", "..", "a/b", ".hidden"] {
            assert!(s.create(k, true).await.unwrap_err().is_store(), "{k:?}");
        }
    }

    #[tokio::test]
    async fn purge_removes_zero_byte_and_part_files() {
        let (_d, s) = store().await;
        s.create("good_1.jpg", true).await.unwrap();
        s.write("good_1.jpg", b"jpeg").await.unwrap();
        s.create("bad_2.jpg", true).await.unwrap();
        std::fs::write(s.root().join(".bad_3.jpg.deadbeef.part"), b"x").unwrap();

        assert_eq!(s.purge_invalid().await.unwrap(), 2);
        let keys: Vec<_> = s.entries().await.unwrap().into_iter().map(|e| e.key).collect();
        assert_eq!(keys, vec!["good_1.jpg".to_string()]);
        assert!(!s.root().join(".bad_3.jpg.deadbeef.part").exists());
    }
}
