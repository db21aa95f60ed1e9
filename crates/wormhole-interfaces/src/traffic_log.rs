//! Append-only capture of the raw bytes a relay direction moves.

use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::info;

/// One append-only traffic file, owned by a single relay direction.
///
/// A disabled log accepts appends and discards them.
#[derive(Debug)]
pub struct TrafficLog {
    sink: Option<(PathBuf, File)>,
    bytes_written: u64,
}

impl TrafficLog {
    /// Open `path` for appending, creating it if missing. Existing content is
    /// kept.
    pub async fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        info!("traffic log: appending to {}", path.display());
        Ok(Self {
            sink: Some((path, file)),
            bytes_written: 0,
        })
    }

    pub fn disabled() -> Self {
        Self {
            sink: None,
            bytes_written: 0,
        }
    }

    /// Open `dir/file_name` when `enabled`, otherwise a disabled log.
    pub async fn in_dir(dir: &Path, file_name: &str, enabled: bool) -> std::io::Result<Self> {
        if enabled {
            Self::open(dir.join(file_name)).await
        } else {
            Ok(Self::disabled())
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.sink.as_ref().map(|(path, _)| path.as_path())
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Bytes appended through this handle since it was opened.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Append `data` and flush it to the file.
    pub async fn append(&mut self, data: &[u8]) -> std::io::Result<()> {
        let Some((_, file)) = self.sink.as_mut() else {
            return Ok(());
        };
        file.write_all(data).await?;
        file.flush().await?;
        self.bytes_written += data.len() as u64;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn append_accumulates_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sniffer.log");

        let mut log = TrafficLog::open(&path).await.unwrap();
        log.append(&[0x53, 0x6E]).await.unwrap();
        log.append(&[0x69, 0x66]).await.unwrap();
        assert_eq!(log.bytes_written(), 4);
        assert_eq!(log.path(), Some(path.as_path()));

        let contents = tokio::fs::read(&path).await.unwrap();
        assert_eq!(contents, b"Snif");
    }

    #[tokio::test]
    async fn reopen_keeps_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.log");
        tokio::fs::write(&path, b"old").await.unwrap();

        let mut log = TrafficLog::open(&path).await.unwrap();
        log.append(b"new").await.unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"oldnew");
    }

    #[tokio::test]
    async fn disabled_log_discards() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = TrafficLog::in_dir(dir.path(), "off.log", false).await.unwrap();
        assert!(!log.is_enabled());
        log.append(b"ignored").await.unwrap();
        assert_eq!(log.bytes_written(), 0);
        assert!(!dir.path().join("off.log").exists());
    }

    #[tokio::test]
    async fn open_in_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = TrafficLog::in_dir(&dir.path().join("missing"), "x.log", true).await;
        assert!(result.is_err());
    }
}
