//! Temporary on-disk staging for incoming multipart files.
//!
//! The media service accepts a local path, so each file part is streamed to
//! `{dir}/.spool-{uuid}.{ext}` first. The spooled file is deleted when its
//! `SpooledFile` handle is dropped, whatever happened in between.

use bytes::Bytes;
use futures::{Stream, StreamExt, pin_mut};
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SpoolError {
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Clone, Debug)]
pub struct UploadSpool {
    dir: PathBuf,
}

/// A staged upload. Removed from disk on drop.
#[derive(Debug)]
pub struct SpooledFile {
    pub path: PathBuf,
    /// Name the client sent with the part, if any.
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub size_bytes: u64,
}

impl Drop for SpooledFile {
    // Drop cannot await; a single unlink on a worker thread is short.
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("removed spooled file {}", self.path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => debug!(
                "failed to remove spooled file {}: {}",
                self.path.display(),
                err
            ),
        }
    }
}

impl UploadSpool {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Extension kept on the spooled file so uploaders can classify it.
    fn extension_of(file_name: Option<&str>) -> Option<String> {
        let ext = Path::new(file_name?).extension()?.to_str()?;
        if ext.is_empty() || ext.len() > 8 || !ext.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }

    /// Stream one file part to disk.
    ///
    /// Returns `None` for an empty part, which callers treat as "no file".
    pub async fn spool_stream<S>(
        &self,
        file_name: Option<String>,
        content_type: Option<String>,
        stream: S,
    ) -> Result<Option<SpooledFile>, SpoolError>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        fs::create_dir_all(&self.dir).await?;
        let name = match Self::extension_of(file_name.as_deref()) {
            Some(ext) => format!(".spool-{}.{}", Uuid::new_v4(), ext),
            None => format!(".spool-{}", Uuid::new_v4()),
        };
        let path = self.dir.join(name);
        let mut file = File::create(&path).await?;

        // From here on the guard owns cleanup.
        let mut spooled = SpooledFile {
            path,
            file_name,
            content_type,
            size_bytes: 0,
        };

        pin_mut!(stream);
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            spooled.size_bytes += chunk.len() as u64;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        file.sync_all().await?;

        if spooled.size_bytes == 0 {
            return Ok(None);
        }
        Ok(Some(spooled))
    }
}
