//! LocalMediaStore: a self-hosted stand-in for a cloud media service.
//!
//! Files are content-addressed: the MD5 of the payload names the file and
//! its first two bytes pick the shard directories, giving
//! `base_path/{aa}/{bb}/{md5}.{ext}`. Uploading the same bytes twice lands on
//! the same path.

use super::{MediaError, MediaResult, MediaUploader, UploadedMedia, probe, resource_type_for};
use async_trait::async_trait;
use futures::StreamExt;
use md5::Context;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};
use uuid::Uuid;

const MAX_MEDIA_PATH_LEN: usize = 1024;

#[derive(Clone, Debug)]
pub struct LocalMediaStore {
    /// Base directory on disk where media payloads are stored.
    pub base_path: PathBuf,

    /// Public URL prefix under which `/media/...` is served.
    pub public_base_url: String,
}

impl LocalMediaStore {
    pub fn new(base_path: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Basic path validation to avoid trivial path traversal vectors.
    ///
    /// Rejects paths that begin with `/` or contain `..`, backslashes or
    /// control characters.
    pub fn ensure_path_safe(rel_path: &str) -> MediaResult<()> {
        let invalid = || MediaError::InvalidPath(rel_path.to_string());
        if rel_path.is_empty() || rel_path.len() > MAX_MEDIA_PATH_LEN {
            return Err(invalid());
        }
        if rel_path.starts_with('/') || rel_path.contains("..") {
            return Err(invalid());
        }
        if rel_path
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
        {
            return Err(invalid());
        }
        Ok(())
    }

    /// Relative path `{aa}/{bb}/{digest}.{ext}` for a payload digest.
    fn relative_path(digest: &str, extension: Option<&str>) -> String {
        let (shard_a, rest) = digest.split_at(2);
        let shard_b = &rest[..2];
        match extension {
            Some(ext) => format!("{}/{}/{}.{}", shard_a, shard_b, digest, ext),
            None => format!("{}/{}/{}", shard_a, shard_b, digest),
        }
    }

    fn url_for(&self, rel_path: &str) -> String {
        format!("{}/media/{}", self.public_base_url, rel_path)
    }

    /// Open a stored file for streaming out.
    ///
    /// Returns the file handle and its length.
    pub async fn open(&self, rel_path: &str) -> MediaResult<(File, u64)> {
        Self::ensure_path_safe(rel_path)?;
        let path = self.base_path.join(rel_path);
        let file = File::open(&path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                MediaError::NotFound(rel_path.to_string())
            } else {
                MediaError::Io(err)
            }
        })?;
        let meta = file.metadata().await?;
        if !meta.is_file() {
            return Err(MediaError::NotFound(rel_path.to_string()));
        }
        Ok((file, meta.len()))
    }

    /// Copy `source` into a temporary file under `base_path`, hashing as it goes.
    ///
    /// Ensures durable writes (fsync) and cleans up the temp file on errors.
    async fn copy_hashed(&self, source: &Path) -> MediaResult<(PathBuf, String, u64)> {
        fs::create_dir_all(&self.base_path).await?;
        let tmp_path = self.base_path.join(format!(".tmp-{}", Uuid::new_v4()));

        let input = File::open(source).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                MediaError::NotFound(source.display().to_string())
            } else {
                MediaError::Io(err)
            }
        })?;
        let mut output = File::create(&tmp_path).await?;

        let mut size_bytes: u64 = 0;
        let mut digest = Context::new();
        let mut stream = ReaderStream::new(input);
        while let Some(chunk_res) = stream.next().await {
            let chunk = match chunk_res {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = fs::remove_file(&tmp_path).await;
                    return Err(MediaError::Io(err));
                }
            };
            size_bytes += chunk.len() as u64;
            digest.consume(&chunk);
            if let Err(err) = output.write_all(&chunk).await {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(MediaError::Io(err));
            }
        }
        if let Err(err) = output.flush().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(MediaError::Io(err));
        }
        if let Err(err) = output.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(MediaError::Io(err));
        }

        Ok((tmp_path, format!("{:x}", digest.compute()), size_bytes))
    }

    async fn probe_duration(path: &Path, extension: Option<&str>) -> Option<f64> {
        if !extension.is_some_and(probe::is_probeable) {
            return None;
        }
        let mut file = match File::open(path).await {
            Ok(file) => file,
            Err(err) => {
                warn!("could not reopen {} for probing: {}", path.display(), err);
                return None;
            }
        };
        match probe::mp4_duration(&mut file).await {
            Ok(duration) => duration,
            Err(err) => {
                debug!("no duration for {}: {}", path.display(), err);
                None
            }
        }
    }
}

#[async_trait]
impl MediaUploader for LocalMediaStore {
    /// Store a copy of `path` and return its public URLs.
    ///
    /// - Streams the source into a temp file while computing MD5.
    /// - Renames into the content-addressed location.
    /// - Probes MP4-family containers for their duration.
    async fn upload(&self, path: &Path) -> MediaResult<UploadedMedia> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .filter(|ext| {
                !ext.is_empty() && ext.len() <= 8 && ext.bytes().all(|b| b.is_ascii_alphanumeric())
            });

        let (tmp_path, digest, size_bytes) = self.copy_hashed(path).await?;
        let rel_path = Self::relative_path(&digest, extension.as_deref());
        let final_path = self.base_path.join(&rel_path);

        let parent = final_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            MediaError::Io(io::Error::other("media path missing parent directory"))
        })?;
        if let Err(err) = fs::create_dir_all(&parent).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(MediaError::Io(err));
        }

        if let Err(err) = fs::rename(&tmp_path, &final_path).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(&final_path).await?;
                fs::rename(&tmp_path, &final_path).await?;
            } else {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(MediaError::Io(err));
            }
        }

        let duration = Self::probe_duration(&final_path, extension.as_deref()).await;
        let url = self.url_for(&rel_path);
        debug!("stored {} as {}", path.display(), rel_path);

        Ok(UploadedMedia {
            public_id: digest,
            secure_url: url.clone(),
            url,
            resource_type: resource_type_for(&final_path).to_string(),
            bytes: size_bytes,
            duration,
        })
    }
}
