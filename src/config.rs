use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use std::env;

/// Which media upload service backs `MediaUploader`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MediaBackend {
    /// Content-addressed files under `media_dir`, served at `/media`.
    Local,
    /// Cloudinary REST upload API.
    Cloudinary,
}

/// Cloudinary account credentials.
#[derive(Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub media_dir: String,
    pub upload_dir: String,
    pub public_base_url: String,
    pub max_upload_bytes: usize,
    pub media_backend: MediaBackend,
    pub cloudinary: Option<CloudinaryConfig>,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Video sharing API")]
pub struct Args {
    /// Host to bind to (overrides VIDEO_HUB_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides VIDEO_HUB_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides VIDEO_HUB_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Directory for locally hosted media (overrides VIDEO_HUB_MEDIA_DIR)
    #[arg(long)]
    pub media_dir: Option<String>,

    /// Directory where incoming multipart files are spooled (overrides VIDEO_HUB_UPLOAD_DIR)
    #[arg(long)]
    pub upload_dir: Option<String>,

    /// Base URL used when building media links (overrides VIDEO_HUB_PUBLIC_BASE_URL)
    #[arg(long)]
    pub public_base_url: Option<String>,

    /// Media upload backend (overrides VIDEO_HUB_MEDIA_BACKEND)
    #[arg(long, value_enum)]
    pub media_backend: Option<MediaBackend>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("VIDEO_HUB_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = parse_env("VIDEO_HUB_PORT", 3000u16)?;
        let env_db = env::var("VIDEO_HUB_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/video_hub.db".into());
        let env_media = env::var("VIDEO_HUB_MEDIA_DIR").unwrap_or_else(|_| "./data/media".into());
        let env_upload =
            env::var("VIDEO_HUB_UPLOAD_DIR").unwrap_or_else(|_| "./data/uploads".into());
        let env_base_url = env::var("VIDEO_HUB_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".into());
        let max_upload_bytes = parse_env("VIDEO_HUB_MAX_UPLOAD_BYTES", 512 * 1024 * 1024usize)?;
        let env_backend = match env::var("VIDEO_HUB_MEDIA_BACKEND") {
            Ok(value) => MediaBackend::from_str(&value, true)
                .map_err(|_| anyhow::anyhow!("unknown VIDEO_HUB_MEDIA_BACKEND `{}`", value))?,
            Err(_) => MediaBackend::Local,
        };

        // --- Merge ---
        let media_backend = args.media_backend.unwrap_or(env_backend);
        let cloudinary = cloudinary_from_env();
        if media_backend == MediaBackend::Cloudinary && cloudinary.is_none() {
            bail!(
                "cloudinary backend requires CLOUDINARY_CLOUD_NAME, CLOUDINARY_API_KEY and CLOUDINARY_API_SECRET"
            );
        }

        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            database_url: args.database_url.unwrap_or(env_db),
            media_dir: args.media_dir.unwrap_or(env_media),
            upload_dir: args.upload_dir.unwrap_or(env_upload),
            public_base_url: args
                .public_base_url
                .unwrap_or(env_base_url)
                .trim_end_matches('/')
                .to_string(),
            max_upload_bytes,
            media_backend,
            cloudinary,
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_env<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}

fn cloudinary_from_env() -> Option<CloudinaryConfig> {
    Some(CloudinaryConfig {
        cloud_name: env::var("CLOUDINARY_CLOUD_NAME").ok()?,
        api_key: env::var("CLOUDINARY_API_KEY").ok()?,
        api_secret: env::var("CLOUDINARY_API_SECRET").ok()?,
    })
}
