#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tempfile::TempDir;

use video_hub::services::media::{
    LocalMediaStore, MediaError, MediaResult, MediaUploader, UploadedMedia,
};
use video_hub::services::spool::UploadSpool;
use video_hub::state::AppState;

pub const MAX_UPLOAD_BYTES: usize = 8 * 1024 * 1024;

pub mod routes {
    pub const VIDEOS: &str = "/api/v1/videos";
    pub const USERS: &str = "/api/v1/users";

    pub fn video(id: &str) -> String {
        format!("/api/v1/videos/{id}")
    }

    pub fn thumbnail(id: &str) -> String {
        format!("/api/v1/videos/{id}/thumbnail")
    }

    pub fn video_file(id: &str) -> String {
        format!("/api/v1/videos/{id}/file")
    }

    pub fn publish_toggle(id: &str) -> String {
        format!("/api/v1/videos/{id}/publish")
    }

    pub fn views(id: &str) -> String {
        format!("/api/v1/videos/{id}/views")
    }

    pub fn user(id: &str) -> String {
        format!("/api/v1/users/{id}")
    }
}

/// Uploader that always fails, standing in for an unreachable media host.
pub struct FailingUploader;

#[async_trait]
impl MediaUploader for FailingUploader {
    async fn upload(&self, _path: &Path) -> MediaResult<UploadedMedia> {
        Err(MediaError::Rejected {
            status: 503,
            message: "media host unavailable".into(),
        })
    }
}

/// A running test server.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub db: Arc<SqlitePool>,
    pub upload_dir: PathBuf,
    _dir: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let text = res.text().await.expect("Failed to read response body");
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self { status, text, body }
    }

    /// `data` from the envelope.
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn message(&self) -> &str {
        self.body["message"].as_str().unwrap_or_default()
    }
}

/// Minimal MP4: `ftyp`, a media payload and a `moov/mvhd` declaring `seconds`.
pub fn fake_mp4(seconds: u32) -> Vec<u8> {
    fn boxed(kind: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = ((payload.len() + 8) as u32).to_be_bytes().to_vec();
        out.extend_from_slice(kind);
        out.extend_from_slice(payload);
        out
    }

    let mut mvhd = vec![0u8; 12]; // version/flags + creation + modification
    mvhd.extend_from_slice(&1000u32.to_be_bytes());
    mvhd.extend_from_slice(&(seconds * 1000).to_be_bytes());
    mvhd.extend_from_slice(&[0u8; 80]);

    let mut file = boxed(b"ftyp", b"isom\0\0\x02\0isomiso2mp41");
    file.extend(boxed(b"mdat", &seconds.to_be_bytes().repeat(64)));
    file.extend(boxed(b"moov", &boxed(b"mvhd", &mvhd)));
    file
}

pub fn fake_png(tag: &str) -> Vec<u8> {
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.extend_from_slice(tag.as_bytes());
    bytes
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_uploader(None).await
    }

    /// Start the router on a random port. Without an explicit uploader the
    /// local media store is used, serving from this app's own address.
    pub async fn spawn_with_uploader(uploader: Option<Arc<dyn MediaUploader>>) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");

        let options = SqliteConnectOptions::from_str(&format!(
            "sqlite://{}",
            dir.path().join("test.db").display()
        ))
        .expect("Invalid SQLite URL")
        .create_if_missing(true)
        .foreign_keys(true);
        let db = Arc::new(
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await
                .expect("Failed to open test database"),
        );
        video_hub::run_migrations(&db)
            .await
            .expect("Failed to run migrations");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        let media_dir = dir.path().join("media");
        std::fs::create_dir_all(&media_dir).unwrap();
        let upload_dir = dir.path().join("uploads");

        let local_media = LocalMediaStore::new(&media_dir, format!("http://{addr}"));
        let uploader = uploader
            .unwrap_or_else(|| Arc::new(local_media.clone()) as Arc<dyn MediaUploader>);
        let state = AppState::new(
            db.clone(),
            uploader,
            local_media,
            UploadSpool::new(&upload_dir),
        );

        let app = video_hub::build_router(state, MAX_UPLOAD_BYTES);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            db,
            upload_dir,
            _dir: dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");
        TestResponse::from_response(res).await
    }

    pub async fn post_json(&self, path: &str, body: &Value, user: Option<&str>) -> TestResponse {
        let mut req = self.client.post(self.url(path)).json(body);
        if let Some(user) = user {
            req = req.header("x-user-id", user);
        }
        let res = req.send().await.expect("Failed to send POST request");
        TestResponse::from_response(res).await
    }

    pub async fn post_as(&self, path: &str, user: &str) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("x-user-id", user)
            .send()
            .await
            .expect("Failed to send POST request");
        TestResponse::from_response(res).await
    }

    pub async fn patch_json(&self, path: &str, body: &Value, user: &str) -> TestResponse {
        let res = self
            .client
            .patch(self.url(path))
            .header("x-user-id", user)
            .json(body)
            .send()
            .await
            .expect("Failed to send PATCH request");
        TestResponse::from_response(res).await
    }

    pub async fn patch_as(&self, path: &str, user: &str) -> TestResponse {
        let res = self
            .client
            .patch(self.url(path))
            .header("x-user-id", user)
            .send()
            .await
            .expect("Failed to send PATCH request");
        TestResponse::from_response(res).await
    }

    pub async fn patch_multipart(&self, path: &str, form: Form, user: &str) -> TestResponse {
        let res = self
            .client
            .patch(self.url(path))
            .header("x-user-id", user)
            .multipart(form)
            .send()
            .await
            .expect("Failed to send multipart PATCH request");
        TestResponse::from_response(res).await
    }

    pub async fn delete_as(&self, path: &str, user: &str) -> TestResponse {
        let res = self
            .client
            .delete(self.url(path))
            .header("x-user-id", user)
            .send()
            .await
            .expect("Failed to send DELETE request");
        TestResponse::from_response(res).await
    }

    /// Register a user via the API and return its id.
    pub async fn create_user(&self, username: &str) -> String {
        let res = self
            .post_json(
                routes::USERS,
                &serde_json::json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "fullName": format!("{username} tester"),
                }),
                None,
            )
            .await;
        assert_eq!(res.status, 201, "Registration failed: {}", res.text);
        res.data()["id"]
            .as_str()
            .expect("Registration response should contain an id")
            .to_string()
    }

    /// Publish with whichever parts are given.
    pub async fn publish(
        &self,
        user: Option<&str>,
        title: Option<&str>,
        description: Option<&str>,
        video: Option<Vec<u8>>,
        thumbnail: Option<Vec<u8>>,
    ) -> TestResponse {
        let mut form = Form::new();
        if let Some(title) = title {
            form = form.text("title", title.to_string());
        }
        if let Some(description) = description {
            form = form.text("description", description.to_string());
        }
        if let Some(bytes) = video {
            form = form.part("videoFile", file_part(bytes, "clip.mp4", "video/mp4"));
        }
        if let Some(bytes) = thumbnail {
            form = form.part("thumbnail", file_part(bytes, "thumb.png", "image/png"));
        }

        let mut req = self.client.post(self.url(routes::VIDEOS)).multipart(form);
        if let Some(user) = user {
            req = req.header("x-user-id", user);
        }
        let res = req.send().await.expect("Failed to send publish request");
        TestResponse::from_response(res).await
    }

    /// Publish a valid video and return its id.
    pub async fn publish_ok(&self, user: &str, title: &str) -> String {
        let res = self
            .publish(
                Some(user),
                Some(title),
                Some("a description"),
                Some(fake_mp4(4)),
                Some(fake_png(title)),
            )
            .await;
        assert_eq!(res.status, 200, "Publish failed: {}", res.text);
        res.data()["id"]
            .as_str()
            .expect("Publish response should contain an id")
            .to_string()
    }

    /// Files still sitting in the upload spool directory.
    pub fn spooled_files(&self) -> usize {
        match std::fs::read_dir(&self.upload_dir) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }

    pub async fn video_count(&self) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM videos")
            .fetch_one(&*self.db)
            .await
            .expect("Failed to count videos")
    }
}

pub fn file_part(bytes: Vec<u8>, file_name: &str, mime: &str) -> Part {
    Part::bytes(bytes)
        .file_name(file_name.to_string())
        .mime_str(mime)
        .expect("Failed to set MIME type")
}
