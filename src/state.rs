use crate::services::{
    media::{LocalMediaStore, MediaUploader},
    spool::UploadSpool,
    user_service::UserService,
    video_service::VideoService,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Shared handles passed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<SqlitePool>,
    pub videos: VideoService,
    pub users: UserService,
    /// Where uploads go. Either `local_media` itself or a remote service.
    pub uploader: Arc<dyn MediaUploader>,
    /// Serves `/media/*`; also the readiness disk probe target.
    pub local_media: LocalMediaStore,
    pub spool: UploadSpool,
}

impl AppState {
    pub fn new(
        db: Arc<SqlitePool>,
        uploader: Arc<dyn MediaUploader>,
        local_media: LocalMediaStore,
        spool: UploadSpool,
    ) -> Self {
        Self {
            videos: VideoService::new(db.clone()),
            users: UserService::new(db.clone()),
            db,
            uploader,
            local_media,
            spool,
        }
    }
}
