//! Defines routes for the video API.
//!
//! ## Structure
//! - **Video endpoints** (`/api/v1/videos`)
//!   - `GET    /`                    list videos (`page`, `limit`, `userId`)
//!   - `POST   /`                    publish a video (multipart)
//!   - `GET    /{video_id}`          video detail with view count
//!   - `PATCH  /{video_id}`          update title/description
//!   - `DELETE /{video_id}`          delete video
//!   - `PATCH  /{video_id}/thumbnail` replace thumbnail (multipart)
//!   - `PATCH  /{video_id}/file`     replace video file (multipart)
//!   - `PATCH  /{video_id}/publish`  toggle published flag
//!   - `POST   /{video_id}/views`    record a view for the caller
//!
//! - **User endpoints** (`/api/v1/users`)
//!   - `POST   /`                    register
//!   - `GET    /{user_id}`           fetch
//!
//! - **Media**: `GET /media/{*path}` serves locally hosted files.

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        media_handlers::get_media,
        user_handlers::{get_user, register_user},
        video_handlers::{
            delete_video, get_video_detail, list_videos, publish_video, record_view,
            toggle_publish_status, update_thumbnail, update_video_details, update_video_file,
        },
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
};

/// Build and return the router for all API routes.
///
/// The router carries shared state (`AppState`) to all handlers. Upload
/// routes accept bodies up to `max_upload_bytes`.
pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    let uploads = Router::new()
        .route("/", get(list_videos).post(publish_video))
        .route("/{video_id}/thumbnail", patch(update_thumbnail))
        .route("/{video_id}/file", patch(update_video_file))
        .layer(DefaultBodyLimit::max(max_upload_bytes));

    let videos = Router::new()
        .route(
            "/{video_id}",
            get(get_video_detail)
                .patch(update_video_details)
                .delete(delete_video),
        )
        .route("/{video_id}/publish", patch(toggle_publish_status))
        .route("/{video_id}/views", post(record_view))
        .merge(uploads);

    let users = Router::new()
        .route("/", post(register_user))
        .route("/{user_id}", get(get_user));

    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/media/{*path}", get(get_media))
        .nest("/api/v1/videos", videos)
        .nest("/api/v1/users", users)
}
