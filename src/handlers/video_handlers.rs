//! HTTP handlers for video operations.
//!
//! Each handler validates input, hands files to the media uploader, writes
//! through `VideoService` and wraps the result in `ApiResponse`. Nothing is
//! compensated on partial failure: an upload followed by a failed insert
//! leaves the remote file behind.

use crate::{
    errors::AppError,
    extractors::auth::AuthUser,
    handlers::form::read_upload_form,
    models::video::{Video, VideoDetail, VideoSummary},
    response::ApiResponse,
    services::{
        media::UploadedMedia,
        spool::SpooledFile,
        video_service::{ListVideosParams, NewVideo},
    },
    state::AppState,
};
use axum::{
    Json,
    extract::{
        Multipart, Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument, warn};
use uuid::Uuid;

const VIDEO_FIELD: &str = "videoFile";
const THUMBNAIL_FIELD: &str = "thumbnail";

/// Body for `PATCH /videos/{videoId}`.
#[derive(Debug, Deserialize)]
pub struct UpdateVideoDetailsReq {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Query params accepted by the listing endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListVideosQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub user_id: Option<String>,
}

fn parse_video_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::bad_request("Invalid video id"))
}

fn ensure_owner(video: &Video, user: &AuthUser) -> Result<(), AppError> {
    if video.owner_id == user.id {
        Ok(())
    } else {
        Err(AppError::forbidden("You are not the owner of this video"))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Hand a spooled file to the media service. Any failure becomes a 401 with
/// `failure` as the message; the cause is only logged.
async fn upload_media(
    state: &AppState,
    file: &SpooledFile,
    failure: &'static str,
) -> Result<UploadedMedia, AppError> {
    state.uploader.upload(&file.path).await.map_err(|err| {
        warn!(
            error = %err,
            file_name = file.file_name.as_deref().unwrap_or("-"),
            "media upload failed"
        );
        AppError::unauthorized(failure)
    })
}

/// POST `/api/v1/videos`: publish a new video (multipart).
#[instrument(skip(state, user, multipart), fields(user_id = %user.id))]
pub async fn publish_video(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> Result<ApiResponse<Video>, AppError> {
    let mut form =
        read_upload_form(&state.spool, multipart, &[VIDEO_FIELD, THUMBNAIL_FIELD]).await?;

    let (Some(video_file), Some(thumbnail)) =
        (form.take_file(VIDEO_FIELD), form.take_file(THUMBNAIL_FIELD))
    else {
        return Err(AppError::bad_request("Provide valid image or video."));
    };

    let (Some(title), Some(description)) = (form.text("title"), form.text("description")) else {
        return Err(AppError::bad_request(
            "Title and description are required.",
        ));
    };

    let failure = "Something went wrong while uploading media.";
    let uploaded_video = upload_media(&state, &video_file, failure).await?;
    let uploaded_thumbnail = upload_media(&state, &thumbnail, failure).await?;

    let id = state
        .videos
        .insert(&NewVideo {
            owner_id: user.id,
            title,
            description,
            duration: uploaded_video.duration.unwrap_or(0.0),
            video_file: uploaded_video.secure_url,
            thumbnail: uploaded_thumbnail.secure_url,
        })
        .await?;

    let video = state.videos.find(id).await?.ok_or_else(|| {
        AppError::new(
            StatusCode::PAYMENT_REQUIRED,
            "Failed to save video in database",
        )
    })?;

    info!(video_id = %video.id, "video published");
    Ok(ApiResponse::ok(
        video,
        "Video has been uploaded successfully.",
    ))
}

/// PATCH `/api/v1/videos/{videoId}`: edit title and/or description.
#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn update_video_details(
    State(state): State<AppState>,
    user: AuthUser,
    Path(video_id): Path<String>,
    payload: Result<Json<UpdateVideoDetailsReq>, JsonRejection>,
) -> Result<ApiResponse<Video>, AppError> {
    let id = parse_video_id(&video_id)?;
    let Json(payload) = payload.map_err(|e| AppError::bad_request(e.body_text()))?;

    let title = non_blank(payload.title);
    let description = non_blank(payload.description);
    if title.is_none() && description.is_none() {
        return Err(AppError::bad_request("Provide title or description."));
    }

    let video = state.videos.get(id).await?;
    ensure_owner(&video, &user)?;

    let video = state
        .videos
        .update_details(id, title.as_deref(), description.as_deref())
        .await?;
    Ok(ApiResponse::ok(video, "Video details have been updated"))
}

/// PATCH `/api/v1/videos/{videoId}/thumbnail`: replace the thumbnail (multipart).
#[instrument(skip(state, user, multipart), fields(user_id = %user.id))]
pub async fn update_thumbnail(
    State(state): State<AppState>,
    user: AuthUser,
    Path(video_id): Path<String>,
    multipart: Multipart,
) -> Result<ApiResponse<Video>, AppError> {
    let id = parse_video_id(&video_id)?;
    let video = state.videos.get(id).await?;
    ensure_owner(&video, &user)?;

    let mut form = read_upload_form(&state.spool, multipart, &[THUMBNAIL_FIELD]).await?;
    let thumbnail = form
        .take_file(THUMBNAIL_FIELD)
        .ok_or_else(|| AppError::unauthorized("Provide valid image."))?;

    let uploaded = upload_media(&state, &thumbnail, "Failed to upload media").await?;
    let video = state.videos.set_thumbnail(id, &uploaded.secure_url).await?;
    Ok(ApiResponse::ok(video, "Thumbnail uploaded successfully"))
}

/// PATCH `/api/v1/videos/{videoId}/file`: replace the video file (multipart).
#[instrument(skip(state, user, multipart), fields(user_id = %user.id))]
pub async fn update_video_file(
    State(state): State<AppState>,
    user: AuthUser,
    Path(video_id): Path<String>,
    multipart: Multipart,
) -> Result<ApiResponse<Video>, AppError> {
    let id = parse_video_id(&video_id)?;
    let video = state.videos.get(id).await?;
    ensure_owner(&video, &user)?;

    let mut form = read_upload_form(&state.spool, multipart, &[VIDEO_FIELD]).await?;
    let video_file = form
        .take_file(VIDEO_FIELD)
        .ok_or_else(|| AppError::bad_request("Please provide a video file"))?;

    let uploaded = upload_media(&state, &video_file, "Error in uploading media.").await?;
    let video = state
        .videos
        .set_video_file(id, &uploaded.secure_url, uploaded.duration.unwrap_or(0.0))
        .await?;
    Ok(ApiResponse::ok(video, "Video updated successfully."))
}

/// GET `/api/v1/videos/{videoId}`: detail view with view count.
#[instrument(skip(state))]
pub async fn get_video_detail(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> Result<ApiResponse<VideoDetail>, AppError> {
    let id = parse_video_id(&video_id)?;
    let detail = state.videos.detail(id).await?;
    Ok(ApiResponse::ok(detail, "Video Detail fetched successfully."))
}

/// DELETE `/api/v1/videos/{videoId}`: hard delete.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_video(
    State(state): State<AppState>,
    user: AuthUser,
    Path(video_id): Path<String>,
) -> Result<ApiResponse<Value>, AppError> {
    let id = parse_video_id(&video_id)?;
    let video = state.videos.get(id).await?;
    ensure_owner(&video, &user)?;

    state.videos.delete(id).await?;
    info!(video_id = %id, "video deleted");
    Ok(ApiResponse::ok(json!({ "videoId": id }), "Video deleted."))
}

/// GET `/api/v1/videos`: paginated listing, optionally for one owner.
#[instrument(skip(state, query))]
pub async fn list_videos(
    State(state): State<AppState>,
    query: Result<Query<ListVideosQuery>, QueryRejection>,
) -> Result<ApiResponse<Vec<VideoSummary>>, AppError> {
    let Query(q) = query.map_err(|e| AppError::bad_request(e.body_text()))?;

    let owner_id = match q.user_id.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => {
            Some(Uuid::parse_str(raw).map_err(|_| AppError::bad_request("Invalid user id"))?)
        }
    };

    let params = ListVideosParams::new(owner_id, q.page, q.limit);
    let videos = state.videos.list(params).await?;
    Ok(ApiResponse::ok(videos, "All videos fetched successfully."))
}

/// PATCH `/api/v1/videos/{videoId}/publish`: flip the published flag.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn toggle_publish_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(video_id): Path<String>,
) -> Result<ApiResponse<Video>, AppError> {
    let id = parse_video_id(&video_id)?;
    let video = state.videos.get(id).await?;
    ensure_owner(&video, &user)?;

    let video = state.videos.toggle_publish(id).await?;
    Ok(ApiResponse::ok(
        video,
        "Video published status toggled successfully.",
    ))
}

/// POST `/api/v1/videos/{videoId}/views`: add the video to the caller's watch history.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn record_view(
    State(state): State<AppState>,
    user: AuthUser,
    Path(video_id): Path<String>,
) -> Result<ApiResponse<VideoDetail>, AppError> {
    let id = parse_video_id(&video_id)?;
    state.videos.record_view(user.id, id).await?;
    let detail = state.videos.detail(id).await?;
    Ok(ApiResponse::ok(detail, "View recorded."))
}
