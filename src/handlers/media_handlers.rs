//! Serves files held by the local media store.

use crate::{errors::AppError, state::AppState};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use tokio_util::io::ReaderStream;

/// GET `/media/{*path}`: stream a stored media file.
///
/// Paths are content-addressed, so responses are marked immutable.
pub async fn get_media(
    State(state): State<AppState>,
    Path(rel_path): Path<String>,
) -> Result<Response, AppError> {
    let (file, len) = state.local_media.open(&rel_path).await?;
    let body = Body::from_stream(ReaderStream::new(file));

    let content_type = mime_guess::from_path(&rel_path)
        .first_raw()
        .unwrap_or("application/octet-stream");

    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );
    Ok(response)
}
