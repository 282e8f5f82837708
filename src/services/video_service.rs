//! VideoService: persistence for video records backed by SQLite.
//!
//! Every method is a single statement (or a read followed by one); uploads
//! are the caller's business and happen before anything reaches this layer.

use crate::models::video::{Video, VideoDetail, VideoSummary};
use chrono::Utc;
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

const VIDEO_COLUMNS: &str = "id, owner_id, title, description, duration, video_file, \
                             thumbnail, is_published, created_at, updated_at";

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

#[derive(Debug, Error)]
pub enum VideoError {
    #[error("video `{0}` not found")]
    NotFound(Uuid),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type VideoResult<T> = Result<T, VideoError>;

/// Fields required to create a video once its media is uploaded.
#[derive(Debug, Clone)]
pub struct NewVideo {
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub duration: f64,
    pub video_file: String,
    pub thumbnail: String,
}

#[derive(Debug, Clone, Copy)]
pub struct ListVideosParams {
    pub owner_id: Option<Uuid>,
    /// 1-based page number.
    pub page: u32,
    pub limit: u32,
}

impl ListVideosParams {
    /// Clamp caller input: page >= 1, limit in 1..=MAX_PAGE_LIMIT.
    pub fn new(owner_id: Option<Uuid>, page: Option<i64>, limit: Option<i64>) -> Self {
        let page = page.unwrap_or(1).clamp(1, i64::from(u32::MAX));
        let limit = limit
            .unwrap_or(i64::from(DEFAULT_PAGE_LIMIT))
            .clamp(1, i64::from(MAX_PAGE_LIMIT));
        Self {
            owner_id,
            page: page as u32,
            limit: limit as u32,
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

#[derive(Clone)]
pub struct VideoService {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl VideoService {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Insert a new, published video and return its id.
    pub async fn insert(&self, new: &NewVideo) -> VideoResult<Uuid> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO videos (
                id, owner_id, title, description, duration, video_file,
                thumbnail, is_published, created_at, updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?, ?)",
        )
        .bind(id)
        .bind(new.owner_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.duration)
        .bind(&new.video_file)
        .bind(&new.thumbnail)
        .bind(now)
        .bind(now)
        .execute(&*self.db)
        .await?;

        debug!(video_id = %id, owner_id = %new.owner_id, "inserted video");
        Ok(id)
    }

    /// Fetch a video, `None` if it does not exist.
    pub async fn find(&self, id: Uuid) -> VideoResult<Option<Video>> {
        let sql = format!("SELECT {} FROM videos WHERE id = ?", VIDEO_COLUMNS);
        Ok(sqlx::query_as::<_, Video>(&sql)
            .bind(id)
            .fetch_optional(&*self.db)
            .await?)
    }

    /// Fetch a video or fail with `NotFound`.
    pub async fn get(&self, id: Uuid) -> VideoResult<Video> {
        self.find(id).await?.ok_or(VideoError::NotFound(id))
    }

    /// Replace title and/or description. `None` keeps the stored value.
    pub async fn update_details(
        &self,
        id: Uuid,
        title: Option<&str>,
        description: Option<&str>,
    ) -> VideoResult<Video> {
        let sql = format!(
            "UPDATE videos
             SET title = COALESCE(?, title),
                 description = COALESCE(?, description),
                 updated_at = ?
             WHERE id = ?
             RETURNING {}",
            VIDEO_COLUMNS
        );
        sqlx::query_as::<_, Video>(&sql)
            .bind(title)
            .bind(description)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&*self.db)
            .await?
            .ok_or(VideoError::NotFound(id))
    }

    pub async fn set_thumbnail(&self, id: Uuid, thumbnail: &str) -> VideoResult<Video> {
        let sql = format!(
            "UPDATE videos SET thumbnail = ?, updated_at = ? WHERE id = ? RETURNING {}",
            VIDEO_COLUMNS
        );
        sqlx::query_as::<_, Video>(&sql)
            .bind(thumbnail)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&*self.db)
            .await?
            .ok_or(VideoError::NotFound(id))
    }

    /// Point the record at a newly uploaded file and take over its duration.
    pub async fn set_video_file(
        &self,
        id: Uuid,
        video_file: &str,
        duration: f64,
    ) -> VideoResult<Video> {
        let sql = format!(
            "UPDATE videos SET video_file = ?, duration = ?, updated_at = ?
             WHERE id = ? RETURNING {}",
            VIDEO_COLUMNS
        );
        sqlx::query_as::<_, Video>(&sql)
            .bind(video_file)
            .bind(duration)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&*self.db)
            .await?
            .ok_or(VideoError::NotFound(id))
    }

    /// Flip `is_published` in a single statement.
    pub async fn toggle_publish(&self, id: Uuid) -> VideoResult<Video> {
        let sql = format!(
            "UPDATE videos SET is_published = NOT is_published, updated_at = ?
             WHERE id = ? RETURNING {}",
            VIDEO_COLUMNS
        );
        sqlx::query_as::<_, Video>(&sql)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&*self.db)
            .await?
            .ok_or(VideoError::NotFound(id))
    }

    /// Hard delete. Watch history rows cascade.
    pub async fn delete(&self, id: Uuid) -> VideoResult<()> {
        let result = sqlx::query("DELETE FROM videos WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(VideoError::NotFound(id));
        }
        debug!(video_id = %id, "deleted video");
        Ok(())
    }

    /// Page through videos, newest first.
    pub async fn list(&self, params: ListVideosParams) -> VideoResult<Vec<VideoSummary>> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT id, title, description, thumbnail, duration FROM videos",
        );

        if let Some(owner_id) = params.owner_id {
            builder.push(" WHERE owner_id = ");
            builder.push_bind(owner_id);
        }

        builder.push(" ORDER BY created_at DESC, id ASC LIMIT ");
        builder.push_bind(i64::from(params.limit));
        builder.push(" OFFSET ");
        builder.push_bind(params.offset() as i64);

        let videos: Vec<VideoSummary> = builder.build_query_as().fetch_all(&*self.db).await?;
        Ok(videos)
    }

    /// Detail projection with the number of distinct viewers.
    pub async fn detail(&self, id: Uuid) -> VideoResult<VideoDetail> {
        sqlx::query_as::<_, VideoDetail>(
            "SELECT v.id, v.title, v.description,
                    (SELECT COUNT(DISTINCT w.user_id) FROM watch_history w
                     WHERE w.video_id = v.id) AS views,
                    v.video_file, v.thumbnail, v.duration
             FROM videos v WHERE v.id = ?",
        )
        .bind(id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(VideoError::NotFound(id))
    }

    /// Add `video_id` to the user's watch history, refreshing the timestamp
    /// on a repeat view. The caller is an existing user, so a foreign key
    /// failure means the video is gone.
    pub async fn record_view(&self, user_id: Uuid, video_id: Uuid) -> VideoResult<()> {
        let result = sqlx::query(
            "INSERT INTO watch_history (user_id, video_id, watched_at) VALUES (?, ?, ?)
             ON CONFLICT(user_id, video_id) DO UPDATE SET watched_at = excluded.watched_at",
        )
        .bind(user_id)
        .bind(video_id)
        .bind(Utc::now())
        .execute(&*self.db)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_foreign_key_violation(&err) => Err(VideoError::NotFound(video_id)),
            Err(err) => Err(VideoError::Sqlx(err)),
        }
    }
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::user_service::{NewUser, UserService};
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::str::FromStr;

    async fn memory_pool() -> Arc<SqlitePool> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .foreign_keys(true);
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();
        crate::run_migrations(&db).await.unwrap();
        Arc::new(db)
    }

    #[tokio::test]
    async fn view_of_deleted_video_is_not_found() {
        let db = memory_pool().await;
        let viewer = UserService::new(db.clone())
            .create(NewUser {
                username: "viewer".into(),
                email: "viewer@example.com".into(),
                full_name: "Viewer".into(),
            })
            .await
            .unwrap();
        let videos = VideoService::new(db);
        let id = videos
            .insert(&NewVideo {
                owner_id: viewer.id,
                title: "t".into(),
                description: "d".into(),
                duration: 1.0,
                video_file: "f".into(),
                thumbnail: "th".into(),
            })
            .await
            .unwrap();

        videos.record_view(viewer.id, id).await.unwrap();
        videos.record_view(viewer.id, id).await.unwrap();
        assert_eq!(videos.detail(id).await.unwrap().views, 1);

        videos.delete(id).await.unwrap();
        let err = videos.record_view(viewer.id, id).await.unwrap_err();
        assert!(matches!(err, VideoError::NotFound(missing) if missing == id));
    }

    #[test]
    fn list_params_clamp_input() {
        let p = ListVideosParams::new(None, None, None);
        assert_eq!((p.page, p.limit, p.offset()), (1, DEFAULT_PAGE_LIMIT, 0));

        let p = ListVideosParams::new(None, Some(0), Some(0));
        assert_eq!((p.page, p.limit), (1, 1));

        let p = ListVideosParams::new(None, Some(3), Some(500));
        assert_eq!(p.limit, MAX_PAGE_LIMIT);
        assert_eq!(p.offset(), 200);

        let p = ListVideosParams::new(None, Some(-4), Some(-20));
        assert_eq!((p.page, p.limit, p.offset()), (1, 1, 0));

        let p = ListVideosParams::new(None, Some(i64::MAX), None);
        assert_eq!(p.page, u32::MAX);
    }
}
