//! Represents a registered user that can own videos.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A user account as seen by the video service.
///
/// Credentials are handled by the upstream gateway; only identity fields
/// needed for ownership and watch history are kept here.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    /// Unique handle.
    pub username: String,

    /// Unique contact address, stored lowercased.
    pub email: String,

    pub full_name: String,

    pub created_at: DateTime<Utc>,
}
