//! Core data models for the video service.
//!
//! These entities map to database tables via `sqlx::FromRow` and serialize
//! as camelCase JSON via `serde`.

pub mod user;
pub mod video;
