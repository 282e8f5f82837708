pub mod media;
pub mod spool;
pub mod user_service;
pub mod video_service;
