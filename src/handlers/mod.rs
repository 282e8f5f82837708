pub mod form;
pub mod health_handlers;
pub mod media_handlers;
pub mod user_handlers;
pub mod video_handlers;
