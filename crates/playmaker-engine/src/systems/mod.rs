pub mod animation;
pub mod dispatch;
pub mod integrate;
pub mod render;
