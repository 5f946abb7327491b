pub mod animation;
pub mod behavior;
pub mod entity;
