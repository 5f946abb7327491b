pub mod collision;
pub mod frame;
pub mod scene;
pub mod stage;
pub mod time;
