pub mod keys;
pub mod state;

pub use keys::Key;
pub use state::{InputEvent, InputState};
