mod engine;
mod gesture;
mod slots;

pub use engine::{assign_slot, rotate, CanvasError, Direction};
pub use gesture::{classify_swipe, SWIPE_MAX_DY, SWIPE_MAX_MS, SWIPE_MIN_DX};
pub use slots::{slots, Slot};
