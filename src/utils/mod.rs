//! Various utilities functions and types

mod geometry;
pub(crate) mod hook;
mod serial;
pub mod signaling;

pub use self::geometry::{Point, Rectangle, Size};
pub use self::hook::HookId;
pub use self::serial::{Serial, SerialCounter, SERIAL_COUNTER};
