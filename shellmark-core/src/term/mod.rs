//! Terminal-side view of what the core writes.
//!
//! - `osc`: streaming OSC parser that turns a byte stream back into markers

pub mod osc;

pub use osc::{decode_markers, OscEvent, OscParser};
