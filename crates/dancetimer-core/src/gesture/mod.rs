//! Button gestures: raw key events in, timer commands out.

mod detector;
mod router;

pub use detector::{
    Button, DetectorConfig, KeyAction, Trigger, TriggerDetector, TriggerMode,
    DEFAULT_HOLD_THRESHOLD_MS, DEFAULT_REPEAT_COUNT, DEFAULT_REPEAT_WINDOW_MS,
};
pub use router::route;
