mod engine;
pub mod format;

pub use engine::{
    current_song_index, raw_cost, timeline_marks, BillingPolicy, BillingQuote, Meter,
    TimelineMarks, DEFAULT_GRACE_SECONDS,
};
