//! Audio playback behind a small `Playback` trait.
//!
//! `RodioPlayback` drives the default output device; tests substitute a fake.

mod player;
mod sink;
mod types;

pub use player::{Playback, RodioPlayback, play_track};
pub use types::PlaybackState;
