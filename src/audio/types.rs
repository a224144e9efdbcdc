//! Small playback state type shared by the `Playback` implementations.

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Nothing loaded, or playback was stopped.
    #[default]
    Stopped,
    /// A file is decoded and queued but not playing yet.
    Loaded,
    Playing,
}
