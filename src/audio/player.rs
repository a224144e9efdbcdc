use std::path::Path;

use rodio::{OutputStream, OutputStreamBuilder, Sink};
use tracing::debug;

use crate::catalog::{Catalog, Track, TrackId};
use crate::error::{Error, Result};

use super::sink::create_sink;
use super::types::PlaybackState;

/// Narrow playback capability. Consumes paths only and never touches the
/// catalog's backup or presence state.
pub trait Playback {
    fn load(&mut self, path: &Path) -> Result<()>;
    fn play(&mut self) -> Result<()>;
    fn stop(&mut self);
    fn state(&self) -> PlaybackState;
}

/// Look up `id` and start playing its file.
pub fn play_track<P: Playback + ?Sized>(player: &mut P, catalog: &Catalog, id: TrackId) -> Result<Track> {
    let track = catalog.get(id)?;
    player.load(&track.path)?;
    player.play()?;
    Ok(track)
}

/// `Playback` on the default audio output device.
pub struct RodioPlayback {
    stream: OutputStream,
    sink: Option<Sink>,
    volume: f32,
}

impl RodioPlayback {
    pub fn new(volume: f32) -> Result<Self> {
        let mut stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| Error::Playback(format!("no audio output device: {e}")))?;
        // rodio logs to stderr when OutputStream is dropped.
        stream.log_on_drop(false);

        Ok(Self {
            stream,
            sink: None,
            volume: volume.clamp(0.0, 1.0),
        })
    }

    /// Block until the loaded file has played out or was stopped.
    pub fn wait_until_end(&self) {
        if let Some(sink) = self.sink.as_ref() {
            sink.sleep_until_end();
        }
    }
}

impl Playback for RodioPlayback {
    fn load(&mut self, path: &Path) -> Result<()> {
        self.stop();
        self.sink = Some(create_sink(&self.stream, path, self.volume)?);
        debug!(path = %path.display(), "loaded");
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        let sink = self
            .sink
            .as_ref()
            .ok_or_else(|| Error::Playback("nothing loaded".to_string()))?;
        sink.play();
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(s) = self.sink.take() {
            s.stop();
        }
    }

    fn state(&self) -> PlaybackState {
        match self.sink.as_ref() {
            None => PlaybackState::Stopped,
            Some(s) if s.empty() => PlaybackState::Stopped,
            Some(s) if s.is_paused() => PlaybackState::Loaded,
            Some(_) => PlaybackState::Playing,
        }
    }
}
