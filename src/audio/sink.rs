//! Opening and decoding a file into a paused `rodio::Sink`.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use rodio::{Decoder, OutputStream, Sink};

use crate::error::{Error, Result};

/// Create a paused `Sink` for the file at `path`.
pub(super) fn create_sink(handle: &OutputStream, path: &Path, volume: f32) -> Result<Sink> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;

    let source = Decoder::new(BufReader::new(file))
        .map_err(|e| Error::Playback(format!("failed to decode {}: {e}", path.display())))?;

    let sink = Sink::connect_new(handle.mixer());
    sink.append(source);
    sink.set_volume(volume);
    sink.pause();
    Ok(sink)
}
