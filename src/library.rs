//! Library scanning: finding audio files under a root and reading their tags.

mod display;
mod model;
mod scan;
mod tags;

pub use display::display_from_fields;
pub use model::*;
pub use scan::{Scan, collect_candidates, scan};
pub use tags::read_metadata;
