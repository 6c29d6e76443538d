//! skiz reads the `.skiz` archives GPS ski-tracking apps export
//! into a single, typed [`SkizTrack`]:
//!
//! ```no_run
//! # use std::fs;
//! let bytes = fs::read("Day 15.skiz")?;
//! let track = skiz::parse(&bytes)?;
//!
//! assert_eq!(track.activity(), Some("skiing"));
//! for node in track.track_nodes.iter().flatten() {
//!     println!("{:?}: {}, {}", node.timestamp, node.latitude, node.longitude);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! A .skiz file is a ZIP archive holding up to six members:
//!
//! | Member                       | Becomes                          |
//! |------------------------------|----------------------------------|
//! | `Track.xml`                  | [`SkizTrack::summary`]           |
//! | `Events.xml`                 | [`SkizTrack::track_events`]      |
//! | `Nodes.csv`                  | [`SkizTrack::track_nodes`]       |
//! | `Segment.csv`                | [`SkizTrack::track_segments`]    |
//! | `Battery.csv`                | [`SkizTrack::battery_usage`]     |
//! | `RelativeAltitudeSensor.csv` | [`SkizTrack::relative_altitude`] |
//!
//! Older archives lack some members (battery and barometer data especially);
//! their fields are just `None`.
//!
//! Parsing is strict about structure and lenient about values.
//! A truncated archive, a ragged CSV, or unbalanced XML fails the parse
//! with a [`SkizError`], but a latitude of `"abc"` is simply `NaN`
//! and an unreadable date is `None`.
//!
//! The ZIP reader underneath works straight from a byte slice
//! (a `Vec`, or a memory map for the truly enormous day on the hill)
//! and is available as [`read::ZipArchive`] if you want the raw members.

pub mod read;
pub mod result;
pub mod rows;
pub mod track;
pub mod xml;

pub use parse::parse;
pub use read::CompressionMethod;
pub use read::ZipArchive;
pub use result::{SkizError, SkizResult};
pub use track::*;

mod arch;
mod coerce;
mod collect;
mod crc_reader;
mod mapper;
mod parse;
mod spec;
