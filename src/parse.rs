//! Walks a .skiz archive and assembles its members into a [`SkizTrack`].

use std::io::Read;

use log::*;

use crate::collect::collect;
use crate::mapper;
use crate::read::{FileMetadata, ZipArchive};
use crate::result::*;
use crate::rows::CsvDecoder;
use crate::track::*;
use crate::xml;

/// What one member decoded to
#[derive(Debug)]
enum Decoded {
    Track(TrackSummary),
    Events(Vec<TrackEvent>),
    Nodes(Vec<TrackNode>),
    Segments(Vec<TrackSegment>),
    Battery(Vec<BatteryUsage>),
    RelativeAltitude(Vec<RelativeAltitude>),
}

impl Decoded {
    /// How many records (rows or events) the member held
    fn len(&self) -> usize {
        match self {
            Decoded::Track(_) => 1,
            Decoded::Events(events) => events.len(),
            Decoded::Nodes(nodes) => nodes.len(),
            Decoded::Segments(segments) => segments.len(),
            Decoded::Battery(battery) => battery.len(),
            Decoded::RelativeAltitude(samples) => samples.len(),
        }
    }
}

/// Collects decoded members for a single parse.
///
/// Each member fills its own field, so the order members arrive in
/// (archive order) doesn't matter.
#[derive(Debug, Default)]
struct Aggregator {
    track: SkizTrack,
}

impl Aggregator {
    fn merge(&mut self, decoded: Decoded) {
        let track = &mut self.track;
        let replaced = match decoded {
            Decoded::Track(summary) => track.summary.replace(summary).is_some(),
            Decoded::Events(events) => track.track_events.replace(events).is_some(),
            Decoded::Nodes(nodes) => track.track_nodes.replace(nodes).is_some(),
            Decoded::Segments(segments) => track.track_segments.replace(segments).is_some(),
            Decoded::Battery(battery) => track.battery_usage.replace(battery).is_some(),
            Decoded::RelativeAltitude(samples) => {
                track.relative_altitude.replace(samples).is_some()
            }
        };
        if replaced {
            warn!("Archive has duplicate members; using the last one");
        }
    }

    fn finish(self) -> SkizTrack {
        self.track
    }
}

/// Parses a .skiz archive held in memory.
///
/// Accepts anything that can be viewed as bytes: a `Vec<u8>` read from disk,
/// a slice, a memory map...
///
/// ```no_run
/// # use std::fs;
/// let bytes = fs::read("Day 15.skiz")?;
/// let track = skiz::parse(&bytes)?;
/// println!("{:?} has {} nodes", track.name(), track.track_nodes.as_ref().map_or(0, Vec::len));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
///
/// Members are decoded one after another, in the order the archive lists them.
/// Entries other than the six known members are skipped without being read.
/// Members the archive lacks are left `None` in the result;
/// anything malformed fails the whole parse.
pub fn parse<B: AsRef<[u8]>>(contents: B) -> SkizResult<SkizTrack> {
    let contents = contents.as_ref();
    let archive = ZipArchive::new(contents).map_err(SkizError::ArchiveFormat)?;
    debug!("Archive has {} entries", archive.len());

    let mut aggregator = Aggregator::default();

    for entry in archive.entries() {
        let entry = entry.map_err(SkizError::ArchiveFormat)?;

        let member = match ArchiveMember::from_file_name(entry.path.as_str()) {
            Some(m) => m,
            None => {
                debug!("Skipping {}", entry.path);
                continue;
            }
        };

        let decoded = decode_entry(&archive, &entry, member)?;
        aggregator.merge(decoded);
    }

    Ok(aggregator.finish())
}

/// Opens and decodes a single member.
///
/// The entry's reader is dropped on return, whether decoding worked or not.
fn decode_entry(
    archive: &ZipArchive,
    entry: &FileMetadata,
    member: ArchiveMember,
) -> SkizResult<Decoded> {
    info!("Decoding {} ({} bytes)", member, entry.size);

    let reader = archive
        .read(entry)
        .map_err(|source| SkizError::ArchiveEntry {
            name: entry.path.to_string(),
            source,
        })?;

    decode_member(member, reader, entry.size)
        .map_err(|source| SkizError::MemberDecode { member, source })
}

fn decode_member<R: Read>(member: ArchiveMember, reader: R, size: usize) -> DecodeResult<Decoded> {
    let decoded = match member {
        ArchiveMember::Track => {
            let document = xml::decode(&collect(reader, size)?)?;
            Decoded::Track(mapper::track_summary(&document)?)
        }
        ArchiveMember::Events => {
            let document = xml::decode(&collect(reader, size)?)?;
            Decoded::Events(mapper::track_events(&document)?)
        }
        ArchiveMember::Nodes => {
            Decoded::Nodes(CsvDecoder::headerless().decode(reader, mapper::track_node)?)
        }
        ArchiveMember::Segment => {
            Decoded::Segments(CsvDecoder::skip_header().decode(reader, mapper::track_segment)?)
        }
        ArchiveMember::Battery => {
            Decoded::Battery(CsvDecoder::headerless().decode(reader, mapper::battery_usage)?)
        }
        ArchiveMember::RelativeAltitudeSensor => Decoded::RelativeAltitude(
            CsvDecoder::headerless().decode(reader, mapper::relative_altitude)?,
        ),
    };
    debug!("{} decoded into {} records", member, decoded.len());
    Ok(decoded)
}
