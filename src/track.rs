//! The decoded shape of a .skiz archive.
//!
//! With the `serde` feature, every type here serializes with the same
//! camelCase field names .skiz tooling has always produced
//! (`hAccuracy`, `includeInSeason`, `trackMetrics`, ...).

use std::fmt;

use chrono::{DateTime, Utc};

#[cfg(feature = "serde")]
use serde::Serialize;

/// The members of a .skiz archive we know how to read,
/// named by their exact path in the archive.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ArchiveMember {
    /// `Track.xml`: session metadata and metrics
    Track,
    /// `Events.xml`: pauses, lifts, and other timed events
    Events,
    /// `Nodes.csv`: GPS samples
    Nodes,
    /// `Segment.csv`: per-run statistics
    Segment,
    /// `Battery.csv`: battery level over time
    Battery,
    /// `RelativeAltitudeSensor.csv`: barometer samples
    RelativeAltitudeSensor,
}

impl ArchiveMember {
    pub const ALL: [ArchiveMember; 6] = [
        ArchiveMember::Track,
        ArchiveMember::Events,
        ArchiveMember::Nodes,
        ArchiveMember::Segment,
        ArchiveMember::Battery,
        ArchiveMember::RelativeAltitudeSensor,
    ];

    /// Matches an entry's path against the known member names, exactly.
    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|member| member.file_name() == name)
    }

    pub fn file_name(self) -> &'static str {
        match self {
            ArchiveMember::Track => "Track.xml",
            ArchiveMember::Events => "Events.xml",
            ArchiveMember::Nodes => "Nodes.csv",
            ArchiveMember::Segment => "Segment.csv",
            ArchiveMember::Battery => "Battery.csv",
            ArchiveMember::RelativeAltitudeSensor => "RelativeAltitudeSensor.csv",
        }
    }
}

impl fmt::Display for ArchiveMember {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Aggregate metrics for the whole session, from `Track.xml`'s `<metrics>`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(rename_all = "camelCase"))]
pub struct TrackMetrics {
    pub max_speed: f64,
    pub max_descent_speed: f64,
    pub max_ascent_speed: f64,
    pub max_descent_steepness: f64,
    pub max_ascent_steepness: f64,
    pub max_vertical_descent_speed: f64,
    pub max_vertical_ascent_speed: f64,
    pub total_ascent: f64,
    pub total_descent: f64,
    pub max_altitude: f64,
    pub min_altitude: f64,
    pub distance: f64,
    pub profile_distance: f64,
    pub descent_distance: f64,
    pub ascent_distance: f64,
    pub average_speed: f64,
    pub average_descent_speed: f64,
    pub average_ascent_speed: f64,
    pub moving_average_speed: f64,
    pub moving_average_descent_speed: f64,
    pub moving_average_ascent_speed: f64,
    pub duration: f64,
    pub start_altitude: f64,
    pub finish_altitude: f64,
    pub ascents: f64,
    pub descents: f64,
    pub laps: f64,
}

/// Session-level metadata, from `Track.xml`
///
/// Strings are `None` when `Track.xml` doesn't mention them.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(rename_all = "camelCase"))]
pub struct TrackSummary {
    pub name: Option<String>,
    pub description: Option<String>,
    pub activity: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub finish: Option<DateTime<Utc>>,
    /// Seconds
    pub duration: f64,
    pub rating: Option<i64>,
    pub version: Option<String>,
    pub parse_object_id: Option<String>,
    pub tz: Option<String>,
    pub include_in_season: bool,
    pub sync_identifier: Option<String>,
    pub sync_version: Option<i64>,
    pub conditions: Option<String>,
    pub platform: Option<String>,
    pub weather: Option<String>,
    pub hidden: bool,
    pub track_metrics: TrackMetrics,
}

/// Something that happened between two points in time, from `Events.xml`
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct TrackEvent {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: Option<String>,
}

/// A GPS sample, from `Nodes.csv`
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(rename_all = "camelCase"))]
pub struct TrackNode {
    pub timestamp: Option<DateTime<Utc>>,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub heading: f64,
    pub velocity: f64,
    pub h_accuracy: f64,
    pub v_accuracy: f64,
}

/// Statistics for a single segment (run, lift ride, ...)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(rename_all = "camelCase"))]
pub struct TrackSegmentMetrics {
    pub time: f64,
    pub speed: f64,
    pub distance: f64,
    pub vertical: f64,
    pub max_speed: f64,
    pub slope: f64,
    pub max_slope: f64,
    pub min_altitude: f64,
    pub max_altitude: f64,
    pub start_altitude: f64,
    pub finish_altitude: f64,
}

/// A labeled run or lap, from `Segment.csv`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(rename_all = "camelCase"))]
pub struct TrackSegment {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub number: Option<i64>,
    pub name: Option<String>,
    pub comment: Option<String>,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: Option<String>,
    pub category: Option<String>,
    pub link: Option<String>,
    pub uuid: Option<String>,
    pub metrics: TrackSegmentMetrics,
}

/// A battery reading, from `Battery.csv`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct BatteryUsage {
    pub timestamp: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub level: f64,
}

/// A barometer reading, from `RelativeAltitudeSensor.csv`
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(rename_all = "camelCase"))]
pub struct RelativeAltitude {
    pub timestamp: Option<DateTime<Utc>>,
    pub pressure: f64,
    pub relative_altitude: f64,
}

/// Everything decoded from a .skiz archive.
///
/// Each field comes from exactly one member.
/// A member missing from the archive leaves its field `None`;
/// a member that's present but has no rows gives `Some(vec![])`.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(rename_all = "camelCase"))]
pub struct SkizTrack {
    /// From `Track.xml`
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub summary: Option<TrackSummary>,
    /// From `Events.xml`
    pub track_events: Option<Vec<TrackEvent>>,
    /// From `Nodes.csv`
    pub track_nodes: Option<Vec<TrackNode>>,
    /// From `Segment.csv`
    pub track_segments: Option<Vec<TrackSegment>>,
    /// From `Battery.csv`
    pub battery_usage: Option<Vec<BatteryUsage>>,
    /// From `RelativeAltitudeSensor.csv`
    pub relative_altitude: Option<Vec<RelativeAltitude>>,
}

impl SkizTrack {
    /// The session's name, if `Track.xml` was present and gave one
    pub fn name(&self) -> Option<&str> {
        self.summary.as_ref()?.name.as_deref()
    }

    /// The kind of session ("skiing", ...), if `Track.xml` was present and gave one
    pub fn activity(&self) -> Option<&str> {
        self.summary.as_ref()?.activity.as_deref()
    }
}
