//! Translates decoded member contents into the types in [`track`](crate::track).
//!
//! CSV rows are mapped by column position, XML trees by key.
//! Missing columns and keys just produce `NaN`/`None`;
//! the only thing a mapper refuses is an XML document
//! without the root element it expects.

use crate::coerce;
use crate::result::*;
use crate::rows::Row;
use crate::track::*;
use crate::xml::XmlNode;

/// Maps `Track.xml`'s `<track>` element (and its `<metrics>`).
pub fn track_summary(document: &XmlNode) -> DecodeResult<TrackSummary> {
    let track = document
        .child("track")
        .ok_or(DecodeError::MissingRoot("track"))?;
    let string = |key| track.value(key).map(str::to_owned);

    Ok(TrackSummary {
        name: string("name"),
        description: string("description"),
        activity: string("activity"),
        start: coerce::date(track.value("start")),
        finish: coerce::date(track.value("finish")),
        duration: coerce::float(track.value("duration")),
        rating: coerce::integer(track.value("rating")),
        version: string("version"),
        parse_object_id: string("parseObjectId"),
        tz: string("tz"),
        include_in_season: coerce::boolean(track.value("includeInSeason")),
        sync_identifier: string("syncIdentifier"),
        sync_version: coerce::integer(track.value("syncVersion")),
        conditions: string("conditions"),
        platform: string("platform"),
        weather: string("weather"),
        hidden: coerce::boolean(track.value("hidden")),
        track_metrics: track
            .child("metrics")
            .map(track_metrics)
            .unwrap_or_else(missing_metrics),
    })
}

fn track_metrics(metrics: &XmlNode) -> TrackMetrics {
    let number = |key| coerce::float(metrics.value(key));

    TrackMetrics {
        max_speed: number("maxSpeed"),
        max_descent_speed: number("maxDescentSpeed"),
        max_ascent_speed: number("maxAscentSpeed"),
        max_descent_steepness: number("maxDescentSteepness"),
        max_ascent_steepness: number("maxAscentSteepness"),
        max_vertical_descent_speed: number("maxVerticalDescentSpeed"),
        max_vertical_ascent_speed: number("maxVerticalAscentSpeed"),
        total_ascent: number("totalAscent"),
        total_descent: number("totalDescent"),
        max_altitude: number("maxAltitude"),
        min_altitude: number("minAltitude"),
        distance: number("distance"),
        profile_distance: number("profileDistance"),
        descent_distance: number("descentDistance"),
        ascent_distance: number("ascentDistance"),
        average_speed: number("averageSpeed"),
        average_descent_speed: number("averageDescentSpeed"),
        average_ascent_speed: number("averageAscentSpeed"),
        moving_average_speed: number("movingAverageSpeed"),
        moving_average_descent_speed: number("movingAverageDescentSpeed"),
        moving_average_ascent_speed: number("movingAverageAscentSpeed"),
        duration: number("duration"),
        start_altitude: number("startAltitude"),
        finish_altitude: number("finishAltitude"),
        ascents: number("ascents"),
        descents: number("descents"),
        laps: number("laps"),
    }
}

/// No `<metrics>` at all reads the same as an empty one: all `NaN`.
fn missing_metrics() -> TrackMetrics {
    track_metrics(&XmlNode::default())
}

/// Maps every `<event>` in `Events.xml`'s `<events>` element.
pub fn track_events(document: &XmlNode) -> DecodeResult<Vec<TrackEvent>> {
    let events = document
        .child("events")
        .ok_or(DecodeError::MissingRoot("events"))?;

    Ok(events
        .children("event")
        .iter()
        .map(|event| TrackEvent {
            start: coerce::date(event.value("start")),
            end: coerce::date(event.value("end")),
            kind: event.value("type").map(str::to_owned),
        })
        .collect())
}

/// Maps a `Nodes.csv` row:
/// `epoch seconds, latitude, longitude, altitude, heading, velocity, h. accuracy, v. accuracy`
pub fn track_node(row: Row) -> TrackNode {
    let number = |i| coerce::float(row.get(i).as_deref());

    TrackNode {
        timestamp: coerce::epoch_seconds(row.get(0).as_deref()),
        latitude: number(1),
        longitude: number(2),
        altitude: number(3),
        heading: number(4),
        velocity: number(5),
        h_accuracy: number(6),
        v_accuracy: number(7),
    }
}

/// Maps a `Segment.csv` row.
///
/// Columns 2 and 3 aren't used.
pub fn track_segment(row: Row) -> TrackSegment {
    let number = |i| coerce::float(row.get(i).as_deref());
    let string = |i| row.get(i).map(|s| s.into_owned());

    TrackSegment {
        start_time: coerce::epoch_seconds(row.get(0).as_deref()),
        end_time: coerce::epoch_seconds(row.get(1).as_deref()),
        number: coerce::integer(row.get(4).as_deref()),
        name: string(5),
        comment: string(6),
        kind: string(7),
        category: string(8),
        link: string(9),
        uuid: string(10),
        metrics: TrackSegmentMetrics {
            time: number(11),
            speed: number(12),
            distance: number(13),
            vertical: number(14),
            max_speed: number(15),
            slope: number(16),
            max_slope: number(17),
            min_altitude: number(18),
            max_altitude: number(19),
            start_altitude: number(20),
            finish_altitude: number(21),
        },
    }
}

/// Maps a `Battery.csv` row: `date, status, level`
pub fn battery_usage(row: Row) -> BatteryUsage {
    BatteryUsage {
        timestamp: coerce::date(row.get(0).as_deref()),
        status: row.get(1).map(|s| s.into_owned()),
        level: coerce::float(row.get(2).as_deref()),
    }
}

/// Maps a `RelativeAltitudeSensor.csv` row: `date, pressure, relative altitude`
pub fn relative_altitude(row: Row) -> RelativeAltitude {
    RelativeAltitude {
        timestamp: coerce::date(row.get(0).as_deref()),
        pressure: coerce::float(row.get(1).as_deref()),
        relative_altitude: coerce::float(row.get(2).as_deref()),
    }
}
