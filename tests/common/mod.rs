//! Builds .skiz archives in memory for the integration tests.

#![allow(dead_code)]

use std::io::Write;

use flate2::write::DeflateEncoder;
use flate2::Compression;

/// Bit 11: file names are UTF-8
const UTF8_FLAG: u16 = 1 << 11;
/// Bit 3: sizes and CRC follow the data
const DATA_DESCRIPTOR_FLAG: u16 = 1 << 3;

/// 1980-01-01 in MS-DOS date format
const DOS_DATE: u16 = (1 << 5) | 1;

/// Writes a (non-Zip64) ZIP archive, one entry at a time.
#[derive(Default)]
pub struct ArchiveBuilder {
    local: Vec<u8>,
    central: Vec<u8>,
    count: u16,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an uncompressed entry.
    pub fn stored(self, name: &str, data: &[u8]) -> Self {
        self.push(name, data.to_vec(), 0, crc32fast::hash(data), data.len(), 0)
    }

    /// Adds a deflated entry.
    pub fn deflated(self, name: &str, data: &[u8]) -> Self {
        self.push(name, deflate(data), 8, crc32fast::hash(data), data.len(), 0)
    }

    /// Adds a deflated entry the way streaming writers do,
    /// with zeroes in the local header and a data descriptor after the data.
    pub fn streamed(self, name: &str, data: &[u8]) -> Self {
        self.push(
            name,
            deflate(data),
            8,
            crc32fast::hash(data),
            data.len(),
            DATA_DESCRIPTOR_FLAG,
        )
    }

    /// Adds an uncompressed entry whose recorded CRC doesn't match its data.
    pub fn with_bad_crc(self, name: &str, data: &[u8]) -> Self {
        self.push(
            name,
            data.to_vec(),
            0,
            !crc32fast::hash(data),
            data.len(),
            0,
        )
    }

    /// Adds an entry claiming some other compression method.
    pub fn with_method(self, name: &str, data: &[u8], method: u16) -> Self {
        self.push(name, data.to_vec(), method, crc32fast::hash(data), data.len(), 0)
    }

    fn push(
        mut self,
        name: &str,
        payload: Vec<u8>,
        method: u16,
        crc: u32,
        size: usize,
        extra_flags: u16,
    ) -> Self {
        let flags = UTF8_FLAG | extra_flags;
        let streamed = extra_flags & DATA_DESCRIPTOR_FLAG != 0;
        let offset = self.local.len() as u32;
        let compressed_size = payload.len() as u32;
        let size = size as u32;

        let (local_crc, local_compressed, local_size) = if streamed {
            (0, 0, 0)
        } else {
            (crc, compressed_size, size)
        };

        let local = &mut self.local;
        local.extend_from_slice(&[b'P', b'K', 3, 4]);
        put_u16(local, 20); // version needed
        put_u16(local, flags);
        put_u16(local, method);
        put_u16(local, 0); // time
        put_u16(local, DOS_DATE);
        put_u32(local, local_crc);
        put_u32(local, local_compressed);
        put_u32(local, local_size);
        put_u16(local, name.len() as u16);
        put_u16(local, 0); // extra field length
        local.extend_from_slice(name.as_bytes());
        local.extend_from_slice(&payload);
        if streamed {
            local.extend_from_slice(&[b'P', b'K', 7, 8]);
            put_u32(local, crc);
            put_u32(local, compressed_size);
            put_u32(local, size);
        }

        let central = &mut self.central;
        central.extend_from_slice(&[b'P', b'K', 1, 2]);
        put_u16(central, (3 << 8) | 20); // made by: Unix
        put_u16(central, 20); // version needed
        put_u16(central, flags);
        put_u16(central, method);
        put_u16(central, 0); // time
        put_u16(central, DOS_DATE);
        put_u32(central, crc);
        put_u32(central, compressed_size);
        put_u32(central, size);
        put_u16(central, name.len() as u16);
        put_u16(central, 0); // extra field length
        put_u16(central, 0); // comment length
        put_u16(central, 0); // disk number
        put_u16(central, 0); // internal attributes
        put_u32(central, 0o100644 << 16); // external attributes
        put_u32(central, offset);
        central.extend_from_slice(name.as_bytes());

        self.count += 1;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut archive = self.local;
        let central_offset = archive.len() as u32;
        archive.extend_from_slice(&self.central);

        archive.extend_from_slice(&[b'P', b'K', 5, 6]);
        put_u16(&mut archive, 0); // this disk
        put_u16(&mut archive, 0); // disk with central directory
        put_u16(&mut archive, self.count);
        put_u16(&mut archive, self.count);
        put_u32(&mut archive, self.central.len() as u32);
        put_u32(&mut archive, central_offset);
        put_u16(&mut archive, 0); // comment length
        archive
    }
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("Couldn't deflate");
    encoder.finish().expect("Couldn't deflate")
}

pub const TRACK_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<track name="Day 15 - 2020/2021" activity="skiing" description="Bluebird after the storm"
       start="2021-01-15T08:02:11.000Z" finish="2021-01-15T15:31:40.000Z" duration="26969"
       rating="4" version="3" parseObjectId="aZ09Xy" tz="+0100" includeinseason="true"
       syncIdentifier="3F2504E0-4F89-11D3-9A0C-0305E82C3301" syncVersion="12"
       conditions="powder" platform="iOS" weather="snow" hidden="false">
  <metrics>
    <maxspeed>23.42</maxspeed>
    <maxdescentspeed>23.42</maxdescentspeed>
    <maxascentspeed>5.1</maxascentspeed>
    <maxdescentsteepness>38.2</maxdescentsteepness>
    <maxascentsteepness>29.7</maxascentsteepness>
    <maxverticaldescentspeed>4.2</maxverticaldescentspeed>
    <maxverticalascentspeed>3.3</maxverticalascentspeed>
    <totalascent>5123</totalascent>
    <totaldescent>5301</totaldescent>
    <maxaltitude>2752.5</maxaltitude>
    <minaltitude>1602.1</minaltitude>
    <distance>61234.9</distance>
    <profiledistance>63310.2</profiledistance>
    <descentdistance>38211.4</descentdistance>
    <ascentdistance>23023.5</ascentdistance>
    <averagespeed>2.27</averagespeed>
    <averagedescentspeed>9.81</averagedescentspeed>
    <averageascentspeed>2.96</averageascentspeed>
    <movingaveragespeed>4.4</movingaveragespeed>
    <movingaveragedescentspeed>10.2</movingaveragedescentspeed>
    <movingaverageascentspeed>3.1</movingaverageascentspeed>
    <duration>26969</duration>
    <startaltitude>1610.4</startaltitude>
    <finishaltitude>1605.9</finishaltitude>
    <ascents>14</ascents>
    <descents>15</descents>
    <laps>14</laps>
  </metrics>
</track>
"#;

pub const EVENTS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<events>
  <event start="2021-01-15T08:02:11.000Z" end="2021-01-15T08:02:11.000Z" type="start"/>
  <event start="2021-01-15T12:01:00.000Z" end="2021-01-15T12:55:30.000Z" type="pause"/>
  <event start="2021-01-15T15:31:40.000Z" end="2021-01-15T15:31:40.000Z" type="stop"/>
</events>
"#;

pub const NODES_CSV: &str = "\
1610697731,46.54271,11.89745,1610.4,182.5,0.5,4,3
1610697732.5,46.54269,11.89746,1610.9,185,1.25,4,3
1610697734,46.54266,11.89749,1611.6,187.25,2.5,5,4
1610697736,46.54262,11.89753,1612.2,190,3,5,4
";

pub const SEGMENT_CSV: &str = "\
start,end,startIndex,endIndex,number,name,comment,type,category,link,uuid,time,speed,distance,vertical,maxSpeed,slope,maxSlope,minAltitude,maxAltitude,startAltitude,finishAltitude
1610697731,1610698331,0,600,1,Lift 1,,lift,chairlift,,a1b2c3,600,3.5,2100,620,5.1,17.2,29.7,1610.4,2230.1,1610.4,2230.1
1610698400,1610698700,601,901,2,Run 1,\"First tracks, untouched\",run,red,https://example.com/run/1,d4e5f6,300,11.2,3360,610,21.9,18.1,34.5,1620.3,2228.8,2228.8,1620.3
";

pub const BATTERY_CSV: &str = "\
2021-01-15 08:02:11 +0000,unplugged,0.98
2021-01-15 11:02:11 +0000,unplugged,0.71
2021-01-15 15:31:40 +0000,unplugged,0.43
";

pub const ALTITUDE_CSV: &str = "\
2021-01-15 08:02:12 +0000,83.211,0
2021-01-15 08:02:13 +0000,83.209,0.18
";

/// All six members, in the order the app tends to write them,
/// plus a few entries we don't care about.
pub fn reference_archive() -> Vec<u8> {
    ArchiveBuilder::new()
        .deflated("Track.xml", TRACK_XML.as_bytes())
        .deflated("Nodes.csv", NODES_CSV.as_bytes())
        .stored("Photos/", b"")
        .deflated("Segment.csv", SEGMENT_CSV.as_bytes())
        .deflated("Events.xml", EVENTS_XML.as_bytes())
        .deflated("Battery.csv", BATTERY_CSV.as_bytes())
        .stored("Info.plist", b"<plist/>")
        .deflated("RelativeAltitudeSensor.csv", ALTITUDE_CSV.as_bytes())
        .build()
}

/// An archive from before battery and barometer logging.
pub fn older_archive() -> Vec<u8> {
    ArchiveBuilder::new()
        .deflated("Track.xml", TRACK_XML.as_bytes())
        .deflated("Nodes.csv", NODES_CSV.as_bytes())
        .deflated("Segment.csv", SEGMENT_CSV.as_bytes())
        .build()
}
