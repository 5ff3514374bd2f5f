//! MPD document model and XML rendering.

use std::io::{Cursor, Write};

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;

use crate::error::Result;

pub const MPD_NAMESPACE: &str = "urn:mpeg:dash:schema:mpd:2011";
pub const LIVE_PROFILE: &str = "urn:mpeg:dash:profile:isoff-live:2011";
pub const ROLE_SCHEME: &str = "urn:mpeg:dash:role:2011";
pub const AUDIO_CHANNEL_SCHEME: &str = "urn:mpeg:dash:23003:3:audio_channel_configuration:2011";

const XLINK_NAMESPACE: &str = "http://www.w3.org/1999/xlink";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
const SCHEMA_LOCATION: &str = "urn:mpeg:DASH:schema:MPD:2011 http://standards.iso.org/ittf/PubliclyAvailableStandards/MPEG-DASH_schema_files/DASH-MPD.xsd";

/// Format a millisecond count as an ISO 8601 duration, e.g. `PT1.500S`.
pub fn format_duration_ms(ms: i64) -> String {
    format!("PT{:.3}S", ms as f64 / 1000.0)
}

/// Format a wall-clock time with millisecond precision, e.g. `2024-01-01T00:00:00.000Z`.
pub fn format_timestamp(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// A composed live manifest, ready to render.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct ManifestDocument {
    pub publish_time: DateTime<Utc>,
    pub availability_start_time: DateTime<Utc>,
    /// Absent while both segment windows are empty.
    pub buffer: Option<BufferTiming>,
    /// Video first, then audio.
    pub adaptation_sets: Vec<AdaptationSet>,
}

/// Buffer and refresh hints derived from the shortest held segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct BufferTiming {
    pub min_buffer_time_ms: i64,
    pub minimum_update_period_ms: i64,
    pub suggested_presentation_delay_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum MediaContent {
    Video {
        width: u32,
        height: u32,
        frame_rate: u32,
    },
    Audio {
        lang: String,
        channels: u32,
    },
}

impl MediaContent {
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Video { .. } => "video",
            Self::Audio { .. } => "audio",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Video { .. } => "video/mp4",
            Self::Audio { .. } => "audio/mp4",
        }
    }
}

/// One adaptation set with its single representation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct AdaptationSet {
    pub id: u32,
    pub content: MediaContent,
    pub representation: Representation,
    pub template: SegmentTemplate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Representation {
    pub id: String,
    pub bandwidth: u64,
    pub codecs: String,
    pub audio_sampling_rate: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct SegmentTemplate {
    pub timescale: u32,
    pub media: String,
    pub initialization: String,
    /// Oldest first.
    pub timeline: Vec<TimelineEntry>,
}

impl SegmentTemplate {
    /// Template addressing segments by representation id and start time.
    pub fn for_prefix(prefix: &str, timescale: u32, timeline: Vec<TimelineEntry>) -> Self {
        Self {
            timescale,
            media: format!("{}_$RepresentationID$_$Time$_mp4.m4s", prefix),
            initialization: format!("{}_$RepresentationID$_init_mp4.m4s", prefix),
            timeline,
        }
    }
}

/// One `<S>` element of a segment timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct TimelineEntry {
    /// Start time, truncated to 32 bits on the wire.
    pub t: u32,
    pub d: i64,
}

impl TimelineEntry {
    pub fn new(timestamp: i64, duration: i64) -> Self {
        Self {
            t: (timestamp & 0xffff_ffff) as u32,
            d: duration,
        }
    }
}

impl ManifestDocument {
    /// Render to an indented XML string with declaration.
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut mpd = BytesStart::new("MPD");
        mpd.push_attribute(("xmlns", MPD_NAMESPACE));
        mpd.push_attribute(("profiles", LIVE_PROFILE));
        mpd.push_attribute(("type", "dynamic"));
        mpd.push_attribute(("xmlns:xlink", XLINK_NAMESPACE));
        mpd.push_attribute(("xmlns:xsi", XSI_NAMESPACE));
        mpd.push_attribute(("xsi:schemaLocation", SCHEMA_LOCATION));
        mpd.push_attribute(("publishTime", format_timestamp(&self.publish_time).as_str()));
        mpd.push_attribute((
            "availabilityStartTime",
            format_timestamp(&self.availability_start_time).as_str(),
        ));
        if let Some(buffer) = &self.buffer {
            mpd.push_attribute((
                "minBufferTime",
                format_duration_ms(buffer.min_buffer_time_ms).as_str(),
            ));
            mpd.push_attribute((
                "minimumUpdatePeriod",
                format_duration_ms(buffer.minimum_update_period_ms).as_str(),
            ));
            mpd.push_attribute((
                "suggestedPresentationDelay",
                format_duration_ms(buffer.suggested_presentation_delay_ms).as_str(),
            ));
        }
        writer.write_event(Event::Start(mpd))?;

        let mut period = BytesStart::new("Period");
        period.push_attribute(("id", "0"));
        period.push_attribute(("start", "PT0.0S"));
        writer.write_event(Event::Start(period))?;

        for set in &self.adaptation_sets {
            write_adaptation_set(&mut writer, set)?;
        }

        writer.write_event(Event::End(BytesEnd::new("Period")))?;
        writer.write_event(Event::End(BytesEnd::new("MPD")))?;

        let bytes = writer.into_inner().into_inner();
        Ok(String::from_utf8(bytes)?)
    }
}

fn write_adaptation_set<W: Write>(writer: &mut Writer<W>, set: &AdaptationSet) -> Result<()> {
    let mut element = BytesStart::new("AdaptationSet");
    element.push_attribute(("id", set.id.to_string().as_str()));
    element.push_attribute(("contentType", set.content.content_type()));
    element.push_attribute(("mimeType", set.content.mime_type()));
    match &set.content {
        MediaContent::Video {
            width,
            height,
            frame_rate,
        } => {
            element.push_attribute(("width", width.to_string().as_str()));
            element.push_attribute(("height", height.to_string().as_str()));
            element.push_attribute(("frameRate", frame_rate.to_string().as_str()));
        }
        MediaContent::Audio { lang, .. } => {
            element.push_attribute(("lang", lang.as_str()));
        }
    }
    element.push_attribute(("segmentAlignment", "true"));
    element.push_attribute(("startWithSAP", "1"));
    element.push_attribute(("subsegmentAlignment", "true"));
    element.push_attribute(("subsegmentStartsWithSAP", "1"));
    writer.write_event(Event::Start(element))?;

    if let MediaContent::Audio { channels, .. } = &set.content {
        let mut channel_config = BytesStart::new("AudioChannelConfiguration");
        channel_config.push_attribute(("schemeIdUri", AUDIO_CHANNEL_SCHEME));
        channel_config.push_attribute(("value", channels.to_string().as_str()));
        writer.write_event(Event::Empty(channel_config))?;
    }

    let mut role = BytesStart::new("Role");
    role.push_attribute(("schemeIdUri", ROLE_SCHEME));
    role.push_attribute(("value", "main"));
    writer.write_event(Event::Empty(role))?;

    write_segment_template(writer, &set.template)?;

    let rep = &set.representation;
    let mut rep_el = BytesStart::new("Representation");
    rep_el.push_attribute(("id", rep.id.as_str()));
    rep_el.push_attribute(("bandwidth", rep.bandwidth.to_string().as_str()));
    rep_el.push_attribute(("codecs", rep.codecs.as_str()));
    if let Some(rate) = rep.audio_sampling_rate {
        rep_el.push_attribute(("audioSamplingRate", rate.to_string().as_str()));
    }
    writer.write_event(Event::Empty(rep_el))?;

    writer.write_event(Event::End(BytesEnd::new("AdaptationSet")))?;
    Ok(())
}

fn write_segment_template<W: Write>(
    writer: &mut Writer<W>,
    template: &SegmentTemplate,
) -> Result<()> {
    let mut element = BytesStart::new("SegmentTemplate");
    element.push_attribute(("timescale", template.timescale.to_string().as_str()));
    element.push_attribute(("media", template.media.as_str()));
    element.push_attribute(("initialization", template.initialization.as_str()));
    writer.write_event(Event::Start(element))?;

    writer.write_event(Event::Start(BytesStart::new("SegmentTimeline")))?;
    for entry in &template.timeline {
        let mut s = BytesStart::new("S");
        s.push_attribute(("t", entry.t.to_string().as_str()));
        s.push_attribute(("d", entry.d.to_string().as_str()));
        writer.write_event(Event::Empty(s))?;
    }
    writer.write_event(Event::End(BytesEnd::new("SegmentTimeline")))?;

    writer.write_event(Event::End(BytesEnd::new("SegmentTemplate")))?;
    Ok(())
}
