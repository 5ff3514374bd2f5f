//! Live manifest generator over the video and audio segment windows.

use bytes::Bytes;
use chrono::Utc;
use tracing::{debug, trace};

use crate::document::{
    AdaptationSet, BufferTiming, ManifestDocument, MediaContent, Representation, SegmentTemplate,
    TimelineEntry,
};
use crate::error::{Error, Result};
use crate::track::{AudioInfo, Track, TrackMeta, VideoInfo};
use crate::window::{SegmentRing, SegmentWindow};

pub const VIDEO_REPRESENTATION_ID: &str = "video0";
pub const AUDIO_REPRESENTATION_ID: &str = "audio0";
const AUDIO_LANG: &str = "eng";

/// Minimum buffer time in milliseconds for the shortest held segment.
pub fn min_buffer_time_ms(shortest_duration: i64, timescale: u32) -> i64 {
    shortest_duration.saturating_mul(1000) / i64::from(timescale.max(1))
}

/// Refresh interval a client should poll the manifest at.
///
/// A configured period below a third of the minimum buffer is replaced by
/// half the minimum buffer.
pub fn minimum_update_period_ms(configured_ms: i64, min_buffer_ms: i64) -> i64 {
    if configured_ms < min_buffer_ms / 3 {
        min_buffer_ms / 2
    } else {
        configured_ms
    }
}

/// Dynamic (live) MPD generator.
///
/// Holds one bounded segment window per track. Track metadata is set once;
/// segments can then be appended concurrently with manifest generation.
#[derive(Debug)]
pub struct DynamicMpd {
    min_buffer_ms: i64,
    video: Track<VideoInfo>,
    audio: Track<AudioInfo>,
}

impl DynamicMpd {
    /// Create a generator with a configured update period and per-track
    /// window capacity.
    pub fn new(min_buffer_ms: i64, max_segments: usize) -> Self {
        Self {
            min_buffer_ms,
            video: Track::new(max_segments),
            audio: Track::new(max_segments),
        }
    }

    /// Set video metadata. Returns `false` if it was already set.
    pub fn set_video_info(&self, info: VideoInfo) -> Result<bool> {
        if info.timescale == 0 {
            return Err(Error::invalid_argument("video timescale must be non-zero"));
        }
        let installed = self.video.init(info);
        if installed {
            debug!("video track initialized");
        } else {
            debug!("video track already initialized, ignoring");
        }
        Ok(installed)
    }

    /// Set audio metadata. Returns `false` if it was already set.
    pub fn set_audio_info(&self, info: AudioInfo) -> Result<bool> {
        if info.timescale == 0 || info.sample_rate == 0 {
            return Err(Error::invalid_argument(
                "audio timescale and sample rate must be non-zero",
            ));
        }
        let installed = self.audio.init(info);
        if installed {
            debug!("audio track initialized");
        } else {
            debug!("audio track already initialized, ignoring");
        }
        Ok(installed)
    }

    pub fn set_video_bitrate(&self, bitrate: u64) -> Result<()> {
        self.video.set_bitrate(bitrate)
    }

    pub fn set_audio_bitrate(&self, bitrate: u64) -> Result<()> {
        self.audio.set_bitrate(bitrate)
    }

    pub fn video_info(&self) -> Option<&VideoInfo> {
        self.video.meta().map(|meta| &meta.info)
    }

    pub fn audio_info(&self) -> Option<&AudioInfo> {
        self.audio.meta().map(|meta| &meta.info)
    }

    /// Append a video segment, returning its start timestamp.
    pub fn append_video(&self, duration: i64, payload: impl Into<Bytes>) -> Result<i64> {
        self.video.append(duration, payload.into())
    }

    /// Append an audio segment, returning its start timestamp.
    pub fn append_audio(&self, duration: i64, payload: impl Into<Bytes>) -> Result<i64> {
        self.audio.append(duration, payload.into())
    }

    pub fn video_segment(&self, timestamp: i64) -> Result<Bytes> {
        self.video.window.lookup(timestamp)
    }

    pub fn audio_segment(&self, timestamp: i64) -> Result<Bytes> {
        self.audio.window.lookup(timestamp)
    }

    pub fn video_window(&self) -> &SegmentWindow {
        &self.video.window
    }

    pub fn audio_window(&self) -> &SegmentWindow {
        &self.audio.window
    }

    /// Compose the current manifest.
    ///
    /// Both windows are read-locked (video first) for the whole composition,
    /// so the document reflects a single consistent view of each track.
    pub fn snapshot(&self) -> Result<ManifestDocument> {
        let video = self.video.meta();
        let audio = self.audio.meta();
        if video.is_none() && audio.is_none() {
            return Err(Error::NotInitialized("video or audio"));
        }

        let video_ring = self.video.window.read();
        let audio_ring = self.audio.window.read();

        let availability_start_time = video
            .map(|meta| meta.since)
            .or_else(|| audio.map(|meta| meta.since))
            .unwrap_or_else(Utc::now);

        let shortest = video
            .and_then(|meta| shortest_with_timescale(&video_ring, meta.info.timescale))
            .or_else(|| {
                audio.and_then(|meta| shortest_with_timescale(&audio_ring, meta.info.timescale))
            });
        let buffer = shortest.map(|(duration, timescale)| {
            let min_buffer_time_ms = min_buffer_time_ms(duration, timescale);
            BufferTiming {
                min_buffer_time_ms,
                minimum_update_period_ms: minimum_update_period_ms(
                    self.min_buffer_ms,
                    min_buffer_time_ms,
                ),
                suggested_presentation_delay_ms: 0,
            }
        });

        let mut adaptation_sets = Vec::with_capacity(2);
        if let Some(meta) = video {
            adaptation_sets.push(self.video_adaptation_set(meta, &video_ring));
        }
        if let Some(meta) = audio {
            adaptation_sets.push(self.audio_adaptation_set(meta, &audio_ring));
        }

        trace!(
            video_segments = video_ring.len(),
            audio_segments = audio_ring.len(),
            "composed manifest"
        );

        Ok(ManifestDocument {
            publish_time: Utc::now(),
            availability_start_time,
            buffer,
            adaptation_sets,
        })
    }

    /// Compose and render the current manifest as XML.
    pub fn generate_xml(&self) -> Result<String> {
        self.snapshot()?.to_xml()
    }

    fn video_adaptation_set(
        &self,
        meta: &TrackMeta<VideoInfo>,
        ring: &SegmentRing,
    ) -> AdaptationSet {
        let info = &meta.info;
        AdaptationSet {
            id: 0,
            content: MediaContent::Video {
                width: info.width,
                height: info.height,
                frame_rate: info.frame_rate,
            },
            representation: Representation {
                id: VIDEO_REPRESENTATION_ID.to_string(),
                bandwidth: self.video.bitrate(),
                codecs: info.codecs.clone(),
                audio_sampling_rate: None,
            },
            template: SegmentTemplate::for_prefix("video", info.timescale, timeline(ring)),
        }
    }

    fn audio_adaptation_set(
        &self,
        meta: &TrackMeta<AudioInfo>,
        ring: &SegmentRing,
    ) -> AdaptationSet {
        let info = &meta.info;
        AdaptationSet {
            id: 1,
            content: MediaContent::Audio {
                lang: AUDIO_LANG.to_string(),
                channels: info.channels,
            },
            representation: Representation {
                id: AUDIO_REPRESENTATION_ID.to_string(),
                bandwidth: self.audio.bitrate(),
                codecs: info.codecs.clone(),
                audio_sampling_rate: Some(info.sample_rate),
            },
            template: SegmentTemplate::for_prefix("audio", info.sample_rate, timeline(ring)),
        }
    }
}

fn shortest_with_timescale(ring: &SegmentRing, timescale: u32) -> Option<(i64, u32)> {
    ring.shortest_duration().map(|duration| (duration, timescale))
}

fn timeline(ring: &SegmentRing) -> Vec<TimelineEntry> {
    ring.iter()
        .map(|segment| TimelineEntry::new(segment.timestamp, segment.duration))
        .collect()
}
