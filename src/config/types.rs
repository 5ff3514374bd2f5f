use livedash_dash::AudioInfo;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub manifest: ManifestConfig,

    #[serde(default)]
    pub video: VideoTrackConfig,

    #[serde(default)]
    pub audio: AudioTrackConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ManifestConfig {
    /// Configured manifest refresh period in milliseconds. Raised to half the
    /// minimum buffer when segments are long compared to it.
    #[serde(default = "default_min_buffer_ms")]
    pub min_buffer_ms: i64,

    /// Segments kept per track
    #[serde(default = "default_max_segments")]
    pub max_segments: usize,
}

fn default_min_buffer_ms() -> i64 {
    1000
}
fn default_max_segments() -> usize {
    10
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            min_buffer_ms: default_min_buffer_ms(),
            max_segments: default_max_segments(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VideoTrackConfig {
    /// Frame rate used for timing; falls back to the SPS timing info when unset
    #[serde(default)]
    pub frame_rate: Option<u32>,

    /// Units per second of video segment durations
    #[serde(default = "default_video_timescale")]
    pub timescale: u32,

    /// Advertised bandwidth in bits per second
    #[serde(default)]
    pub bitrate: u64,

    /// Codec string; derived from the SPS when unset
    #[serde(default)]
    pub codecs: Option<String>,
}

fn default_video_timescale() -> u32 {
    1000
}

impl Default for VideoTrackConfig {
    fn default() -> Self {
        Self {
            frame_rate: None,
            timescale: default_video_timescale(),
            bitrate: 0,
            codecs: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudioTrackConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_sample_rate")]
    pub timescale: u32,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    #[serde(default = "default_audio_bitrate")]
    pub bitrate: u64,

    #[serde(default = "default_channels")]
    pub channels: u32,

    #[serde(default = "default_sample_size")]
    pub sample_size: u32,

    #[serde(default = "default_audio_codecs")]
    pub codecs: String,
}

fn default_sample_rate() -> u32 {
    44_100
}
fn default_audio_bitrate() -> u64 {
    128_000
}
fn default_channels() -> u32 {
    2
}
fn default_sample_size() -> u32 {
    16
}
fn default_audio_codecs() -> String {
    "mp4a.40.2".to_string()
}

impl Default for AudioTrackConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timescale: default_sample_rate(),
            sample_rate: default_sample_rate(),
            bitrate: default_audio_bitrate(),
            channels: default_channels(),
            sample_size: default_sample_size(),
            codecs: default_audio_codecs(),
        }
    }
}

impl AudioTrackConfig {
    /// Track metadata advertised in the manifest.
    pub fn to_info(&self) -> AudioInfo {
        AudioInfo {
            timescale: self.timescale,
            sample_rate: self.sample_rate,
            bitrate: self.bitrate,
            channels: self.channels,
            sample_size: self.sample_size,
            codecs: self.codecs.clone(),
        }
    }
}
