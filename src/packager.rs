//! One live stream session: H.264 picture timing feeding a DASH manifest.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use livedash_dash::{DynamicMpd, VideoInfo};
use livedash_h264::{parse_sps, NalUnitType, PictureTiming, TimestampReconstructor};

use crate::config::{Config, VideoTrackConfig};

/// Ties a [`TimestampReconstructor`] to the [`DynamicMpd`] it publishes into.
///
/// The first SPS seen installs both the timing session and the video track
/// metadata. The manifest handle can be shared with readers on other threads
/// while this packager keeps feeding pictures.
#[derive(Debug)]
pub struct Packager {
    video: VideoTrackConfig,
    timestamps: TimestampReconstructor,
    mpd: Arc<DynamicMpd>,
}

impl Packager {
    pub fn new(config: &Config) -> Result<Self> {
        let mpd = DynamicMpd::new(config.manifest.min_buffer_ms, config.manifest.max_segments);
        if config.audio.enabled {
            mpd.set_audio_info(config.audio.to_info())
                .context("Invalid audio track configuration")?;
        }

        Ok(Self {
            video: config.video.clone(),
            timestamps: TimestampReconstructor::new(),
            mpd: Arc::new(mpd),
        })
    }

    /// Shared handle to the manifest generator.
    pub fn manifest(&self) -> Arc<DynamicMpd> {
        Arc::clone(&self.mpd)
    }

    pub fn timestamps(&self) -> &TimestampReconstructor {
        &self.timestamps
    }

    /// Feed one NAL unit, header byte first, start code removed.
    ///
    /// Returns the timing of coded pictures. Parameter sets are consumed;
    /// every other unit type is passed over.
    pub fn push_nal(
        &mut self,
        nal: &[u8],
        external_timestamp: i64,
    ) -> Result<Option<PictureTiming>> {
        let header = *nal.first().ok_or_else(|| anyhow!("empty NAL unit"))?;
        match NalUnitType::from_header(header) {
            NalUnitType::Sps => {
                self.install_sps(nal)?;
                Ok(None)
            }
            nal_type if nal_type.is_coded_picture() => {
                Ok(self.timestamps.process_picture(nal, external_timestamp)?)
            }
            _ => Ok(None),
        }
    }

    /// Append a video segment covering `frames` pictures at the session
    /// frame rate. Returns the segment's start timestamp.
    pub fn append_video_frames(&self, frames: u32, payload: Vec<u8>) -> Result<i64> {
        let frame_rate = self
            .timestamps
            .frame_rate()
            .context("No SPS received yet")?;
        let duration = i64::from(frames) * i64::from(self.video.timescale) / i64::from(frame_rate);
        Ok(self.mpd.append_video(duration, payload)?)
    }

    fn install_sps(&mut self, nal: &[u8]) -> Result<()> {
        if self.timestamps.parameter_set().is_some() {
            tracing::debug!("SPS repeated, keeping the installed one");
            return Ok(());
        }

        let sps = parse_sps(nal).context("Failed to parse SPS")?;
        let frame_rate = match self.video.frame_rate {
            Some(fps) => fps,
            None => u32::try_from(sps.frame_rate())
                .ok()
                .filter(|&fps| fps > 0)
                .ok_or_else(|| {
                    anyhow!("SPS carries no frame rate and video.frame_rate is not set")
                })?,
        };

        let info = VideoInfo {
            timescale: self.video.timescale,
            width: sps.width,
            height: sps.height,
            frame_rate,
            bitrate: self.video.bitrate,
            codecs: self
                .video
                .codecs
                .clone()
                .unwrap_or_else(|| sps.codec_string()),
        };

        tracing::info!(
            width = sps.width,
            height = sps.height,
            frame_rate,
            codecs = %info.codecs,
            "video stream parameters"
        );
        self.timestamps.set_parameters(sps, frame_rate)?;
        self.mpd.set_video_info(info)?;
        Ok(())
    }
}
