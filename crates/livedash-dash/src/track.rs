//! Track metadata and per-track state.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::window::SegmentWindow;

/// Static parameters of the video representation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct VideoInfo {
    /// Units per second of segment timestamps and durations.
    pub timescale: u32,
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    /// Bits per second.
    pub bitrate: u64,
    /// RFC 6381 codec string, e.g. `avc1.64001f`.
    pub codecs: String,
}

/// Static parameters of the audio representation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct AudioInfo {
    /// Units per second of segment timestamps and durations.
    pub timescale: u32,
    pub sample_rate: u32,
    /// Bits per second.
    pub bitrate: u64,
    pub channels: u32,
    pub sample_size: u32,
    pub codecs: String,
}

/// Metadata common to both track kinds.
pub(crate) trait TrackInfo {
    const KIND: &'static str;

    fn bitrate(&self) -> u64;
}

impl TrackInfo for VideoInfo {
    const KIND: &'static str = "video";

    fn bitrate(&self) -> u64 {
        self.bitrate
    }
}

impl TrackInfo for AudioInfo {
    const KIND: &'static str = "audio";

    fn bitrate(&self) -> u64 {
        self.bitrate
    }
}

/// Metadata together with the wall clock at which it was set.
#[derive(Debug)]
pub(crate) struct TrackMeta<I> {
    pub info: I,
    pub since: DateTime<Utc>,
}

/// Metadata slot, bitrate and segment window of one track.
#[derive(Debug)]
pub(crate) struct Track<I> {
    meta: OnceCell<TrackMeta<I>>,
    bitrate: AtomicU64,
    pub window: SegmentWindow,
}

impl<I: TrackInfo> Track<I> {
    pub fn new(capacity: usize) -> Self {
        Self {
            meta: OnceCell::new(),
            bitrate: AtomicU64::new(0),
            window: SegmentWindow::new(capacity),
        }
    }

    /// Install metadata; returns `false` if another call already did.
    pub fn init(&self, info: I) -> bool {
        let mut installed = false;
        self.meta.get_or_init(|| {
            installed = true;
            // Published before the metadata becomes visible to other threads
            self.bitrate.store(info.bitrate(), Ordering::Release);
            TrackMeta {
                info,
                since: Utc::now(),
            }
        });
        installed
    }

    pub fn meta(&self) -> Option<&TrackMeta<I>> {
        self.meta.get()
    }

    pub fn set_bitrate(&self, bitrate: u64) -> Result<()> {
        self.require_meta()?;
        self.bitrate.store(bitrate, Ordering::Release);
        Ok(())
    }

    pub fn bitrate(&self) -> u64 {
        self.bitrate.load(Ordering::Acquire)
    }

    /// Append to the window once metadata is known.
    pub fn append(&self, duration: i64, payload: Bytes) -> Result<i64> {
        self.require_meta()?;
        self.window.append(duration, payload)
    }

    fn require_meta(&self) -> Result<&TrackMeta<I>> {
        self.meta.get().ok_or(Error::NotInitialized(I::KIND))
    }
}
