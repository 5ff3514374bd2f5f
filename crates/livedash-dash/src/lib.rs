//! # livedash-dash
//!
//! Live MPEG-DASH packaging state: bounded per-track segment windows and a
//! dynamic MPD generator over them.
//!
//! ## Example
//!
//! ```
//! use livedash_dash::{DynamicMpd, VideoInfo};
//!
//! # fn main() -> livedash_dash::Result<()> {
//! let mpd = DynamicMpd::new(1000, 8);
//! mpd.set_video_info(VideoInfo {
//!     timescale: 1000,
//!     width: 1280,
//!     height: 720,
//!     frame_rate: 25,
//!     bitrate: 2_000_000,
//!     codecs: "avc1.64001f".to_string(),
//! })?;
//!
//! let ts = mpd.append_video(2000, vec![0u8; 16])?;
//! assert_eq!(ts, 0);
//!
//! let xml = mpd.generate_xml()?;
//! assert!(xml.contains("<S t=\"0\" d=\"2000\"/>"));
//! # Ok(())
//! # }
//! ```

pub mod document;
pub mod error;
pub mod manifest;
pub mod track;
pub mod window;

pub use document::{
    format_duration_ms, format_timestamp, AdaptationSet, BufferTiming, ManifestDocument,
    MediaContent, Representation, SegmentTemplate, TimelineEntry,
};
pub use error::{Error, Result};
pub use manifest::{min_buffer_time_ms, minimum_update_period_ms, DynamicMpd};
pub use track::{AudioInfo, VideoInfo};
pub use window::{Segment, SegmentRing, SegmentWindow};
