//! # livedash-h264
//!
//! H.264 parsing for live packaging: just enough of the bitstream to recover
//! presentation timing.
//!
//! ## Pipeline
//!
//! 1. [`remove_emulation_prevention`] strips `00 00 03` escapes from a NAL unit
//! 2. [`parse_sps`] decodes the sequence parameter set into a [`ParameterSet`]
//! 3. [`parse_picture_header`] reads `pic_order_cnt_lsb` from a slice header
//! 4. [`TimestampReconstructor`] turns each coded picture into a PTS and a
//!    composition offset (CTS)
//!
//! ## Example
//!
//! ```no_run
//! use livedash_h264::TimestampReconstructor;
//!
//! # fn demo(sps: &[u8], slices: &[Vec<u8>]) -> livedash_h264::Result<()> {
//! let mut session = TimestampReconstructor::new();
//! session.set_parameters_from_nal(sps, 25)?;
//!
//! for nal in slices {
//!     if let Some(timing) = session.process_picture(nal, 0)? {
//!         println!("pts={} cts={}", timing.pts, timing.cts);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod bits;
pub mod error;
pub mod nal;
pub mod slice;
pub mod sps;
pub mod timing;

#[cfg(test)]
mod testutil;

pub use error::{Error, Result};
pub use nal::{extract_nal_units, remove_emulation_prevention, NalUnit, NalUnitType};
pub use slice::{parse_picture_header, PictureHeader};
pub use sps::{parse_sps, ParameterSet, PocType, TimingInfo, UNKNOWN_FRAME_RATE};
pub use timing::{PictureTiming, TimestampReconstructor};
