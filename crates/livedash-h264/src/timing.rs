//! Presentation timestamp reconstruction for one H.264 stream
//!
//! A [`TimestampReconstructor`] is owned by exactly one stream session. It
//! assumes a constant frame rate: the nominal PTS of the n-th coded picture
//! is `n * 1000 / fps` milliseconds, and the composition offset (CTS) is
//! recovered from `pic_order_cnt_lsb` when the stream signals POC type 0.

use once_cell::sync::OnceCell;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::nal::NalUnitType;
use crate::slice::parse_picture_header;
use crate::sps::{parse_sps, ParameterSet, PocType};

/// Timing of one coded picture, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PictureTiming {
    pub pts: i64,
    pub cts: i64,
}

/// How the composition offset is derived, selected by `pic_order_cnt_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PocStrategy {
    /// POC type 0: CTS reconstructed from lsb groups of `group_size` pictures
    LsbGroups { group_size: i64 },
    /// POC types 1 and 2: nominal PTS only, CTS is always 0
    NominalOnly(PocType),
}

impl PocStrategy {
    fn for_parameter_set(sps: &ParameterSet) -> Self {
        match sps.poc_type {
            PocType::Type0 => PocStrategy::LsbGroups {
                group_size: ((1i64 << sps.poc_lsb_bits()) + 1) / 2,
            },
            other => PocStrategy::NominalOnly(other),
        }
    }
}

/// Immutable part of a session, installed once
#[derive(Debug)]
struct Session {
    sps: ParameterSet,
    frame_rate: i64,
    frame_duration: i64,
    strategy: PocStrategy,
}

/// Lsb group tracking for POC type 0
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct GroupState {
    last_lsb: i64,
    group_time: i64,
}

impl GroupState {
    /// Fold one picture's halved lsb into the state, returning the new state and CTS
    fn advance(self, lsb: i64, pts: i64, frame_duration: i64, group_size: i64) -> (Self, i64) {
        let mut group_time = self.group_time;

        let cts = if lsb == 0 {
            let dts = pts + frame_duration * 2;
            group_time = dts;
            dts - pts
        } else {
            let threshold = group_size / 2;
            if lsb < self.last_lsb && self.last_lsb - lsb > threshold {
                group_time -= group_size * frame_duration;
            } else if lsb > self.last_lsb && lsb - self.last_lsb > threshold {
                group_time += group_size * frame_duration;
            }
            group_time + lsb * frame_duration - pts
        };

        (
            GroupState {
                last_lsb: lsb,
                group_time,
            },
            cts.max(0),
        )
    }
}

/// Per-stream PTS/CTS reconstructor
///
/// The parameter set can be installed once; later attempts are ignored.
/// Per-picture state is only touched through `&mut self`, so a session must
/// not be shared between producers without external locking.
#[derive(Debug, Default)]
pub struct TimestampReconstructor {
    session: OnceCell<Session>,
    frame_counter: i64,
    groups: GroupState,
}

impl TimestampReconstructor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the stream's parameter set from a raw SPS NAL unit.
    ///
    /// First write wins: once a parameter set is installed, further calls
    /// return `Ok(())` without parsing or changing anything. A parse failure
    /// or a zero frame rate leaves the session uninitialized.
    pub fn set_parameters_from_nal(&self, sps_nal: &[u8], frame_rate: u32) -> Result<()> {
        if self.session.get().is_some() {
            debug!("parameter set already installed, ignoring SPS");
            return Ok(());
        }
        let sps = parse_sps(sps_nal)?;
        self.set_parameters(sps, frame_rate)
    }

    /// Install an already parsed parameter set. Same first-write-wins rule.
    pub fn set_parameters(&self, sps: ParameterSet, frame_rate: u32) -> Result<()> {
        if self.session.get().is_some() {
            debug!("parameter set already installed, ignoring");
            return Ok(());
        }
        if frame_rate == 0 {
            return Err(Error::InvalidArgument("frame rate must be positive".into()));
        }

        let strategy = PocStrategy::for_parameter_set(&sps);
        let session = Session {
            frame_rate: frame_rate as i64,
            frame_duration: 1000 / frame_rate as i64,
            strategy,
            sps,
        };

        match self.session.set(session) {
            Ok(()) => {
                debug!(
                    ?strategy,
                    frame_rate,
                    "installed H.264 parameter set"
                );
            }
            Err(_) => debug!("lost parameter set race, keeping the first one"),
        }
        Ok(())
    }

    /// The installed parameter set, if any.
    pub fn parameter_set(&self) -> Option<&ParameterSet> {
        self.session.get().map(|s| &s.sps)
    }

    /// Frame rate the session was configured with.
    pub fn frame_rate(&self) -> Option<u32> {
        self.session.get().map(|s| s.frame_rate as u32)
    }

    /// Number of coded pictures timed so far.
    pub fn frames_processed(&self) -> i64 {
        self.frame_counter
    }

    /// Time one NAL unit.
    ///
    /// Returns `Ok(None)` for units that are not coded pictures (parameter
    /// sets, SEI, delimiters, partitions B/C). A non-zero
    /// `external_timestamp` replaces the returned PTS; the CTS is still
    /// computed against the nominal PTS. On error no state changes.
    pub fn process_picture(
        &mut self,
        nal: &[u8],
        external_timestamp: i64,
    ) -> Result<Option<PictureTiming>> {
        let header = *nal
            .first()
            .ok_or_else(|| Error::parse("nal header", "empty NAL unit"))?;
        let nal_type = NalUnitType::from_header(header);
        if !nal_type.is_coded_picture() {
            return Ok(None);
        }

        let session = self.session.get().ok_or(Error::NotInitialized)?;
        let nominal_pts = self.frame_counter * 1000 / session.frame_rate;

        let cts = match session.strategy {
            PocStrategy::LsbGroups { group_size } => {
                let picture = parse_picture_header(nal, &session.sps)?;
                let lsb = picture
                    .pic_order_cnt_lsb
                    .ok_or_else(|| Error::parse("slice header", "missing pic_order_cnt_lsb"))?
                    as i64
                    / 2;
                let (groups, cts) =
                    self.groups
                        .advance(lsb, nominal_pts, session.frame_duration, group_size);
                self.groups = groups;
                cts
            }
            PocStrategy::NominalOnly(_) => 0,
        };

        self.frame_counter += 1;

        let pts = if external_timestamp != 0 {
            external_timestamp
        } else {
            nominal_pts
        };

        trace!(frame = self.frame_counter - 1, pts, cts, ?nal_type, "timed picture");
        Ok(Some(PictureTiming { pts, cts }))
    }
}
