//! Bounded sliding window of encoded segments for one track.
//!
//! Segments live in a fixed ring of slots; a timestamp index maps each
//! segment's start time to its slot. Appends advance a running timestamp
//! cursor and, once the ring is full, overwrite the oldest slot.

use std::collections::HashMap;

use bytes::Bytes;
use parking_lot::{RwLock, RwLockReadGuard};
use tracing::{debug, trace};

use crate::error::{Error, Result};

/// One encoded segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Start time in track timescale units.
    pub timestamp: i64,
    /// Duration in track timescale units, always positive.
    pub duration: i64,
    /// Encoded segment bytes.
    pub payload: Bytes,
}

/// Ring storage behind a [`SegmentWindow`] lock.
///
/// Obtained through [`SegmentWindow::read`] to inspect a consistent view.
#[derive(Debug)]
pub struct SegmentRing {
    slots: Box<[Option<Segment>]>,
    index: HashMap<i64, usize>,
    head: usize,
    len: usize,
    next_timestamp: i64,
}

impl SegmentRing {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            index: HashMap::with_capacity(capacity),
            head: 0,
            len: 0,
            next_timestamp: 0,
        }
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Store a segment at the cursor. Fails without changing anything when
    /// the cursor would run past `i64::MAX`.
    fn push(&mut self, duration: i64, payload: Bytes) -> Result<(i64, Option<Segment>)> {
        let next_timestamp = self.next_timestamp.checked_add(duration).ok_or_else(|| {
            Error::invalid_argument(format!(
                "segment duration {} overflows timestamp {}",
                duration, self.next_timestamp
            ))
        })?;

        let evicted = if self.len == self.capacity() {
            let slot = self.head;
            self.head = (self.head + 1) % self.capacity();
            self.len -= 1;
            let old = self.slots[slot].take();
            if let Some(ref segment) = old {
                self.index.remove(&segment.timestamp);
            }
            old
        } else {
            None
        };

        let timestamp = self.next_timestamp;
        let slot = (self.head + self.len) % self.capacity();
        self.slots[slot] = Some(Segment {
            timestamp,
            duration,
            payload,
        });
        self.index.insert(timestamp, slot);
        self.len += 1;
        self.next_timestamp = next_timestamp;

        Ok((timestamp, evicted))
    }

    /// Segment starting at `timestamp`, if still held.
    pub fn get(&self, timestamp: i64) -> Option<&Segment> {
        self.index
            .get(&timestamp)
            .and_then(|&slot| self.slots[slot].as_ref())
    }

    /// Segments oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Segment> + '_ {
        (0..self.len).filter_map(move |i| self.slots[(self.head + i) % self.capacity()].as_ref())
    }

    /// Shortest duration among held segments.
    pub fn shortest_duration(&self) -> Option<i64> {
        self.iter().map(|segment| segment.duration).min()
    }

    /// Timestamp the next appended segment will receive.
    pub fn next_timestamp(&self) -> i64 {
        self.next_timestamp
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Thread-safe bounded segment window for one track.
///
/// Appends take the write lock; lookups and manifest reads share the read
/// lock. Windows of different tracks are fully independent.
#[derive(Debug)]
pub struct SegmentWindow {
    ring: RwLock<SegmentRing>,
}

impl SegmentWindow {
    /// Create a window holding at most `capacity` segments (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: RwLock::new(SegmentRing::with_capacity(capacity.max(1))),
        }
    }

    /// Append a segment and return the timestamp assigned to it.
    ///
    /// The first segment starts at 0 and each following one starts where the
    /// previous ended. A non-positive duration, or one that would push the
    /// timestamp past `i64::MAX`, is rejected without touching the window.
    pub fn append(&self, duration: i64, payload: impl Into<Bytes>) -> Result<i64> {
        if duration <= 0 {
            return Err(Error::invalid_argument(format!(
                "segment duration must be positive, got {}",
                duration
            )));
        }

        let payload = payload.into();
        let size = payload.len();
        let (timestamp, evicted) = self.ring.write().push(duration, payload)?;

        trace!(timestamp, duration, size, "appended segment");
        if let Some(old) = evicted {
            debug!(timestamp = old.timestamp, "evicted oldest segment");
        }

        Ok(timestamp)
    }

    /// Payload of the segment starting at `timestamp`.
    pub fn lookup(&self, timestamp: i64) -> Result<Bytes> {
        self.ring
            .read()
            .get(timestamp)
            .map(|segment| segment.payload.clone())
            .ok_or(Error::NotFound(timestamp))
    }

    /// Shared read access to the whole window.
    ///
    /// The window cannot change while the guard is held.
    pub fn read(&self) -> RwLockReadGuard<'_, SegmentRing> {
        self.ring.read()
    }

    pub fn capacity(&self) -> usize {
        self.ring.read().capacity()
    }

    pub fn len(&self) -> usize {
        self.ring.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.read().is_empty()
    }
}
