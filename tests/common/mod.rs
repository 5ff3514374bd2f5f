//! Shared H.264 fixtures for integration tests.
//!
//! A baseline 320x240 stream with POC type 0 (4-bit lsb), no VUI timing, and
//! eight pictures: an IDR followed by seven P slices in display order.

#![allow(dead_code)]

use std::io::Write;

use tempfile::NamedTempFile;

pub const SPS_320X240: [u8; 8] = [0x67, 0x42, 0x00, 0x1E, 0xF4, 0x0A, 0x0F, 0xC8];

pub const SLICES: [&[u8]; 8] = [
    &[0x65, 0x88, 0x84, 0x29, 0x60],
    &[0x41, 0x9A, 0x25, 0x4B],
    &[0x41, 0x9A, 0x49, 0x4B],
    &[0x41, 0x9A, 0x6D, 0x4B],
    &[0x41, 0x9A, 0x91, 0x4B],
    &[0x41, 0x9A, 0xB5, 0x4B],
    &[0x41, 0x9A, 0xD9, 0x4B],
    &[0x41, 0x9A, 0xFD, 0x4B],
];

/// Access unit delimiter, ignored by the packager
pub const AUD: [u8; 2] = [0x09, 0xF0];

/// Annex B byte stream: SPS, then the eight slices each preceded by an AUD.
pub fn annex_b_stream() -> Vec<u8> {
    let mut stream = Vec::new();
    let mut push = |nal: &[u8]| {
        stream.extend_from_slice(&[0x00, 0x00, 0x00, 0x01]);
        stream.extend_from_slice(nal);
    };
    push(&SPS_320X240);
    for slice in SLICES {
        push(&AUD);
        push(slice);
    }
    stream
}

/// Write the fixture stream to a temporary `.h264` file.
pub fn stream_file() -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".h264").tempfile().unwrap();
    file.write_all(&annex_b_stream()).unwrap();
    file.flush().unwrap();
    file
}
