//! H.264 NAL unit parsing

/// H.264 NAL unit types (ITU-T H.264 Table 7-1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NalUnitType {
    /// Coded slice of a non-IDR picture
    Slice,
    /// Coded slice data partition A
    DataPartitionA,
    /// Coded slice data partition B
    DataPartitionB,
    /// Coded slice data partition C
    DataPartitionC,
    /// Coded slice of an IDR picture
    IdrSlice,
    /// Supplemental enhancement information
    Sei,
    /// Sequence parameter set
    Sps,
    /// Picture parameter set
    Pps,
    /// Access unit delimiter
    Aud,
    /// End of sequence
    EndOfSequence,
    /// End of stream
    EndOfStream,
    /// Filler data
    FillerData,
    /// Sequence parameter set extension
    SpsExtension,
    /// Coded slice of an auxiliary picture
    AuxiliarySlice,
    /// Unknown/other
    Unknown(u8),
}

impl From<u8> for NalUnitType {
    fn from(value: u8) -> Self {
        match value {
            1 => NalUnitType::Slice,
            2 => NalUnitType::DataPartitionA,
            3 => NalUnitType::DataPartitionB,
            4 => NalUnitType::DataPartitionC,
            5 => NalUnitType::IdrSlice,
            6 => NalUnitType::Sei,
            7 => NalUnitType::Sps,
            8 => NalUnitType::Pps,
            9 => NalUnitType::Aud,
            10 => NalUnitType::EndOfSequence,
            11 => NalUnitType::EndOfStream,
            12 => NalUnitType::FillerData,
            13 => NalUnitType::SpsExtension,
            19 => NalUnitType::AuxiliarySlice,
            v => NalUnitType::Unknown(v),
        }
    }
}

impl NalUnitType {
    /// Read the type from the first byte of a NAL unit header.
    pub fn from_header(byte: u8) -> Self {
        NalUnitType::from(byte & 0x1F)
    }

    /// Whether this unit carries a slice header that the timing path consumes.
    ///
    /// Partitions B and C reuse the header of partition A, so they are not
    /// counted as separate pictures.
    pub fn is_coded_picture(self) -> bool {
        matches!(
            self,
            NalUnitType::Slice | NalUnitType::DataPartitionA | NalUnitType::IdrSlice
        )
    }
}

/// A parsed NAL unit
#[derive(Debug, Clone)]
pub struct NalUnit {
    /// NAL unit type
    pub nal_type: NalUnitType,
    /// nal_ref_idc (0 means the unit is not used for reference)
    pub nal_ref_idc: u8,
    /// Raw NAL unit data (without start code, includes header)
    pub data: Vec<u8>,
}

impl NalUnit {
    /// Get the NAL unit payload (data after the one-byte header)
    pub fn payload(&self) -> &[u8] {
        self.data.get(1..).unwrap_or(&[])
    }
}

/// Extract NAL units from an Annex B byte stream (start code delimited)
pub fn extract_nal_units(data: &[u8]) -> Vec<NalUnit> {
    let mut nal_starts = Vec::new();
    let mut i = 0;

    while i + 2 < data.len() {
        if data[i] == 0 && data[i + 1] == 0 {
            if data[i + 2] == 1 {
                nal_starts.push(i + 3);
                i += 3;
                continue;
            } else if i + 3 < data.len() && data[i + 2] == 0 && data[i + 3] == 1 {
                nal_starts.push(i + 4);
                i += 4;
                continue;
            }
        }
        i += 1;
    }

    let mut units = Vec::with_capacity(nal_starts.len());
    for (idx, &start) in nal_starts.iter().enumerate() {
        let end = match nal_starts.get(idx + 1) {
            Some(&next_start) => {
                // Step back over the start code, 4-byte form if a zero precedes it
                if next_start >= start + 4 && data[next_start - 4] == 0 {
                    next_start - 4
                } else {
                    next_start - 3
                }
            }
            None => data.len(),
        };

        if start < end {
            if let Some(unit) = parse_nal_header(&data[start..end]) {
                units.push(unit);
            }
        }
    }

    units
}

/// Parse the one-byte NAL unit header
fn parse_nal_header(data: &[u8]) -> Option<NalUnit> {
    let header = *data.first()?;

    // forbidden_zero_bit (1) | nal_ref_idc (2) | nal_unit_type (5)
    if header & 0x80 != 0 {
        return None;
    }

    Some(NalUnit {
        nal_type: NalUnitType::from_header(header),
        nal_ref_idc: (header >> 5) & 0x03,
        data: data.to_vec(),
    })
}

/// Remove emulation prevention bytes (0x03) from a NAL unit
///
/// Every `00 00 03` triplet becomes `00 00` and scanning resumes right after
/// the triplet. Must run before any field parsing.
pub fn remove_emulation_prevention(data: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        if i + 2 < data.len() && data[i] == 0 && data[i + 1] == 0 && data[i + 2] == 3 {
            result.push(0);
            result.push(0);
            i += 3;
        } else {
            result.push(data[i]);
            i += 1;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nal_type_from_header() {
        assert_eq!(NalUnitType::from_header(0x67), NalUnitType::Sps);
        assert_eq!(NalUnitType::from_header(0x65), NalUnitType::IdrSlice);
        assert_eq!(NalUnitType::from_header(0x41), NalUnitType::Slice);
        assert_eq!(NalUnitType::from_header(0x1E), NalUnitType::Unknown(30));
    }

    #[test]
    fn test_coded_picture_types() {
        assert!(NalUnitType::Slice.is_coded_picture());
        assert!(NalUnitType::DataPartitionA.is_coded_picture());
        assert!(NalUnitType::IdrSlice.is_coded_picture());
        assert!(!NalUnitType::DataPartitionB.is_coded_picture());
        assert!(!NalUnitType::Sps.is_coded_picture());
        assert!(!NalUnitType::Sei.is_coded_picture());
    }

    #[test]
    fn test_remove_emulation_prevention() {
        assert_eq!(
            remove_emulation_prevention(&[0x00, 0x00, 0x03, 0x01]),
            vec![0x00, 0x00, 0x01]
        );

        let input = vec![0x00, 0x00, 0x03, 0x01, 0x00, 0x00, 0x03, 0x02];
        let output = remove_emulation_prevention(&input);
        assert_eq!(output, vec![0x00, 0x00, 0x01, 0x00, 0x00, 0x02]);
    }

    #[test]
    fn test_remove_emulation_prevention_passthrough() {
        let input = vec![0x67, 0x42, 0x00, 0x1E, 0x00, 0x01, 0x03];
        assert_eq!(remove_emulation_prevention(&input), input);
        assert!(remove_emulation_prevention(&[]).is_empty());
    }

    #[test]
    fn test_scan_resumes_after_triplet() {
        // The zeros inside a consumed triplet do not start a new one
        let input = [0x00, 0x00, 0x03, 0x00, 0x03];
        assert_eq!(remove_emulation_prevention(&input), vec![0x00, 0x00, 0x00, 0x03]);
    }

    #[test]
    fn test_extract_annex_b() {
        let stream = [
            0x00, 0x00, 0x00, 0x01, 0x67, 0x42, 0x1E, // SPS, 4-byte start code
            0x00, 0x00, 0x01, 0x68, 0xCE, // PPS, 3-byte start code
            0x00, 0x00, 0x00, 0x01, 0x65, 0x88, 0x84, // IDR slice
        ];

        let units = extract_nal_units(&stream);
        assert_eq!(units.len(), 3);
        assert_eq!(units[0].nal_type, NalUnitType::Sps);
        assert_eq!(units[0].data, vec![0x67, 0x42, 0x1E]);
        assert_eq!(units[1].nal_type, NalUnitType::Pps);
        assert_eq!(units[1].data, vec![0x68, 0xCE]);
        assert_eq!(units[2].nal_type, NalUnitType::IdrSlice);
        assert_eq!(units[2].nal_ref_idc, 3);
        assert_eq!(units[2].payload(), &[0x88, 0x84]);
    }
}
