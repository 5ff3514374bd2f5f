//! H.264 Sequence Parameter Set (SPS) parsing

use crate::bits::RbspReader;
use crate::error::{Error, Result};
use crate::nal::{remove_emulation_prevention, NalUnitType};

/// Frame rate reported when the SPS carries no usable timing info
pub const UNKNOWN_FRAME_RATE: i32 = -1;

/// Profiles whose SPS carries the chroma format and bit depth fields
const HIGH_PROFILES: [u8; 13] = [100, 110, 122, 244, 44, 83, 86, 118, 128, 138, 139, 134, 135];

/// Picture order count signalling mode (`pic_order_cnt_type`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PocType {
    /// POC lsb sent in every slice header
    Type0,
    /// POC derived from frame_num and offset cycle
    Type1,
    /// POC equals output order of frame_num
    Type2,
}

/// VUI timing hint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingInfo {
    pub num_units_in_tick: u32,
    pub time_scale: u32,
    pub fixed_frame_rate: bool,
}

/// Sequence Parameter Set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSet {
    pub profile_idc: u8,
    /// constraint_set0..5 flags and the two reserved bits, as coded
    pub constraint_flags: u8,
    pub level_idc: u8,
    /// Picture width in luma samples, after cropping
    pub width: u32,
    /// Picture height in luma samples, after cropping
    pub height: u32,
    /// 0 = monochrome, 1 = 4:2:0, 2 = 4:2:2, 3 = 4:4:4
    pub chroma_format_idc: u8,
    pub separate_colour_plane: bool,
    pub bit_depth_luma_minus8: u8,
    pub bit_depth_chroma_minus8: u8,
    /// Bit width of `frame_num` in slice headers
    pub log2_max_frame_num: u8,
    pub poc_type: PocType,
    /// `log2_max_pic_order_cnt_lsb_minus4`; only meaningful for [`PocType::Type0`]
    pub log2_max_poc_lsb_minus4: u8,
    pub frame_mbs_only: bool,
    pub timing: Option<TimingInfo>,
}

impl ParameterSet {
    /// Frames per second from the VUI timing hint, or [`UNKNOWN_FRAME_RATE`].
    pub fn frame_rate(&self) -> i32 {
        match self.timing {
            Some(t) if t.num_units_in_tick != 0 && t.time_scale != 0 => {
                (t.time_scale as u64 / (t.num_units_in_tick as u64 * 2)) as i32
            }
            _ => UNKNOWN_FRAME_RATE,
        }
    }

    /// RFC 6381 codec string, e.g. `avc1.42001e`.
    pub fn codec_string(&self) -> String {
        format!(
            "avc1.{:02x}{:02x}{:02x}",
            self.profile_idc, self.constraint_flags, self.level_idc
        )
    }

    /// Bit width of `pic_order_cnt_lsb` in slice headers.
    pub fn poc_lsb_bits(&self) -> u32 {
        self.log2_max_poc_lsb_minus4 as u32 + 4
    }
}

/// Parse an SPS NAL unit, header byte included and possibly still escaped
pub fn parse_sps(data: &[u8]) -> Result<ParameterSet> {
    let rbsp = remove_emulation_prevention(data);

    let header = *rbsp
        .first()
        .ok_or_else(|| Error::parse("sps", "empty NAL unit"))?;
    if NalUnitType::from_header(header) != NalUnitType::Sps {
        return Err(Error::parse(
            "sps",
            format!("unexpected NAL unit type {:?}", NalUnitType::from_header(header)),
        ));
    }

    parse_sps_rbsp(&rbsp[1..])
}

/// Parse de-escaped SPS payload (after the NAL header byte)
pub fn parse_sps_rbsp(rbsp: &[u8]) -> Result<ParameterSet> {
    let mut reader = RbspReader::new(rbsp, "sps");

    let profile_idc = reader.read_bits(8, "profile_idc")? as u8;
    let constraint_flags = reader.read_bits(8, "constraint_flags")? as u8;
    let level_idc = reader.read_bits(8, "level_idc")? as u8;
    reader.read_ue("seq_parameter_set_id")?;

    let mut chroma_format_idc = 1;
    let mut separate_colour_plane = false;
    let mut bit_depth_luma_minus8 = 0;
    let mut bit_depth_chroma_minus8 = 0;

    if HIGH_PROFILES.contains(&profile_idc) {
        chroma_format_idc = reader.read_ue("chroma_format_idc")?;
        if chroma_format_idc > 3 {
            return Err(Error::parse(
                "sps",
                format!("chroma_format_idc {} out of range", chroma_format_idc),
            ));
        }
        if chroma_format_idc == 3 {
            separate_colour_plane = reader.read_flag("separate_colour_plane_flag")?;
        }
        bit_depth_luma_minus8 = reader.read_ue("bit_depth_luma_minus8")?;
        bit_depth_chroma_minus8 = reader.read_ue("bit_depth_chroma_minus8")?;
        if bit_depth_luma_minus8 > 6 || bit_depth_chroma_minus8 > 6 {
            return Err(Error::parse("sps", "bit depth out of range"));
        }
        reader.read_flag("qpprime_y_zero_transform_bypass_flag")?;

        if reader.read_flag("seq_scaling_matrix_present_flag")? {
            let lists = if chroma_format_idc != 3 { 8 } else { 12 };
            for i in 0..lists {
                if reader.read_flag("seq_scaling_list_present_flag")? {
                    skip_scaling_list(&mut reader, if i < 6 { 16 } else { 64 })?;
                }
            }
        }
    }

    let log2_max_frame_num_minus4 = reader.read_ue("log2_max_frame_num_minus4")?;
    if log2_max_frame_num_minus4 > 12 {
        return Err(Error::parse("sps", "log2_max_frame_num_minus4 out of range"));
    }

    let mut log2_max_poc_lsb_minus4 = 0;
    let poc_type = match reader.read_ue("pic_order_cnt_type")? {
        0 => {
            log2_max_poc_lsb_minus4 = reader.read_ue("log2_max_pic_order_cnt_lsb_minus4")?;
            if log2_max_poc_lsb_minus4 > 12 {
                return Err(Error::parse(
                    "sps",
                    "log2_max_pic_order_cnt_lsb_minus4 out of range",
                ));
            }
            PocType::Type0
        }
        1 => {
            reader.read_flag("delta_pic_order_always_zero_flag")?;
            reader.read_se("offset_for_non_ref_pic")?;
            reader.read_se("offset_for_top_to_bottom_field")?;
            let cycle = reader.read_ue("num_ref_frames_in_pic_order_cnt_cycle")?;
            if cycle > 255 {
                return Err(Error::parse("sps", "pic order count cycle too long"));
            }
            for _ in 0..cycle {
                reader.read_se("offset_for_ref_frame")?;
            }
            PocType::Type1
        }
        2 => PocType::Type2,
        other => {
            return Err(Error::parse(
                "sps",
                format!("pic_order_cnt_type {} out of range", other),
            ))
        }
    };

    reader.read_ue("max_num_ref_frames")?;
    reader.read_flag("gaps_in_frame_num_value_allowed_flag")?;

    let pic_width_in_mbs_minus1 = reader.read_ue("pic_width_in_mbs_minus1")?;
    let pic_height_in_map_units_minus1 = reader.read_ue("pic_height_in_map_units_minus1")?;

    let frame_mbs_only = reader.read_flag("frame_mbs_only_flag")?;
    if !frame_mbs_only {
        reader.read_flag("mb_adaptive_frame_field_flag")?;
    }
    reader.read_flag("direct_8x8_inference_flag")?;

    let (mut crop_left, mut crop_right, mut crop_top, mut crop_bottom) = (0, 0, 0, 0);
    if reader.read_flag("frame_cropping_flag")? {
        crop_left = reader.read_ue("frame_crop_left_offset")?;
        crop_right = reader.read_ue("frame_crop_right_offset")?;
        crop_top = reader.read_ue("frame_crop_top_offset")?;
        crop_bottom = reader.read_ue("frame_crop_bottom_offset")?;
    }

    let timing = if reader.read_flag("vui_parameters_present_flag")? {
        parse_vui_timing(&mut reader)?
    } else {
        None
    };

    // Crop units per 7.4.2.1.1
    let frame_height_factor = if frame_mbs_only { 1u64 } else { 2u64 };
    let (crop_unit_x, crop_unit_y) = if chroma_format_idc == 0 || separate_colour_plane {
        (1u64, frame_height_factor)
    } else {
        let sub_width_c = if chroma_format_idc == 3 { 1 } else { 2 };
        let sub_height_c = if chroma_format_idc == 1 { 2 } else { 1 };
        (sub_width_c, sub_height_c * frame_height_factor)
    };

    let coded_width = (pic_width_in_mbs_minus1 as u64 + 1) * 16;
    let coded_height = frame_height_factor * (pic_height_in_map_units_minus1 as u64 + 1) * 16;
    let crop_x = crop_unit_x * (crop_left as u64 + crop_right as u64);
    let crop_y = crop_unit_y * (crop_top as u64 + crop_bottom as u64);

    if crop_x >= coded_width || crop_y >= coded_height {
        return Err(Error::parse("sps", "cropping window exceeds coded size"));
    }
    let width = u32::try_from(coded_width - crop_x)
        .map_err(|_| Error::parse("sps", "picture size out of range"))?;
    let height = u32::try_from(coded_height - crop_y)
        .map_err(|_| Error::parse("sps", "picture size out of range"))?;

    Ok(ParameterSet {
        profile_idc,
        constraint_flags,
        level_idc,
        width,
        height,
        chroma_format_idc: chroma_format_idc as u8,
        separate_colour_plane,
        bit_depth_luma_minus8: bit_depth_luma_minus8 as u8,
        bit_depth_chroma_minus8: bit_depth_chroma_minus8 as u8,
        log2_max_frame_num: (log2_max_frame_num_minus4 + 4) as u8,
        poc_type,
        log2_max_poc_lsb_minus4: log2_max_poc_lsb_minus4 as u8,
        frame_mbs_only,
        timing,
    })
}

/// Skip scaling_list() syntax (7.3.2.1.1.1)
fn skip_scaling_list(reader: &mut RbspReader, size: usize) -> Result<()> {
    let mut last_scale: i32 = 8;
    let mut next_scale: i32 = 8;

    for _ in 0..size {
        if next_scale != 0 {
            let delta_scale = reader.read_se("delta_scale")?;
            next_scale = (last_scale + delta_scale + 256).rem_euclid(256);
        }
        if next_scale != 0 {
            last_scale = next_scale;
        }
    }

    Ok(())
}

/// Parse VUI parameters up to the timing info, the rest is not needed
fn parse_vui_timing(reader: &mut RbspReader) -> Result<Option<TimingInfo>> {
    if reader.read_flag("aspect_ratio_info_present_flag")? {
        let aspect_ratio_idc = reader.read_bits(8, "aspect_ratio_idc")?;
        if aspect_ratio_idc == 255 {
            // Extended_SAR
            reader.skip_bits(16, "sar_width")?;
            reader.skip_bits(16, "sar_height")?;
        }
    }

    if reader.read_flag("overscan_info_present_flag")? {
        reader.read_flag("overscan_appropriate_flag")?;
    }

    if reader.read_flag("video_signal_type_present_flag")? {
        reader.skip_bits(3, "video_format")?;
        reader.read_flag("video_full_range_flag")?;
        if reader.read_flag("colour_description_present_flag")? {
            reader.skip_bits(8, "colour_primaries")?;
            reader.skip_bits(8, "transfer_characteristics")?;
            reader.skip_bits(8, "matrix_coefficients")?;
        }
    }

    if reader.read_flag("chroma_loc_info_present_flag")? {
        reader.read_ue("chroma_sample_loc_type_top_field")?;
        reader.read_ue("chroma_sample_loc_type_bottom_field")?;
    }

    if !reader.read_flag("timing_info_present_flag")? {
        return Ok(None);
    }

    let num_units_in_tick = reader.read_bits(32, "num_units_in_tick")?;
    let time_scale = reader.read_bits(32, "time_scale")?;
    let fixed_frame_rate = reader.read_flag("fixed_frame_rate_flag")?;

    Ok(Some(TimingInfo {
        num_units_in_tick,
        time_scale,
        fixed_frame_rate,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{SliceBuilder, SpsBuilder};

    #[test]
    fn test_parse_baseline_sps() {
        let sps = parse_sps(&SpsBuilder::baseline(320, 240).build()).unwrap();

        assert_eq!(sps.profile_idc, 66);
        assert_eq!(sps.width, 320);
        assert_eq!(sps.height, 240);
        assert_eq!(sps.chroma_format_idc, 1);
        assert_eq!(sps.bit_depth_luma_minus8, 0);
        assert_eq!(sps.bit_depth_chroma_minus8, 0);
        assert_eq!(sps.poc_type, PocType::Type0);
        assert_eq!(sps.poc_lsb_bits(), 4);
        assert_eq!(sps.log2_max_frame_num, 4);
        assert!(sps.frame_mbs_only);
    }

    #[test]
    fn test_unknown_frame_rate_without_timing() {
        let sps = parse_sps(&SpsBuilder::baseline(320, 240).build()).unwrap();
        assert!(sps.timing.is_none());
        assert_eq!(sps.frame_rate(), UNKNOWN_FRAME_RATE);
    }

    #[test]
    fn test_frame_rate_from_timing() {
        let mut builder = SpsBuilder::baseline(1280, 720);
        builder.timing = Some((1, 50));
        let sps = parse_sps(&builder.build()).unwrap();
        assert_eq!(sps.frame_rate(), 25);

        builder.timing = Some((0, 50));
        let sps = parse_sps(&builder.build()).unwrap();
        assert_eq!(sps.frame_rate(), UNKNOWN_FRAME_RATE);
    }

    #[test]
    fn test_high_profile_with_cropping() {
        // 1920x1088 coded, cropped 8 lines at the bottom (4:2:0 crop unit 2)
        let mut builder = SpsBuilder::baseline(1920, 1088);
        builder.profile_idc = 100;
        builder.bit_depth_luma_minus8 = 2;
        builder.bit_depth_chroma_minus8 = 2;
        builder.crop_bottom = 4;
        let sps = parse_sps(&builder.build()).unwrap();

        assert_eq!(sps.width, 1920);
        assert_eq!(sps.height, 1080);
        assert_eq!(sps.bit_depth_luma_minus8, 2);
        assert_eq!(sps.bit_depth_chroma_minus8, 2);
    }

    #[test]
    fn test_oversized_picture_is_parse_error() {
        let mut builder = SpsBuilder::baseline(320, 240);
        builder.width_in_mbs_minus1 = Some(1 << 28);
        assert!(matches!(
            parse_sps(&builder.build()),
            Err(Error::Parse { context: "sps", .. })
        ));

        // Largest width that still fits
        builder.width_in_mbs_minus1 = Some((1 << 28) - 2);
        assert_eq!(parse_sps(&builder.build()).unwrap().width, u32::MAX - 15);
    }

    #[test]
    fn test_poc_type_variants() {
        let mut builder = SpsBuilder::baseline(320, 240);
        builder.poc_type = 2;
        assert_eq!(parse_sps(&builder.build()).unwrap().poc_type, PocType::Type2);

        builder.poc_type = 1;
        assert_eq!(parse_sps(&builder.build()).unwrap().poc_type, PocType::Type1);
    }

    #[test]
    fn test_truncated_sps_is_error() {
        let full = SpsBuilder::baseline(320, 240).build();
        for len in 1..5 {
            assert!(matches!(
                parse_sps(&full[..len]),
                Err(Error::Parse { context: "sps", .. })
            ));
        }
        assert!(parse_sps(&[]).is_err());
    }

    #[test]
    fn test_rejects_non_sps_unit() {
        let sps = parse_sps(&SpsBuilder::baseline(320, 240).build()).unwrap();
        let slice = SliceBuilder::idr(0).build(&sps);
        assert!(parse_sps(&slice).is_err());
    }
}
