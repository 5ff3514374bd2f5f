//! Bitstream builders for unit tests

use bitstream_io::{BigEndian, BitWrite, BitWriter};

use crate::sps::{ParameterSet, PocType};

struct RbspWriter {
    buf: Vec<u8>,
    bits: Vec<bool>,
}

impl RbspWriter {
    fn new() -> Self {
        Self {
            buf: Vec::new(),
            bits: Vec::new(),
        }
    }

    fn u(&mut self, n: u32, value: u32) {
        for i in (0..n).rev() {
            self.bits.push((value >> i) & 1 == 1);
        }
    }

    fn flag(&mut self, value: bool) {
        self.bits.push(value);
    }

    fn ue(&mut self, value: u32) {
        let code = value as u64 + 1;
        let len = 64 - code.leading_zeros();
        for _ in 0..len - 1 {
            self.bits.push(false);
        }
        for i in (0..len).rev() {
            self.bits.push((code >> i) & 1 == 1);
        }
    }

    /// rbsp_trailing_bits, byte packing and emulation prevention
    fn finish(mut self, header: u8) -> Vec<u8> {
        self.bits.push(true);
        while self.bits.len() % 8 != 0 {
            self.bits.push(false);
        }

        {
            let mut writer = BitWriter::endian(&mut self.buf, BigEndian);
            for bit in &self.bits {
                writer.write_bit(*bit).unwrap();
            }
        }

        let mut out = vec![header];
        let mut zeros = 0;
        for byte in self.buf {
            if zeros >= 2 && byte <= 3 {
                out.push(0x03);
                zeros = 0;
            }
            out.push(byte);
            zeros = if byte == 0 { zeros + 1 } else { 0 };
        }
        out
    }
}

/// Knobs for a synthetic SPS
pub(crate) struct SpsBuilder {
    pub profile_idc: u8,
    pub width: u32,
    pub height: u32,
    pub bit_depth_luma_minus8: u32,
    pub bit_depth_chroma_minus8: u32,
    pub poc_type: u32,
    pub log2_max_poc_lsb_minus4: u32,
    pub crop_bottom: u32,
    /// Raw pic_width_in_mbs_minus1, overriding `width`
    pub width_in_mbs_minus1: Option<u32>,
    /// (num_units_in_tick, time_scale)
    pub timing: Option<(u32, u32)>,
}

impl SpsBuilder {
    /// Progressive 4:2:0 stream, dimensions in multiples of 16
    pub fn baseline(width: u32, height: u32) -> Self {
        Self {
            profile_idc: 66,
            width,
            height,
            bit_depth_luma_minus8: 0,
            bit_depth_chroma_minus8: 0,
            poc_type: 0,
            log2_max_poc_lsb_minus4: 0,
            crop_bottom: 0,
            width_in_mbs_minus1: None,
            timing: None,
        }
    }

    pub fn build(&self) -> Vec<u8> {
        let mut w = RbspWriter::new();
        w.u(8, self.profile_idc as u32);
        w.u(8, 0); // constraint flags
        w.u(8, 30); // level_idc
        w.ue(0); // seq_parameter_set_id

        if self.profile_idc == 100 {
            w.ue(1); // chroma_format_idc
            w.ue(self.bit_depth_luma_minus8);
            w.ue(self.bit_depth_chroma_minus8);
            w.flag(false); // qpprime_y_zero_transform_bypass_flag
            w.flag(false); // seq_scaling_matrix_present_flag
        }

        w.ue(0); // log2_max_frame_num_minus4
        w.ue(self.poc_type);
        match self.poc_type {
            0 => w.ue(self.log2_max_poc_lsb_minus4),
            1 => {
                w.flag(false);
                w.ue(0); // offset_for_non_ref_pic = 0
                w.ue(0); // offset_for_top_to_bottom_field = 0
                w.ue(1); // one cycle entry
                w.ue(1); // offset_for_ref_frame = +1
            }
            _ => {}
        }

        w.ue(1); // max_num_ref_frames
        w.flag(false); // gaps_in_frame_num_value_allowed_flag
        w.ue(self.width_in_mbs_minus1.unwrap_or(self.width / 16 - 1));
        w.ue(self.height / 16 - 1);
        w.flag(true); // frame_mbs_only_flag
        w.flag(true); // direct_8x8_inference_flag

        if self.crop_bottom > 0 {
            w.flag(true);
            w.ue(0);
            w.ue(0);
            w.ue(0);
            w.ue(self.crop_bottom);
        } else {
            w.flag(false);
        }

        match self.timing {
            Some((units, scale)) => {
                w.flag(true); // vui_parameters_present_flag
                w.flag(false); // aspect_ratio_info_present_flag
                w.flag(false); // overscan_info_present_flag
                w.flag(false); // video_signal_type_present_flag
                w.flag(false); // chroma_loc_info_present_flag
                w.flag(true); // timing_info_present_flag
                w.u(32, units);
                w.u(32, scale);
                w.flag(true); // fixed_frame_rate_flag
            }
            None => w.flag(false),
        }

        w.finish(0x67)
    }
}

/// Knobs for a synthetic slice header
pub(crate) struct SliceBuilder {
    pub idr: bool,
    pub frame_num: u32,
    pub poc_lsb: u32,
}

impl SliceBuilder {
    pub fn idr(poc_lsb: u32) -> Self {
        Self {
            idr: true,
            frame_num: 0,
            poc_lsb,
        }
    }

    pub fn non_idr(frame_num: u32, poc_lsb: u32) -> Self {
        Self {
            idr: false,
            frame_num,
            poc_lsb,
        }
    }

    pub fn build(&self, sps: &ParameterSet) -> Vec<u8> {
        let mut w = RbspWriter::new();
        w.ue(0); // first_mb_in_slice
        w.ue(if self.idr { 7 } else { 5 }); // slice_type I or P
        w.ue(0); // pic_parameter_set_id
        w.u(sps.log2_max_frame_num as u32, self.frame_num);
        if self.idr {
            w.ue(0); // idr_pic_id
        }
        if sps.poc_type == PocType::Type0 {
            w.u(sps.poc_lsb_bits(), self.poc_lsb);
        }
        // Slice data is irrelevant to timing
        w.u(8, 0xA5);

        w.finish(if self.idr { 0x65 } else { 0x41 })
    }
}
