//! Slice header parsing, limited to what the timing path needs

use crate::bits::RbspReader;
use crate::error::{Error, Result};
use crate::nal::{remove_emulation_prevention, NalUnitType};
use crate::sps::{ParameterSet, PocType};

/// Fields of a slice header consumed by timestamp reconstruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PictureHeader {
    pub nal_type: NalUnitType,
    pub frame_num: u32,
    /// `pic_order_cnt_lsb`, present only with [`PocType::Type0`]
    pub pic_order_cnt_lsb: Option<u32>,
}

/// Parse the leading slice header fields of a coded picture NAL unit
///
/// `data` starts at the NAL header byte and may still contain emulation
/// prevention bytes.
pub fn parse_picture_header(data: &[u8], sps: &ParameterSet) -> Result<PictureHeader> {
    let rbsp = remove_emulation_prevention(data);

    let header = *rbsp
        .first()
        .ok_or_else(|| Error::parse("slice header", "empty NAL unit"))?;
    let nal_type = NalUnitType::from_header(header);
    if !nal_type.is_coded_picture() {
        return Err(Error::parse(
            "slice header",
            format!("NAL unit type {:?} carries no slice header", nal_type),
        ));
    }

    let mut reader = RbspReader::new(&rbsp[1..], "slice header");

    reader.read_ue("first_mb_in_slice")?;
    let slice_type = reader.read_ue("slice_type")?;
    if slice_type > 9 {
        return Err(Error::parse(
            "slice header",
            format!("slice_type {} out of range", slice_type),
        ));
    }
    reader.read_ue("pic_parameter_set_id")?;

    if sps.separate_colour_plane {
        reader.skip_bits(2, "colour_plane_id")?;
    }

    let frame_num = reader.read_bits(sps.log2_max_frame_num as u32, "frame_num")?;

    if !sps.frame_mbs_only && reader.read_flag("field_pic_flag")? {
        reader.read_flag("bottom_field_flag")?;
    }

    if nal_type == NalUnitType::IdrSlice {
        reader.read_ue("idr_pic_id")?;
    }

    let pic_order_cnt_lsb = match sps.poc_type {
        PocType::Type0 => Some(reader.read_bits(sps.poc_lsb_bits(), "pic_order_cnt_lsb")?),
        PocType::Type1 | PocType::Type2 => None,
    };

    Ok(PictureHeader {
        nal_type,
        frame_num,
        pic_order_cnt_lsb,
    })
}
