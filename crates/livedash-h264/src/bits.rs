//! RBSP bit reader with Exp-Golomb helpers

use std::io::Cursor;

use bitstream_io::{BigEndian, BitRead, BitReader};

use crate::error::{Error, Result};

/// Bit reader over de-escaped RBSP bytes
///
/// Every read that runs past the end of the buffer surfaces as
/// [`Error::Parse`] tagged with the syntax structure being decoded.
pub(crate) struct RbspReader<'a> {
    inner: BitReader<Cursor<&'a [u8]>, BigEndian>,
    context: &'static str,
}

impl<'a> RbspReader<'a> {
    pub(crate) fn new(data: &'a [u8], context: &'static str) -> Self {
        Self {
            inner: BitReader::endian(Cursor::new(data), BigEndian),
            context,
        }
    }

    fn truncated(&self, field: &str) -> Error {
        Error::parse(self.context, format!("truncated at {}", field))
    }

    /// Read `n` bits (up to 32) as an unsigned value
    pub(crate) fn read_bits(&mut self, n: u32, field: &str) -> Result<u32> {
        if n == 0 {
            return Ok(0);
        }
        self.inner
            .read::<u32>(n)
            .map_err(|_| self.truncated(field))
    }

    pub(crate) fn read_flag(&mut self, field: &str) -> Result<bool> {
        self.inner.read_bit().map_err(|_| self.truncated(field))
    }

    pub(crate) fn skip_bits(&mut self, n: u32, field: &str) -> Result<()> {
        if n == 0 {
            return Ok(());
        }
        self.inner.skip(n).map_err(|_| self.truncated(field))
    }

    /// Read unsigned Exp-Golomb coded value, ue(v)
    pub(crate) fn read_ue(&mut self, field: &str) -> Result<u32> {
        let mut leading_zeros = 0u32;
        while !self.read_flag(field)? {
            leading_zeros += 1;
            if leading_zeros > 31 {
                return Err(Error::parse(
                    self.context,
                    format!("exp-golomb prefix too long at {}", field),
                ));
            }
        }

        if leading_zeros == 0 {
            return Ok(0);
        }

        let suffix = self.read_bits(leading_zeros, field)?;
        Ok(((1u64 << leading_zeros) - 1 + suffix as u64) as u32)
    }

    /// Read signed Exp-Golomb coded value, se(v)
    pub(crate) fn read_se(&mut self, field: &str) -> Result<i32> {
        let code = self.read_ue(field)? as i64;
        let value = if code % 2 == 1 {
            (code + 1) / 2
        } else {
            -(code / 2)
        };
        Ok(value as i32)
    }
}
