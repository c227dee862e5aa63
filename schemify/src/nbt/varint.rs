use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};

const SEGMENT_BITS: u32 = 0x7F;
const CONTINUE_BIT: u8 = 0x80;

/// Number of bytes needed to encode `value` as an unsigned LEB128 var-int.
pub const fn var_int_len(value: u32) -> usize {
    let bits = u32::BITS - value.leading_zeros();
    if bits == 0 { 1 } else { bits.div_ceil(7) as usize }
}

/// Encode palette indices as a stream of unsigned LEB128 var-ints, low 7-bit group first.
pub fn encode_var_int_array(values: &[i32]) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(values.len());
    for (position, &index) in values.iter().enumerate() {
        let Ok(mut value) = u32::try_from(index) else {
            return Err(Error::InvalidPaletteIndex { index, position });
        };
        while value > SEGMENT_BITS {
            buf.put_u8((value & SEGMENT_BITS) as u8 | CONTINUE_BIT);
            value >>= 7;
        }
        buf.put_u8(value as u8);
    }
    Ok(buf.freeze())
}
