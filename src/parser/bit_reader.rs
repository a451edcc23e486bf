use crate::error::DecodeError;

pub(crate) struct BitReader<'a> {
    buf: &'a [u8],
    byte_offset: usize,
    bit_offset: u8,
}

impl<'a> BitReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            byte_offset: 0,
            bit_offset: 0,
        }
    }

    /// Reads a single bit, least significant bit of each byte first.
    pub fn read_bit(&mut self) -> Result<u32, DecodeError> {
        let byte = *self.buf.get(self.byte_offset).ok_or(DecodeError::OutOfData)?;
        let bit = (byte >> self.bit_offset) & 1;

        self.bit_offset += 1;
        if self.bit_offset > 7 {
            self.bit_offset = 0;
            self.byte_offset += 1;
        }

        Ok(bit.into())
    }

    /// Reads `count` bits, the first bit read ends up in the lowest bit of the result.
    ///
    /// Fails with [`DecodeError::OutOfData`] without moving the cursor when fewer than
    /// `count` bits remain.
    pub fn read_bits(&mut self, count: u32) -> Result<u32, DecodeError> {
        debug_assert!(count <= 32);

        if self.position() + count as usize > self.len() {
            return Err(DecodeError::OutOfData);
        }

        let mut value = 0;
        for i in 0..count {
            value |= self.read_bit()? << i;
        }
        Ok(value)
    }

    /// Absolute cursor position in bits.
    pub fn position(&self) -> usize {
        self.byte_offset * 8 + self.bit_offset as usize
    }

    /// Buffer length in bits.
    pub fn len(&self) -> usize {
        self.buf.len() * 8
    }
}
