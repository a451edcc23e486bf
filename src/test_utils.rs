/// Packs `(code, width)` pairs LSB-first, the way a GIF encoder lays codes out.
pub(crate) fn pack_codes(codes: &[(u16, u32)]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut acc: u32 = 0;
    let mut bits = 0;

    for &(code, width) in codes {
        acc |= u32::from(code) << bits;
        bits += width;
        while bits >= 8 {
            out.push(acc as u8);
            acc >>= 8;
            bits -= 8;
        }
    }
    if bits > 0 {
        out.push(acc as u8);
    }
    out
}

/// Splits `data` into a sub-block chain terminated by a zero length block.
pub(crate) fn sub_blocks(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    for chunk in data.chunks(255) {
        out.push(chunk.len() as u8);
        out.extend_from_slice(chunk);
    }
    out.push(0);
    out
}

/// Builds GIF byte streams block by block.
pub(crate) struct GifBuilder {
    bytes: Vec<u8>,
}

impl GifBuilder {
    /// Header with a two entry (black, white) global color table.
    pub fn new(version: &[u8; 3], width: u16, height: u16) -> Self {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"GIF");
        bytes.extend_from_slice(version);
        bytes.extend_from_slice(&width.to_le_bytes());
        bytes.extend_from_slice(&height.to_le_bytes());
        bytes.push(0b1000_0000);
        bytes.push(0);
        bytes.push(0);
        bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0xff, 0xff, 0xff]);
        Self { bytes }
    }

    pub fn graphic_control(mut self, packed: u8, delay: u16, transparent_index: u8) -> Self {
        self.bytes.extend_from_slice(&[0x21, 0xf9, 4, packed]);
        self.bytes.extend_from_slice(&delay.to_le_bytes());
        self.bytes.extend_from_slice(&[transparent_index, 0]);
        self
    }

    pub fn extension(mut self, label: u8, data: &[u8]) -> Self {
        self.bytes.extend_from_slice(&[0x21, label]);
        self.bytes.extend(sub_blocks(data));
        self
    }

    /// Image block with no local color table.
    pub fn image(self, rect: (u16, u16, u16, u16), interlaced: bool, min_code_size: u8, data: &[u8]) -> Self {
        let packed = if interlaced { 0b0100_0000 } else { 0 };
        self.image_with_packed(rect, packed, &[], min_code_size, data)
    }

    pub fn image_with_packed(
        mut self,
        (left, top, width, height): (u16, u16, u16, u16),
        packed: u8,
        local_color_table: &[u8],
        min_code_size: u8,
        data: &[u8],
    ) -> Self {
        self.bytes.push(0x2c);
        for value in [left, top, width, height] {
            self.bytes.extend_from_slice(&value.to_le_bytes());
        }
        self.bytes.push(packed);
        self.bytes.extend_from_slice(local_color_table);
        self.bytes.push(min_code_size);
        self.bytes.extend(sub_blocks(data));
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn trailer(mut self) -> Vec<u8> {
        self.bytes.push(0x3b);
        self.bytes
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

/// `[0, 1, 0, 1]` compressed with a minimum code size of 2.
pub(crate) const CHECKER_2X2: [u8; 2] = [0x44, 0x5c];

/// `[0]` compressed with a minimum code size of 2.
pub(crate) const SINGLE_PIXEL: [u8; 2] = [0x44, 0x01];
