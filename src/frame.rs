/// One color table entry.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Ordered list of colors, indexed by decoded pixel indices.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ColorTable {
    entries: Box<[Rgb]>,
}

impl ColorTable {
    /// Groups raw `r g b` bytes into entries, a trailing partial triple is dropped.
    pub fn from_rgb_bytes(bytes: &[u8]) -> Self {
        let entries = bytes
            .chunks_exact(3)
            .map(|rgb| Rgb {
                r: rgb[0],
                g: rgb[1],
                b: rgb[2],
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, index: u8) -> Option<Rgb> {
        self.entries.get(usize::from(index)).copied()
    }

    pub fn entries(&self) -> &[Rgb] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DisposalMethod {
    #[default]
    Unspecified = 0,
    DoNotDispose = 1,
    RestoreToBackgroundColor = 2,
    RestoreToPrevious = 3,
}

impl DisposalMethod {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => DisposalMethod::DoNotDispose,
            2 => DisposalMethod::RestoreToBackgroundColor,
            3 => DisposalMethod::RestoreToPrevious,
            _ => DisposalMethod::Unspecified,
        }
    }
}

/// A decoded image and the metadata needed to composite it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,

    /// Time on screen in milliseconds.
    pub delay_ms: u32,
    pub disposal_method: DisposalMethod,
    /// The canvas should be cleared to the background color before drawing this frame.
    pub clear_to_background: bool,
    /// The viewer is expected to wait for input before moving on.
    pub user_input: bool,
    pub has_transparency: bool,
    pub transparent_index: u8,
    pub interlaced: bool,

    /// Read from the file but not consulted by [`Frame::as_pixels`] callers that pass the
    /// global table.
    pub local_color_table: Option<ColorTable>,

    pub(crate) indices: Box<[u8]>,
}

impl Frame {
    /// Color table indices, row-major in the order they were decoded.
    pub fn indices(&self) -> &[u8] {
        &self.indices
    }

    pub fn is_complete(&self) -> bool {
        self.indices.len() == usize::from(self.width) * usize::from(self.height)
    }

    /// Maps every decoded index through `color_table`, index for index.
    ///
    /// Returns `None` if an index has no entry in the table.
    pub fn as_pixels(&self, color_table: &ColorTable) -> Option<Vec<Rgb>> {
        self.indices.iter().map(|&index| color_table.get(index)).collect()
    }

    pub fn is_transparent(&self, index: u8) -> bool {
        self.has_transparency && index == self.transparent_index
    }

    /// Decoded rows paired with the canvas row they belong to.
    pub fn rows(&self) -> impl Iterator<Item = (usize, &[u8])> + '_ {
        self.rows_as(self.interlaced)
    }

    /// Like [`Frame::rows`] but ignores the interlace flag of the frame.
    pub fn rows_as(&self, interlaced: bool) -> impl Iterator<Item = (usize, &[u8])> + '_ {
        let data: &[u8] = if self.width == 0 { &[] } else { &self.indices };
        let order = RowOrder::new(usize::from(self.height), interlaced);
        order.zip(data.chunks(usize::from(self.width).max(1)))
    }

    /// Indices rearranged top to bottom, `width * height` long.
    ///
    /// Rows the stream did not provide are left as index 0 and surplus data is ignored.
    pub fn display_indices(&self) -> Vec<u8> {
        self.display_indices_as(self.interlaced)
    }

    pub fn display_indices_as(&self, interlaced: bool) -> Vec<u8> {
        let width = usize::from(self.width);
        let mut out = vec![0; width * usize::from(self.height)];
        for (row, data) in self.rows_as(interlaced) {
            let start = row * width;
            out[start..start + data.len()].copy_from_slice(data);
        }
        out
    }
}

// (first row, step) per pass
const INTERLACED_PASSES: [(usize, usize); 4] = [(0, 8), (4, 8), (2, 4), (1, 2)];
const PROGRESSIVE_PASSES: [(usize, usize); 1] = [(0, 1)];

/// Destination rows in the order an image's rows are stored.
///
/// Interlaced images are stored in four passes: every 8th row from 0, every 8th row
/// from 4, every 4th row from 2, then every 2nd row from 1.
#[derive(Debug, Clone)]
pub struct RowOrder {
    height: usize,
    passes: &'static [(usize, usize)],
    pass: usize,
    row: usize,
}

impl RowOrder {
    pub fn new(height: usize, interlaced: bool) -> Self {
        let passes: &'static [(usize, usize)] = if interlaced {
            &INTERLACED_PASSES
        } else {
            &PROGRESSIVE_PASSES
        };
        Self {
            height,
            passes,
            pass: 0,
            row: passes[0].0,
        }
    }
}

impl Iterator for RowOrder {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while self.row >= self.height {
            self.pass += 1;
            let &(first, _) = self.passes.get(self.pass)?;
            self.row = first;
        }

        let row = self.row;
        self.row += self.passes[self.pass].1;
        Some(row)
    }
}
