//! Decodes GIF files into a list of frames.
//!
//! Every frame carries its color table indices (in the order they were stored, see
//! [`Frame::rows`] for interlaced images) together with its placement on the logical
//! screen and the timing and disposal information of its graphic control extension.
//! Painting, pacing and windowing are left to the caller.
//!
//! ```no_run
//! let gif = gif_frames::decode_file("animation.gif")?;
//! for frame in &gif.frames {
//!     let pixels = gif.frame_pixels(frame);
//!     println!("{}x{} for {}ms", frame.width, frame.height, frame.delay_ms);
//! #   let _ = pixels;
//! }
//! # Ok::<(), gif_frames::DecodeError>(())
//! ```

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

mod error;
mod frame;
mod parser;
#[cfg(test)]
mod test_utils;

pub use error::{DecodeError, DecodeWarning};
pub use frame::{ColorTable, DisposalMethod, Frame, Rgb, RowOrder};
pub use parser::{Decoder, LogicalScreenDescriptor, Version};

/// Everything decoded from one file.
#[derive(Debug, Clone)]
pub struct Gif {
    pub version: Version,
    pub screen: LogicalScreenDescriptor,
    pub global_color_table: ColorTable,
    /// Images in file order.
    pub frames: Vec<Frame>,
    pub warnings: Vec<DecodeWarning>,
}

impl Gif {
    pub fn background_color_index(&self) -> u8 {
        self.screen.background_color_index
    }

    pub fn background_color(&self) -> Option<Rgb> {
        self.global_color_table.get(self.background_color_index())
    }

    /// Colors of `frame` looked up in the global color table.
    pub fn frame_pixels(&self, frame: &Frame) -> Option<Vec<Rgb>> {
        frame.as_pixels(&self.global_color_table)
    }
}

pub fn decode<R: Read>(reader: R) -> Result<Gif, DecodeError> {
    Decoder::new(reader).decode()
}

pub fn decode_file<P: AsRef<Path>>(path: P) -> Result<Gif, DecodeError> {
    let file = File::open(path)?;
    decode(BufReader::new(file))
}
