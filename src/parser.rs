mod bit_reader;
pub(crate) mod decoder;
mod lzw;

pub use decoder::{Decoder, LogicalScreenDescriptor, Version};
