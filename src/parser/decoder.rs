use super::lzw;

use crate::error::{DecodeError, DecodeWarning};
use crate::frame::{ColorTable, DisposalMethod, Frame};
use crate::Gif;

use log::{debug, warn};

use std::fmt;
use std::io::{self, prelude::*};

type Result<T> = std::result::Result<T, DecodeError>;

const EXTENSION_INTRODUCER: u8 = 0x21;
const IMAGE_DESCRIPTOR_LABEL: u8 = 0x2c;
const TRAILER_LABEL: u8 = 0x3b;

// Extension labels
const APPLICATION_EXTENSION: u8 = 0xff;
const COMMENT_EXTENSION: u8 = 0xfe;
const GRAPHIC_CONTROL_EXTENSION: u8 = 0xf9;
const PLAIN_TEXT_EXTENSION: u8 = 0x01;

const GRAPHIC_CONTROL_BLOCK_SIZE: u8 = 4;

#[derive(Debug)]
enum ExtensionType {
    Application,
    Comment,
    GraphicControl,
    PlainText,
    Unknown(u8),
}

impl From<u8> for ExtensionType {
    fn from(value: u8) -> Self {
        use ExtensionType::*;

        match value {
            APPLICATION_EXTENSION => Application,
            COMMENT_EXTENSION => Comment,
            GRAPHIC_CONTROL_EXTENSION => GraphicControl,
            PLAIN_TEXT_EXTENSION => PlainText,
            label => Unknown(label),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct GraphicControlExtension {
    disposal_method: DisposalMethod,
    user_input_flag: bool,
    transparent_color_flag: bool,

    delay_time: u16,
    transparent_color_index: u8,
}

#[derive(Debug)]
pub(crate) struct ImageDescriptor {
    left_position: u16,
    top_position: u16,

    width: u16,
    height: u16,

    interlace_flag: bool,
    // number of entries, present when the local color table flag is set
    local_color_table_size: Option<usize>,
}

#[derive(Debug)]
pub(crate) struct GraphicBlock {
    extension: Option<GraphicControlExtension>,
    descriptor: ImageDescriptor,
    local_color_table: Option<ColorTable>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Version {
    V87a,
    V89a,
    Unknown(String),
}

impl From<[u8; 3]> for Version {
    fn from(value: [u8; 3]) -> Self {
        match &value {
            b"87a" => Version::V87a,
            b"89a" => Version::V89a,
            other => Version::Unknown(String::from_utf8_lossy(other).into_owned()),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::V87a => f.write_str("87a"),
            Version::V89a => f.write_str("89a"),
            Version::Unknown(version) => f.write_str(version),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LogicalScreenDescriptor {
    pub screen_width: u16,
    pub screen_height: u16,
    pub global_color_table_flag: bool,
    pub color_resolution: u8,
    pub sort_flag: bool,
    /// Number of entries, present when the global color table flag is set.
    pub global_color_table_size: Option<usize>,
    pub background_color_index: u8,
    pub pixel_aspect_ratio: u8,
}

#[derive(Debug)]
pub(crate) enum ParserState {
    ProcessMagic,
    ProcessLogicalScreenDescriptor,
    ProcessGlobalColorTable,

    // the graphic control extension waiting for the next image rides along
    DetermineNextBlock(Option<GraphicControlExtension>),
    ProcessExtension(u8, Option<GraphicControlExtension>),
    ProcessImageDescriptor(Option<GraphicControlExtension>),
    ProcessLocalColorTable(GraphicBlock),
    ProcessImageData(GraphicBlock),

    Done,
}

/// Single pass GIF decoder over any byte source.
///
/// Call [`Decoder::parse`] and read the results through the accessors, or use
/// [`Decoder::decode`] to get a [`Gif`] in one go.
#[derive(Debug)]
pub struct Decoder<R: Read> {
    inner: R,
    version: Option<Version>,
    logical_screen_descriptor: Option<LogicalScreenDescriptor>,
    global_color_table: ColorTable,
    frames: Vec<Frame>,
    warnings: Vec<DecodeWarning>,
}

impl<R: Read> Decoder<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            version: None,
            logical_screen_descriptor: None,
            global_color_table: ColorTable::default(),
            frames: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn parse(&mut self) -> Result<()> {
        let mut state = ParserState::ProcessMagic;

        loop {
            debug!("begin parsing state {:?}", state);

            state = self.process_next_state(state)?;
            if let ParserState::Done = state {
                debug!("decoded {} frames", self.frames.len());
                break Ok(());
            }
        }
    }

    pub fn decode(mut self) -> Result<Gif> {
        self.parse()?;

        let (Some(version), Some(screen)) = (self.version, self.logical_screen_descriptor) else {
            return Err(DecodeError::OutOfData);
        };

        Ok(Gif {
            version,
            screen,
            global_color_table: self.global_color_table,
            frames: self.frames,
            warnings: self.warnings,
        })
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    pub fn logical_screen_descriptor(&self) -> Option<&LogicalScreenDescriptor> {
        self.logical_screen_descriptor.as_ref()
    }

    pub fn global_color_table(&self) -> &ColorTable {
        &self.global_color_table
    }

    pub fn warnings(&self) -> &[DecodeWarning] {
        &self.warnings
    }

    fn process_next_state(&mut self, next_state: ParserState) -> Result<ParserState> {
        use ParserState::*;

        match next_state {
            ProcessMagic => {
                let signature = self.read_array::<3>()?;
                if &signature != b"GIF" {
                    return Err(DecodeError::Format(signature));
                }
                debug!("processed signature, got GIF");

                let version = Version::from(self.read_array::<3>()?);
                if version != Version::V89a {
                    warn!("GIF version is {version}, not 89a, decoding continues but some features may not work");
                    self.warnings.push(DecodeWarning::UnsupportedVersion(version.to_string()));
                }
                debug!("processed version, got {:?}", version);
                self.version = Some(version);

                Ok(ProcessLogicalScreenDescriptor)
            }
            ProcessLogicalScreenDescriptor => {
                let screen_width = self.read_u16()?;
                let screen_height = self.read_u16()?;

                let packed_fields = self.read_byte()?;

                // packed field start
                let global_color_table_flag = packed_fields & 0b10000000 != 0;
                let color_resolution = (packed_fields >> 4) & 0b00000111;
                let sort_flag = packed_fields & 0b00001000 != 0;
                let global_color_table_size = if global_color_table_flag {
                    Some(color_table_entries(packed_fields))
                } else {
                    None
                };
                // packed field end

                let background_color_index = self.read_byte()?;
                let pixel_aspect_ratio = self.read_byte()?;

                let descriptor = LogicalScreenDescriptor {
                    screen_width,
                    screen_height,
                    global_color_table_flag,
                    color_resolution,
                    sort_flag,
                    global_color_table_size,
                    background_color_index,
                    pixel_aspect_ratio,
                };
                debug!("processed logical screen descriptor, got: {:#?}", descriptor);
                self.logical_screen_descriptor = Some(descriptor);

                let next_state = if global_color_table_flag {
                    ProcessGlobalColorTable
                } else {
                    DetermineNextBlock(None)
                };

                Ok(next_state)
            }
            ProcessGlobalColorTable => {
                let size = self
                    .logical_screen_descriptor
                    .and_then(|descriptor| descriptor.global_color_table_size)
                    .unwrap_or_default();

                self.global_color_table = self.read_color_table(size)?;
                debug!("processed global color table with {} entries", self.global_color_table.len());

                Ok(DetermineNextBlock(None))
            }
            DetermineNextBlock(graphic_control_extension) => {
                let Some(introducer_or_label) = self.try_read_byte()? else {
                    warn!("reached end of file without a trailer");
                    return Ok(Done);
                };

                match introducer_or_label {
                    // extension introducer means that a label follows determining what exact type
                    // of extension it is.
                    EXTENSION_INTRODUCER => Ok(ProcessExtension(self.read_byte()?, graphic_control_extension)),
                    IMAGE_DESCRIPTOR_LABEL => Ok(ProcessImageDescriptor(graphic_control_extension)),
                    TRAILER_LABEL => Ok(Done),
                    label => {
                        warn!("skipping unexpected byte 0x{label:02x} between blocks");
                        Ok(DetermineNextBlock(graphic_control_extension))
                    }
                }
            }
            ProcessExtension(label, pending) => self.process_extension(ExtensionType::from(label), pending),
            ProcessImageDescriptor(graphic_control_extension) => {
                let left_position = self.read_u16()?;
                let top_position = self.read_u16()?;

                let width = self.read_u16()?;
                let height = self.read_u16()?;

                let packed_fields = self.read_byte()?;

                let local_color_table_flag = packed_fields & 0b10000000 != 0;
                let interlace_flag = packed_fields & 0b01000000 != 0;
                let sort_flag = packed_fields & 0b00100000 != 0;
                let local_color_table_size = if local_color_table_flag {
                    Some(color_table_entries(packed_fields))
                } else {
                    None
                };
                debug!("image descriptor packed fields: 0b{packed_fields:08b}, sorted color table: {sort_flag}");

                let graphic_block = GraphicBlock {
                    extension: graphic_control_extension,
                    descriptor: ImageDescriptor {
                        left_position,
                        top_position,
                        width,
                        height,
                        interlace_flag,
                        local_color_table_size,
                    },
                    local_color_table: None,
                };
                debug!("processed image descriptor, got: {:#?}", graphic_block.descriptor);

                let next_state = if local_color_table_flag {
                    ProcessLocalColorTable(graphic_block)
                } else {
                    ProcessImageData(graphic_block)
                };

                Ok(next_state)
            }
            ProcessLocalColorTable(mut graphic_block) => {
                let size = graphic_block.descriptor.local_color_table_size.unwrap_or_default();

                // kept on the frame, pixels are still looked up in the global table
                debug!("image has a local color table with {size} entries");
                graphic_block.local_color_table = Some(self.read_color_table(size)?);

                Ok(ProcessImageData(graphic_block))
            }
            ProcessImageData(graphic_block) => {
                let lzw_code_size = self.read_byte()?;
                let data_stream = self.read_data_sub_blocks()?;
                debug!("read {} bytes of image data, lzw minimum code size {lzw_code_size}", data_stream.len());

                let indices = lzw::lzw_decode(&data_stream, lzw_code_size)?;

                let frame = assemble_frame(graphic_block, indices);
                if !frame.is_complete() {
                    warn!(
                        "frame {} decoded to {} indices, expected {}x{}",
                        self.frames.len(),
                        frame.indices().len(),
                        frame.width,
                        frame.height
                    );
                }
                self.frames.push(frame);

                Ok(DetermineNextBlock(None))
            }
            Done => Ok(Done),
        }
    }

    fn process_extension(
        &mut self,
        label: ExtensionType,
        pending: Option<GraphicControlExtension>,
    ) -> Result<ParserState> {
        use ExtensionType::*;

        debug!("processing extension type: {:?}", label);
        match label {
            GraphicControl => {
                let block_size = self.read_byte()?;
                if block_size != GRAPHIC_CONTROL_BLOCK_SIZE {
                    return Err(DecodeError::MalformedExtension(block_size));
                }

                let packed_fields = self.read_byte()?;
                // packed fields definition
                // XXXYYYZW
                // XXX = reserved, not needed
                // YYY = disposal method, indicates what to do with graphic after displaying
                // Z = user input flag
                // W = transparent color flag

                let disposal_method = DisposalMethod::from_u8((packed_fields >> 2) & 0b00000111);
                let user_input_flag = packed_fields & 0b00000010 != 0;
                let transparent_color_flag = packed_fields & 0b00000001 != 0;

                let delay_time = self.read_u16()?;
                let transparent_color_index = self.read_byte()?;

                // block terminator
                self.skip_data_sub_blocks()?;

                let graphic_control_extension = GraphicControlExtension {
                    disposal_method,
                    user_input_flag,
                    transparent_color_flag,

                    delay_time,
                    transparent_color_index,
                };

                debug!("processed GraphicControlExtension: {:#?}", graphic_control_extension);

                Ok(ParserState::DetermineNextBlock(Some(graphic_control_extension)))
            }
            // application blocks, comments, plain text and unknown labels are all framed
            // as sub-block chains and carry nothing we decode
            Application | Comment | PlainText | Unknown(_) => {
                let skipped = self.skip_data_sub_blocks()?;
                debug!("skipped {skipped} bytes of {:?} extension", label);

                Ok(ParserState::DetermineNextBlock(pending))
            }
        }
    }

    fn read_color_table(&mut self, entries: usize) -> Result<ColorTable> {
        let bytes = self.read_bytes(3 * entries)?;
        Ok(ColorTable::from_rgb_bytes(&bytes))
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buffer = [0; N];
        self.inner.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    fn read_bytes(&mut self, count: usize) -> Result<Box<[u8]>> {
        let mut buffer = vec![0; count];
        self.inner.read_exact(&mut buffer)?;
        Ok(buffer.into_boxed_slice())
    }

    fn read_byte(&mut self) -> Result<u8> {
        let [byte] = self.read_array::<1>()?;
        Ok(byte)
    }

    /// Like [`Decoder::read_byte`] but reports end of file as `None`.
    fn try_read_byte(&mut self) -> Result<Option<u8>> {
        let mut buffer = [0; 1];
        loop {
            match self.inner.read(&mut buffer) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(buffer[0])),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn read_u16(&mut self) -> Result<u16> {
        // GIF89a: Unless otherwise stated, multi-byte numeric fields are ordered with the Least
        // Significant Byte first.
        Ok(u16::from_le_bytes(self.read_array::<2>()?))
    }

    fn read_data_sub_blocks(&mut self) -> Result<Vec<u8>> {
        let mut block_size = self.read_byte()?;

        // there could be more than one block, but we do know we'll at least have 1 sub-block.
        // allocate capacity to account for it.
        let mut result = Vec::with_capacity(block_size.into());

        // we might have read the block terminator at the end of the while loop, stop right there
        // because we're done.
        while block_size != 0 {
            let start = result.len();
            result.resize(start + usize::from(block_size), 0);
            self.inner.read_exact(&mut result[start..])?;

            block_size = self.read_byte()?;
        }

        Ok(result)
    }

    fn skip_data_sub_blocks(&mut self) -> Result<u64> {
        let mut skipped = 0;
        loop {
            let block_size = u64::from(self.read_byte()?);
            if block_size == 0 {
                return Ok(skipped);
            }

            let copied = io::copy(&mut self.inner.by_ref().take(block_size), &mut io::sink())?;
            if copied != block_size {
                return Err(DecodeError::OutOfData);
            }
            skipped += copied;
        }
    }
}

/// Entry count encoded in the low three bits of a packed field, 2^(n+1).
fn color_table_entries(packed_fields: u8) -> usize {
    1 << ((packed_fields & 0b00000111) + 1)
}

fn assemble_frame(graphic_block: GraphicBlock, indices: Vec<u8>) -> Frame {
    let GraphicBlock {
        extension,
        descriptor,
        local_color_table,
    } = graphic_block;
    let control = extension.unwrap_or_default();

    Frame {
        left: descriptor.left_position,
        top: descriptor.top_position,
        width: descriptor.width,
        height: descriptor.height,

        // delay time is stored in hundredths of a second
        delay_ms: u32::from(control.delay_time) * 10,
        disposal_method: control.disposal_method,
        clear_to_background: control.disposal_method == DisposalMethod::RestoreToBackgroundColor,
        user_input: control.user_input_flag,
        has_transparency: control.transparent_color_flag,
        transparent_index: control.transparent_color_index,
        interlaced: descriptor.interlace_flag,

        local_color_table,
        indices: indices.into_boxed_slice(),
    }
}
