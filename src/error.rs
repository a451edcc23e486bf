use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("signature is invalid, expected GIF but found {0:?}")]
    Format([u8; 3]),

    #[error("graphic control extension declares a block size of {0}, expected 4")]
    MalformedExtension(u8),

    #[error("lzw code {code} is out of range, the dictionary only holds {dict_size} codes")]
    CorruptStream { code: u16, dict_size: usize },

    #[error("lzw minimum code size {0} is unsupported, expected a value between 1 and 8")]
    InvalidMinimumCodeSize(u8),

    #[error("ran out of data while decoding")]
    OutOfData,

    #[error(transparent)]
    Io(io::Error),
}

impl From<io::Error> for DecodeError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => DecodeError::OutOfData,
            _ => DecodeError::Io(err),
        }
    }
}

/// Problems that were noticed while decoding but did not stop it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeWarning {
    /// The header carried a version other than `89a`.
    UnsupportedVersion(String),
}
