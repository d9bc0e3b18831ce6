use std::error::Error;
use std::fmt;
use std::io;

pub type Result<T> = std::result::Result<T, ProtocolError>;

#[derive(Debug)]
pub enum ProtocolError {
    IoError(io::Error),
    /// The buffer ended before the layout implied by masks/flags did.
    Truncated { needed: usize, remaining: usize },
    /// Metadata type id outside the wire table (0-6).
    UnknownMetadataType(u8),
    /// Compressed NBT payload does not fit the signed 16-bit length field.
    NbtTooLarge(usize),
    /// Status favicon is not a 64x64 image, or is not a decodable data URI.
    InvalidIcon(String),
    NbtError(quartz_nbt::io::NbtIoError),
    ImageError(image::ImageError),
    JsonError(serde_json::Error),
    /// Status JSON is missing a required field or has one of the wrong shape.
    MalformedStatus(String),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::IoError(err) => write!(f, "IO error: {}", err),
            ProtocolError::Truncated { needed, remaining } => write!(
                f,
                "buffer truncated: needed {} more bytes, {} remaining",
                needed, remaining
            ),
            ProtocolError::UnknownMetadataType(id) => {
                write!(f, "unknown metadata type id: {}", id)
            }
            ProtocolError::NbtTooLarge(size) => {
                write!(f, "compressed NBT is {} bytes, limit is {}", size, i16::MAX)
            }
            ProtocolError::InvalidIcon(msg) => write!(f, "invalid favicon: {}", msg),
            ProtocolError::NbtError(err) => write!(f, "NBT error: {}", err),
            ProtocolError::ImageError(err) => write!(f, "image error: {}", err),
            ProtocolError::JsonError(err) => write!(f, "JSON error: {}", err),
            ProtocolError::MalformedStatus(msg) => write!(f, "malformed status: {}", msg),
        }
    }
}

impl Error for ProtocolError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ProtocolError::IoError(err) => Some(err),
            ProtocolError::NbtError(err) => Some(err),
            ProtocolError::ImageError(err) => Some(err),
            ProtocolError::JsonError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ProtocolError {
    fn from(err: io::Error) -> Self {
        ProtocolError::IoError(err)
    }
}

impl From<quartz_nbt::io::NbtIoError> for ProtocolError {
    fn from(err: quartz_nbt::io::NbtIoError) -> Self {
        ProtocolError::NbtError(err)
    }
}

impl From<image::ImageError> for ProtocolError {
    fn from(err: image::ImageError) -> Self {
        ProtocolError::ImageError(err)
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        ProtocolError::JsonError(err)
    }
}
