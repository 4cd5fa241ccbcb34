// https://en.wikipedia.org/wiki/TIFF#TIFF_Compression_Tag
// https://exiftool.org/TagNames/EXIF.html#Compression

use flate2::read::{ZlibDecoder, ZlibEncoder};
use num_enum::{FromPrimitive, IntoPrimitive};
use salzweg::decoder::{DecodingError, TiffStyleDecoder};
use salzweg::encoder::{EncodingError, TiffStyleEncoder};
use std::fmt;
use std::io::{self, Read};
use tracing::warn;

#[derive(Debug)]
pub enum DecompressError {
    LzwError(DecodingError),
    LzwEncodeError(EncodingError),
    CompressionNotSupported(Compression),
    IoError(io::Error),
}

impl fmt::Display for DecompressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecompressError::LzwError(e) => write!(f, "LZW decode failed: {e:?}"),
            DecompressError::LzwEncodeError(e) => write!(f, "LZW encode failed: {e:?}"),
            DecompressError::CompressionNotSupported(c) => {
                write!(f, "compression {c:?} not supported for writing")
            }
            DecompressError::IoError(e) => write!(f, "deflate failed: {e}"),
        }
    }
}

impl std::error::Error for DecompressError {}

impl From<io::Error> for DecompressError {
    fn from(e: io::Error) -> Self {
        DecompressError::IoError(e)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, FromPrimitive)]
#[repr(u16)]
pub enum Compression {
    Uncompressed = 1,
    CCITT1D = 2,
    T4Group3Fax = 3,
    T6Group4Fax = 4,
    Lzw = 5,
    JpegOld = 6,
    Jpeg = 7,
    DeflateAdobe = 8,
    JbigBW = 9,
    JbigColor = 10,
    PackBits = 32773,
    Deflate = 32946,
    ESRILerc = 34887,
    LZMA2 = 34925,
    Zstd = 34926,
    WebP = 34927,
    JPEGXL = 52546,

    #[num_enum(default)]
    Unknown = 0x0000,
}

impl Compression {
    /// Inflates one strip or tile. Schemes without a decoder pass the bytes
    /// through unchanged.
    pub fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>, DecompressError> {
        match self {
            Self::Uncompressed => Ok(bytes.to_vec()),
            Self::Lzw => TiffStyleDecoder::decode_to_vec(bytes).map_err(DecompressError::LzwError),
            Self::DeflateAdobe | Self::Deflate => {
                let mut buf = vec![];
                ZlibDecoder::new(bytes).read_to_end(&mut buf)?;
                Ok(buf)
            }
            other => {
                warn!("No decoder for {other:?} compression, passing bytes through");
                Ok(bytes.to_vec())
            }
        }
    }

    pub fn encode(&self, bytes: &[u8]) -> Result<Vec<u8>, DecompressError> {
        match self {
            Self::Uncompressed => Ok(bytes.to_vec()),
            Self::Lzw => TiffStyleEncoder::encode_to_vec(bytes)
                .map_err(DecompressError::LzwEncodeError),
            Self::DeflateAdobe | Self::Deflate => {
                let mut buf = vec![];
                ZlibEncoder::new(bytes, flate2::Compression::default()).read_to_end(&mut buf)?;
                Ok(buf)
            }
            other => Err(DecompressError::CompressionNotSupported(*other)),
        }
    }
}
