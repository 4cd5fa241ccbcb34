use super::TagId;
use std::fmt;
use std::io;

#[derive(Debug)]
pub enum TiffError {
    BadMagicBytes,
    BadVersion(u16),
    ReadError(io::Error),
    MissingTag(TagId),
    BadTag(TagId),
    NoIfd0,
    /// A value or offset does not fit the 32-bit fields of a classic TIFF.
    ClassicOverflow(u16),
    /// LONG8/SLONG8/IFD8 entries are only valid in BigTIFF.
    BigTiffTypeInClassic(u16),
}

impl fmt::Display for TiffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TiffError::BadMagicBytes => write!(f, "bad TIFF magic bytes"),
            TiffError::BadVersion(v) => write!(f, "unsupported TIFF version {v}"),
            TiffError::ReadError(e) => write!(f, "TIFF I/O error: {e}"),
            TiffError::MissingTag(id) => write!(f, "missing required tag {id:?}"),
            TiffError::BadTag(id) => write!(f, "malformed tag {id:?}"),
            TiffError::NoIfd0 => write!(f, "TIFF contains no image directory"),
            TiffError::ClassicOverflow(code) => {
                write!(f, "tag {code} overflows a classic TIFF 32-bit field")
            }
            TiffError::BigTiffTypeInClassic(code) => {
                write!(f, "tag {code} uses a BigTIFF-only field type in a classic TIFF")
            }
        }
    }
}

impl std::error::Error for TiffError {}

impl From<io::Error> for TiffError {
    fn from(e: io::Error) -> Self {
        TiffError::ReadError(e)
    }
}
