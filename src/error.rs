use crate::encode::EncodeError;
use crate::geotags::GeoTiffError;
use crate::projection::ProjectionError;
use crate::raster::{DecompressError, RasterError};
use crate::tiff::TiffError;
use std::fmt;
use std::io;
use std::num::ParseFloatError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    BadTiff(TiffError),
    BadGeoTiff(GeoTiffError),
    ReadError(io::Error),
    DecompressionError(DecompressError),
    RasterizationError(RasterError),
    ProjectionError(ProjectionError),
    EncodeError(EncodeError),
    /// GDALNoData text that is not a number.
    NoData(String, ParseFloatError),
    ReadOnly,
    WriteOnly,
    NotOpen,
    ImageIndexOutOfRange((usize, usize)),
}

impl Error {
    /// The bytes are not a usable (Geo)TIFF.
    pub fn is_format_error(&self) -> bool {
        match self {
            Error::BadTiff(_)
            | Error::BadGeoTiff(_)
            | Error::DecompressionError(_)
            | Error::RasterizationError(_)
            | Error::NoData(..) => true,
            Error::EncodeError(EncodeError::Tiff(_)) => true,
            _ => false,
        }
    }

    pub fn is_io_error(&self) -> bool {
        matches!(
            self,
            Error::ReadError(_) | Error::EncodeError(EncodeError::WriteError(_))
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BadTiff(e) => write!(f, "not a valid TIFF: {e}"),
            Error::BadGeoTiff(e) => write!(f, "not a valid GeoTIFF: {e}"),
            Error::ReadError(e) => write!(f, "I/O error: {e}"),
            Error::DecompressionError(e) => write!(f, "{e}"),
            Error::RasterizationError(e) => write!(f, "{e}"),
            Error::ProjectionError(e) => write!(f, "{e}"),
            Error::EncodeError(e) => write!(f, "{e}"),
            Error::NoData(s, e) => write!(f, "bad GDALNoData value {s:?}: {e}"),
            Error::ReadOnly => write!(f, "file is open for reading"),
            Error::WriteOnly => write!(f, "file is open for writing"),
            Error::NotOpen => write!(f, "file is closed"),
            Error::ImageIndexOutOfRange((index, count)) => {
                write!(f, "image {index} out of range, file has {count}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<TiffError> for Error {
    fn from(e: TiffError) -> Self {
        match e {
            TiffError::ReadError(io_error) => Error::ReadError(io_error),
            tiff_error => Error::BadTiff(tiff_error),
        }
    }
}

impl From<GeoTiffError> for Error {
    fn from(e: GeoTiffError) -> Self {
        Error::BadGeoTiff(e)
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::ReadError(e)
    }
}

impl From<DecompressError> for Error {
    fn from(e: DecompressError) -> Self {
        Error::DecompressionError(e)
    }
}

impl From<RasterError> for Error {
    fn from(e: RasterError) -> Self {
        Error::RasterizationError(e)
    }
}

impl From<ProjectionError> for Error {
    fn from(e: ProjectionError) -> Self {
        Error::ProjectionError(e)
    }
}

impl From<EncodeError> for Error {
    fn from(e: EncodeError) -> Self {
        Error::EncodeError(e)
    }
}
