use crate::raster::{DecompressError, Layout, Predictor, RasterError};
use crate::tiff::TiffError;
use std::fmt;
use std::io;

pub type EncodeResult<T> = Result<T, EncodeError>;

#[derive(Debug)]
pub enum EncodeError {
    WriteError(io::Error),
    Tiff(TiffError),
    CompressionError(DecompressError),
    RasterizationError(RasterError),
    UnsupportedPredictor(Predictor),
    BadLayout(Layout),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::WriteError(e) => write!(f, "write failed: {e}"),
            EncodeError::Tiff(e) => write!(f, "{e}"),
            EncodeError::CompressionError(e) => write!(f, "{e}"),
            EncodeError::RasterizationError(e) => write!(f, "{e}"),
            EncodeError::UnsupportedPredictor(p) => write!(f, "cannot write {p:?} predictor"),
            EncodeError::BadLayout(layout) => write!(f, "bad layout {layout}"),
        }
    }
}

impl std::error::Error for EncodeError {}

impl From<io::Error> for EncodeError {
    fn from(e: io::Error) -> Self {
        EncodeError::WriteError(e)
    }
}

impl From<TiffError> for EncodeError {
    fn from(e: TiffError) -> Self {
        match e {
            TiffError::ReadError(io_error) => EncodeError::WriteError(io_error),
            tiff_error => EncodeError::Tiff(tiff_error),
        }
    }
}

impl From<RasterError> for EncodeError {
    fn from(e: RasterError) -> Self {
        EncodeError::RasterizationError(e)
    }
}

impl From<DecompressError> for EncodeError {
    fn from(e: DecompressError) -> Self {
        EncodeError::CompressionError(e)
    }
}
