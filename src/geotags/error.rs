use crate::tiff::TagId;
use std::fmt;

#[derive(Debug, PartialEq)]
pub enum GeoTiffError {
    MissingTag(TagId),
    BadTag(TagId),
    /// A key names a storage tag that is not in the directory.
    MissingStorageTag { key: u16, location: u16 },
    /// A key's offset/count runs past the end of its storage tag.
    BadKeyRange { key: u16, location: u16 },
}

impl fmt::Display for GeoTiffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeoTiffError::MissingTag(id) => write!(f, "missing GeoTIFF tag {id:?}"),
            GeoTiffError::BadTag(id) => write!(f, "malformed GeoTIFF tag {id:?}"),
            GeoTiffError::MissingStorageTag { key, location } => write!(
                f,
                "GeoKey {key} stored in absent tag {}",
                TagId::name_of(*location)
            ),
            GeoTiffError::BadKeyRange { key, location } => write!(
                f,
                "GeoKey {key} runs past the end of {}",
                TagId::name_of(*location)
            ),
        }
    }
}

impl std::error::Error for GeoTiffError {}
