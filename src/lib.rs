pub mod encode;
pub mod error;
pub mod geotags;
pub mod geotiff;
pub mod projection;
pub mod raster;
pub mod tiff;

pub use encode::{EncodeError, Encoder};
pub use error::{Error, Result};
pub use geotags::{GeoKeyId, GeoKeyValue, GeoModel, GeoTags};
pub use geotiff::{is_geotiff, GeoTiff};
pub use projection::Projection;
pub use raster::{Compression, Layout, Predictor, Raster, RasterData, SampleType, Window};
pub use tiff::{Endian, Variant};
