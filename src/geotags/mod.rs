// https://docs.ogc.org/is/19-008r4/19-008r4.html#_geotiff_tags_for_coordinate_transformations

use crate::tiff::{Ifd, TagData, TagId};
use num_traits::NumCast;
use std::fmt::Display;

mod error;
mod id;
mod keys;
mod value;

pub use error::GeoTiffError;
pub use id::{GeoKeyId, USER_DEFINED};
pub use keys::{GeoKey, GeoKeyDirectory};
pub use value::GeoKeyValue;

#[derive(Clone, Debug, PartialEq)]
pub struct GeoTags {
    pub directory: GeoKeyDirectory,
    pub model: GeoModel,
}

/// Raster to model space mapping.
#[derive(Clone, Debug, PartialEq)]
pub enum GeoModel {
    /// ModelTransformation, a row-major 4x4 affine.
    Transformed {
        transformation: [f64; 16],
        tiepoint: Option<[f64; 6]>,
    },
    /// ModelTiepoint (I, J, K, X, Y, Z) plus ModelPixelScale (Sx, Sy, Sz).
    Scaled {
        tiepoint: [f64; 6],
        pixel_scale: [f64; 3],
    },
}

impl Display for GeoTags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "GeoTIFF Tags:")?;
        match &self.model {
            GeoModel::Transformed {
                transformation,
                tiepoint,
            } => {
                writeln!(f, "  Tiepoint: {:?}", tiepoint)?;
                writeln!(f, "  Transformation: {:?}", transformation)?;
            }
            GeoModel::Scaled {
                tiepoint,
                pixel_scale,
            } => {
                writeln!(f, "  Tiepoint: {:?}", tiepoint)?;
                writeln!(f, "  Pixel Scale: {:?}", pixel_scale)?;
            }
        }
        write!(
            f,
            "  Directory: {{version: {}, revision: {}.{}}}",
            self.directory.version, self.directory.revision.0, self.directory.revision.1,
        )?;
        if !self.directory.keys.is_empty() {
            write!(f, "\n  Keys:")?;
            for key in self.directory.keys.iter() {
                write!(f, "\n    {key}")?;
            }
        }
        Ok(())
    }
}

impl GeoTags {
    pub fn from_tiepoint_and_scale(tiepoint: [f64; 6], pixel_scale: [f64; 3]) -> Self {
        Self {
            model: GeoModel::Scaled {
                tiepoint,
                pixel_scale,
            },
            directory: GeoKeyDirectory::new(),
        }
    }

    pub fn from_transformation(transformation: [f64; 16]) -> Self {
        Self {
            model: GeoModel::Transformed {
                transformation,
                tiepoint: None,
            },
            directory: GeoKeyDirectory::new(),
        }
    }

    /// Model tags are required. A missing GeoKeyDirectory yields an empty one;
    /// a directory that is present but inconsistent is an error.
    pub fn parse(ifd: &Ifd) -> Result<Self, GeoTiffError> {
        let tiepoint: Option<[f64; 6]> = get_tag_as_array(ifd, TagId::ModelTiepoint).ok();
        let pixel_scale: Option<[f64; 3]> = get_tag_as_array(ifd, TagId::ModelPixelScale).ok();
        let transformation: Option<[f64; 16]> =
            get_tag_as_array(ifd, TagId::ModelTransformation).ok();
        let model = match (tiepoint, pixel_scale, transformation) {
            (tiepoint, _, Some(transformation)) => GeoModel::Transformed {
                transformation,
                tiepoint,
            },
            (Some(tiepoint), Some(pixel_scale), None) => GeoModel::Scaled {
                tiepoint,
                pixel_scale,
            },
            (Some(_), None, None) => return Err(GeoTiffError::MissingTag(TagId::ModelPixelScale)),
            _ => return Err(GeoTiffError::MissingTag(TagId::ModelTiepoint)),
        };

        let directory = match GeoKeyDirectory::parse(ifd) {
            Err(GeoTiffError::MissingTag(TagId::GeoKeyDirectory)) => GeoKeyDirectory::new(),
            result => result?,
        };

        Ok(Self { model, directory })
    }

    pub fn add_to_ifd(&self, ifd: &mut Ifd) {
        match &self.model {
            GeoModel::Transformed {
                transformation,
                tiepoint,
            } => {
                ifd.set_tag(
                    TagId::ModelTransformation,
                    TagData::Double(transformation.to_vec()),
                );
                if let Some(tiepoint) = tiepoint {
                    ifd.set_tag(TagId::ModelTiepoint, TagData::Double(tiepoint.to_vec()));
                }
            }
            GeoModel::Scaled {
                tiepoint,
                pixel_scale,
            } => {
                ifd.set_tag(TagId::ModelTiepoint, TagData::Double(tiepoint.to_vec()));
                ifd.set_tag(
                    TagId::ModelPixelScale,
                    TagData::Double(pixel_scale.to_vec()),
                );
            }
        }
        if !self.directory.keys.is_empty() {
            self.directory.add_to_ifd(ifd);
        }
    }

    pub fn set_key<I: Into<u16>>(&mut self, id: I, value: GeoKeyValue) {
        self.directory.set(id, value);
    }
}

/// True if `ifd` carries either georeferencing model tag.
pub fn has_model_tags(ifd: &Ifd) -> bool {
    ifd.get_tag(TagId::ModelTransformation).is_ok() || ifd.get_tag(TagId::ModelTiepoint).is_ok()
}

// Methods for accessing tiff tags with geotiff errors
fn get_geo_tag_values<T: NumCast>(ifd: &Ifd, id: TagId) -> Result<Vec<T>, GeoTiffError> {
    ifd.get_tag(id)
        .map_err(|_| GeoTiffError::MissingTag(id))?
        .values()
        .ok_or(GeoTiffError::BadTag(id))
}

/// First `N` values of a tag; a ModelTiepoint may carry several tiepoints.
fn get_tag_as_array<const N: usize, T: NumCast + Copy>(
    ifd: &Ifd,
    id: TagId,
) -> Result<[T; N], GeoTiffError> {
    let values = get_geo_tag_values::<T>(ifd, id)?;
    values
        .get(..N)
        .and_then(|v| v.try_into().ok())
        .ok_or(GeoTiffError::BadTag(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaled_model_with_directory() {
        let mut tags = GeoTags::from_tiepoint_and_scale(
            [0.0, 0.0, 0.0, 440720.0, 3751320.0, 0.0],
            [60.0, 60.0, 0.0],
        );
        tags.set_key(GeoKeyId::GTModelTypeGeoKey, GeoKeyValue::Short(vec![1]));
        let mut ifd = Ifd::new();
        tags.add_to_ifd(&mut ifd);
        assert!(has_model_tags(&ifd));
        assert_eq!(GeoTags::parse(&ifd).unwrap(), tags);
    }

    #[test]
    fn transformation_wins_over_tiepoint() {
        let mut ifd = Ifd::new();
        let mut transformation = [0.0; 16];
        transformation[0] = 2.0;
        ifd.set_tag(TagId::ModelTransformation, TagData::Double(transformation.to_vec()));
        ifd.set_tag(TagId::ModelTiepoint, TagData::Double(vec![0.0; 6]));
        ifd.set_tag(TagId::ModelPixelScale, TagData::Double(vec![1.0, 1.0, 0.0]));
        let tags = GeoTags::parse(&ifd).unwrap();
        assert!(matches!(tags.model, GeoModel::Transformed { tiepoint: Some(_), .. }));
        assert!(tags.directory.keys.is_empty());
    }

    #[test]
    fn no_model_tags() {
        let ifd = Ifd::new();
        assert!(!has_model_tags(&ifd));
        assert_eq!(
            GeoTags::parse(&ifd),
            Err(GeoTiffError::MissingTag(TagId::ModelTiepoint))
        );
    }
}
