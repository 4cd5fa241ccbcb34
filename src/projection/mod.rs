use crate::geotags::{GeoKeyDirectory, GeoKeyId, GeoTags, USER_DEFINED};
use proj4rs::errors::Error as Proj4Error;
use proj4rs::proj::Proj;
use std::fmt::Display;
use tracing::{debug, warn};

#[derive(Debug)]
pub enum ProjectionError {
    Proj4Error(Proj4Error),
}

impl From<Proj4Error> for ProjectionError {
    fn from(e: Proj4Error) -> Self {
        ProjectionError::Proj4Error(e)
    }
}

impl Display for ProjectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectionError::Proj4Error(e) => write!(f, "projection error: {e:?}"),
        }
    }
}

impl std::error::Error for ProjectionError {}

/// Coordinate reference derived from the GeoKeys of a projected image.
#[derive(Clone, Debug, PartialEq)]
pub enum Projection {
    Epsg(u16),
    /// Compact PROJ parameter string, e.g. `+proj=tmerc+lat_0=0.0+...`.
    Proj4(String),
}

// ProjCoordTransGeoKey codes
const CT_TRANSVERSE_MERCATOR: u16 = 1;
const CT_LAMBERT_CONF_CONIC_2SP: u16 = 8;
const CT_ALBERS_EQUAL_AREA: u16 = 11;

// GTModelTypeGeoKey
const MODEL_TYPE_PROJECTED: u16 = 1;

impl Projection {
    /// Geographic WGS84, the fallback when nothing can be derived.
    pub fn wgs84() -> Self {
        Projection::Epsg(4326)
    }

    pub fn from_geo_tags(geo: &GeoTags) -> Option<Self> {
        Self::from_geo_keys(&geo.directory)
    }

    /// Only projected models are considered. A registered ProjectedCSType
    /// wins; otherwise the parameters of a supported transform are spelled
    /// out. Absent parameters are 0 (scale factor 1).
    pub fn from_geo_keys(directory: &GeoKeyDirectory) -> Option<Self> {
        let model_type: u16 = directory.get_number(GeoKeyId::GTModelTypeGeoKey)?;
        if model_type != MODEL_TYPE_PROJECTED {
            debug!("GTModelType {model_type} is not projected");
            return None;
        }

        if let Some(code) = directory.get_number::<u16, _>(GeoKeyId::ProjectedCSTypeGeoKey) {
            if code != USER_DEFINED {
                return Some(Projection::Epsg(code));
            }
        }

        let param = |id: GeoKeyId| directory.get_number::<f64, _>(id);
        let either = |a: GeoKeyId, b: GeoKeyId| param(a).or_else(|| param(b)).unwrap_or(0.0);
        let transform: u16 = directory.get_number(GeoKeyId::ProjCoordTransGeoKey)?;

        let proj = match transform {
            CT_TRANSVERSE_MERCATOR => format!(
                "+proj=tmerc+lat_0={:?}+lon_0={:?}+k_0={:?}+x_0={:?}+y_0={:?}",
                param(GeoKeyId::ProjNatOriginLatGeoKey).unwrap_or(0.0),
                param(GeoKeyId::ProjNatOriginLongGeoKey).unwrap_or(0.0),
                param(GeoKeyId::ProjScaleAtNatOriginGeoKey).unwrap_or(1.0),
                param(GeoKeyId::ProjFalseEastingGeoKey).unwrap_or(0.0),
                param(GeoKeyId::ProjFalseNorthingGeoKey).unwrap_or(0.0),
            ),
            CT_LAMBERT_CONF_CONIC_2SP | CT_ALBERS_EQUAL_AREA => format!(
                "+proj={}+lat_1={:?}+lat_2={:?}+lon_0={:?}+lat_0={:?}+x_0={:?}+y_0={:?}",
                if transform == CT_ALBERS_EQUAL_AREA {
                    "aea"
                } else {
                    "lcc"
                },
                param(GeoKeyId::ProjStdParallel1GeoKey).unwrap_or(0.0),
                param(GeoKeyId::ProjStdParallel2GeoKey).unwrap_or(0.0),
                either(
                    GeoKeyId::ProjFalseOriginLongGeoKey,
                    GeoKeyId::ProjNatOriginLongGeoKey
                ),
                either(
                    GeoKeyId::ProjFalseOriginLatGeoKey,
                    GeoKeyId::ProjNatOriginLatGeoKey
                ),
                either(
                    GeoKeyId::ProjFalseOriginEastingGeoKey,
                    GeoKeyId::ProjFalseEastingGeoKey
                ),
                either(
                    GeoKeyId::ProjFalseOriginNorthingGeoKey,
                    GeoKeyId::ProjFalseNorthingGeoKey
                ),
            ),
            code => {
                warn!("Unsupported ProjCoordTrans {code}, no projection derived");
                return None;
            }
        };
        Some(Projection::Proj4(proj))
    }

    pub fn to_proj(&self) -> Result<Proj, ProjectionError> {
        match self {
            Projection::Epsg(code) => Ok(Proj::from_epsg_code(*code)?),
            Projection::Proj4(s) => {
                // proj4rs wants whitespace between parameters
                let spaced = s.replace('+', " +");
                Ok(Proj::from_proj_string(spaced.trim())?)
            }
        }
    }
}

impl Display for Projection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Projection::Epsg(code) => write!(f, "EPSG:{code}"),
            Projection::Proj4(s) => write!(f, "{s}"),
        }
    }
}
