// https://docs.ogc.org/is/19-008r4/19-008r4.html#_requirements_class_geokeydirectorytag

use super::{get_geo_tag_values, GeoKeyId, GeoKeyValue, GeoTiffError};
use crate::tiff::{Ifd, TagData, TagId};
use num_traits::NumCast;
use std::fmt::Display;
use tracing::warn;

#[derive(Clone, Debug, PartialEq)]
pub struct GeoKeyDirectory {
    pub version: u16,
    pub revision: (u16, u16),
    pub keys: Vec<GeoKey>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GeoKey {
    pub code: u16,
    pub value: GeoKeyValue,
}

impl GeoKey {
    pub fn id(&self) -> Option<GeoKeyId> {
        GeoKeyId::try_from(self.code).ok()
    }
}

impl Default for GeoKeyDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl GeoKeyDirectory {
    pub fn new() -> Self {
        Self {
            version: 1,
            revision: (1, 0),
            keys: vec![],
        }
    }

    /// Resolves every key record against the storage tags of `ifd`.
    pub fn parse(ifd: &Ifd) -> Result<Self, GeoTiffError> {
        // Directory is a tiff tag
        let directory_values: Vec<u16> = get_geo_tag_values(ifd, TagId::GeoKeyDirectory)?;

        // Directory size validation
        if directory_values.len() < 4 {
            return Err(GeoTiffError::BadTag(TagId::GeoKeyDirectory));
        }

        // Directory header
        let version = directory_values[0];
        let revision = directory_values[1];
        let minor_revision = directory_values[2];
        let key_count = directory_values[3] as usize;

        // Directory size validation
        if directory_values.len() < 4 + key_count * 4 {
            return Err(GeoTiffError::BadTag(TagId::GeoKeyDirectory));
        }

        // Parse keys
        let keys = directory_values[4..4 + key_count * 4]
            .chunks_exact(4)
            .map(|entry| {
                let (code, location, count, offset) = (entry[0], entry[1], entry[2], entry[3]);
                let value = if location == 0 {
                    GeoKeyValue::Short(vec![offset])
                } else {
                    resolve(ifd, &directory_values, code, location, count, offset)?
                };
                Ok(GeoKey { code, value })
            })
            .collect::<Result<Vec<GeoKey>, GeoTiffError>>()?;

        Ok(Self {
            version,
            revision: (revision, minor_revision),
            keys,
        })
    }

    pub fn get<I: Into<u16>>(&self, id: I) -> Option<&GeoKeyValue> {
        let code = id.into();
        self.keys
            .iter()
            .find(|key| key.code == code)
            .map(|key| &key.value)
    }

    pub fn get_number<T: NumCast, I: Into<u16>>(&self, id: I) -> Option<T> {
        self.get(id)?.as_number()
    }

    pub fn get_string<I: Into<u16>>(&self, id: I) -> Option<&str> {
        self.get(id)?.as_string()
    }

    pub fn set<I: Into<u16>>(&mut self, id: I, value: GeoKeyValue) {
        let code: u16 = id.into();
        let key = GeoKey { code, value };
        match self.keys.iter_mut().find(|k| k.code == code) {
            Some(existing) => *existing = key,
            None => self.keys.push(key),
        }
    }

    pub fn add_to_ifd(&self, ifd: &mut Ifd) {
        let (key_directory, mut ascii_params, double_params) = self.unparse();
        ifd.set_tag(TagId::GeoKeyDirectory, TagData::Short(key_directory));
        if !ascii_params.is_empty() {
            ascii_params.push(0);
            ifd.set_tag(TagId::GeoAsciiParams, TagData::Ascii(ascii_params));
        }
        if !double_params.is_empty() {
            ifd.set_tag(TagId::GeoDoubleParams, TagData::Double(double_params));
        }
    }

    /// Packs the keys into (GeoKeyDirectory shorts, GeoAsciiParams bytes,
    /// GeoDoubleParams). Keys are written in ascending code order.
    pub fn unparse(&self) -> (Vec<u16>, Vec<u8>, Vec<f64>) {
        let mut directory = vec![];
        let mut shorts = vec![];
        let mut asciis = vec![];
        let mut doubles = vec![];
        let dir_size = 4 * (self.keys.len() + 1) as u16;

        let mut keys: Vec<&GeoKey> = self.keys.iter().collect();
        keys.sort_by_key(|key| key.code);

        // Directory header
        directory.push(self.version);
        directory.push(self.revision.0);
        directory.push(self.revision.1);
        directory.push(keys.len() as u16);

        // Keys
        for key in keys {
            directory.push(key.code);

            match &key.value {
                GeoKeyValue::Short(vec) => match vec.len() {
                    0 => directory.extend([0, 0, 0]),
                    1 => directory.extend([0, 1, vec[0]]),
                    n => {
                        directory.push(TagId::GeoKeyDirectory.code());
                        directory.push(n as u16);
                        directory.push(dir_size + shorts.len() as u16);
                        shorts.extend(vec);
                    }
                },
                GeoKeyValue::Ascii(s) => {
                    directory.push(TagId::GeoAsciiParams.code());
                    directory.push(s.len() as u16 + 1);
                    directory.push(asciis.len() as u16);
                    asciis.extend(s.bytes());
                    asciis.push(b'|');
                }
                GeoKeyValue::Double(vec) => {
                    directory.push(TagId::GeoDoubleParams.code());
                    directory.push(vec.len() as u16);
                    directory.push(doubles.len() as u16);
                    doubles.extend(vec);
                }
                GeoKeyValue::Undefined => directory.extend([0, 0, 0]),
            }
        }

        ([directory, shorts].concat(), asciis, doubles)
    }
}

fn resolve(
    ifd: &Ifd,
    directory_values: &[u16],
    code: u16,
    location: u16,
    count: u16,
    offset: u16,
) -> Result<GeoKeyValue, GeoTiffError> {
    let tag = ifd
        .get_tag_by_code(location)
        .ok_or(GeoTiffError::MissingStorageTag { key: code, location })?;
    let bad_range = GeoTiffError::BadKeyRange { key: code, location };
    let range = offset as usize..offset as usize + count as usize;

    match TagId::try_from(location) {
        Ok(TagId::GeoDoubleParams) => {
            let doubles = tag
                .doubles()
                .ok_or(GeoTiffError::BadTag(TagId::GeoDoubleParams))?;
            let values = doubles.get(range).ok_or(bad_range)?;
            Ok(GeoKeyValue::Double(values.to_vec()))
        }
        Ok(TagId::GeoKeyDirectory) => {
            let values = directory_values.get(range).ok_or(bad_range)?;
            Ok(GeoKeyValue::Short(values.to_vec()))
        }
        Ok(TagId::GeoAsciiParams) => {
            let TagData::Ascii(bytes) = &tag.data else {
                return Err(GeoTiffError::BadTag(TagId::GeoAsciiParams));
            };
            let chars = bytes.get(range).ok_or(bad_range)?;
            Ok(GeoKeyValue::Ascii(
                String::from_utf8_lossy(chars)
                    .trim_end_matches(|c| c == '|' || c == '\0')
                    .to_string(),
            ))
        }
        _ => {
            warn!(
                "GeoKey {code} stored in unsupported tag {}",
                TagId::name_of(location)
            );
            Ok(GeoKeyValue::Undefined)
        }
    }
}

impl Display for GeoKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let id_string = match self.id() {
            Some(id) => format!("{id:?}"),
            None => format!("0x{:04X}", self.code),
        };
        write!(f, "{}: {}", id_string, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory_ifd() -> Ifd {
        let mut ifd = Ifd::new();
        ifd.set_tag(
            TagId::GeoKeyDirectory,
            TagData::Short(vec![
                1, 1, 0, 3, //
                1024, 0, 1, 1, //
                2057, 34736, 1, 1, //
                3073, 34737, 12, 6, //
            ]),
        );
        ifd.set_tag(
            TagId::GeoDoubleParams,
            TagData::Double(vec![298.257, 6378137.0]),
        );
        ifd.set_tag(
            TagId::GeoAsciiParams,
            TagData::from_string("WGS84|UTM zone 18N|"),
        );
        ifd
    }

    #[test]
    fn resolves_inline_double_and_ascii_keys() {
        let directory = GeoKeyDirectory::parse(&directory_ifd()).unwrap();
        assert_eq!(directory.version, 1);
        assert_eq!(directory.revision, (1, 0));
        assert_eq!(directory.keys.len(), 3);
        assert_eq!(
            directory.get(GeoKeyId::GTModelTypeGeoKey),
            Some(&GeoKeyValue::Short(vec![1]))
        );
        assert_eq!(
            directory.get_number::<f64, _>(GeoKeyId::GeogSemiMajorAxisGeoKey),
            Some(6378137.0)
        );
        assert_eq!(
            directory.get_string(GeoKeyId::PCSCitationGeoKey),
            Some("UTM zone 18N")
        );
    }

    #[test]
    fn missing_storage_tag_is_fatal() {
        let mut ifd = directory_ifd();
        ifd.remove_tag(TagId::GeoDoubleParams);
        assert_eq!(
            GeoKeyDirectory::parse(&ifd),
            Err(GeoTiffError::MissingStorageTag {
                key: 2057,
                location: 34736
            })
        );
    }

    #[test]
    fn out_of_range_key_is_fatal() {
        let mut ifd = directory_ifd();
        ifd.set_tag(TagId::GeoDoubleParams, TagData::Double(vec![1.0]));
        assert_eq!(
            GeoKeyDirectory::parse(&ifd),
            Err(GeoTiffError::BadKeyRange {
                key: 2057,
                location: 34736
            })
        );
    }

    #[test]
    fn unparse_then_parse() {
        let mut directory = GeoKeyDirectory::new();
        directory.set(GeoKeyId::ProjectedCSTypeGeoKey, GeoKeyValue::Short(vec![32618]));
        directory.set(GeoKeyId::GTModelTypeGeoKey, GeoKeyValue::Short(vec![1]));
        directory.set(GeoKeyId::GTCitationGeoKey, GeoKeyValue::Ascii("test".into()));
        directory.set(GeoKeyId::ProjFalseEastingGeoKey, GeoKeyValue::Double(vec![500000.0]));
        directory.set(GeoKeyId::VerticalUnitsGeoKey, GeoKeyValue::Short(vec![9001, 9002]));

        let mut ifd = Ifd::new();
        directory.add_to_ifd(&mut ifd);
        let parsed = GeoKeyDirectory::parse(&ifd).unwrap();

        let mut expected = directory.keys.clone();
        expected.sort_by_key(|k| k.code);
        assert_eq!(parsed.keys, expected);
        assert_eq!(
            ifd.get_tag(TagId::GeoAsciiParams).unwrap().string().as_deref(),
            Some("test|")
        );
    }
}
