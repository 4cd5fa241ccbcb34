use super::TagType;
use crate::tiff::Endian;
use num_traits::NumCast;
use std::fmt::Display;

/// Decoded value of a directory entry. The variant is fixed by the field type
/// so exactly one representation is ever populated.
#[derive(Clone, Debug, PartialEq)]
pub enum TagData {
    Byte(Vec<u8>),
    Ascii(Vec<u8>),
    Short(Vec<u16>),
    Long(Vec<u32>),
    Rational(Vec<(u32, u32)>),
    SByte(Vec<i8>),
    Undefined(Vec<u8>),
    SShort(Vec<i16>),
    SLong(Vec<i32>),
    SRational(Vec<(i32, i32)>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    Ifd(Vec<u32>),
    Long8(Vec<u64>),
    SLong8(Vec<i64>),
    Ifd8(Vec<u64>),
}

impl TagData {
    /// NUL terminated as TIFF requires.
    pub fn from_string(s: &str) -> Self {
        let mut bytes = s.as_bytes().to_vec();
        bytes.push(0);
        Self::Ascii(bytes)
    }

    pub fn from_short(v: u16) -> Self {
        Self::Short(vec![v])
    }

    pub fn from_long(v: u32) -> Self {
        Self::Long(vec![v])
    }

    pub fn from_double(v: f64) -> Self {
        Self::Double(vec![v])
    }

    /// Decodes `bytes` (exactly `count * size_in_bytes` long) as `datatype`.
    pub fn parse(datatype: TagType, bytes: &[u8], endian: Endian) -> Option<Self> {
        Some(match datatype {
            TagType::Byte => Self::Byte(bytes.to_vec()),
            TagType::Ascii => Self::Ascii(bytes.to_vec()),
            TagType::Short => Self::Short(endian.decode_all::<2, u16>(bytes)?),
            TagType::Long => Self::Long(endian.decode_all::<4, u32>(bytes)?),
            TagType::Rational => Self::Rational(pairs(endian.decode_all::<4, u32>(bytes)?)),
            TagType::SByte => Self::SByte(bytes.iter().map(|b| *b as i8).collect()),
            TagType::Undefined => Self::Undefined(bytes.to_vec()),
            TagType::SShort => Self::SShort(endian.decode_all::<2, i16>(bytes)?),
            TagType::SLong => Self::SLong(endian.decode_all::<4, i32>(bytes)?),
            TagType::SRational => Self::SRational(pairs(endian.decode_all::<4, i32>(bytes)?)),
            TagType::Float => Self::Float(endian.decode_all::<4, f32>(bytes)?),
            TagType::Double => Self::Double(endian.decode_all::<8, f64>(bytes)?),
            TagType::Ifd => Self::Ifd(endian.decode_all::<4, u32>(bytes)?),
            TagType::Long8 => Self::Long8(endian.decode_all::<8, u64>(bytes)?),
            TagType::SLong8 => Self::SLong8(endian.decode_all::<8, i64>(bytes)?),
            TagType::Ifd8 => Self::Ifd8(endian.decode_all::<8, u64>(bytes)?),
        })
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Byte(vec) => vec.len(),
            Self::Ascii(vec) => vec.len(),
            Self::Short(vec) => vec.len(),
            Self::Long(vec) => vec.len(),
            Self::Rational(vec) => vec.len(),
            Self::SByte(vec) => vec.len(),
            Self::Undefined(vec) => vec.len(),
            Self::SShort(vec) => vec.len(),
            Self::SLong(vec) => vec.len(),
            Self::SRational(vec) => vec.len(),
            Self::Float(vec) => vec.len(),
            Self::Double(vec) => vec.len(),
            Self::Ifd(vec) => vec.len(),
            Self::Long8(vec) => vec.len(),
            Self::SLong8(vec) => vec.len(),
            Self::Ifd8(vec) => vec.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn tag_type(&self) -> TagType {
        match self {
            Self::Byte(_) => TagType::Byte,
            Self::Ascii(_) => TagType::Ascii,
            Self::Short(_) => TagType::Short,
            Self::Long(_) => TagType::Long,
            Self::Rational(_) => TagType::Rational,
            Self::SByte(_) => TagType::SByte,
            Self::Undefined(_) => TagType::Undefined,
            Self::SShort(_) => TagType::SShort,
            Self::SLong(_) => TagType::SLong,
            Self::SRational(_) => TagType::SRational,
            Self::Float(_) => TagType::Float,
            Self::Double(_) => TagType::Double,
            Self::Ifd(_) => TagType::Ifd,
            Self::Long8(_) => TagType::Long8,
            Self::SLong8(_) => TagType::SLong8,
            Self::Ifd8(_) => TagType::Ifd8,
        }
    }

    pub fn bytes(&self, endian: Endian) -> Vec<u8> {
        match self {
            Self::Byte(vec) => vec.clone(),
            Self::Ascii(vec) => vec.clone(),
            Self::Short(vec) => endian.encode_all(vec),
            Self::Long(vec) => endian.encode_all(vec),
            Self::Rational(vec) => vec
                .iter()
                .flat_map(|(a, b)| endian.encode(*a).into_iter().chain(endian.encode(*b)))
                .collect(),
            Self::SByte(vec) => vec.iter().map(|v| *v as u8).collect(),
            Self::Undefined(vec) => vec.clone(),
            Self::SShort(vec) => endian.encode_all(vec),
            Self::SLong(vec) => endian.encode_all(vec),
            Self::SRational(vec) => vec
                .iter()
                .flat_map(|(a, b)| endian.encode(*a).into_iter().chain(endian.encode(*b)))
                .collect(),
            Self::Float(vec) => endian.encode_all(vec),
            Self::Double(vec) => endian.encode_all(vec),
            Self::Ifd(vec) => endian.encode_all(vec),
            Self::Long8(vec) => endian.encode_all(vec),
            Self::SLong8(vec) => endian.encode_all(vec),
            Self::Ifd8(vec) => endian.encode_all(vec),
        }
    }

    /// Integer view. Rationals come back as flat numerator/denominator pairs.
    pub fn ints(&self) -> Option<Vec<i64>> {
        match self {
            Self::Byte(vec) | Self::Undefined(vec) => cast_all(vec),
            Self::Short(vec) => cast_all(vec),
            Self::Long(vec) | Self::Ifd(vec) => cast_all(vec),
            Self::SByte(vec) => cast_all(vec),
            Self::SShort(vec) => cast_all(vec),
            Self::SLong(vec) => cast_all(vec),
            Self::Long8(vec) | Self::Ifd8(vec) => cast_all(vec),
            Self::SLong8(vec) => Some(vec.clone()),
            Self::Rational(vec) => Some(
                vec.iter()
                    .flat_map(|(n, d)| [*n as i64, *d as i64])
                    .collect(),
            ),
            Self::SRational(vec) => Some(
                vec.iter()
                    .flat_map(|(n, d)| [*n as i64, *d as i64])
                    .collect(),
            ),
            Self::Ascii(_) | Self::Float(_) | Self::Double(_) => None,
        }
    }

    /// Floating point view: FLOAT widened, DOUBLE, and rationals as quotients.
    pub fn doubles(&self) -> Option<Vec<f64>> {
        match self {
            Self::Float(vec) => Some(vec.iter().map(|v| *v as f64).collect()),
            Self::Double(vec) => Some(vec.clone()),
            Self::Rational(vec) => Some(vec.iter().map(|(n, d)| *n as f64 / *d as f64).collect()),
            Self::SRational(vec) => {
                Some(vec.iter().map(|(n, d)| *n as f64 / *d as f64).collect())
            }
            _ => None,
        }
    }

    pub fn string(&self) -> Option<String> {
        match self {
            Self::Ascii(vec) => Some(
                String::from_utf8_lossy(vec)
                    .trim_end_matches('\0')
                    .to_string(),
            ),
            _ => None,
        }
    }

    /// Any numeric type coerced to `T`; `None` if a value does not fit.
    pub fn values<T: NumCast>(&self) -> Option<Vec<T>> {
        match self {
            Self::Byte(vec) | Self::Undefined(vec) => cast_all(vec),
            Self::Short(vec) => cast_all(vec),
            Self::Long(vec) | Self::Ifd(vec) => cast_all(vec),
            Self::SByte(vec) => cast_all(vec),
            Self::SShort(vec) => cast_all(vec),
            Self::SLong(vec) => cast_all(vec),
            Self::Float(vec) => cast_all(vec),
            Self::Double(vec) => cast_all(vec),
            Self::Long8(vec) | Self::Ifd8(vec) => cast_all(vec),
            Self::SLong8(vec) => cast_all(vec),
            Self::Rational(_) | Self::SRational(_) => cast_all(&self.doubles()?),
            Self::Ascii(_) => None,
        }
    }
}

fn pairs<T: Copy>(flat: Vec<T>) -> Vec<(T, T)> {
    flat.chunks_exact(2).map(|c| (c[0], c[1])).collect()
}

fn cast_all<S: NumCast + Copy, T: NumCast>(values: &[S]) -> Option<Vec<T>> {
    values.iter().map(|v| T::from(*v)).collect()
}

impl Display for TagData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(s) = self.string() {
            return write!(f, "{}", s.replace('\n', "\\n"));
        }
        if let Some(v) = self.doubles() {
            return match v.as_slice() {
                [x] => write!(f, "{x}"),
                _ => write!(f, "{v:?}"),
            };
        }
        match self.ints() {
            Some(v) if v.len() == 1 => write!(f, "{}", v[0]),
            Some(v) => write!(f, "{v:?}"),
            None => write!(f, "Undefined"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rational_as_pairs() {
        let endian = Endian::Big;
        let bytes = endian.encode_all(&[72_u32, 1, 300, 2]);
        let data = TagData::parse(TagType::Rational, &bytes, endian).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.ints(), Some(vec![72, 1, 300, 2]));
        assert_eq!(data.doubles(), Some(vec![72.0, 150.0]));
        assert_eq!(data.bytes(endian), bytes);
    }

    #[test]
    fn ascii_strips_nul() {
        let data = TagData::from_string("-9999");
        assert_eq!(data.len(), 6);
        assert_eq!(data.string().as_deref(), Some("-9999"));
        assert_eq!(data.ints(), None);
    }

    #[test]
    fn signed_types_sign_extend() {
        let data = TagData::parse(TagType::SByte, &[0xFF, 0x01], Endian::Little).unwrap();
        assert_eq!(data.ints(), Some(vec![-1, 1]));
        let data = TagData::parse(TagType::Byte, &[0xFF, 0x01], Endian::Little).unwrap();
        assert_eq!(data.ints(), Some(vec![255, 1]));
    }

    #[test]
    fn float_widens_to_double() {
        let data = TagData::Float(vec![0.5, -2.25]);
        assert_eq!(data.doubles(), Some(vec![0.5, -2.25]));
        assert_eq!(data.values::<i32>(), Some(vec![0, -2]));
    }

    #[test]
    fn offsets_accept_every_unsigned_width() {
        assert_eq!(TagData::Short(vec![8, 16]).values::<u64>(), Some(vec![8, 16]));
        assert_eq!(
            TagData::Long8(vec![1 << 40]).values::<u64>(),
            Some(vec![1 << 40])
        );
        assert_eq!(TagData::SLong(vec![-1]).values::<u64>(), None);
    }
}
