// refs
// https://www.itu.int/itudoc/itu-t/com16/tiff-fx/docs/tiff6.pdf
// https://www.awaresystems.be/imaging/tiff/bigtiff.html

use num_enum::{IntoPrimitive, TryFromPrimitive};
use num_traits::NumCast;
use std::fmt::Display;

mod data;
mod id;

pub use data::TagData;
pub use id::TagId;

/// One directory entry. The field type and count are carried by `data`.
#[derive(Clone, Debug, PartialEq)]
pub struct Tag {
    pub code: u16,
    pub data: TagData,
}

impl Tag {
    pub fn new<I: Into<u16>>(id: I, data: TagData) -> Self {
        Self {
            code: id.into(),
            data,
        }
    }

    pub fn id(&self) -> Option<TagId> {
        TagId::try_from(self.code).ok()
    }

    pub fn name(&self) -> String {
        TagId::name_of(self.code)
    }

    pub fn datatype(&self) -> TagType {
        self.data.tag_type()
    }

    pub fn count(&self) -> usize {
        self.data.len()
    }

    /// Encoded length of the value in bytes.
    pub fn byte_len(&self) -> usize {
        self.count() * self.datatype().size_in_bytes()
    }

    pub fn ints(&self) -> Option<Vec<i64>> {
        self.data.ints()
    }

    pub fn doubles(&self) -> Option<Vec<f64>> {
        self.data.doubles()
    }

    pub fn string(&self) -> Option<String> {
        self.data.string()
    }

    /// Offsets and byte counts, whatever unsigned width they were stored as.
    pub fn offsets(&self) -> Option<Vec<u64>> {
        match self.data {
            TagData::Short(_)
            | TagData::Long(_)
            | TagData::Long8(_)
            | TagData::Ifd(_)
            | TagData::Ifd8(_) => self.data.values(),
            _ => None,
        }
    }

    pub fn values<T: NumCast>(&self) -> Option<Vec<T>> {
        self.data.values()
    }

    pub fn value<T: NumCast + Copy>(&self) -> Option<T> {
        self.values()?.first().copied()
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut value_string = format!("{}", self.data);
        if value_string.len() > 100 {
            let cut = (0..=98)
                .rev()
                .find(|i| value_string.is_char_boundary(*i))
                .unwrap_or(0);
            value_string = format!("{}...", &value_string[..cut])
        }
        write!(
            f,
            "{} {:?}[{}]: {}",
            self.name(),
            self.datatype(),
            self.count(),
            value_string
        )
    }
}

/// Field types. Codes outside this set are rejected at parse time.
#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum TagType {
    Byte = 1,
    Ascii = 2,
    Short = 3,
    Long = 4,
    Rational = 5,
    SByte = 6,
    Undefined = 7,
    SShort = 8,
    SLong = 9,
    SRational = 10,
    Float = 11,
    Double = 12,
    Ifd = 13,
    Long8 = 16,
    SLong8 = 17,
    Ifd8 = 18,
}

impl TagType {
    pub const fn size_in_bytes(&self) -> usize {
        match self {
            TagType::Byte => 1,
            TagType::Ascii => 1,
            TagType::Short => 2,
            TagType::Long => 4,
            TagType::Rational => 8,
            TagType::SByte => 1,
            TagType::Undefined => 1,
            TagType::SShort => 2,
            TagType::SLong => 4,
            TagType::SRational => 8,
            TagType::Float => 4,
            TagType::Double => 8,
            TagType::Ifd => 4,
            TagType::Long8 => 8,
            TagType::SLong8 => 8,
            TagType::Ifd8 => 8,
        }
    }

    pub const fn is_bigtiff_only(&self) -> bool {
        matches!(self, TagType::Long8 | TagType::SLong8 | TagType::Ifd8)
    }
}
