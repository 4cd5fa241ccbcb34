use super::{read_bytes, Endian, Tag, TagData, TagId, TagType, TiffError, Variant};
use num_traits::NumCast;
use std::io::{self, Read, Seek, SeekFrom};
use tracing::{trace, warn};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ifd(pub Vec<Tag>);

impl Ifd {
    pub fn new() -> Self {
        Self(vec![])
    }

    pub fn parse<R: Read + Seek>(
        stream: &mut R,
        offset: u64,
        endian: Endian,
        variant: Variant,
    ) -> Result<(Ifd, u64), TiffError> {
        // IFD starts at offset
        stream.seek(SeekFrom::Start(offset))?;

        // IFD header is just the number of tags
        let tag_count = variant.read_count(endian, stream)?;
        let offset_size = variant.offset_bytesize();

        // Parse each tag in the IFD
        let mut tags = Vec::with_capacity(tag_count.min(4096) as usize);
        for _ in 0..tag_count {
            let code: u16 = endian.read(stream)?;
            let type_code: u16 = endian.read(stream)?;
            let count = variant.read_offset(endian, stream)?;
            let mut field = vec![0; offset_size];
            stream.read_exact(&mut field)?;

            let Ok(datatype) = TagType::try_from(type_code) else {
                warn!(
                    "Skipping tag {} with unknown field type {type_code}",
                    TagId::name_of(code)
                );
                continue;
            };

            let data_size = count
                .checked_mul(datatype.size_in_bytes() as u64)
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| invalid(format!("tag {code} count {count} too large")))?;

            let bytes = if data_size <= offset_size {
                field.truncate(data_size);
                field
            } else {
                let data_offset = variant
                    .decode_offset(endian, &field)
                    .ok_or_else(|| invalid(format!("tag {code} has a bad value offset")))?;
                let pos = stream.stream_position()?;
                stream.seek(SeekFrom::Start(data_offset))?;
                let data = read_bytes(stream, data_size as u64)?;
                stream.seek(SeekFrom::Start(pos))?;
                data
            };

            match TagData::parse(datatype, &bytes, endian) {
                Some(data) => {
                    let tag = Tag { code, data };
                    trace!("{tag}");
                    tags.push(tag);
                }
                None => warn!("Skipping undecodable tag {}", TagId::name_of(code)),
            }
        }

        let ifd = Ifd(tags);
        let next_ifd_offset = variant.read_offset(endian, stream)?;

        Ok((ifd, next_ifd_offset))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn tags(&self) -> impl Iterator<Item = &Tag> {
        self.0.iter()
    }

    pub fn get_tag_by_code(&self, code: u16) -> Option<&Tag> {
        let Self(tags) = &self;
        tags.iter().find(|tag| tag.code == code)
    }

    pub fn get_tag(&self, id: TagId) -> Result<&Tag, TiffError> {
        self.get_tag_by_code(id.code())
            .ok_or(TiffError::MissingTag(id))
    }

    pub fn get_tag_values<T: NumCast>(&self, id: TagId) -> Result<Vec<T>, TiffError> {
        self.get_tag(id)?.values().ok_or(TiffError::BadTag(id))
    }

    pub fn get_tag_value<T: NumCast + Copy>(&self, id: TagId) -> Result<T, TiffError> {
        self.get_tag(id)?.value().ok_or(TiffError::BadTag(id))
    }

    pub fn get_tag_offsets(&self, id: TagId) -> Result<Vec<u64>, TiffError> {
        self.get_tag(id)?.offsets().ok_or(TiffError::BadTag(id))
    }

    /// Replaces an existing entry with the same code or appends a new one.
    pub fn set_tag<I: Into<u16>>(&mut self, id: I, data: TagData) {
        let tag = Tag::new(id, data);
        let Self(tags) = self;
        match tags.iter_mut().find(|t| t.code == tag.code) {
            Some(existing) => *existing = tag,
            None => tags.push(tag),
        }
    }

    pub fn remove_tag<I: Into<u16>>(&mut self, id: I) -> Option<Tag> {
        let code = id.into();
        let Self(tags) = self;
        let index = tags.iter().position(|t| t.code == code)?;
        Some(tags.remove(index))
    }

    /// Ascending tag code, as TIFF requires on disk.
    pub fn sort(&mut self) {
        self.0.sort_by_key(|tag| tag.code);
    }
}

fn invalid(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn classic_entry(
        endian: Endian,
        code: u16,
        type_code: u16,
        count: u32,
        field: [u8; 4],
    ) -> Vec<u8> {
        let mut bytes = vec![];
        bytes.extend(endian.encode(code));
        bytes.extend(endian.encode(type_code));
        bytes.extend(endian.encode(count));
        bytes.extend(field);
        bytes
    }

    #[test]
    fn parse_inline_and_overflow_values() {
        let endian = Endian::Little;
        let mut file = vec![0; 8];
        file.extend(endian.encode(3_u16));
        file.extend(classic_entry(endian, 256, 3, 1, [64, 0, 0, 0]));
        // 2 doubles at offset 50 (8 + 2 + 3*12 + 4)
        file.extend(classic_entry(endian, 33550, 12, 2, endian.encode(50_u32)));
        // unknown field type 99 is dropped
        file.extend(classic_entry(endian, 257, 99, 1, [1, 0, 0, 0]));
        file.extend(endian.encode(0_u32));
        file.extend(endian.encode(0.5_f64));
        file.extend(endian.encode(-0.5_f64));

        let mut stream = Cursor::new(file);
        let (ifd, next) = Ifd::parse(&mut stream, 8, endian, Variant::Normal).unwrap();
        assert_eq!(next, 0);
        assert_eq!(ifd.len(), 2);
        assert_eq!(ifd.get_tag_value::<u32>(TagId::ImageWidth).unwrap(), 64);
        assert_eq!(
            ifd.get_tag(TagId::ModelPixelScale).unwrap().doubles(),
            Some(vec![0.5, -0.5])
        );
        assert!(matches!(
            ifd.get_tag(TagId::ImageHeight),
            Err(TiffError::MissingTag(TagId::ImageHeight))
        ));
    }

    #[test]
    fn oversized_count_is_an_error() {
        let endian = Endian::Big;
        let mut file = vec![0; 8];
        file.extend(endian.encode(1_u16));
        // u32::MAX doubles claimed at offset 8, far past the end of the file
        file.extend(classic_entry(endian, 33550, 12, u32::MAX, endian.encode(8_u32)));
        file.extend(endian.encode(0_u32));

        let mut stream = Cursor::new(file);
        match Ifd::parse(&mut stream, 8, endian, Variant::Normal) {
            Err(TiffError::ReadError(e)) => assert_eq!(e.kind(), io::ErrorKind::InvalidData),
            other => panic!("expected a read error, got {other:?}"),
        }
    }

    #[test]
    fn set_replaces_and_sort_orders() {
        let mut ifd = Ifd::new();
        ifd.set_tag(TagId::GeoKeyDirectory, TagData::Short(vec![1, 1, 0, 0]));
        ifd.set_tag(TagId::ImageHeight, TagData::from_long(10));
        ifd.set_tag(TagId::ImageWidth, TagData::from_long(20));
        ifd.set_tag(TagId::ImageHeight, TagData::from_long(30));
        assert_eq!(ifd.len(), 3);
        ifd.sort();
        let codes: Vec<u16> = ifd.tags().map(|t| t.code).collect();
        assert_eq!(codes, vec![256, 257, 34735]);
        assert_eq!(ifd.get_tag_value::<u32>(TagId::ImageHeight).unwrap(), 30);

        let removed = ifd.remove_tag(TagId::ImageWidth).unwrap();
        assert_eq!(removed.data, TagData::from_long(20));
        assert!(ifd.remove_tag(TagId::ImageWidth).is_none());
    }
}
