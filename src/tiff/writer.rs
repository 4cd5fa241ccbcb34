use super::{write_header, Endian, Ifd, TiffError, Variant};
use std::io::{Seek, SeekFrom, Write};
use tracing::debug;

/// Appends pixel payloads and directories to a TIFF stream.
///
/// `next_overflow` is the write cursor: it only moves forward and always sits
/// past the last byte written. `last_ifd_slot` is the position of the link
/// (first-IFD offset in the header, or the previous directory's next-IFD
/// field) that the next directory written gets patched into.
#[derive(Debug)]
pub struct TiffWriter<W: Write + Seek> {
    stream: W,
    pub endian: Endian,
    pub variant: Variant,
    next_overflow: u64,
    last_ifd_slot: u64,
}

impl<W: Write + Seek> TiffWriter<W> {
    pub fn new(mut stream: W, endian: Endian, variant: Variant) -> Result<Self, TiffError> {
        let last_ifd_slot = write_header(&mut stream, endian, variant)?;
        Ok(Self {
            stream,
            endian,
            variant,
            next_overflow: variant.header_bytesize() as u64,
            last_ifd_slot,
        })
    }

    pub fn next_overflow(&self) -> u64 {
        self.next_overflow
    }

    pub fn last_ifd_slot(&self) -> u64 {
        self.last_ifd_slot
    }

    /// Writes `bytes` at the (word aligned) cursor and returns their offset.
    pub fn write_payload(&mut self, bytes: &[u8]) -> Result<u64, TiffError> {
        let offset = self.align();
        self.stream.seek(SeekFrom::Start(offset))?;
        self.stream.write_all(bytes)?;
        self.next_overflow = offset + bytes.len() as u64;
        Ok(offset)
    }

    /// Sorts and writes `ifd` with its overflow values directly after it,
    /// then links it into the chain. Returns the directory offset.
    pub fn write_ifd(&mut self, ifd: &mut Ifd) -> Result<u64, TiffError> {
        ifd.sort();
        let endian = self.endian;
        let variant = self.variant;
        let offset_size = variant.offset_bytesize();

        let dir_offset = self.align();
        let dir_len = variant.count_bytesize()
            + ifd.len() * variant.entry_bytesize()
            + offset_size;
        let mut overflow_cursor = dir_offset + dir_len as u64;

        let mut dir = Vec::with_capacity(dir_len);
        let mut overflow = vec![];
        dir.extend(
            variant
                .encode_count(endian, ifd.len() as u64)
                .ok_or(TiffError::ClassicOverflow(0))?,
        );

        for tag in ifd.tags() {
            let datatype = tag.datatype();
            if variant == Variant::Normal && datatype.is_bigtiff_only() {
                return Err(TiffError::BigTiffTypeInClassic(tag.code));
            }
            dir.extend(endian.encode(tag.code));
            dir.extend(endian.encode(u16::from(datatype)));
            dir.extend(
                variant
                    .encode_offset(endian, tag.count() as u64)
                    .ok_or(TiffError::ClassicOverflow(tag.code))?,
            );

            let mut bytes = tag.data.bytes(endian);
            if bytes.len() <= offset_size {
                bytes.resize(offset_size, 0);
                dir.extend(bytes);
            } else {
                dir.extend(
                    variant
                        .encode_offset(endian, overflow_cursor)
                        .ok_or(TiffError::ClassicOverflow(tag.code))?,
                );
                if bytes.len() % 2 == 1 {
                    bytes.push(0);
                }
                overflow_cursor += bytes.len() as u64;
                overflow.extend(bytes);
            }
        }

        // Next IFD offset, patched if another image follows
        let next_slot = dir_offset + (dir_len - offset_size) as u64;
        dir.extend(vec![0; offset_size]);

        self.stream.seek(SeekFrom::Start(dir_offset))?;
        self.stream.write_all(&dir)?;
        self.stream.write_all(&overflow)?;
        self.patch_link(dir_offset)?;

        debug!(
            "IFD with {} tags at {dir_offset}, {} overflow bytes",
            ifd.len(),
            overflow.len()
        );
        self.last_ifd_slot = next_slot;
        self.next_overflow = overflow_cursor;
        Ok(dir_offset)
    }

    pub fn flush(&mut self) -> Result<(), TiffError> {
        Ok(self.stream.flush()?)
    }

    /// Flushes and hands back the stream.
    pub fn finish(mut self) -> Result<W, TiffError> {
        self.flush()?;
        Ok(self.stream)
    }

    pub fn get_ref(&self) -> &W {
        &self.stream
    }

    fn patch_link(&mut self, offset: u64) -> Result<(), TiffError> {
        let bytes = self
            .variant
            .encode_offset(self.endian, offset)
            .ok_or(TiffError::ClassicOverflow(0))?;
        self.stream.seek(SeekFrom::Start(self.last_ifd_slot))?;
        self.stream.write_all(&bytes)?;
        Ok(())
    }

    fn align(&self) -> u64 {
        self.next_overflow + self.next_overflow % 2
    }
}
