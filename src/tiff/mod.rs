use std::collections::HashSet;
use std::fmt::Display;
use std::io::{self, Read, Seek, SeekFrom, Write};
use tracing::{debug, warn};

mod endian;
mod error;
mod ifd;
mod tag;
mod writer;

pub use endian::Endian;
pub use error::TiffError;
pub use ifd::Ifd;
pub use tag::{Tag, TagData, TagId, TagType};
pub use writer::TiffWriter;

/// Classic TIFF (version 42, 32-bit offsets) or BigTIFF (version 43, 64-bit offsets).
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default)]
pub enum Variant {
    #[default]
    Normal,
    Big,
}

impl Variant {
    pub const fn version(&self) -> u16 {
        match self {
            Variant::Normal => 42,
            Variant::Big => 43,
        }
    }

    pub const fn offset_bytesize(&self) -> usize {
        match self {
            Variant::Normal => 4,
            Variant::Big => 8,
        }
    }

    /// Width of the entry count that opens each IFD.
    pub const fn count_bytesize(&self) -> usize {
        match self {
            Variant::Normal => 2,
            Variant::Big => 8,
        }
    }

    pub const fn entry_bytesize(&self) -> usize {
        match self {
            Variant::Normal => 12,
            Variant::Big => 20,
        }
    }

    pub const fn header_bytesize(&self) -> usize {
        match self {
            Variant::Normal => 8,
            Variant::Big => 16,
        }
    }

    pub fn read_offset<R: Read>(&self, endian: Endian, stream: &mut R) -> io::Result<u64> {
        match self {
            Variant::Normal => endian.read::<4, u32>(stream).map(|v| v as u64),
            Variant::Big => endian.read(stream),
        }
    }

    pub fn read_count<R: Read>(&self, endian: Endian, stream: &mut R) -> io::Result<u64> {
        match self {
            Variant::Normal => endian.read::<2, u16>(stream).map(|v| v as u64),
            Variant::Big => endian.read(stream),
        }
    }

    /// Reads an offset out of an entry's value field.
    pub fn decode_offset(&self, endian: Endian, field: &[u8]) -> Option<u64> {
        match self {
            Variant::Normal => endian
                .decode::<4, u32>(field.get(..4)?.try_into().ok()?)
                .ok()
                .map(|v| v as u64),
            Variant::Big => endian.decode(field.get(..8)?.try_into().ok()?).ok(),
        }
    }

    /// `None` if `value` does not fit a classic 32-bit field.
    pub fn encode_offset(&self, endian: Endian, value: u64) -> Option<Vec<u8>> {
        match self {
            Variant::Normal => u32::try_from(value)
                .ok()
                .map(|v| endian.encode(v).to_vec()),
            Variant::Big => Some(endian.encode(value).to_vec()),
        }
    }

    pub fn encode_count(&self, endian: Endian, value: u64) -> Option<Vec<u8>> {
        match self {
            Variant::Normal => u16::try_from(value)
                .ok()
                .map(|v| endian.encode(v).to_vec()),
            Variant::Big => Some(endian.encode(value).to_vec()),
        }
    }
}

/// Reads exactly `len` bytes from the current position. The buffer grows
/// with what the stream actually holds, so a corrupt length fails with
/// `InvalidData` instead of allocating it up front.
pub fn read_bytes<R: Read>(stream: &mut R, len: u64) -> io::Result<Vec<u8>> {
    let mut bytes = vec![];
    stream.by_ref().take(len).read_to_end(&mut bytes)?;
    if (bytes.len() as u64) < len {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("expected {len} bytes, stream holds {}", bytes.len()),
        ));
    }
    Ok(bytes)
}

/// Reads the magic bytes, version and first IFD offset.
pub fn read_header<R: Read + Seek>(stream: &mut R) -> Result<(Endian, Variant, u64), TiffError> {
    stream.seek(SeekFrom::Start(0))?;
    let mut magic = [0; 2];
    stream.read_exact(&mut magic)?;

    let endian = match &magic {
        b"II" => Endian::Little,
        b"MM" => Endian::Big,
        _ => return Err(TiffError::BadMagicBytes),
    };

    let variant = match endian.read::<2, u16>(stream)? {
        42 => Variant::Normal,
        43 => Variant::Big,
        v => return Err(TiffError::BadVersion(v)),
    };

    if Variant::Big == variant {
        // BigTIFFs have 4 extra bytes in the header
        let offset_bytesize: u16 = endian.read(stream)?; // 0x0008
        let _: u16 = endian.read(stream)?; // 0x0000
        if offset_bytesize != 8 {
            return Err(TiffError::BadVersion(offset_bytesize));
        }
    }

    let first_ifd = variant.read_offset(endian, stream)?;
    debug!("TIFF header {endian:?} {variant:?}, first IFD at {first_ifd}");
    Ok((endian, variant, first_ifd))
}

/// Writes a header with a zero first IFD offset and returns the position of
/// that offset so it can be patched once the first directory is placed.
pub fn write_header<W: Write + Seek>(
    stream: &mut W,
    endian: Endian,
    variant: Variant,
) -> Result<u64, TiffError> {
    stream.seek(SeekFrom::Start(0))?;
    stream.write_all(endian.magic())?;
    endian.write(stream, variant.version())?;
    if Variant::Big == variant {
        endian.write(stream, 8_u16)?;
        endian.write(stream, 0_u16)?;
    }
    let slot = stream.stream_position()?;
    stream.write_all(&vec![0; variant.offset_bytesize()])?;
    Ok(slot)
}

#[derive(Clone, Debug)]
pub struct Tiff {
    pub endian: Endian,
    pub variant: Variant,
    pub ifds: Vec<Ifd>,
}

impl Tiff {
    pub fn new(endian: Endian, variant: Variant) -> Self {
        Self {
            endian,
            variant,
            ifds: vec![],
        }
    }

    pub fn open<R: Read + Seek>(stream: &mut R) -> Result<Self, TiffError> {
        let (endian, variant, first_ifd) = read_header(stream)?;
        if first_ifd == 0 {
            return Err(TiffError::NoIfd0);
        }

        // IFDs
        let mut ifds = vec![];
        let mut seen = HashSet::new();
        let mut ifd_offset = first_ifd;
        while ifd_offset != 0 {
            if !seen.insert(ifd_offset) {
                warn!("IFD chain revisits offset {ifd_offset}, stopping");
                break;
            }
            let (ifd, next_offset) = Ifd::parse(stream, ifd_offset, endian, variant)?;
            debug!("IFD {} at {ifd_offset}: {} tags", ifds.len(), ifd.0.len());
            ifd_offset = next_offset;
            ifds.push(ifd);
        }

        Ok(Self {
            endian,
            variant,
            ifds,
        })
    }

    pub fn ifd0(&self) -> Result<&Ifd, TiffError> {
        self.ifds.first().ok_or(TiffError::NoIfd0)
    }

    /// Writes the whole file: header then every IFD in order.
    pub fn encode<W: Write + Seek>(&self, stream: W) -> Result<W, TiffError> {
        let mut writer = TiffWriter::new(stream, self.endian, self.variant)?;
        for ifd in self.ifds.iter() {
            writer.write_ifd(&mut ifd.clone())?;
        }
        writer.finish()
    }
}

impl Display for Tiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, ifd) in self.ifds.iter().enumerate() {
            writeln!(f, "IFD {i}:")?;
            for tag in ifd.0.iter() {
                writeln!(f, "\t{}", tag)?;
            }
        }
        Ok(())
    }
}
