use super::{
    Chunk, Compression, Layout, PlanarConfiguration, Predictor, Raster, RasterData, RasterError,
    RowShape, SampleFormat, SampleType, Window,
};
use crate::error::{Error, Result};
use crate::tiff::{read_bytes, Endian, Ifd, TagId, TiffError};
use std::fmt::Display;
use std::io::{Read, Seek, SeekFrom};
use tracing::{debug, trace, warn};

/// Everything needed to decode one image, resolved once from its IFD.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageInfo {
    pub width: usize,
    pub height: usize,
    pub bands: usize,
    pub sample_type: SampleType,
    pub compression: Compression,
    /// Predictor to undo after decompression, after defaulting.
    pub predictor: Predictor,
    pub layout: Layout,
    pub offsets: Vec<u64>,
    pub byte_counts: Vec<u64>,
    pub nodata: Option<f64>,
    pub endian: Endian,
}

impl ImageInfo {
    pub fn from_ifd(ifd: &Ifd, endian: Endian) -> Result<Self> {
        // Required tags
        let width: usize = ifd.get_tag_value(TagId::ImageWidth)?;
        let height: usize = ifd.get_tag_value(TagId::ImageHeight)?;
        let bits_per_sample: Vec<u16> = ifd.get_tag_values(TagId::BitsPerSample)?;

        let bands: usize = ifd.get_tag_value(TagId::SamplesPerPixel).unwrap_or(1);
        let format: SampleFormat = ifd
            .get_tag_value::<u16>(TagId::SampleFormat)
            .unwrap_or(1)
            .into();
        let planar: PlanarConfiguration = ifd
            .get_tag_value::<u16>(TagId::PlanarConfiguration)
            .unwrap_or(1)
            .into();
        if planar != PlanarConfiguration::Chunky && bands > 1 {
            return Err(RasterError::UnsupportedPlanarConfiguration.into());
        }

        let bits = *bits_per_sample
            .first()
            .ok_or(TiffError::BadTag(TagId::BitsPerSample))?;
        if let Some(other) = bits_per_sample.iter().find(|b| **b != bits) {
            return Err(RasterError::UnsupportedBitDepth(*other).into());
        }
        let sample_type = SampleType::from_tags(bits, format)?;

        let compression_code: u16 = ifd.get_tag_value(TagId::Compression).unwrap_or(1);
        let compression = Compression::from(compression_code);
        if compression == Compression::Unknown {
            warn!("Unknown compression {compression_code}, pixel data will be passed through");
        }

        // Predictor decided once. Some writers LZW float rasters with
        // differencing but no Predictor tag.
        let predictor = match ifd.get_tag_value::<u16>(TagId::Predictor) {
            Ok(code) => Predictor::from(code),
            Err(_) if compression == Compression::Lzw && sample_type == SampleType::F32 => {
                Predictor::Horizontal
            }
            Err(_) => Predictor::No,
        };
        if predictor == Predictor::Unknown {
            warn!("Unknown predictor, leaving samples as decoded");
        }

        let (layout, offsets, byte_counts) = if ifd.get_tag(TagId::TileOffsets).is_ok() {
            let tile_width: usize = ifd.get_tag_value(TagId::TileWidth)?;
            let tile_height: usize = ifd.get_tag_value(TagId::TileLength)?;
            if tile_width == 0 || tile_height == 0 {
                return Err(TiffError::BadTag(TagId::TileWidth).into());
            }
            (
                Layout::Tiles {
                    width: tile_width,
                    height: tile_height,
                },
                ifd.get_tag_offsets(TagId::TileOffsets)?,
                ifd.get_tag_offsets(TagId::TileByteCounts)?,
            )
        } else if ifd.get_tag(TagId::StripOffsets).is_ok() {
            let rows_per_strip = ifd
                .get_tag_value::<u64>(TagId::RowsPerStrip)
                .unwrap_or(u32::MAX as u64)
                .min(height.max(1) as u64) as usize;
            if rows_per_strip == 0 {
                return Err(TiffError::BadTag(TagId::RowsPerStrip).into());
            }
            (
                Layout::Strips { rows_per_strip },
                ifd.get_tag_offsets(TagId::StripOffsets)?,
                ifd.get_tag_offsets(TagId::StripByteCounts)?,
            )
        } else {
            return Err(RasterError::MissingLayout.into());
        };

        let expected = layout.chunk_count(width, height);
        for actual in [offsets.len(), byte_counts.len()] {
            if actual < expected {
                return Err(RasterError::ChunkCountMismatch { expected, actual }.into());
            }
        }

        let nodata = nodata(ifd)?;

        let info = Self {
            width,
            height,
            bands,
            sample_type,
            compression,
            predictor,
            layout,
            offsets,
            byte_counts,
            nodata,
            endian,
        };
        debug!("{info}");
        Ok(info)
    }

    pub fn read<R: Read + Seek>(&self, stream: &mut R) -> Result<Raster> {
        self.read_window(stream, &Window::full(self.height, self.width))
    }

    /// Decodes the chunks overlapping `window` into a bottom-up raster and
    /// substitutes NaN for nodata.
    pub fn read_window<R: Read + Seek>(&self, stream: &mut R, window: &Window) -> Result<Raster> {
        window.check(self.height, self.width)?;
        let mut raster = Raster::blank(
            window.width(),
            window.height(),
            self.bands,
            self.sample_type,
        );
        let bytes_per_sample = self.sample_type.bytes_per_sample();

        for index in 0..self.layout.chunk_count(self.width, self.height) {
            let chunk = self.layout.chunk(index, self.width, self.height);
            if !self.overlaps(&chunk, window) {
                continue;
            }

            let byte_count = self.byte_counts[index];
            if byte_count == 0 {
                trace!("Chunk {index} is sparse");
                continue;
            }

            stream.seek(SeekFrom::Start(self.offsets[index]))?;
            let bytes = read_bytes(stream, byte_count)?;

            let mut buffer = self.compression.decode(&bytes)?;
            let shape = RowShape {
                cols: chunk.cols,
                bands: self.bands,
                bytes_per_sample,
            };
            self.predictor.undo(&mut buffer, shape, self.endian);

            let expected = chunk.rows * shape.row_bytes();
            if buffer.len() < expected {
                warn!(
                    "Chunk {index} decoded to {} of {expected} bytes",
                    buffer.len()
                );
            }

            let samples = self.sample_type.decode(&buffer, self.endian);
            let placement = Placement {
                chunk: &chunk,
                window,
                height: self.height,
                bands: self.bands,
            };
            match (&samples, &mut raster.data) {
                (RasterData::Int(src), RasterData::Int(dst)) => placement.copy(src, dst),
                (RasterData::Float(src), RasterData::Float(dst)) => placement.copy(src, dst),
                (RasterData::Double(src), RasterData::Double(dst)) => placement.copy(src, dst),
                _ => warn!("Chunk {index} decoded to an unexpected element type"),
            }
        }

        if let Some(nodata) = self.nodata {
            raster.apply_nodata(nodata);
        }
        Ok(raster)
    }

    fn overlaps(&self, chunk: &Chunk, window: &Window) -> bool {
        // chunk rows in output (bottom-up) space
        let out_end = self.height - chunk.row;
        let out_start = out_end.saturating_sub(chunk.valid_rows);
        let rows = out_start < window.rows.end && window.rows.start < out_end;
        let cols = chunk.col < window.cols.end && window.cols.start < chunk.col + chunk.valid_cols;
        rows && cols
    }
}

/// The GDALNoData value. Text that is not a number is an error, not a
/// silent absence.
pub fn nodata(ifd: &Ifd) -> Result<Option<f64>> {
    let Ok(tag) = ifd.get_tag(TagId::GDALNoData) else {
        return Ok(None);
    };
    let text = tag
        .string()
        .ok_or(TiffError::BadTag(TagId::GDALNoData))?;
    let value = text
        .trim()
        .parse::<f64>()
        .map_err(|e| Error::NoData(text.clone(), e))?;
    Ok(Some(value))
}

struct Placement<'a> {
    chunk: &'a Chunk,
    window: &'a Window,
    height: usize,
    bands: usize,
}

impl Placement<'_> {
    /// Copies the in-window pixels of a chunk, flipping rows on the way.
    fn copy<T: Copy>(&self, src: &[T], dst: &mut [T]) {
        let Self {
            chunk,
            window,
            height,
            bands,
        } = *self;
        for r in 0..chunk.valid_rows {
            let out_row = height - 1 - (chunk.row + r);
            if !window.rows.contains(&out_row) {
                continue;
            }
            let dst_row = out_row - window.rows.start;
            for c in 0..chunk.valid_cols {
                let col = chunk.col + c;
                if !window.cols.contains(&col) {
                    continue;
                }
                let src_at = (r * chunk.cols + c) * bands;
                let dst_at = (dst_row * window.width() + col - window.cols.start) * bands;
                let Some(pixel) = src.get(src_at..src_at + bands) else {
                    // truncated chunk, the rest is missing too
                    return;
                };
                dst[dst_at..dst_at + bands].copy_from_slice(pixel);
            }
        }
    }
}

impl Display for ImageInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Image({}x{}x{}, {:?}, {}, {:?} Compression, {:?} Predictor)",
            self.width,
            self.height,
            self.bands,
            self.sample_type,
            self.layout,
            self.compression,
            self.predictor
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiff::TagData;
    use std::io::Cursor;

    fn strip_ifd(data_offset: u32, byte_count: u32) -> Ifd {
        let mut ifd = Ifd::new();
        ifd.set_tag(TagId::ImageWidth, TagData::from_long(3));
        ifd.set_tag(TagId::ImageHeight, TagData::from_long(2));
        ifd.set_tag(TagId::BitsPerSample, TagData::from_short(8));
        ifd.set_tag(TagId::StripOffsets, TagData::from_long(data_offset));
        ifd.set_tag(TagId::StripByteCounts, TagData::from_long(byte_count));
        ifd.set_tag(TagId::RowsPerStrip, TagData::from_long(2));
        ifd
    }

    #[test]
    fn single_strip_is_flipped() {
        let info = ImageInfo::from_ifd(&strip_ifd(2, 6), Endian::Big).unwrap();
        assert_eq!(info.layout, Layout::Strips { rows_per_strip: 2 });
        assert_eq!(info.predictor, Predictor::No);
        let mut stream = Cursor::new(vec![0, 0, 1, 2, 3, 4, 5, 6]);
        let raster = info.read(&mut stream).unwrap();
        assert_eq!(raster.data, RasterData::Int(vec![4, 5, 6, 1, 2, 3]));
    }

    #[test]
    fn short_chunk_leaves_zeros() {
        let info = ImageInfo::from_ifd(&strip_ifd(0, 4), Endian::Big).unwrap();
        let mut stream = Cursor::new(vec![1, 2, 3, 4]);
        let raster = info.read(&mut stream).unwrap();
        // second image row only has its first sample
        assert_eq!(raster.data, RasterData::Int(vec![4, 0, 0, 1, 2, 3]));
    }

    #[test]
    fn missing_layout_and_counts() {
        let mut ifd = strip_ifd(0, 6);
        ifd.remove_tag(TagId::StripOffsets);
        assert!(matches!(
            ImageInfo::from_ifd(&ifd, Endian::Big),
            Err(Error::RasterizationError(RasterError::MissingLayout))
        ));

        let mut ifd = strip_ifd(0, 6);
        ifd.set_tag(TagId::RowsPerStrip, TagData::from_long(1));
        assert!(matches!(
            ImageInfo::from_ifd(&ifd, Endian::Big),
            Err(Error::RasterizationError(RasterError::ChunkCountMismatch {
                expected: 2,
                actual: 1
            }))
        ));

        let mut ifd = strip_ifd(0, 6);
        ifd.remove_tag(TagId::BitsPerSample);
        let err = ImageInfo::from_ifd(&ifd, Endian::Big).unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn planar_and_bad_nodata() {
        let mut ifd = strip_ifd(0, 6);
        ifd.set_tag(TagId::SamplesPerPixel, TagData::from_short(3));
        ifd.set_tag(TagId::BitsPerSample, TagData::Short(vec![8, 8, 8]));
        ifd.set_tag(TagId::PlanarConfiguration, TagData::from_short(2));
        assert!(matches!(
            ImageInfo::from_ifd(&ifd, Endian::Big),
            Err(Error::RasterizationError(
                RasterError::UnsupportedPlanarConfiguration
            ))
        ));

        let mut ifd = strip_ifd(0, 6);
        ifd.set_tag(TagId::GDALNoData, TagData::from_string("none"));
        assert!(matches!(
            ImageInfo::from_ifd(&ifd, Endian::Big),
            Err(Error::NoData(s, _)) if s == "none"
        ));
    }

    #[test]
    fn oversized_byte_count_fails_cleanly() {
        let mut ifd = strip_ifd(0, 6);
        ifd.set_tag(TagId::StripByteCounts, TagData::Long8(vec![u64::MAX / 2]));
        let info = ImageInfo::from_ifd(&ifd, Endian::Big).unwrap();
        let mut stream = Cursor::new(vec![1, 2, 3, 4, 5, 6]);
        match info.read(&mut stream) {
            Err(Error::ReadError(e)) => assert_eq!(e.kind(), std::io::ErrorKind::InvalidData),
            other => panic!("expected a read error, got {other:?}"),
        }
    }

    #[test]
    fn unflagged_sixteen_bit_samples_are_signed() {
        let mut ifd = Ifd::new();
        ifd.set_tag(TagId::ImageWidth, TagData::from_long(2));
        ifd.set_tag(TagId::ImageHeight, TagData::from_long(1));
        ifd.set_tag(TagId::BitsPerSample, TagData::from_short(16));
        ifd.set_tag(TagId::StripOffsets, TagData::from_long(0));
        ifd.set_tag(TagId::StripByteCounts, TagData::from_long(4));
        ifd.set_tag(TagId::GDALNoData, TagData::from_string("-32768"));
        let info = ImageInfo::from_ifd(&ifd, Endian::Big).unwrap();
        assert_eq!(info.sample_type, SampleType::I16);

        let mut stream = Cursor::new(vec![0xFF, 0xFF, 0x80, 0x00]);
        let raster = info.read(&mut stream).unwrap();
        let RasterData::Double(values) = raster.data else {
            panic!("nodata promotes to doubles");
        };
        assert_eq!(values[0], -1.0);
        assert!(values[1].is_nan());

        // an explicit unsigned SampleFormat reads the same way
        ifd.set_tag(TagId::SampleFormat, TagData::from_short(1));
        let info = ImageInfo::from_ifd(&ifd, Endian::Big).unwrap();
        assert_eq!(info.sample_type, SampleType::I16);
    }

    #[test]
    fn lzw_float_without_predictor_tag_is_differenced() {
        let mut ifd = strip_ifd(0, 6);
        ifd.set_tag(TagId::BitsPerSample, TagData::from_short(32));
        ifd.set_tag(TagId::SampleFormat, TagData::from_short(3));
        ifd.set_tag(TagId::Compression, TagData::from_short(5));
        let info = ImageInfo::from_ifd(&ifd, Endian::Big).unwrap();
        assert_eq!(info.predictor, Predictor::Horizontal);

        ifd.set_tag(TagId::Predictor, TagData::from_short(1));
        let info = ImageInfo::from_ifd(&ifd, Endian::Big).unwrap();
        assert_eq!(info.predictor, Predictor::No);
    }
}
