use crate::geotags::GeoTags;
use crate::raster::{
    Compression, Layout, PhotometricInterpretation, PlanarConfiguration, Predictor, Raster,
    RasterData, RowShape,
};
use crate::tiff::{Ifd, TagData, TagId, TiffError, TiffWriter, Variant};
use std::io::{Seek, Write};
use tracing::debug;

pub mod error;

pub use error::{EncodeError, EncodeResult};

/// Writes one raster as a TIFF image. Rows are taken bottom-up, the way the
/// decoder returns them.
#[derive(Debug, Clone)]
pub struct Encoder {
    raster: Raster,
    layout: Layout,
    compression: Compression,
    predictor: Predictor,
    geo_tags: Option<GeoTags>,
    nodata: Option<f64>,
}

impl Encoder {
    pub fn new(raster: Raster) -> Self {
        let row_bytes = raster.width * raster.bands * raster.sample_type.bytes_per_sample();
        let rows_per_strip = (8192 / row_bytes.max(1)).clamp(1, raster.height.max(1));
        Self {
            raster,
            layout: Layout::Strips { rows_per_strip },
            compression: Compression::Uncompressed,
            predictor: Predictor::No,
            geo_tags: None,
            nodata: None,
        }
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_predictor(mut self, predictor: Predictor) -> Self {
        self.predictor = predictor;
        self
    }

    pub fn with_geo_tags(mut self, geo_tags: GeoTags) -> Self {
        self.geo_tags = Some(geo_tags);
        self
    }

    /// Written as GDALNoData; NaN samples are stored as this value.
    pub fn with_nodata(mut self, nodata: f64) -> Self {
        self.nodata = Some(nodata);
        self
    }

    /// Writes the pixel payloads, then the IFD. Returns the IFD offset.
    pub fn encode<W: Write + Seek>(&self, writer: &mut TiffWriter<W>) -> EncodeResult<u64> {
        let endian = writer.endian;
        let variant = writer.variant;
        let raster = &self.raster;
        let (width, height, bands) = (raster.width, raster.height, raster.bands);
        let sample_type = raster.sample_type;
        let bytes_per_sample = sample_type.bytes_per_sample();

        match self.predictor {
            Predictor::No | Predictor::Horizontal => {}
            other => return Err(EncodeError::UnsupportedPredictor(other)),
        }
        let layout_ok = match self.layout {
            Layout::Strips { rows_per_strip } => rows_per_strip > 0,
            Layout::Tiles { width, height } => width > 0 && height > 0,
        };
        if !layout_ok || width == 0 || height == 0 || bands == 0 {
            return Err(EncodeError::BadLayout(self.layout));
        }

        // TIFF rows run top-down
        let mut data = raster.data.clone();
        if let Some(nodata) = self.nodata {
            fill_nan(&mut data, nodata);
        }
        let mut top_down = Raster::new(width, height, bands, sample_type, data)?;
        top_down.flip_rows();
        let image = sample_type.encode(&top_down.data, endian)?;

        let pixel_bytes = bands * bytes_per_sample;
        let image_row_bytes = width * pixel_bytes;
        let chunk_count = self.layout.chunk_count(width, height);
        let mut offsets = Vec::with_capacity(chunk_count);
        let mut byte_counts = Vec::with_capacity(chunk_count);

        for index in 0..chunk_count {
            let chunk = self.layout.chunk(index, width, height);
            let shape = RowShape {
                cols: chunk.cols,
                bands,
                bytes_per_sample,
            };
            let mut buffer = vec![0; chunk.rows * shape.row_bytes()];
            for r in 0..chunk.valid_rows {
                let src = (chunk.row + r) * image_row_bytes + chunk.col * pixel_bytes;
                let dst = r * shape.row_bytes();
                let len = chunk.valid_cols * pixel_bytes;
                buffer[dst..dst + len].copy_from_slice(&image[src..src + len]);
            }
            self.predictor.apply(&mut buffer, shape, endian);
            let packed = self.compression.encode(&buffer)?;
            offsets.push(writer.write_payload(&packed)?);
            byte_counts.push(packed.len() as u64);
        }
        debug!(
            "Wrote {chunk_count} chunks as {}, {:?}",
            self.layout, self.compression
        );

        let mut ifd = Ifd::new();
        ifd.set_tag(TagId::ImageWidth, TagData::from_long(dimension(width)?));
        ifd.set_tag(TagId::ImageHeight, TagData::from_long(dimension(height)?));
        ifd.set_tag(
            TagId::BitsPerSample,
            TagData::Short(vec![sample_type.bits_per_sample(); bands]),
        );
        ifd.set_tag(
            TagId::Compression,
            TagData::from_short(self.compression.into()),
        );
        ifd.set_tag(
            TagId::PhotometricInterpretation,
            TagData::from_short(PhotometricInterpretation::for_bands(bands).into()),
        );
        ifd.set_tag(TagId::SamplesPerPixel, TagData::from_short(bands as u16));
        ifd.set_tag(
            TagId::PlanarConfiguration,
            TagData::from_short(PlanarConfiguration::Chunky.into()),
        );
        // Always explicit: readers assume differencing for untagged LZW floats
        ifd.set_tag(TagId::Predictor, TagData::from_short(self.predictor.into()));
        ifd.set_tag(
            TagId::SampleFormat,
            TagData::Short(vec![sample_type.sample_format().into(); bands]),
        );

        let (offsets_id, counts_id) = match self.layout {
            Layout::Strips { rows_per_strip } => {
                ifd.set_tag(
                    TagId::RowsPerStrip,
                    TagData::from_long(dimension(rows_per_strip)?),
                );
                (TagId::StripOffsets, TagId::StripByteCounts)
            }
            Layout::Tiles { width, height } => {
                ifd.set_tag(TagId::TileWidth, TagData::from_long(dimension(width)?));
                ifd.set_tag(TagId::TileLength, TagData::from_long(dimension(height)?));
                (TagId::TileOffsets, TagId::TileByteCounts)
            }
        };
        ifd.set_tag(offsets_id, offset_data(variant, offsets_id, offsets)?);
        ifd.set_tag(counts_id, offset_data(variant, counts_id, byte_counts)?);

        if let Some(geo_tags) = &self.geo_tags {
            geo_tags.add_to_ifd(&mut ifd);
        }
        if let Some(nodata) = self.nodata {
            ifd.set_tag(TagId::GDALNoData, TagData::from_string(&format!("{nodata}")));
        }

        Ok(writer.write_ifd(&mut ifd)?)
    }
}

fn dimension(value: usize) -> EncodeResult<u32> {
    u32::try_from(value).map_err(|_| EncodeError::Tiff(TiffError::ClassicOverflow(0)))
}

/// LONG in classic files, LONG8 in BigTIFF.
fn offset_data(variant: Variant, id: TagId, values: Vec<u64>) -> EncodeResult<TagData> {
    match variant {
        Variant::Big => Ok(TagData::Long8(values)),
        Variant::Normal => values
            .into_iter()
            .map(|v| u32::try_from(v).map_err(|_| TiffError::ClassicOverflow(id.code()).into()))
            .collect::<EncodeResult<Vec<u32>>>()
            .map(TagData::Long),
    }
}

fn fill_nan(data: &mut RasterData, nodata: f64) {
    match data {
        RasterData::Float(values) => values
            .iter_mut()
            .filter(|v| v.is_nan())
            .for_each(|v| *v = nodata as f32),
        RasterData::Double(values) => values
            .iter_mut()
            .filter(|v| v.is_nan())
            .for_each(|v| *v = nodata),
        RasterData::Int(_) => {}
    }
}
