use crate::tiff::Endian;
use eio::FromBytes;
use num_traits::NumCast;
use std::fmt::{self, Display};
use std::ops::Range;

mod compression;
mod coords;
mod decoder;
mod layout;
mod photometrics;
mod predictor;

pub use compression::{Compression, DecompressError};
pub use coords::model_xy;
pub use decoder::{nodata, ImageInfo};
pub use layout::{Chunk, Layout};
pub use photometrics::{PhotometricInterpretation, PlanarConfiguration, SampleFormat};
pub use predictor::{Predictor, RowShape};

#[derive(Debug, PartialEq)]
pub enum RasterError {
    UnsupportedBitDepth(u16),
    UnsupportedPlanarConfiguration,
    BadWindow {
        window: Window,
        dimensions: (usize, usize),
    },
    ShapeMismatch {
        expected: usize,
        actual: usize,
    },
    /// Neither strip nor tile offsets are present.
    MissingLayout,
    ChunkCountMismatch {
        expected: usize,
        actual: usize,
    },
    /// A sample value has no representation in the target sample type.
    UnrepresentableSample {
        index: usize,
        value: f64,
        sample_type: SampleType,
    },
}

impl Display for RasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RasterError::UnsupportedBitDepth(bits) => {
                write!(f, "unsupported bits per sample {bits}")
            }
            RasterError::UnsupportedPlanarConfiguration => {
                write!(f, "only chunky (interleaved) pixel data is supported")
            }
            RasterError::BadWindow { window, dimensions } => write!(
                f,
                "window {:?}x{:?} outside {}x{} raster",
                window.rows, window.cols, dimensions.0, dimensions.1
            ),
            RasterError::ShapeMismatch { expected, actual } => {
                write!(f, "expected {expected} samples, got {actual}")
            }
            RasterError::MissingLayout => write!(f, "no strip or tile offsets"),
            RasterError::ChunkCountMismatch { expected, actual } => {
                write!(f, "expected {expected} strips/tiles, found {actual}")
            }
            RasterError::UnrepresentableSample {
                index,
                value,
                sample_type,
            } => write!(f, "sample {index} ({value}) does not fit {sample_type:?}"),
        }
    }
}

impl std::error::Error for RasterError {}

/// On-disk sample encoding, decided once from BitsPerSample and SampleFormat.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SampleType {
    U8,
    I8,
    /// All non-float 16-bit samples, whatever SampleFormat says.
    I16,
    /// 16-bit integers flagged as float by the producer. Read as `i16` and
    /// widened to `f32`; not a half-float decoder.
    I16AsFloat,
    I32,
    F32,
    F64,
}

impl SampleType {
    pub fn from_tags(bits_per_sample: u16, format: SampleFormat) -> Result<Self, RasterError> {
        Ok(match (bits_per_sample, format) {
            (8, SampleFormat::Signed) => SampleType::I8,
            (8, _) => SampleType::U8,
            (16, SampleFormat::Float) => SampleType::I16AsFloat,
            (16, _) => SampleType::I16,
            (32, SampleFormat::Float) => SampleType::F32,
            (32, _) => SampleType::I32,
            (64, SampleFormat::Float) => SampleType::F64,
            (bits, _) => return Err(RasterError::UnsupportedBitDepth(bits)),
        })
    }

    pub const fn bits_per_sample(&self) -> u16 {
        match self {
            SampleType::U8 | SampleType::I8 => 8,
            SampleType::I16 | SampleType::I16AsFloat => 16,
            SampleType::I32 | SampleType::F32 => 32,
            SampleType::F64 => 64,
        }
    }

    pub const fn bytes_per_sample(&self) -> usize {
        self.bits_per_sample() as usize / 8
    }

    pub const fn sample_format(&self) -> SampleFormat {
        match self {
            SampleType::U8 => SampleFormat::Unsigned,
            SampleType::I8 | SampleType::I16 | SampleType::I32 => SampleFormat::Signed,
            SampleType::I16AsFloat | SampleType::F32 | SampleType::F64 => SampleFormat::Float,
        }
    }

    /// Zeroed buffer of the element type this sample type decodes to.
    pub fn blank(&self, len: usize) -> RasterData {
        match self {
            SampleType::I16AsFloat | SampleType::F32 => RasterData::Float(vec![0.0; len]),
            SampleType::F64 => RasterData::Double(vec![0.0; len]),
            _ => RasterData::Int(vec![0; len]),
        }
    }

    /// Decodes whole samples; trailing bytes are ignored.
    pub fn decode(&self, bytes: &[u8], endian: Endian) -> RasterData {
        match self {
            SampleType::U8 => RasterData::Int(bytes.iter().map(|b| *b as i32).collect()),
            SampleType::I8 => RasterData::Int(bytes.iter().map(|b| *b as i8 as i32).collect()),
            SampleType::I16 => RasterData::Int(
                decode_as::<2, i16>(bytes, endian)
                    .into_iter()
                    .map(|v| v as i32)
                    .collect(),
            ),
            SampleType::I16AsFloat => RasterData::Float(
                decode_as::<2, i16>(bytes, endian)
                    .into_iter()
                    .map(|v| v as f32)
                    .collect(),
            ),
            SampleType::I32 => RasterData::Int(decode_as::<4, i32>(bytes, endian)),
            SampleType::F32 => RasterData::Float(decode_as::<4, f32>(bytes, endian)),
            SampleType::F64 => RasterData::Double(decode_as::<8, f64>(bytes, endian)),
        }
    }

    /// Encodes `data` as this sample type. Fails on the first value the
    /// type cannot hold (out of range, or NaN for integer types).
    pub fn encode(&self, data: &RasterData, endian: Endian) -> Result<Vec<u8>, RasterError> {
        Ok(match self {
            SampleType::U8 => data.cast_vec::<u8>(*self)?,
            SampleType::I8 => data
                .cast_vec::<i8>(*self)?
                .into_iter()
                .map(|v| v as u8)
                .collect(),
            SampleType::I16 | SampleType::I16AsFloat => {
                endian.encode_all(&data.cast_vec::<i16>(*self)?)
            }
            SampleType::I32 => endian.encode_all(&data.cast_vec::<i32>(*self)?),
            SampleType::F32 => endian.encode_all(&data.cast_vec::<f32>(*self)?),
            SampleType::F64 => endian.encode_all(&data.cast_vec::<f64>(*self)?),
        })
    }
}

fn decode_as<const N: usize, T: FromBytes<N>>(bytes: &[u8], endian: Endian) -> Vec<T> {
    endian.decode_all(bytes).unwrap_or_default()
}

/// Decoded samples, interleaved per pixel in band order.
#[derive(Clone, Debug, PartialEq)]
pub enum RasterData {
    Int(Vec<i32>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

impl RasterData {
    pub fn len(&self) -> usize {
        match self {
            RasterData::Int(v) => v.len(),
            RasterData::Float(v) => v.len(),
            RasterData::Double(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_float(&self) -> bool {
        !matches!(self, RasterData::Int(_))
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        match self {
            RasterData::Int(v) => v.get(index).map(|x| *x as f64),
            RasterData::Float(v) => v.get(index).map(|x| *x as f64),
            RasterData::Double(v) => v.get(index).copied(),
        }
    }

    pub fn to_f64(&self) -> Vec<f64> {
        match self {
            RasterData::Int(v) => v.iter().map(|x| *x as f64).collect(),
            RasterData::Float(v) => v.iter().map(|x| *x as f64).collect(),
            RasterData::Double(v) => v.clone(),
        }
    }

    fn cast_vec<T: NumCast>(&self, sample_type: SampleType) -> Result<Vec<T>, RasterError> {
        fn cast<S: NumCast + Copy, T: NumCast>(
            v: &[S],
            sample_type: SampleType,
        ) -> Result<Vec<T>, RasterError> {
            v.iter()
                .enumerate()
                .map(|(index, x)| {
                    T::from(*x).ok_or_else(|| RasterError::UnrepresentableSample {
                        index,
                        value: x.to_f64().unwrap_or(f64::NAN),
                        sample_type,
                    })
                })
                .collect()
        }
        match self {
            RasterData::Int(v) => cast(v, sample_type),
            RasterData::Float(v) => cast(v, sample_type),
            RasterData::Double(v) => cast(v, sample_type),
        }
    }

    fn flip_rows(&mut self, row_len: usize) {
        match self {
            RasterData::Int(v) => flip(v, row_len),
            RasterData::Float(v) => flip(v, row_len),
            RasterData::Double(v) => flip(v, row_len),
        }
    }
}

fn flip<T>(values: &mut [T], row_len: usize) {
    if row_len == 0 {
        return;
    }
    let rows = values.len() / row_len;
    for r in 0..rows / 2 {
        let (top, bottom) = values.split_at_mut((rows - 1 - r) * row_len);
        top[r * row_len..(r + 1) * row_len].swap_with_slice(&mut bottom[..row_len]);
    }
}

/// Row and column ranges of a partial read, in output (bottom-up) indices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Window {
    pub rows: Range<usize>,
    pub cols: Range<usize>,
}

impl Window {
    pub fn new(rows: Range<usize>, cols: Range<usize>) -> Self {
        Self { rows, cols }
    }

    pub fn full(height: usize, width: usize) -> Self {
        Self {
            rows: 0..height,
            cols: 0..width,
        }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.cols.len()
    }

    pub fn check(&self, height: usize, width: usize) -> Result<(), RasterError> {
        let ok = self.rows.start < self.rows.end
            && self.cols.start < self.cols.end
            && self.rows.end <= height
            && self.cols.end <= width;
        if ok {
            Ok(())
        } else {
            Err(RasterError::BadWindow {
                window: self.clone(),
                dimensions: (height, width),
            })
        }
    }
}

/// A decoded grid. Row 0 is the southernmost (bottom) row.
#[derive(Clone, Debug, PartialEq)]
pub struct Raster {
    pub width: usize,
    pub height: usize,
    pub bands: usize,
    pub sample_type: SampleType,
    pub data: RasterData,
}

impl Raster {
    pub fn new(
        width: usize,
        height: usize,
        bands: usize,
        sample_type: SampleType,
        data: RasterData,
    ) -> Result<Self, RasterError> {
        let expected = width * height * bands;
        if data.len() != expected {
            return Err(RasterError::ShapeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            bands,
            sample_type,
            data,
        })
    }

    pub fn blank(width: usize, height: usize, bands: usize, sample_type: SampleType) -> Self {
        Self {
            width,
            height,
            bands,
            sample_type,
            data: sample_type.blank(width * height * bands),
        }
    }

    /// (rows, cols, bands)
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.height, self.width, self.bands)
    }

    pub fn index(&self, row: usize, col: usize, band: usize) -> Option<usize> {
        (row < self.height && col < self.width && band < self.bands)
            .then(|| (row * self.width + col) * self.bands + band)
    }

    pub fn get(&self, row: usize, col: usize, band: usize) -> Option<f64> {
        self.data.get(self.index(row, col, band)?)
    }

    pub fn is_float(&self) -> bool {
        self.data.is_float()
    }

    /// Row 0 becomes the last row.
    pub fn flip_rows(&mut self) {
        self.data.flip_rows(self.width * self.bands);
    }

    /// Replaces every sample equal to `nodata` with NaN. Integer data is
    /// promoted to `Double` first.
    pub fn apply_nodata(&mut self, nodata: f64) {
        if let RasterData::Int(values) = &self.data {
            self.data = RasterData::Double(values.iter().map(|v| *v as f64).collect());
        }
        match &mut self.data {
            RasterData::Float(values) => values
                .iter_mut()
                .filter(|v| **v as f64 == nodata)
                .for_each(|v| *v = f32::NAN),
            RasterData::Double(values) => values
                .iter_mut()
                .filter(|v| **v == nodata)
                .for_each(|v| *v = f64::NAN),
            RasterData::Int(_) => {}
        }
    }
}

impl Display for Raster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Raster({}x{}x{}, {:?})",
            self.height, self.width, self.bands, self.sample_type
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_type_dispatch() {
        assert_eq!(SampleType::from_tags(8, SampleFormat::Unsigned), Ok(SampleType::U8));
        assert_eq!(SampleType::from_tags(8, SampleFormat::Signed), Ok(SampleType::I8));
        assert_eq!(SampleType::from_tags(16, SampleFormat::Float), Ok(SampleType::I16AsFloat));
        assert_eq!(SampleType::from_tags(16, SampleFormat::Unsigned), Ok(SampleType::I16));
        assert_eq!(SampleType::from_tags(16, SampleFormat::Signed), Ok(SampleType::I16));
        assert_eq!(SampleType::from_tags(32, SampleFormat::Unsigned), Ok(SampleType::I32));
        assert_eq!(SampleType::from_tags(32, SampleFormat::Float), Ok(SampleType::F32));
        assert_eq!(SampleType::from_tags(64, SampleFormat::Float), Ok(SampleType::F64));
        assert_eq!(
            SampleType::from_tags(12, SampleFormat::Unsigned),
            Err(RasterError::UnsupportedBitDepth(12))
        );
    }

    #[test]
    fn decode_signed_and_widened() {
        let bytes = [0xFF, 0xFE, 0x00, 0x05];
        assert_eq!(
            SampleType::I16.decode(&bytes, Endian::Big),
            RasterData::Int(vec![-2, 5])
        );
        assert_eq!(
            SampleType::I16AsFloat.decode(&bytes, Endian::Big),
            RasterData::Float(vec![-2.0, 5.0])
        );
        assert_eq!(
            SampleType::I8.decode(&bytes[..2], Endian::Big),
            RasterData::Int(vec![-1, -2])
        );
    }

    #[test]
    fn encode_matches_decode() {
        let data = RasterData::Float(vec![0.5, -7.25, 1e10]);
        let bytes = SampleType::F32.encode(&data, Endian::Little).unwrap();
        assert_eq!(SampleType::F32.decode(&bytes, Endian::Little), data);
    }

    #[test]
    fn encode_rejects_values_out_of_range() {
        let data = RasterData::Int(vec![0, 255, 256]);
        assert_eq!(
            SampleType::U8.encode(&data, Endian::Big),
            Err(RasterError::UnrepresentableSample {
                index: 2,
                value: 256.0,
                sample_type: SampleType::U8
            })
        );
        let data = RasterData::Int(vec![-32768, 40000]);
        assert!(matches!(
            SampleType::I16.encode(&data, Endian::Big),
            Err(RasterError::UnrepresentableSample { index: 1, .. })
        ));
        let data = RasterData::Double(vec![1.0, f64::NAN]);
        assert!(SampleType::I32.encode(&data, Endian::Big).is_err());
        assert!(SampleType::F64.encode(&data, Endian::Big).is_ok());
        assert_eq!(
            SampleType::I8.encode(&RasterData::Int(vec![-1, 127]), Endian::Big),
            Ok(vec![0xFF, 0x7F])
        );
    }

    #[test]
    fn flip_rows() {
        let data = RasterData::Int(vec![1, 2, 3, 4, 5, 6]);
        let mut raster = Raster::new(2, 3, 1, SampleType::I32, data).unwrap();
        raster.flip_rows();
        assert_eq!(raster.data, RasterData::Int(vec![5, 6, 3, 4, 1, 2]));
        assert_eq!(raster.get(0, 1, 0), Some(6.0));
        assert_eq!(raster.get(3, 0, 0), None);
    }

    #[test]
    fn nodata_promotes_ints() {
        let mut raster =
            Raster::new(3, 1, 1, SampleType::I16, RasterData::Int(vec![-9999, 0, 7])).unwrap();
        raster.apply_nodata(-9999.0);
        let RasterData::Double(values) = &raster.data else {
            panic!("expected doubles");
        };
        assert!(values[0].is_nan());
        assert_eq!(&values[1..], &[0.0, 7.0]);
    }

    #[test]
    fn shape_and_window_checks() {
        assert_eq!(
            Raster::new(2, 2, 1, SampleType::U8, RasterData::Int(vec![0; 3])),
            Err(RasterError::ShapeMismatch {
                expected: 4,
                actual: 3
            })
        );
        assert!(Window::new(0..2, 1..3).check(2, 3).is_ok());
        assert!(Window::new(0..3, 0..1).check(2, 3).is_err());
        assert!(Window::new(1..1, 0..1).check(2, 3).is_err());
    }
}
