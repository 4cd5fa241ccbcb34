// https://www.awaresystems.be/imaging/tiff/tifftags/predictor.html
// Adobe Photoshop TIFF Technical Note 3 (floating point predictor)

use crate::tiff::Endian;
use eio::{FromBytes, ToBytes};
use num_enum::{FromPrimitive, IntoPrimitive};
use num_traits::{WrappingAdd, WrappingSub};

#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, FromPrimitive)]
#[repr(u16)]
pub enum Predictor {
    No = 1,
    Horizontal = 2,
    FloatingPoint = 3,

    #[num_enum(default)]
    Unknown = 0x0000,
}

/// Row geometry of a decoded chunk.
#[derive(Debug, Clone, Copy)]
pub struct RowShape {
    pub cols: usize,
    pub bands: usize,
    pub bytes_per_sample: usize,
}

impl RowShape {
    pub fn row_bytes(&self) -> usize {
        self.cols * self.bands * self.bytes_per_sample
    }
}

impl Predictor {
    /// Reverses the predictor in place. Whole rows only; a trailing partial
    /// row is left as is.
    pub fn undo(&self, buffer: &mut [u8], shape: RowShape, endian: Endian) {
        let row_bytes = shape.row_bytes();
        if row_bytes == 0 {
            return;
        }
        match self {
            Self::Horizontal => {
                for row in buffer.chunks_exact_mut(row_bytes) {
                    match shape.bytes_per_sample {
                        1 => accumulate::<1, u8>(row, shape.bands, endian),
                        2 => accumulate::<2, u16>(row, shape.bands, endian),
                        4 => accumulate::<4, u32>(row, shape.bands, endian),
                        8 => accumulate::<8, u64>(row, shape.bands, endian),
                        _ => {}
                    }
                }
            }
            Self::FloatingPoint => {
                for row in buffer.chunks_exact_mut(row_bytes) {
                    undo_floating_point(row, shape, endian);
                }
            }
            Self::No | Self::Unknown => {}
        }
    }

    /// Applies horizontal differencing before compression.
    pub fn apply(&self, buffer: &mut [u8], shape: RowShape, endian: Endian) {
        let row_bytes = shape.row_bytes();
        if row_bytes == 0 || *self != Self::Horizontal {
            return;
        }
        for row in buffer.chunks_exact_mut(row_bytes) {
            match shape.bytes_per_sample {
                1 => difference::<1, u8>(row, shape.bands, endian),
                2 => difference::<2, u16>(row, shape.bands, endian),
                4 => difference::<4, u32>(row, shape.bands, endian),
                8 => difference::<8, u64>(row, shape.bands, endian),
                _ => {}
            }
        }
    }
}

fn accumulate<const N: usize, T>(row: &mut [u8], stride: usize, endian: Endian)
where
    T: FromBytes<N> + ToBytes<N> + WrappingAdd + Copy,
{
    let Some(mut values) = endian.decode_all::<N, T>(row) else {
        return;
    };
    for i in stride..values.len() {
        values[i] = values[i].wrapping_add(&values[i - stride]);
    }
    row.copy_from_slice(&endian.encode_all(&values));
}

fn difference<const N: usize, T>(row: &mut [u8], stride: usize, endian: Endian)
where
    T: FromBytes<N> + ToBytes<N> + WrappingSub + Copy,
{
    let Some(mut values) = endian.decode_all::<N, T>(row) else {
        return;
    };
    for i in (stride..values.len()).rev() {
        values[i] = values[i].wrapping_sub(&values[i - stride]);
    }
    row.copy_from_slice(&endian.encode_all(&values));
}

// Bytes are differenced across the row, then stored as byte planes with the
// most significant plane first.
fn undo_floating_point(row: &mut [u8], shape: RowShape, endian: Endian) {
    for i in shape.bands..row.len() {
        row[i] = row[i].wrapping_add(row[i - shape.bands]);
    }
    let planes = row.to_vec();
    let samples = shape.cols * shape.bands;
    let bps = shape.bytes_per_sample;
    for sample in 0..samples {
        for byte in 0..bps {
            let plane = match endian {
                Endian::Big => byte,
                Endian::Little => bps - 1 - byte,
            };
            row[sample * bps + byte] = planes[plane * samples + sample];
        }
    }
}
