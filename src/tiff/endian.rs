use eio::{FromBytes, ReadExt, ToBytes};
use std::io::{Read, Result, Write};
use std::mem;

#[derive(PartialEq, Clone, Copy, Debug, Default)]
pub enum Endian {
    #[default]
    Big,
    Little,
}

impl Endian {
    pub const fn magic(&self) -> &'static [u8; 2] {
        match self {
            Endian::Big => b"MM",
            Endian::Little => b"II",
        }
    }

    pub fn read<const N: usize, T: FromBytes<N>>(&self, stream: &mut impl Read) -> Result<T> {
        let mut buf = [0u8; N];
        stream.read_exact(&mut buf)?;
        self.decode(buf)
    }

    pub fn decode<const N: usize, T: FromBytes<N>>(&self, bytes: [u8; N]) -> Result<T> {
        match self {
            Endian::Big => bytes.as_slice().read_be(),
            Endian::Little => bytes.as_slice().read_le(),
        }
    }

    /// Decodes a packed run of `T`. Trailing bytes that do not fill a whole
    /// value are ignored.
    pub fn decode_all<const N: usize, T: FromBytes<N>>(&self, bytes: &[u8]) -> Option<Vec<T>> {
        bytes
            .chunks_exact(mem::size_of::<T>())
            .map(|chunk| {
                chunk
                    .try_into()
                    .ok()
                    .and_then(|arr| self.decode::<N, T>(arr).ok())
            })
            .collect()
    }

    pub fn encode<const N: usize, T: ToBytes<N>>(&self, value: T) -> [u8; N] {
        match self {
            Endian::Big => value.to_be_bytes(),
            Endian::Little => value.to_le_bytes(),
        }
    }

    pub fn encode_all<const N: usize, T: ToBytes<N> + Copy>(&self, values: &[T]) -> Vec<u8> {
        values.iter().flat_map(|v| self.encode(*v)).collect()
    }

    pub fn write<const N: usize, T: ToBytes<N>>(
        &self,
        stream: &mut impl Write,
        value: T,
    ) -> Result<()> {
        stream.write_all(&self.encode(value))
    }
}
