use num_enum::{FromPrimitive, IntoPrimitive};

#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, FromPrimitive)]
#[repr(u16)]
pub enum PhotometricInterpretation {
    WhiteIsZero = 0,
    BlackIsZero = 1,
    RGB = 2,
    RGBPalette = 3,
    TransparencyMask = 4,
    CMYK = 5,
    YCbCr = 6,
    CIELab = 8,

    #[num_enum(default)]
    Unknown = 0xFFFF,
}

impl PhotometricInterpretation {
    /// Grids are written as grey data unless they carry three colour bands.
    pub fn for_bands(bands: usize) -> Self {
        match bands {
            3 => Self::RGB,
            _ => Self::BlackIsZero,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, FromPrimitive)]
#[repr(u16)]
pub enum SampleFormat {
    Unsigned = 1,
    Signed = 2,
    Float = 3,
    Undefined = 4,
    ComplexInt = 5,
    ComplexFloat = 6,

    #[num_enum(default)]
    Unknown = 0xFFFF,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, FromPrimitive)]
#[repr(u16)]
pub enum PlanarConfiguration {
    Chunky = 1,
    Planar = 2,

    #[num_enum(default)]
    Unknown = 0xFFFF,
}
