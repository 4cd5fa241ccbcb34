use geotiff_grid::raster::{ImageInfo, Layout, RasterData, SampleType, Window};
use geotiff_grid::tiff::{Endian, Ifd, TagData, TagId, Tiff, TiffWriter, Variant};
use geotiff_grid::{Compression, Encoder, Predictor, Raster};
use salzweg::encoder::TiffStyleEncoder;
use std::io::Cursor;

fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn write(encoder: &Encoder, endian: Endian, variant: Variant) -> Cursor<Vec<u8>> {
    let mut writer = TiffWriter::new(Cursor::new(vec![]), endian, variant).unwrap();
    encoder.encode(&mut writer).unwrap();
    writer.finish().unwrap()
}

fn read(stream: &mut Cursor<Vec<u8>>) -> (Ifd, Raster) {
    let tiff = Tiff::open(stream).unwrap();
    let ifd = tiff.ifd0().unwrap().clone();
    let raster = ImageInfo::from_ifd(&ifd, tiff.endian)
        .unwrap()
        .read(stream)
        .unwrap();
    (ifd, raster)
}

fn ramp(width: usize, height: usize, bands: usize, sample_type: SampleType) -> Raster {
    let len = width * height * bands;
    let data = match sample_type {
        SampleType::F32 => RasterData::Float((0..len).map(|i| i as f32 * 0.5 - 7.0).collect()),
        SampleType::F64 => RasterData::Double((0..len).map(|i| i as f64 * 0.25 - 3.0).collect()),
        SampleType::U8 => RasterData::Int((0..len).map(|i| (i % 256) as i32).collect()),
        SampleType::I8 => RasterData::Int((0..len).map(|i| (i % 256) as i32 - 128).collect()),
        _ => RasterData::Int((0..len).map(|i| (i as i32 * 7) % 1000 - 300).collect()),
    };
    Raster::new(width, height, bands, sample_type, data).unwrap()
}

/// One image written by hand: `chunks` are raw payloads, `None` leaves a
/// zero offset and byte count.
fn hand_written(
    width: u32,
    height: u32,
    layout: Layout,
    sample_tags: &[(TagId, TagData)],
    chunks: &[Option<Vec<u8>>],
) -> Cursor<Vec<u8>> {
    let mut writer = TiffWriter::new(Cursor::new(vec![]), Endian::Big, Variant::Normal).unwrap();
    let mut offsets = vec![];
    let mut counts = vec![];
    for chunk in chunks {
        match chunk {
            Some(bytes) => {
                offsets.push(writer.write_payload(bytes).unwrap() as u32);
                counts.push(bytes.len() as u32);
            }
            None => {
                offsets.push(0);
                counts.push(0);
            }
        }
    }

    let mut ifd = Ifd::new();
    ifd.set_tag(TagId::ImageWidth, TagData::from_long(width));
    ifd.set_tag(TagId::ImageHeight, TagData::from_long(height));
    for (id, data) in sample_tags {
        ifd.set_tag(*id, data.clone());
    }
    match layout {
        Layout::Strips { rows_per_strip } => {
            ifd.set_tag(TagId::RowsPerStrip, TagData::from_long(rows_per_strip as u32));
            ifd.set_tag(TagId::StripOffsets, TagData::Long(offsets));
            ifd.set_tag(TagId::StripByteCounts, TagData::Long(counts));
        }
        Layout::Tiles { width, height } => {
            ifd.set_tag(TagId::TileWidth, TagData::from_long(width as u32));
            ifd.set_tag(TagId::TileLength, TagData::from_long(height as u32));
            ifd.set_tag(TagId::TileOffsets, TagData::Long(offsets));
            ifd.set_tag(TagId::TileByteCounts, TagData::Long(counts));
        }
    }
    writer.write_ifd(&mut ifd).unwrap();
    writer.finish().unwrap()
}

#[test]
fn byte_order_and_variant_invariance() {
    init_logging();
    let encoder = Encoder::new(ramp(19, 11, 2, SampleType::I16))
        .with_compression(Compression::Lzw)
        .with_predictor(Predictor::Horizontal);

    let mut decoded = vec![];
    for endian in [Endian::Big, Endian::Little] {
        for variant in [Variant::Normal, Variant::Big] {
            let mut stream = write(&encoder, endian, variant);
            let magic = &stream.get_ref()[0..2];
            assert_eq!(magic, if endian == Endian::Big { b"MM" } else { b"II" });
            let (ifd, raster) = read(&mut stream);
            let widths: Vec<u16> = ifd.get_tag_values(TagId::BitsPerSample).unwrap();
            assert_eq!(widths, vec![16, 16]);
            decoded.push(raster);
        }
    }
    assert!(decoded.iter().all(|raster| *raster == decoded[0]));
    assert_eq!(decoded[0], ramp(19, 11, 2, SampleType::I16));
}

#[test]
fn strips_and_tiles_decode_identically() {
    let sample_types = [
        SampleType::U8,
        SampleType::I8,
        SampleType::I16,
        SampleType::I32,
        SampleType::F32,
        SampleType::F64,
    ];
    for sample_type in sample_types {
        let raster = ramp(37, 23, 3, sample_type);
        let layouts = [
            Layout::Strips { rows_per_strip: 5 },
            Layout::Tiles {
                width: 16,
                height: 16,
            },
        ];
        let decoded: Vec<Raster> = layouts
            .into_iter()
            .map(|layout| {
                let encoder = Encoder::new(raster.clone())
                    .with_layout(layout)
                    .with_compression(Compression::DeflateAdobe);
                read(&mut write(&encoder, Endian::Little, Variant::Normal)).1
            })
            .collect();
        assert_eq!(decoded[0], decoded[1], "{sample_type:?}");
        assert_eq!(decoded[0], raster, "{sample_type:?}");
    }
}

#[test]
fn rows_are_flipped_bottom_up() {
    let tags = [
        (TagId::BitsPerSample, TagData::from_short(8)),
        (TagId::SamplesPerPixel, TagData::from_short(1)),
    ];
    let top_down = vec![10, 11, 12, 20, 21, 22];
    let mut stream = hand_written(
        3,
        2,
        Layout::Strips { rows_per_strip: 2 },
        &tags,
        &[Some(top_down)],
    );
    let (_, raster) = read(&mut stream);
    assert_eq!(raster.data, RasterData::Int(vec![20, 21, 22, 10, 11, 12]));
    assert_eq!(raster.get(1, 0, 0), Some(10.0));
}

#[test]
fn lzw_float_tile_with_horizontal_predictor() {
    let values = [1.5f32, -2.25, 3.0, 1.0e10];
    let bits: Vec<u32> = values.iter().map(|v| v.to_bits()).collect();
    // per row: first sample kept, then differences
    let differenced = [
        bits[0],
        bits[1].wrapping_sub(bits[0]),
        bits[2],
        bits[3].wrapping_sub(bits[2]),
    ];
    let raw: Vec<u8> = differenced.iter().flat_map(|v| v.to_be_bytes()).collect();
    let packed = TiffStyleEncoder::encode_to_vec(&raw[..]).unwrap();

    let base = vec![
        (TagId::BitsPerSample, TagData::from_short(32)),
        (TagId::SampleFormat, TagData::from_short(3)),
        (TagId::Compression, TagData::from_short(5)),
    ];
    let mut tagged = base.clone();
    tagged.push((TagId::Predictor, TagData::from_short(2)));

    // Predictor=2, and the legacy files that omit the tag
    for tags in [tagged, base] {
        let mut stream = hand_written(
            2,
            2,
            Layout::Tiles {
                width: 2,
                height: 2,
            },
            &tags,
            &[Some(packed.clone())],
        );
        let (_, raster) = read(&mut stream);
        // bottom row first
        assert_eq!(raster.data, RasterData::Float(vec![3.0, 1.0e10, 1.5, -2.25]));
    }
}

#[test]
fn sparse_tiles_are_left_blank() {
    let tags = [(TagId::BitsPerSample, TagData::from_short(8))];
    let mut stream = hand_written(
        4,
        2,
        Layout::Tiles {
            width: 2,
            height: 2,
        },
        &tags,
        &[Some(vec![1, 2, 3, 4]), None],
    );
    let (_, raster) = read(&mut stream);
    assert_eq!(raster.data, RasterData::Int(vec![3, 4, 0, 0, 1, 2, 0, 0]));
}

#[test]
fn nodata_becomes_nan() {
    let mut raster = ramp(6, 4, 1, SampleType::I16);
    if let RasterData::Int(values) = &mut raster.data {
        values[3] = -9999;
        values[17] = -9999;
    }
    let encoder = Encoder::new(raster.clone()).with_nodata(-9999.0);
    let (ifd, decoded) = read(&mut write(&encoder, Endian::Big, Variant::Normal));
    assert_eq!(
        ifd.get_tag(TagId::GDALNoData).unwrap().string().as_deref(),
        Some("-9999")
    );

    let RasterData::Double(values) = &decoded.data else {
        panic!("nodata promotes integer rasters to doubles");
    };
    let original = raster.data.to_f64();
    for (i, (value, expected)) in values.iter().zip(original).enumerate() {
        if i == 3 || i == 17 {
            assert!(value.is_nan());
        } else {
            assert_eq!(*value, expected);
        }
    }
}

#[test]
fn tiled_32_bit_window_matches_full_read() {
    for sample_type in [SampleType::I32, SampleType::F32] {
        let encoder = Encoder::new(ramp(37, 21, 2, sample_type)).with_layout(Layout::Tiles {
            width: 16,
            height: 16,
        });
        let mut stream = write(&encoder, Endian::Little, Variant::Big);
        let tiff = Tiff::open(&mut stream).unwrap();
        let info = ImageInfo::from_ifd(tiff.ifd0().unwrap(), tiff.endian).unwrap();
        let full = info.read(&mut stream).unwrap();

        let window = Window::new(3..19, 10..33);
        let part = info.read_window(&mut stream, &window).unwrap();
        assert_eq!(part.shape(), (16, 23, 2));
        for row in window.rows.clone() {
            for col in window.cols.clone() {
                for band in 0..2 {
                    assert_eq!(
                        part.get(row - 3, col - 10, band),
                        full.get(row, col, band),
                        "{sample_type:?} ({row}, {col}, {band})"
                    );
                }
            }
        }
    }
}

#[test]
fn window_outside_image_is_rejected() {
    let encoder = Encoder::new(ramp(4, 4, 1, SampleType::U8));
    let mut stream = write(&encoder, Endian::Big, Variant::Normal);
    let tiff = Tiff::open(&mut stream).unwrap();
    let info = ImageInfo::from_ifd(tiff.ifd0().unwrap(), tiff.endian).unwrap();
    let error = info
        .read_window(&mut stream, &Window::new(0..5, 0..4))
        .unwrap_err();
    assert!(error.is_format_error());
}

#[test]
fn sixteen_bit_float_flag_widens_integers() {
    let data = RasterData::Float(vec![1.0, -2.0, 300.0, 4.0]);
    let raster = Raster::new(2, 2, 1, SampleType::I16AsFloat, data).unwrap();
    let mut stream = write(&Encoder::new(raster.clone()), Endian::Big, Variant::Normal);
    let (ifd, decoded) = read(&mut stream);
    assert_eq!(ifd.get_tag_value::<u16>(TagId::SampleFormat).unwrap(), 3);
    assert_eq!(decoded, raster);
}
