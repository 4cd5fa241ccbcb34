use crate::encode::Encoder;
use crate::error::{Error, Result};
use crate::geotags::{self, GeoKeyDirectory, GeoTags, GeoTiffError};
use crate::projection::Projection;
use crate::raster::{self, model_xy, ImageInfo, Raster, Window};
use crate::tiff::{Endian, Ifd, TagId, Tiff, TiffWriter, Variant};
use std::fmt::Display;
use std::fs::{File, OpenOptions};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A GeoTIFF file bound to a path. The file is opened on first use, for
/// either reading or writing but never both.
#[derive(Debug)]
pub struct GeoTiff {
    path: PathBuf,
    endian: Endian,
    variant: Variant,
    mode: Mode,
}

#[derive(Debug)]
enum Mode {
    Unopened,
    Read(Reader),
    Write(TiffWriter<File>),
    Closed,
}

#[derive(Debug)]
struct Reader {
    file: BufReader<File>,
    tiff: Tiff,
    geo_keys: Vec<GeoKeyDirectory>,
}

impl Reader {
    fn open(path: &Path) -> Result<Self> {
        let mut file = BufReader::new(File::open(path)?);
        let tiff = Tiff::open(&mut file)?;

        // GeoKeys are resolved once for the whole chain
        let geo_keys = tiff
            .ifds
            .iter()
            .map(|ifd| match GeoKeyDirectory::parse(ifd) {
                Err(GeoTiffError::MissingTag(TagId::GeoKeyDirectory)) => {
                    Ok(GeoKeyDirectory::new())
                }
                result => result,
            })
            .collect::<std::result::Result<Vec<_>, GeoTiffError>>()?;

        info!(
            "Opened {} for reading: {:?} endian, {:?} variant, {} images",
            path.display(),
            tiff.endian,
            tiff.variant,
            tiff.ifds.len()
        );
        Ok(Self {
            file,
            tiff,
            geo_keys,
        })
    }

    fn ifd(&self, image: usize) -> Result<&Ifd> {
        self.tiff
            .ifds
            .get(image)
            .ok_or(Error::ImageIndexOutOfRange((image, self.tiff.ifds.len())))
    }

    fn geo_keys(&self, image: usize) -> Result<&GeoKeyDirectory> {
        self.geo_keys
            .get(image)
            .ok_or(Error::ImageIndexOutOfRange((image, self.geo_keys.len())))
    }

    fn image_info(&self, image: usize) -> Result<ImageInfo> {
        ImageInfo::from_ifd(self.ifd(image)?, self.tiff.endian)
    }
}

impl GeoTiff {
    /// Binds to `path` without touching the file system.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            endian: Endian::Big,
            variant: Variant::Normal,
            mode: Mode::Unopened,
        }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut geotiff = Self::new(path);
        geotiff.reader()?;
        Ok(geotiff)
    }

    /// Creates (or truncates) a classic big-endian file.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::create_with(path, Endian::Big, Variant::Normal)
    }

    pub fn create_with<P: AsRef<Path>>(path: P, endian: Endian, variant: Variant) -> Result<Self> {
        let mut geotiff = Self::new(path);
        geotiff.endian = endian;
        geotiff.variant = variant;
        geotiff.writer()?;
        Ok(geotiff)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_readonly(&self) -> bool {
        matches!(self.mode, Mode::Read(_))
    }

    fn reader(&mut self) -> Result<&mut Reader> {
        if matches!(self.mode, Mode::Unopened) {
            self.mode = Mode::Read(Reader::open(&self.path)?);
        }
        match &mut self.mode {
            Mode::Read(reader) => Ok(reader),
            Mode::Write(_) => Err(Error::WriteOnly),
            Mode::Unopened | Mode::Closed => Err(Error::NotOpen),
        }
    }

    fn writer(&mut self) -> Result<&mut TiffWriter<File>> {
        if matches!(self.mode, Mode::Unopened) {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(&self.path)?;
            let writer = TiffWriter::new(file, self.endian, self.variant)?;
            info!(
                "Opened {} for writing: {:?} endian, {:?} variant",
                self.path.display(),
                self.endian,
                self.variant
            );
            self.mode = Mode::Write(writer);
        }
        match &mut self.mode {
            Mode::Write(writer) => Ok(writer),
            Mode::Read(_) => Err(Error::ReadOnly),
            Mode::Unopened | Mode::Closed => Err(Error::NotOpen),
        }
    }

    pub fn image_count(&mut self) -> Result<usize> {
        Ok(self.reader()?.tiff.ifds.len())
    }

    /// (width, height)
    pub fn dimensions(&mut self, image: usize) -> Result<(usize, usize)> {
        let ifd = self.reader()?.ifd(image)?;
        let width = ifd.get_tag_value(TagId::ImageWidth)?;
        let height = ifd.get_tag_value(TagId::ImageHeight)?;
        Ok((width, height))
    }

    /// Decodes a whole image. Row 0 is the bottom row; nodata becomes NaN.
    pub fn read(&mut self, image: usize) -> Result<Raster> {
        let reader = self.reader()?;
        let info = reader.image_info(image)?;
        info.read(&mut reader.file)
    }

    /// Decodes the samples inside `window`, given in bottom-up rows.
    pub fn read_window(&mut self, image: usize, window: &Window) -> Result<Raster> {
        let reader = self.reader()?;
        let info = reader.image_info(image)?;
        info.read_window(&mut reader.file, window)
    }

    /// Cell x coordinates (west to east) and y coordinates (south to north),
    /// matching the rows and columns of [`GeoTiff::read`].
    pub fn read_xy(&mut self, image: usize) -> Result<(Vec<f64>, Vec<f64>)> {
        let (width, height) = self.dimensions(image)?;
        let geo_tags = self.geo_tags(image)?;
        Ok(model_xy(&geo_tags.model, width, height))
    }

    pub fn geo_tags(&mut self, image: usize) -> Result<GeoTags> {
        let reader = self.reader()?;
        let mut geo_tags = GeoTags::parse(reader.ifd(image)?)?;
        geo_tags.directory = reader.geo_keys(image)?.clone();
        Ok(geo_tags)
    }

    /// `None` means no projection could be derived; callers assume
    /// [`Projection::wgs84`].
    pub fn projection(&mut self, image: usize) -> Result<Option<Projection>> {
        Ok(Projection::from_geo_keys(self.reader()?.geo_keys(image)?))
    }

    pub fn nodata(&mut self, image: usize) -> Result<Option<f64>> {
        raster::nodata(self.reader()?.ifd(image)?)
    }

    /// Appends one image and links it into the IFD chain. Returns the IFD
    /// offset.
    pub fn write(&mut self, encoder: &Encoder) -> Result<u64> {
        let offset = encoder.encode(self.writer()?)?;
        debug!("Wrote IFD at {offset} to {}", self.path.display());
        Ok(offset)
    }

    /// Flushes a writer and truncates the file to the last byte written.
    /// Later calls on this handle fail with [`Error::NotOpen`].
    pub fn close(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.mode, Mode::Closed) {
            Mode::Write(writer) => {
                let end = writer.next_overflow();
                let file = writer.finish()?;
                file.set_len(end)?;
                file.sync_all()?;
                info!("Closed {} at {end} bytes", self.path.display());
            }
            Mode::Read(_) => info!("Closed {}", self.path.display()),
            Mode::Unopened | Mode::Closed => {}
        }
        Ok(())
    }
}

impl Drop for GeoTiff {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close {}: {e}", self.path.display());
        }
    }
}

impl Display for GeoTiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = match &self.mode {
            Mode::Unopened => "unopened",
            Mode::Read(_) => "read",
            Mode::Write(_) => "write",
            Mode::Closed => "closed",
        };
        write!(f, "GeoTiff({}, {mode})", self.path.display())
    }
}

/// True if `path` parses as a TIFF and some image carries a model
/// transformation or tiepoint.
pub fn is_geotiff<P: AsRef<Path>>(path: P) -> bool {
    let Ok(file) = File::open(path) else {
        return false;
    };
    match Tiff::open(&mut BufReader::new(file)) {
        Ok(tiff) => tiff.ifds.iter().any(geotags::has_model_tags),
        Err(e) => {
            debug!("Not a TIFF: {e}");
            false
        }
    }
}
