use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};

use crate::error::{Error, Result};

/// Icon shipped with the crate, used when no icon source is given.
const DEFAULT_ICON: &[u8] = include_bytes!("../assets/icon.png");

/// An RGBA8 image, cheap to clone.
#[derive(Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    rgba: Arc<[u8]>,
}

impl Bitmap {
    pub fn from_rgba(rgba: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 || rgba.len() != (width as usize * height as usize * 4) {
            return Err(Error::InvalidIcon);
        }

        Ok(Self {
            width,
            height,
            rgba: rgba.into(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    fn into_image(self) -> Result<DynamicImage> {
        RgbaImage::from_raw(self.width, self.height, self.rgba.to_vec())
            .map(DynamicImage::ImageRgba8)
            .ok_or(Error::InvalidIcon)
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl From<RgbaImage> for Bitmap {
    fn from(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            rgba: image.into_raw().into(),
        }
    }
}

/// Pixel size every icon of a tray is scaled to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconScale {
    pub width: u32,
    pub height: u32,
}

impl IconScale {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn square(size: u32) -> Self {
        Self::new(size, size)
    }
}

/// Where a tray icon comes from.
#[derive(Debug, Clone)]
pub enum IconSource {
    Path(PathBuf),
    /// `file://` or `http(s)://` location.
    Url(String),
    Bitmap(Bitmap),
    Image(DynamicImage),
}

impl IconSource {
    fn location(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Url(url) => url.clone(),
            Self::Bitmap(_) => "<bitmap>".into(),
            Self::Image(_) => "<image>".into(),
        }
    }
}

impl From<PathBuf> for IconSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&std::path::Path> for IconSource {
    fn from(path: &std::path::Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<Bitmap> for IconSource {
    fn from(bitmap: Bitmap) -> Self {
        Self::Bitmap(bitmap)
    }
}

impl From<DynamicImage> for IconSource {
    fn from(image: DynamicImage) -> Self {
        Self::Image(image)
    }
}

fn load_error<E>(location: String) -> impl FnOnce(E) -> Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    move |e| Error::IconLoad {
        location,
        source: e.into(),
    }
}

fn fetch(url: &str) -> Result<Vec<u8>> {
    if let Some(path) = url.strip_prefix("file://") {
        return std::fs::read(path).map_err(load_error(url.to_string()));
    }

    if url.starts_with("http://") || url.starts_with("https://") {
        tracing::debug!("Fetching icon from {url}");
        return reqwest::blocking::get(url)
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.bytes())
            .map(|b| b.to_vec())
            .map_err(load_error(url.to_string()));
    }

    Err(load_error(url.to_string())(format!(
        "unsupported url scheme in `{url}`"
    )))
}

fn decode(source: IconSource) -> Result<DynamicImage> {
    let location = source.location();

    let bytes = match source {
        IconSource::Path(path) => std::fs::read(path).map_err(load_error(location.clone()))?,
        IconSource::Url(url) => fetch(&url)?,
        IconSource::Bitmap(bitmap) => return bitmap.into_image(),
        IconSource::Image(image) => return Ok(image),
    };

    image::load_from_memory(&bytes).map_err(load_error(location))
}

/// Loads the default icon bundled with the crate.
pub fn default_icon(scale: IconScale) -> Result<Bitmap> {
    let image = image::load_from_memory(DEFAULT_ICON).map_err(load_error("<default>".into()))?;
    resize(image, scale)
}

fn resize(image: DynamicImage, scale: IconScale) -> Result<Bitmap> {
    let image = if image.width() == scale.width && image.height() == scale.height {
        image
    } else {
        image.resize_exact(scale.width, scale.height, FilterType::Lanczos3)
    };

    let image = image.to_rgba8();
    let (width, height) = image.dimensions();
    Bitmap::from_rgba(image.into_raw(), width, height)
}

/// Loads `source` and scales it to `scale`, falling back to the bundled icon when there is no source.
pub fn load(source: Option<IconSource>, scale: IconScale) -> Result<Bitmap> {
    if scale.width == 0 || scale.height == 0 {
        return Err(Error::InvalidIcon);
    }

    match source {
        Some(source) => resize(decode(source)?, scale),
        None => default_icon(scale),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(dir: &std::path::Path, size: u32) -> PathBuf {
        let path = dir.join("icon.png");
        RgbaImage::from_pixel(size, size, image::Rgba([200, 30, 30, 255]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn scales_png_file_to_requested_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), 64);

        let bitmap = load(Some(IconSource::Path(path)), IconScale::square(24)).unwrap();
        assert_eq!((bitmap.width(), bitmap.height()), (24, 24));
        assert_eq!(bitmap.rgba().len(), 24 * 24 * 4);
    }

    #[test]
    fn file_url_is_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), 32);
        let url = format!("file://{}", path.display());

        let bitmap = load(Some(IconSource::Url(url)), IconScale::new(16, 20)).unwrap();
        assert_eq!((bitmap.width(), bitmap.height()), (16, 20));
    }

    #[test]
    fn missing_source_falls_back_to_bundled_icon() {
        let bitmap = load(None, IconScale::square(22)).unwrap();
        assert_eq!((bitmap.width(), bitmap.height()), (22, 22));
    }

    #[test]
    fn zero_scale_is_rejected_without_a_source() {
        assert!(matches!(load(None, IconScale::new(0, 0)), Err(Error::InvalidIcon)));
        assert!(matches!(load(None, IconScale::new(22, 0)), Err(Error::InvalidIcon)));
    }

    #[test]
    fn unreadable_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.png");

        let err = load(Some(IconSource::Path(path)), IconScale::square(16)).unwrap_err();
        assert!(matches!(err, Error::IconLoad { .. }));
    }

    #[test]
    fn undecodable_bytes_are_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        let err = load(Some(IconSource::Path(path)), IconScale::square(16)).unwrap_err();
        assert!(matches!(err, Error::IconLoad { .. }));
    }

    #[test]
    fn unknown_url_scheme_is_rejected() {
        let source = IconSource::Url("ftp://example.com/icon.png".into());
        assert!(matches!(
            load(Some(source), IconScale::square(16)),
            Err(Error::IconLoad { .. })
        ));
    }

    #[test]
    fn bitmap_source_is_rescaled() {
        let bitmap = Bitmap::from_rgba(vec![255; 8 * 8 * 4], 8, 8).unwrap();
        let scaled = load(Some(bitmap.into()), IconScale::square(16)).unwrap();
        assert_eq!((scaled.width(), scaled.height()), (16, 16));
    }

    #[test]
    fn malformed_bitmap_is_rejected() {
        assert!(matches!(
            Bitmap::from_rgba(vec![0; 10], 2, 2),
            Err(Error::InvalidIcon)
        ));
        assert!(matches!(
            Bitmap::from_rgba(vec![], 0, 0),
            Err(Error::InvalidIcon)
        ));
    }
}
