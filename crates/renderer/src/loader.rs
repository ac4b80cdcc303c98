//! Decoding wallpapers off the GPU thread at a best-fit resolution.

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Seek};
use std::path::PathBuf;
use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::{ImageReader, RgbaImage};

/// Produces a decoded picture sized for a target surface.
///
/// Failures are reported as `None`: "no image" is a normal outcome the caller
/// must handle, never an error crossing the thread boundary.
pub trait ImageLoader: Send + Sync {
    fn load(&self, target_width: u32, target_height: u32) -> Option<RgbaImage>;
}

/// Loader used when no wallpaper is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyLoader;

impl ImageLoader for EmptyLoader {
    fn load(&self, _target_width: u32, _target_height: u32) -> Option<RgbaImage> {
        None
    }
}

pub trait ReadSeek: BufRead + Seek + Send {}

impl<T: BufRead + Seek + Send> ReadSeek for T {}

/// An addressable encoded image that can be opened more than once.
pub trait ImageSource: Send + Sync + fmt::Debug {
    fn open(&self) -> io::Result<Box<dyn ReadSeek>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSource(pub PathBuf);

impl ImageSource for FileSource {
    fn open(&self) -> io::Result<Box<dyn ReadSeek>> {
        Ok(Box::new(BufReader::new(File::open(&self.0)?)))
    }
}

#[derive(Clone)]
pub struct MemorySource(pub Arc<[u8]>);

impl fmt::Debug for MemorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MemorySource")
            .field(&format_args!("{} bytes", self.0.len()))
            .finish()
    }
}

impl ImageSource for MemorySource {
    fn open(&self) -> io::Result<Box<dyn ReadSeek>> {
        Ok(Box::new(Cursor::new(Arc::clone(&self.0))))
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum LoadError {
    #[error("failed to read source: {0}")]
    Io(#[from] io::Error),
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("source reports an empty image")]
    EmptySource,
}

/// Decodes from an [`ImageSource`], downsampling by a power of two.
#[derive(Debug, Clone)]
pub struct SourceLoader<S> {
    source: S,
}

impl<S: ImageSource> SourceLoader<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn try_load(&self, target_width: u32, target_height: u32) -> Result<RgbaImage, LoadError> {
        // Header only: no pixel data is decoded here.
        let native = ImageReader::new(self.source.open()?)
            .with_guessed_format()?
            .into_dimensions()?;
        if native.0 == 0 || native.1 == 0 {
            return Err(LoadError::EmptySource);
        }
        let factor = downsample_factor(native, (target_width, target_height));

        let decoded = ImageReader::new(self.source.open()?)
            .with_guessed_format()?
            .decode()?
            .to_rgba8();
        if factor == 1 {
            return Ok(decoded);
        }

        let (width, height) = decoded.dimensions();
        tracing::debug!(
            native_width = width,
            native_height = height,
            factor,
            "downsampling wallpaper"
        );
        Ok(imageops::resize(
            &decoded,
            (width / factor).max(1),
            (height / factor).max(1),
            FilterType::Triangle,
        ))
    }
}

impl<S: ImageSource> ImageLoader for SourceLoader<S> {
    fn load(&self, target_width: u32, target_height: u32) -> Option<RgbaImage> {
        match self.try_load(target_width, target_height) {
            Ok(image) => Some(image),
            Err(err) => {
                tracing::warn!(source = ?self.source, error = %err, "failed to load wallpaper");
                None
            }
        }
    }
}

/// Largest power-of-two `f` that keeps `native / f >= target` on both axes.
///
/// Returns 1 for degenerate inputs or when the source is already no larger
/// than the target.
pub fn downsample_factor(native: (u32, u32), target: (u32, u32)) -> u32 {
    let (native_w, native_h) = native;
    let (target_w, target_h) = target;
    if native_w == 0 || native_h == 0 || target_w == 0 || target_h == 0 {
        return 1;
    }

    let mut factor = 1u32;
    while let Some(next) = factor.checked_mul(2) {
        if native_w / next < target_w || native_h / next < target_h {
            break;
        }
        factor = next;
    }
    factor
}

/// Smallest power-of-two `f` that brings both axes of `dims / f` within
/// `max_dimension`. A limit of zero means unknown and yields 1.
pub fn limit_factor(dims: (u32, u32), max_dimension: u32) -> u32 {
    if max_dimension == 0 {
        return 1;
    }
    let largest = dims.0.max(dims.1);
    let mut factor = 1u32;
    while largest / factor > max_dimension {
        match factor.checked_mul(2) {
            Some(next) => factor = next,
            None => break,
        }
    }
    factor
}

/// Shrinks `image` by [`limit_factor`] so it can become a single texture.
pub fn fit_within(image: RgbaImage, max_dimension: u32) -> RgbaImage {
    let (width, height) = image.dimensions();
    let factor = limit_factor((width, height), max_dimension);
    if factor == 1 {
        return image;
    }
    tracing::debug!(
        width,
        height,
        max_dimension,
        factor,
        "downsampling wallpaper to the texture limit"
    );
    imageops::resize(
        &image,
        (width / factor).max(1),
        (height / factor).max(1),
        FilterType::Triangle,
    )
}

const LUMA_SAMPLES_PER_AXIS: u32 = 64;
const TARGET_LUMA: f32 = 0.45;

/// Brightness correction for a picture: mean BT.709 luminance over a strided
/// grid, mapped to `0.45 / L` and clamped to `0.6..=1.2`.
pub fn brightness_factor(image: &RgbaImage) -> f32 {
    let luma = mean_luminance(image);
    (TARGET_LUMA / luma.max(0.01)).clamp(0.6, 1.2)
}

pub fn mean_luminance(image: &RgbaImage) -> f32 {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return 0.0;
    }
    let step_x = (width / LUMA_SAMPLES_PER_AXIS).max(1);
    let step_y = (height / LUMA_SAMPLES_PER_AXIS).max(1);

    let mut total = 0.0f64;
    let mut count = 0u32;
    for y in (0..height).step_by(step_y as usize) {
        for x in (0..width).step_by(step_x as usize) {
            let [r, g, b, _] = image.get_pixel(x, y).0;
            total += 0.2126 * f64::from(r) + 0.7152 * f64::from(g) + 0.0722 * f64::from(b);
            count += 1;
        }
    }
    (total / f64::from(count.max(1)) / 255.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};

    fn encoded_png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, Rgba(color));
        let mut bytes = Cursor::new(Vec::new());
        image
            .write_to(&mut bytes, ImageFormat::Png)
            .expect("encode fixture");
        bytes.into_inner()
    }

    #[test]
    fn factor_is_largest_power_of_two_that_stays_above_target() {
        assert_eq!(downsample_factor((4000, 3000), (1000, 750)), 4);
        assert_eq!(downsample_factor((4000, 3000), (1001, 750)), 2);
        assert_eq!(downsample_factor((8192, 8192), (1, 1)), 8192);
    }

    #[test]
    fn factor_holds_for_many_dimension_pairs() {
        for native_w in [1u32, 7, 640, 1920, 4032, 12000] {
            for native_h in [1u32, 9, 480, 1080, 3024] {
                for target in [(1u32, 1u32), (320, 240), (1080, 1920), (1920, 1080), (5000, 5000)] {
                    let f = downsample_factor((native_w, native_h), target);
                    assert!(f.is_power_of_two());
                    if native_w >= target.0 && native_h >= target.1 {
                        assert!(native_w / f >= target.0 && native_h / f >= target.1);
                        assert!(native_w / (f * 2) < target.0 || native_h / (f * 2) < target.1);
                    } else {
                        assert_eq!(f, 1);
                    }
                }
            }
        }
    }

    #[test]
    fn degenerate_inputs_use_factor_one() {
        assert_eq!(downsample_factor((0, 100), (10, 10)), 1);
        assert_eq!(downsample_factor((100, 100), (0, 10)), 1);
        assert_eq!(downsample_factor((500, 500), (1000, 1000)), 1);
    }

    #[test]
    fn panorama_is_shrunk_until_both_axes_fit_the_limit() {
        assert_eq!(downsample_factor((20_000, 1080), (1920, 1080)), 1);
        assert_eq!(limit_factor((20_000, 1080), 16_384), 2);
        assert_eq!(limit_factor((20_000, 1080), 8192), 4);
        assert_eq!(limit_factor((1080, 40_000), 8192), 8);
        assert_eq!(limit_factor((8192, 8192), 8192), 1);
        assert_eq!(limit_factor((20_000, 1080), 0), 1);

        let strip = RgbaImage::from_pixel(300, 6, Rgba([10, 20, 30, 255]));
        let fitted = fit_within(strip, 64);
        assert_eq!(fitted.dimensions(), (37, 1));
        assert!(fitted.width() <= 64);

        let small = RgbaImage::new(32, 32);
        assert_eq!(fit_within(small, 64).dimensions(), (32, 32));
    }

    #[test]
    fn empty_loader_never_produces_an_image() {
        assert!(EmptyLoader.load(1920, 1080).is_none());
    }

    #[test]
    fn file_source_decodes_and_downsamples() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("wall.png");
        std::fs::write(&path, encoded_png(64, 32, [10, 20, 30, 255])).expect("write fixture");

        let loader = SourceLoader::new(FileSource(path));
        let image = loader.load(16, 8).expect("decoded image");
        assert_eq!(image.dimensions(), (16, 8));

        let full = loader.load(64, 64).expect("decoded image");
        assert_eq!(full.dimensions(), (64, 32));
    }

    #[test]
    fn memory_source_sniffs_format_from_content() {
        let bytes: Arc<[u8]> = encoded_png(8, 8, [255, 255, 255, 255]).into();
        let loader = SourceLoader::new(MemorySource(bytes));
        let image = loader.load(8, 8).expect("decoded image");
        assert_eq!(image.get_pixel(0, 0).0, [255, 255, 255, 255]);
    }

    #[test]
    fn unreadable_or_corrupt_sources_yield_none() {
        let missing = SourceLoader::new(FileSource(PathBuf::from("/nonexistent/wall.png")));
        assert!(missing.load(100, 100).is_none());

        let mut bytes = encoded_png(16, 16, [0, 0, 0, 255]);
        bytes.truncate(bytes.len() / 2);
        let corrupt = SourceLoader::new(MemorySource(bytes.into()));
        assert!(corrupt.load(16, 16).is_none());

        let garbage = SourceLoader::new(MemorySource(Arc::from(&b"not an image"[..])));
        assert!(garbage.load(16, 16).is_none());
    }

    #[test]
    fn brightness_lifts_dark_and_tames_bright_pictures() {
        let dark = RgbaImage::from_pixel(200, 100, Rgba([5, 5, 5, 255]));
        let bright = RgbaImage::from_pixel(200, 100, Rgba([255, 255, 255, 255]));
        let mid = RgbaImage::from_pixel(10, 10, Rgba([115, 115, 115, 255]));

        assert_eq!(brightness_factor(&dark), 1.2);
        assert_eq!(brightness_factor(&bright), 0.6);
        assert!((brightness_factor(&mid) - 1.0).abs() < 0.01);
    }

    #[test]
    fn luminance_uses_bt709_weights() {
        let green = RgbaImage::from_pixel(4, 4, Rgba([0, 255, 0, 255]));
        assert!((mean_luminance(&green) - 0.7152).abs() < 1e-4);
        assert_eq!(mean_luminance(&RgbaImage::new(0, 0)), 0.0);
    }
}
