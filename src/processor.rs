use image::{
    codecs::jpeg::JpegEncoder, imageops, imageops::FilterType, DynamicImage, GenericImageView,
    ImageFormat, Rgba, RgbaImage, RgbImage,
};
use tracing::{debug, info, warn};

use crate::{
    error::{ResizeError, Result},
    layout,
    models::{ProcessedImage, Settings, SizePreset},
};

const ACCEPTED_FORMATS: [ImageFormat; 3] = [ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::Gif];

pub fn decode_source(bytes: &[u8], settings: &Settings) -> Result<DynamicImage> {
    let size = bytes.len() as u64;
    if size > settings.max_input_bytes {
        return Err(ResizeError::InputTooLarge {
            size,
            limit: settings.max_input_bytes,
        });
    }

    let format = image::guess_format(bytes).map_err(|_| ResizeError::UnsupportedFormat)?;
    if !ACCEPTED_FORMATS.contains(&format) {
        return Err(ResizeError::UnsupportedFormat);
    }

    let image = image::load_from_memory_with_format(bytes, format).map_err(ResizeError::Decode)?;
    let (width, height) = image.dimensions();
    debug!(format = ?format, width, height, "decoded source image");
    Ok(image)
}

/// Draw `source` onto a background-filled canvas of exactly the preset's size.
pub fn letterbox(source: &RgbaImage, preset: &SizePreset, settings: &Settings) -> Result<RgbImage> {
    let (target_width, target_height) = preset.dimensions();
    if target_width > settings.max_side || target_height > settings.max_side {
        return Err(ResizeError::InvalidSize {
            width: target_width,
            height: target_height,
            reason: "exceeds the maximum side length",
        });
    }

    let placement = layout::fit(source.dimensions(), preset.dimensions())?;

    let resized = imageops::resize(
        source,
        placement.width,
        placement.height,
        FilterType::Lanczos3,
    );

    let [r, g, b] = settings.background;
    let mut canvas = RgbaImage::from_pixel(target_width, target_height, Rgba([r, g, b, 255]));
    imageops::overlay(&mut canvas, &resized, placement.x as i64, placement.y as i64);

    Ok(DynamicImage::ImageRgba8(canvas).into_rgb8())
}

pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    encoder
        .encode_image(image)
        .map_err(|source| ResizeError::Encode {
            width: image.width(),
            height: image.height(),
            source,
        })?;
    Ok(buffer)
}

fn render(source: &RgbaImage, preset: &SizePreset, settings: &Settings) -> Result<ProcessedImage> {
    let canvas = letterbox(source, preset, settings)?;
    let data = encode_jpeg(&canvas, settings.jpeg_quality)?;
    Ok(ProcessedImage {
        size: preset.clone(),
        width: canvas.width(),
        height: canvas.height(),
        data,
    })
}

/// Produce one letterboxed JPEG per enabled size, in list order.
///
/// Errors that concern the input as a whole are returned. A size that fails
/// on its own is logged and left out of the results. `on_progress` receives
/// `(finished, total)` after every enabled size, including skipped ones.
pub fn process_image<F>(
    bytes: &[u8],
    sizes: &[SizePreset],
    settings: &Settings,
    mut on_progress: F,
) -> Result<Vec<ProcessedImage>>
where
    F: FnMut(usize, usize),
{
    let source = decode_source(bytes, settings)?.into_rgba8();
    let enabled: Vec<&SizePreset> = sizes.iter().filter(|size| size.enabled).collect();
    let total = enabled.len();

    let mut results = Vec::with_capacity(total);
    for (index, preset) in enabled.into_iter().enumerate() {
        match render(&source, preset, settings) {
            Ok(result) => {
                debug!(
                    label = %preset.label,
                    bytes = result.data.len(),
                    "rendered {}x{}",
                    result.width,
                    result.height
                );
                results.push(result);
            }
            Err(e) => {
                warn!(
                    label = %preset.label,
                    "skipping size {}x{}: {}",
                    preset.width,
                    preset.height,
                    e
                );
            }
        }
        on_progress(index + 1, total);
    }

    info!(produced = results.len(), requested = total, "processing finished");
    Ok(results)
}
