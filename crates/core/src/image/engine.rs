//! Pixel work: decode, apply a normalized spec, encode.
//!
//! Everything here is synchronous and CPU-bound. Callers on the async runtime
//! must run it through `tokio::task::spawn_blocking`.

use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageReader, Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};

use super::error::ProcessingError;
use super::spec::{MAX_DIMENSION, NormalizedSpec, OutputFormat, Resize, Rotation};

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Encoded transformation result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutput {
    /// Encoded bytes.
    pub data: Vec<u8>,
    /// Encoding of `data`.
    pub format: OutputFormat,
}

impl TransformOutput {
    /// MIME type of `data`.
    #[must_use]
    pub const fn content_type(&self) -> &'static str {
        self.format.content_type()
    }
}

/// Format and dimensions of an encoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    /// Detected encoding.
    pub format: OutputFormat,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Stateless transformation engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformEngine;

impl TransformEngine {
    /// Applies `spec` to the encoded image in `data`.
    ///
    /// Operations run in a fixed order: resize, rotate, flip, flop,
    /// grayscale. The result is encoded as `spec.format`, or in the source
    /// format when none is requested.
    ///
    /// # Errors
    ///
    /// Returns a [`ProcessingError`] if the input cannot be decoded, a step
    /// would produce a side longer than [`MAX_DIMENSION`], or the result
    /// cannot be encoded.
    pub fn apply(data: &[u8], spec: &NormalizedSpec) -> Result<TransformOutput, ProcessingError> {
        let source = detect_format(data)?;
        let mut img = image::load_from_memory_with_format(data, source.image_format())
            .map_err(|e| ProcessingError::Decode(e.to_string()))?;

        if let Some(resize) = spec.resize {
            img = resize_image(&img, resize)?;
        }

        img = match spec.rotate {
            Some(Rotation::Deg90) => img.rotate90(),
            Some(Rotation::Deg180) => img.rotate180(),
            Some(Rotation::Deg270) => img.rotate270(),
            Some(Rotation::Angle(degrees)) => rotate_expanded(&img, degrees)?,
            None => img,
        };

        if spec.flip {
            img = img.flipv();
        }
        if spec.flop {
            img = img.fliph();
        }
        if spec.grayscale {
            img = img.grayscale();
        }

        let format = spec.format.unwrap_or(source);
        let data = encode(img, format)?;

        Ok(TransformOutput { data, format })
    }

    /// Reads format and dimensions without decoding pixel data.
    ///
    /// # Errors
    ///
    /// Returns a [`ProcessingError`] if the bytes are not a supported image.
    pub fn probe(data: &[u8]) -> Result<ImageInfo, ProcessingError> {
        let format = detect_format(data)?;
        let (width, height) = ImageReader::with_format(Cursor::new(data), format.image_format())
            .into_dimensions()
            .map_err(|e| ProcessingError::Decode(e.to_string()))?;

        Ok(ImageInfo {
            format,
            width,
            height,
        })
    }
}

fn detect_format(data: &[u8]) -> Result<OutputFormat, ProcessingError> {
    let format = image::guess_format(data).map_err(|_| ProcessingError::UnknownFormat)?;
    OutputFormat::from_image_format(format)
        .ok_or_else(|| ProcessingError::UnsupportedFormat(format!("{format:?}").to_lowercase()))
}

fn resize_image(img: &DynamicImage, resize: Resize) -> Result<DynamicImage, ProcessingError> {
    let (width, height) = match (resize.width, resize.height) {
        (Some(width), Some(height)) => return Ok(fill(img, width, height)),
        (Some(width), None) => (width, scale_side(img.height(), width, img.width())),
        (None, Some(height)) => (scale_side(img.width(), height, img.height()), height),
        (None, None) => return Ok(img.clone()),
    };

    check_output(u64::from(width), u64::from(height))?;
    Ok(img.resize_exact(width, height, FilterType::Lanczos3))
}

/// Crops the largest centred region with the target aspect ratio, then
/// scales it to exactly `width` x `height`.
///
/// Cropping first keeps the intermediate buffer no larger than the source.
fn fill(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    let crop_width = scale_side(img.height(), width, height).min(img.width());
    let crop_height = scale_side(img.width(), height, width).min(img.height());
    let x = (img.width() - crop_width) / 2;
    let y = (img.height() - crop_height) / 2;

    img.crop_imm(x, y, crop_width, crop_height)
        .resize_exact(width, height, FilterType::Lanczos3)
}

/// Rotates clockwise by `degrees` on a canvas grown to hold the whole
/// result. Uncovered corners are transparent.
fn rotate_expanded(img: &DynamicImage, degrees: u16) -> Result<DynamicImage, ProcessingError> {
    let (src_width, src_height) = (img.width(), img.height());
    let (out_width, out_height) = rotated_bounds(src_width, src_height, degrees);
    check_output(out_width, out_height)?;
    let out_width = u32::try_from(out_width).unwrap_or(MAX_DIMENSION);
    let out_height = u32::try_from(out_height).unwrap_or(MAX_DIMENSION);

    // The canvas has to hold both the source and the rotated bounds.
    let canvas_width = out_width.max(src_width);
    let canvas_height = out_height.max(src_height);
    let mut canvas = RgbaImage::from_pixel(canvas_width, canvas_height, TRANSPARENT);
    imageops::overlay(
        &mut canvas,
        &img.to_rgba8(),
        i64::from((canvas_width - src_width) / 2),
        i64::from((canvas_height - src_height) / 2),
    );

    let theta = f32::from(degrees).to_radians();
    let rotated = rotate_about_center(&canvas, theta, Interpolation::Bilinear, TRANSPARENT);

    Ok(DynamicImage::ImageRgba8(rotated).crop_imm(
        (canvas_width - out_width) / 2,
        (canvas_height - out_height) / 2,
        out_width,
        out_height,
    ))
}

/// Bounding box of a `width` x `height` image rotated by `degrees`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn rotated_bounds(width: u32, height: u32, degrees: u16) -> (u64, u64) {
    let (sin, cos) = f64::from(degrees).to_radians().sin_cos();
    let (sin, cos) = (sin.abs(), cos.abs());
    let (width, height) = (f64::from(width), f64::from(height));

    (
        (width * cos + height * sin).ceil() as u64,
        (width * sin + height * cos).ceil() as u64,
    )
}

fn check_output(width: u64, height: u64) -> Result<(), ProcessingError> {
    let max = u64::from(MAX_DIMENSION);
    if width > max || height > max {
        return Err(ProcessingError::OutputTooLarge { width, height });
    }
    Ok(())
}

/// `side * target / reference`, rounded, never below one pixel.
///
/// Saturates at `u32::MAX`; callers bound the result before allocating.
fn scale_side(side: u32, target: u32, reference: u32) -> u32 {
    let reference = u64::from(reference.max(1));
    let scaled = (u64::from(side) * u64::from(target) + reference / 2) / reference;
    u32::try_from(scaled.max(1)).unwrap_or(u32::MAX)
}

fn encode(img: DynamicImage, format: OutputFormat) -> Result<Vec<u8>, ProcessingError> {
    // Match the colour type to what each encoder accepts.
    let img = match format {
        OutputFormat::Jpeg if img.color().has_color() => DynamicImage::ImageRgb8(img.to_rgb8()),
        OutputFormat::Jpeg => DynamicImage::ImageLuma8(img.to_luma8()),
        OutputFormat::WebP | OutputFormat::Gif => DynamicImage::ImageRgba8(img.to_rgba8()),
        OutputFormat::Png => img,
    };

    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, format.image_format())
        .map_err(|e| ProcessingError::Encode {
            format: format.as_str(),
            message: e.to_string(),
        })?;

    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, ImageFormat, Rgba, RgbaImage};
    use rstest::rstest;

    use crate::image::spec::TransformSpec;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    /// 4x2 PNG, red in the top-left pixel, blue everywhere else.
    fn marked_png() -> Vec<u8> {
        let img = RgbaImage::from_fn(4, 2, |x, y| if x == 0 && y == 0 { RED } else { BLUE });
        png_bytes(&DynamicImage::ImageRgba8(img))
    }

    fn png_bytes(img: &DynamicImage) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    fn spec(json: &str) -> NormalizedSpec {
        TransformSpec::from_json(json.as_bytes())
            .unwrap()
            .normalize()
            .unwrap()
    }

    fn decode(output: &TransformOutput) -> DynamicImage {
        image::load_from_memory(&output.data).unwrap()
    }

    #[test]
    fn test_resize_both_sides_fills() {
        let output = TransformEngine::apply(
            &marked_png(),
            &spec(r#"{"resize": {"width": 3, "height": 3}}"#),
        )
        .unwrap();

        assert_eq!(decode(&output).dimensions(), (3, 3));
        assert_eq!(output.format, OutputFormat::Png);
    }

    #[rstest]
    #[case(r#"{"resize": {"width": 8}}"#, (8, 4))]
    #[case(r#"{"resize": {"height": 1}}"#, (2, 1))]
    #[case(r#"{"resize": {"width": 1}}"#, (1, 1))]
    fn test_resize_one_side_keeps_aspect(#[case] json: &str, #[case] expected: (u32, u32)) {
        let output = TransformEngine::apply(&marked_png(), &spec(json)).unwrap();
        assert_eq!(decode(&output).dimensions(), expected);
    }

    /// Solid `width` x `height` PNG.
    fn solid_png(width: u32, height: u32) -> Vec<u8> {
        png_bytes(&DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width, height, BLUE,
        )))
    }

    #[rstest]
    #[case(1, 4, r#"{"resize": {"width": 4000}}"#)]
    #[case(4, 1, r#"{"resize": {"height": 4000}}"#)]
    #[case(1, 2000, r#"{"resize": {"width": 10000}}"#)]
    fn test_resize_rejects_oversized_derived_side(
        #[case] width: u32,
        #[case] height: u32,
        #[case] json: &str,
    ) {
        let err = TransformEngine::apply(&solid_png(width, height), &spec(json)).unwrap_err();
        assert!(
            matches!(err, ProcessingError::OutputTooLarge { .. }),
            "{json}: {err:?}"
        );
    }

    #[test]
    fn test_fill_from_tall_source() {
        let output = TransformEngine::apply(
            &solid_png(1, 400),
            &spec(r#"{"resize": {"width": 100, "height": 100}}"#),
        )
        .unwrap();
        assert_eq!(decode(&output).dimensions(), (100, 100));
    }

    #[test]
    fn test_rotate_arbitrary_angle_expands_canvas() {
        let output =
            TransformEngine::apply(&solid_png(4, 4), &spec(r#"{"rotate": 45}"#)).unwrap();
        let img = decode(&output);

        assert_eq!(img.dimensions(), (6, 6));
        assert_eq!(img.get_pixel(0, 0)[3], 0);
        assert_eq!(img.get_pixel(5, 5)[3], 0);
        assert_eq!(img.get_pixel(5, 0)[3], 0);
        assert!(img.get_pixel(3, 3)[3] > 200);
    }

    #[test]
    fn test_rotated_bounds() {
        assert_eq!(rotated_bounds(4, 4, 45), (6, 6));
        assert_eq!(rotated_bounds(100, 10, 30), (92, 59));
        // Rotation can push a source inside the limit past it.
        let (width, height) = rotated_bounds(MAX_DIMENSION, MAX_DIMENSION, 45);
        assert!(width > u64::from(MAX_DIMENSION) && height > u64::from(MAX_DIMENSION));
        assert!(check_output(width, height).is_err());
    }

    #[test]
    fn test_rotate_swaps_dimensions() {
        let output = TransformEngine::apply(&marked_png(), &spec(r#"{"rotate": 90}"#)).unwrap();
        let img = decode(&output);

        assert_eq!(img.dimensions(), (2, 4));
        // Top-left moves to top-right under a clockwise quarter turn.
        assert_eq!(img.get_pixel(1, 0), RED);
    }

    #[test]
    fn test_flip_and_flop() {
        let flipped = decode(
            &TransformEngine::apply(&marked_png(), &spec(r#"{"flip": true}"#)).unwrap(),
        );
        assert_eq!(flipped.get_pixel(0, 1), RED);

        let flopped = decode(
            &TransformEngine::apply(&marked_png(), &spec(r#"{"flop": true}"#)).unwrap(),
        );
        assert_eq!(flopped.get_pixel(3, 0), RED);
    }

    #[test]
    fn test_application_order_is_fixed() {
        // Rotating first puts the marker at (1, 0); flipping then moves it to (1, 3).
        let a = TransformEngine::apply(&marked_png(), &spec(r#"{"rotate": 90, "flip": true}"#))
            .unwrap();
        let b = TransformEngine::apply(&marked_png(), &spec(r#"{"flip": true, "rotate": 90}"#))
            .unwrap();

        assert_eq!(a, b);
        assert_eq!(decode(&a).get_pixel(1, 3), RED);
    }

    #[test]
    fn test_grayscale_reduces_channels() {
        let output =
            TransformEngine::apply(&marked_png(), &spec(r#"{"grayscale": true}"#)).unwrap();
        assert!(!decode(&output).color().has_color());
    }

    #[rstest]
    #[case("jpeg", ImageFormat::Jpeg, "image/jpeg")]
    #[case("png", ImageFormat::Png, "image/png")]
    #[case("webp", ImageFormat::WebP, "image/webp")]
    #[case("gif", ImageFormat::Gif, "image/gif")]
    fn test_format_conversion(
        #[case] name: &str,
        #[case] expected: ImageFormat,
        #[case] content_type: &str,
    ) {
        let json = format!(r#"{{"format": "{name}"}}"#);
        let output = TransformEngine::apply(&marked_png(), &spec(&json)).unwrap();

        assert_eq!(image::guess_format(&output.data).unwrap(), expected);
        assert_eq!(output.content_type(), content_type);
    }

    #[test]
    fn test_grayscale_jpeg() {
        let output = TransformEngine::apply(
            &marked_png(),
            &spec(r#"{"grayscale": true, "format": "jpg"}"#),
        )
        .unwrap();
        assert_eq!(output.format, OutputFormat::Jpeg);
    }

    #[test]
    fn test_identity_keeps_source_format() {
        let output = TransformEngine::apply(&marked_png(), &NormalizedSpec::default()).unwrap();
        assert_eq!(output.format, OutputFormat::Png);
        assert_eq!(decode(&output).dimensions(), (4, 2));
    }

    #[test]
    fn test_output_is_deterministic() {
        let spec = spec(r#"{"resize": {"width": 2, "height": 2}, "grayscale": true}"#);
        let first = TransformEngine::apply(&marked_png(), &spec).unwrap();
        let second = TransformEngine::apply(&marked_png(), &spec).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_bytes() {
        let err = TransformEngine::apply(b"definitely not an image", &NormalizedSpec::default())
            .unwrap_err();
        assert!(matches!(err, ProcessingError::UnknownFormat));
    }

    #[test]
    fn test_truncated_image() {
        let mut data = marked_png();
        data.truncate(20);

        let err = TransformEngine::apply(&data, &NormalizedSpec::default()).unwrap_err();
        assert!(matches!(err, ProcessingError::Decode(_)));
    }

    #[test]
    fn test_unsupported_source_format() {
        // TIFF signature; recognized by the sniffer but not served.
        let err = TransformEngine::probe(b"II*\x00\x08\x00\x00\x00").unwrap_err();
        assert!(matches!(err, ProcessingError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_probe() {
        let info = TransformEngine::probe(&marked_png()).unwrap();
        assert_eq!(
            info,
            ImageInfo {
                format: OutputFormat::Png,
                width: 4,
                height: 2
            }
        );
    }

    #[test]
    fn test_scale_side() {
        assert_eq!(scale_side(2, 8, 4), 4);
        assert_eq!(scale_side(1, 1, 1000), 1);
        assert_eq!(scale_side(3, 2, 4), 2);
        assert_eq!(scale_side(u32::MAX, u32::MAX, 1), u32::MAX);
    }
}
