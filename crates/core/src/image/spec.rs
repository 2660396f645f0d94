//! Transformation specs, their normalized form, and the cache key derived from it.

use image::ImageFormat;
use serde::{Deserialize, Deserializer, de};
use serde_json::{Number, Value};

use prism_shared::types::ImageId;

use super::error::ImageError;

/// Largest side the engine produces for a resize or rotation.
pub const MAX_DIMENSION: u32 = 10_000;

/// Transformation request as sent by clients.
///
/// Every operation is optional. Keys this struct does not know are ignored so
/// newer clients keep working against older servers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TransformSpec {
    /// Target dimensions.
    pub resize: Option<ResizeSpec>,
    /// Clockwise rotation in degrees.
    #[serde(default, deserialize_with = "whole_number")]
    pub rotate: Option<i64>,
    /// Mirror vertically.
    pub flip: Option<bool>,
    /// Mirror horizontally.
    pub flop: Option<bool>,
    /// Reduce to a single luma channel.
    pub grayscale: Option<bool>,
    /// Output container (`jpeg`, `jpg`, `png`, `webp`, `gif`).
    pub format: Option<String>,
}

/// Requested resize dimensions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ResizeSpec {
    /// Target width in pixels.
    #[serde(default, deserialize_with = "whole_number")]
    pub width: Option<i64>,
    /// Target height in pixels.
    #[serde(default, deserialize_with = "whole_number")]
    pub height: Option<i64>,
}

/// Accepts any JSON number without a fractional part, so `90` and `90.0`
/// read the same.
fn whole_number<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    // Beyond 2^53 an f64 no longer holds every integer exactly.
    const EXACT_F64: f64 = 9_007_199_254_740_992.0;

    let Some(number) = Option::<Number>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Some(n) = number.as_i64() {
        return Ok(Some(n));
    }

    match number.as_f64() {
        #[allow(clippy::cast_possible_truncation)]
        Some(f) if f.fract() == 0.0 && f.abs() <= EXACT_F64 => Ok(Some(f as i64)),
        _ => Err(de::Error::custom(format!(
            "expected a whole number, got {number}"
        ))),
    }
}

impl TransformSpec {
    /// Parses a spec from a JSON request body.
    ///
    /// Accepts either the bare spec object or one wrapped as
    /// `{"transformations": {...}}`.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::Validation`] if the body is not a JSON object, a
    /// recognized key has the wrong type, or no recognized key is present.
    pub fn from_json(body: &[u8]) -> Result<Self, ImageError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(ImageError::validation("transformation spec is required"));
        }

        let value: Value = serde_json::from_slice(body)
            .map_err(|e| ImageError::validation(format!("invalid JSON body: {e}")))?;
        let value = match value {
            Value::Object(mut map) => match map.remove("transformations") {
                Some(inner @ Value::Object(_)) => inner,
                Some(other) => {
                    map.insert("transformations".to_string(), other);
                    Value::Object(map)
                }
                None => Value::Object(map),
            },
            _ => return Err(ImageError::validation("transformation spec must be an object")),
        };

        let spec: Self = serde_json::from_value(value)
            .map_err(|e| ImageError::validation(format!("invalid transformation spec: {e}")))?;

        if spec.is_empty() {
            return Err(ImageError::validation(
                "at least one transformation is required",
            ));
        }

        Ok(spec)
    }

    /// True if no recognized operation is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resize.is_none()
            && self.rotate.is_none()
            && self.flip.is_none()
            && self.flop.is_none()
            && self.grayscale.is_none()
            && self.format.is_none()
    }

    /// Reduces the spec to its canonical form.
    ///
    /// No-op operations disappear, rotation is taken modulo 360 and format
    /// aliases collapse, so equivalent requests share one cache key.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::Validation`] for unknown formats or oversized
    /// resize targets.
    pub fn normalize(&self) -> Result<NormalizedSpec, ImageError> {
        let resize = match self.resize {
            Some(resize) => Resize::from_spec(resize)?,
            None => None,
        };

        let rotate = match self.rotate {
            Some(degrees) => Rotation::from_degrees(degrees),
            None => None,
        };

        let format = match self.format.as_deref() {
            Some(name) => Some(OutputFormat::parse(name).ok_or_else(|| {
                ImageError::validation(format!("unsupported output format '{name}'"))
            })?),
            None => None,
        };

        Ok(NormalizedSpec {
            resize,
            rotate,
            flip: self.flip.unwrap_or(false),
            flop: self.flop.unwrap_or(false),
            grayscale: self.grayscale.unwrap_or(false),
            format,
        })
    }
}

/// Validated resize target. At least one side is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resize {
    /// Target width; `None` keeps the aspect ratio.
    pub width: Option<u32>,
    /// Target height; `None` keeps the aspect ratio.
    pub height: Option<u32>,
}

impl Resize {
    fn from_spec(spec: ResizeSpec) -> Result<Option<Self>, ImageError> {
        let width = positive_dimension(spec.width, "width")?;
        let height = positive_dimension(spec.height, "height")?;

        Ok(match (width, height) {
            (None, None) => None,
            (width, height) => Some(Self { width, height }),
        })
    }
}

fn positive_dimension(value: Option<i64>, side: &str) -> Result<Option<u32>, ImageError> {
    match value {
        Some(v) if v > 0 => match u32::try_from(v) {
            Ok(v) if v <= MAX_DIMENSION => Ok(Some(v)),
            _ => Err(ImageError::validation(format!(
                "resize {side} must not exceed {MAX_DIMENSION}"
            ))),
        },
        _ => Ok(None),
    }
}

/// Clockwise rotation, reduced to `1..360` degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    /// 90 degrees.
    Deg90,
    /// 180 degrees.
    Deg180,
    /// 270 degrees.
    Deg270,
    /// Any other angle. The canvas grows to fit the rotated image.
    Angle(u16),
}

impl Rotation {
    fn from_degrees(degrees: i64) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => None,
            90 => Some(Self::Deg90),
            180 => Some(Self::Deg180),
            270 => Some(Self::Deg270),
            // rem_euclid keeps the value in 1..360 here.
            other => u16::try_from(other).ok().map(Self::Angle),
        }
    }

    /// Angle in degrees.
    #[must_use]
    pub const fn degrees(self) -> u16 {
        match self {
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
            Self::Angle(degrees) => degrees,
        }
    }
}

/// Encodings the engine can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// JPEG.
    Jpeg,
    /// PNG.
    Png,
    /// WebP (lossless).
    WebP,
    /// GIF.
    Gif,
}

impl OutputFormat {
    /// Parses a client-supplied format name. `jpg` is an alias for `jpeg`.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::WebP),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Gif => "gif",
        }
    }

    /// File extension used for derived object keys.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Gif => "gif",
        }
    }

    /// MIME type.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
        }
    }

    /// Matching codec of the `image` crate.
    #[must_use]
    pub const fn image_format(self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
            Self::WebP => ImageFormat::WebP,
            Self::Gif => ImageFormat::Gif,
        }
    }

    /// Inverse of [`Self::image_format`]; `None` for codecs we do not serve.
    #[must_use]
    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(Self::Jpeg),
            ImageFormat::Png => Some(Self::Png),
            ImageFormat::WebP => Some(Self::WebP),
            ImageFormat::Gif => Some(Self::Gif),
            _ => None,
        }
    }
}

/// Canonical transformation. Applied as resize, rotate, flip, flop,
/// grayscale, then format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizedSpec {
    /// Resize target.
    pub resize: Option<Resize>,
    /// Rotation.
    pub rotate: Option<Rotation>,
    /// Vertical mirror.
    pub flip: bool,
    /// Horizontal mirror.
    pub flop: bool,
    /// Luma reduction.
    pub grayscale: bool,
    /// Output encoding; `None` keeps the source format.
    pub format: Option<OutputFormat>,
}

impl NormalizedSpec {
    /// Order-independent rendering of the operations.
    ///
    /// Operations are sorted by name and rendered as `name=value` joined by
    /// `;`. A spec without operations renders as `none`.
    #[must_use]
    pub fn canonical(&self) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(6);

        if self.flip {
            parts.push("flip=true".to_string());
        }
        if self.flop {
            parts.push("flop=true".to_string());
        }
        if let Some(format) = self.format {
            parts.push(format!("format={}", format.as_str()));
        }
        if self.grayscale {
            parts.push("grayscale=true".to_string());
        }
        if let Some(resize) = self.resize {
            let side = |v: Option<u32>| v.map_or_else(|| "auto".to_string(), |v| v.to_string());
            parts.push(format!(
                "resize={}x{}",
                side(resize.width),
                side(resize.height)
            ));
        }
        if let Some(rotation) = self.rotate {
            parts.push(format!("rotate={}", rotation.degrees()));
        }

        if parts.is_empty() {
            "none".to_string()
        } else {
            parts.join(";")
        }
    }
}

/// Cache key for the result of applying `spec` to `image_id`.
#[must_use]
pub fn cache_key(image_id: ImageId, spec: &NormalizedSpec) -> String {
    format!("transform:{image_id}:{}", spec.canonical())
}
