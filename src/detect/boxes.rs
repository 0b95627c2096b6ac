//! Detector box geometry and category codes.
//!
//! The primary detector reports boxes in relative top-left/size form together
//! with a numeric category code. This module maps those onto pixel corner
//! boxes for persistence and cropping, and back onto normalized center-format
//! coordinates for dataset export.

use serde::{Deserialize, Serialize};

/// Semantic detector category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Wild or domestic animal.
    Animal,
    /// Human.
    Person,
    /// Vehicle.
    Vehicle,
    /// Unrecognized category code.
    Unknown,
}

impl Category {
    /// Map a detector category code onto its semantic category.
    ///
    /// Unrecognized codes map to [`Category::Unknown`] rather than failing;
    /// the detection is kept but receives no species.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            crate::constants::category_codes::ANIMAL => Self::Animal,
            crate::constants::category_codes::PERSON => Self::Person,
            crate::constants::category_codes::VEHICLE => Self::Vehicle,
            _ => Self::Unknown,
        }
    }
}

/// Box in relative image coordinates as reported by the detector:
/// top-left corner plus size, each component in `[0, 1]`.
/// Serialized as the four-element array `[x, y, w, h]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelativeBox {
    /// Left edge as a fraction of image width.
    pub x: f32,
    /// Top edge as a fraction of image height.
    pub y: f32,
    /// Width as a fraction of image width.
    pub w: f32,
    /// Height as a fraction of image height.
    pub h: f32,
}

impl RelativeBox {
    /// Convert to pixel corner coordinates against a concrete image size.
    ///
    /// Coordinates are rounded to the nearest pixel and clamped so that
    /// `0 <= x1 <= x2 <= width` and `0 <= y1 <= y2 <= height` even when the
    /// detector reports values slightly outside `[0, 1]`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn to_pixels(&self, width: u32, height: u32) -> PixelBox {
        let w = f64::from(width);
        let h = f64::from(height);

        let scale = |v: f64, limit: f64| -> u32 {
            let px = (v * limit).round();
            if px <= 0.0 {
                0
            } else if px >= limit {
                limit as u32
            } else {
                px as u32
            }
        };

        let x1 = scale(f64::from(self.x), w);
        let y1 = scale(f64::from(self.y), h);
        let x2 = scale(f64::from(self.x) + f64::from(self.w), w);
        let y2 = scale(f64::from(self.y) + f64::from(self.h), h);

        PixelBox {
            x1,
            y1,
            x2: x2.max(x1),
            y2: y2.max(y1),
        }
    }
}

impl Serialize for RelativeBox {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        [self.x, self.y, self.w, self.h].serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RelativeBox {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let [x, y, w, h] = <[f32; 4]>::deserialize(deserializer)?;
        Ok(Self { x, y, w, h })
    }
}

/// Axis-aligned box in pixel corner coordinates.
///
/// Invariant: `x1 <= x2` and `y1 <= y2`, both within the image the box was
/// mapped against. Serialized as the four-element array `[x1, y1, x2, y2]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBox {
    /// Left edge.
    pub x1: u32,
    /// Top edge.
    pub y1: u32,
    /// Right edge.
    pub x2: u32,
    /// Bottom edge.
    pub y2: u32,
}

impl PixelBox {
    /// Box width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    /// Box height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    /// Convert to normalized center-format coordinates `[xc, yc, w, h]`,
    /// each clamped to `[0, 1]`, against a concrete image size.
    #[must_use]
    pub fn normalize(&self, width: u32, height: u32) -> NormalizedBox {
        let w = f64::from(width);
        let h = f64::from(height);
        let clamp01 = |v: f64| v.clamp(0.0, 1.0);

        NormalizedBox {
            xc: clamp01(f64::from(self.x1 + self.x2) / 2.0 / w),
            yc: clamp01(f64::from(self.y1 + self.y2) / 2.0 / h),
            w: clamp01(f64::from(self.width()) / w),
            h: clamp01(f64::from(self.height()) / h),
        }
    }
}

impl Serialize for PixelBox {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        [self.x1, self.y1, self.x2, self.y2].serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PixelBox {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let [x1, y1, x2, y2] = <[u32; 4]>::deserialize(deserializer)?;
        Ok(Self { x1, y1, x2, y2 })
    }
}

/// Box in normalized center-format coordinates used by label files.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedBox {
    /// Horizontal center as a fraction of image width.
    pub xc: f64,
    /// Vertical center as a fraction of image height.
    pub yc: f64,
    /// Width as a fraction of image width.
    pub w: f64,
    /// Height as a fraction of image height.
    pub h: f64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_code() {
        assert_eq!(Category::from_code("1"), Category::Animal);
        assert_eq!(Category::from_code("2"), Category::Person);
        assert_eq!(Category::from_code("3"), Category::Vehicle);
        assert_eq!(Category::from_code("4"), Category::Unknown);
        assert_eq!(Category::from_code(""), Category::Unknown);
        assert_eq!(Category::from_code("animal"), Category::Unknown);
    }

    #[test]
    fn test_category_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Category::Animal).unwrap(), "\"animal\"");
        assert_eq!(serde_json::to_string(&Category::Person).unwrap(), "\"person\"");
    }

    #[test]
    fn test_to_pixels_rounds_to_nearest() {
        let rel = RelativeBox {
            x: 0.25,
            y: 0.25,
            w: 0.5,
            h: 0.5,
        };
        let px = rel.to_pixels(400, 400);
        assert_eq!(
            px,
            PixelBox {
                x1: 100,
                y1: 100,
                x2: 300,
                y2: 300
            }
        );
    }

    #[test]
    fn test_to_pixels_rounding_not_truncation() {
        // 0.4999 * 100 = 49.99 rounds to 50, truncation would give 49.
        let rel = RelativeBox {
            x: 0.4999,
            y: 0.0,
            w: 0.25,
            h: 0.25,
        };
        let px = rel.to_pixels(100, 100);
        assert_eq!(px.x1, 50);
    }

    #[test]
    fn test_to_pixels_clamps_out_of_range_input() {
        let rel = RelativeBox {
            x: -0.1,
            y: 0.9,
            w: 0.05,
            h: 0.5,
        };
        let px = rel.to_pixels(200, 100);
        assert_eq!(px.x1, 0);
        assert!(px.x2 >= px.x1);
        assert_eq!(px.y2, 100);
        assert!(px.y1 <= px.y2);
    }

    #[test]
    fn test_to_pixels_degenerate_box_keeps_order() {
        let rel = RelativeBox {
            x: 1.0,
            y: 1.0,
            w: 0.0,
            h: 0.0,
        };
        let px = rel.to_pixels(640, 480);
        assert_eq!(px.x1, 640);
        assert_eq!(px.x2, 640);
        assert_eq!(px.y1, 480);
        assert_eq!(px.y2, 480);
    }

    #[test]
    fn test_normalize_center_format() {
        let px = PixelBox {
            x1: 100,
            y1: 100,
            x2: 300,
            y2: 300,
        };
        let norm = px.normalize(400, 400);
        assert_eq!(norm.xc, 0.5);
        assert_eq!(norm.yc, 0.5);
        assert_eq!(norm.w, 0.5);
        assert_eq!(norm.h, 0.5);
    }

    #[test]
    fn test_normalize_clamps_to_unit_interval() {
        let px = PixelBox {
            x1: 0,
            y1: 0,
            x2: 400,
            y2: 400,
        };
        let norm = px.normalize(400, 400);
        assert!(norm.xc <= 1.0 && norm.yc <= 1.0);
        assert_eq!(norm.w, 1.0);
        assert_eq!(norm.h, 1.0);
    }

    #[test]
    fn test_pixel_mapping_round_trips_within_tolerance() {
        // Mapping to integer pixels and back loses at most one pixel per axis.
        let rel = RelativeBox {
            x: 0.13,
            y: 0.21,
            w: 0.33,
            h: 0.46,
        };
        let norm = rel.to_pixels(640, 480).normalize(640, 480);
        assert!((norm.xc - f64::from(rel.x + rel.w / 2.0)).abs() < 0.005);
        assert!((norm.yc - f64::from(rel.y + rel.h / 2.0)).abs() < 0.005);
        assert!((norm.w - f64::from(rel.w)).abs() < 0.005);
        assert!((norm.h - f64::from(rel.h)).abs() < 0.005);
    }

    #[test]
    fn test_relative_box_deserializes_from_array() {
        let rel: RelativeBox = serde_json::from_str("[0.1,0.2,0.3,0.4]").unwrap();
        assert_eq!(
            rel,
            RelativeBox {
                x: 0.1,
                y: 0.2,
                w: 0.3,
                h: 0.4
            }
        );
    }

    #[test]
    fn test_pixel_box_round_trips_as_array() {
        let px = PixelBox {
            x1: 1,
            y1: 2,
            x2: 3,
            y2: 4,
        };
        let json = serde_json::to_string(&px).unwrap();
        assert_eq!(json, "[1,2,3,4]");
        let back: PixelBox = serde_json::from_str(&json).unwrap();
        assert_eq!(back, px);
    }
}
