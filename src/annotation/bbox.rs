//! Two-corner bounding boxes.

use std::marker::PhantomData;

use super::space::{Normalized, Pixel};

/// An axis-aligned box given by its top-left and bottom-right corners.
///
/// The `TSpace` parameter is either [`Pixel`] or [`Normalized`]. The
/// constructor does not require `min <= max`; boxes are carried through
/// exactly as annotated.
#[derive(Clone, Copy, PartialEq)]
pub struct BBox<TSpace> {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
    _space: PhantomData<TSpace>,
}

impl<TSpace> BBox<TSpace> {
    /// Creates a box from explicit corner coordinates.
    #[inline]
    pub fn from_xyxy(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
            _space: PhantomData,
        }
    }

    /// Creates a box from a `(top-left, bottom-right)` point pair.
    #[inline]
    pub fn from_corners(top_left: [f64; 2], bottom_right: [f64; 2]) -> Self {
        Self::from_xyxy(top_left[0], top_left[1], bottom_right[0], bottom_right[1])
    }

    /// Returns true if all coordinates are finite (not NaN or infinite).
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.xmin.is_finite()
            && self.ymin.is_finite()
            && self.xmax.is_finite()
            && self.ymax.is_finite()
    }
}

impl<TSpace> std::fmt::Debug for BBox<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BBox")
            .field("xmin", &self.xmin)
            .field("ymin", &self.ymin)
            .field("xmax", &self.xmax)
            .field("ymax", &self.ymax)
            .finish()
    }
}

impl BBox<Pixel> {
    /// Divides x coordinates by `image_width` and y coordinates by
    /// `image_height`. No clamping is applied.
    pub fn to_normalized(&self, image_width: f64, image_height: f64) -> BBox<Normalized> {
        BBox::from_xyxy(
            self.xmin / image_width,
            self.ymin / image_height,
            self.xmax / image_width,
            self.ymax / image_height,
        )
    }
}

impl BBox<Normalized> {
    /// Returns true if every coordinate lies in `[0, 1]`.
    pub fn is_within_unit(&self) -> bool {
        [self.xmin, self.ymin, self.xmax, self.ymax]
            .iter()
            .all(|v| (0.0..=1.0).contains(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_corners_keeps_point_order() {
        let bbox: BBox<Pixel> = BBox::from_corners([10.0, 20.0], [100.0, 80.0]);
        assert_eq!(bbox.xmin, 10.0);
        assert_eq!(bbox.ymin, 20.0);
        assert_eq!(bbox.xmax, 100.0);
        assert_eq!(bbox.ymax, 80.0);
    }

    #[test]
    fn to_normalized_divides_by_dimensions() {
        let bbox: BBox<Pixel> = BBox::from_xyxy(64.0, 48.0, 320.0, 240.0);
        let norm = bbox.to_normalized(640.0, 480.0);
        assert_eq!(norm.xmin, 0.1);
        assert_eq!(norm.ymin, 0.1);
        assert_eq!(norm.xmax, 0.5);
        assert_eq!(norm.ymax, 0.5);
        assert!(norm.is_within_unit());
    }

    #[test]
    fn out_of_range_boxes_pass_through() {
        let bbox: BBox<Pixel> = BBox::from_xyxy(-10.0, 0.0, 700.0, 480.0);
        let norm = bbox.to_normalized(640.0, 480.0);
        assert!(norm.xmin < 0.0);
        assert!(norm.xmax > 1.0);
        assert!(!norm.is_within_unit());
    }
}
