//! Axis-aligned object bounding box in source-image pixel space.

/// A bounding box stored as top-left corner plus size.
///
/// The corner is signed so that malformed boxes read from disk can still be
/// represented and reported by validation; the size is never negative.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BBox {
    pub x1: i32,
    pub y1: i32,
    pub w: u32,
    pub h: u32,
}

impl BBox {
    #[inline]
    pub fn new(x1: i32, y1: i32, w: u32, h: u32) -> Self {
        Self { x1, y1, w, h }
    }

    /// Exclusive right edge.
    #[inline]
    pub fn x2(&self) -> i64 {
        self.x1 as i64 + self.w as i64
    }

    /// Exclusive bottom edge.
    #[inline]
    pub fn y2(&self) -> i64 {
        self.y1 as i64 + self.h as i64
    }

    #[inline]
    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }

    /// Returns true if the box covers no pixels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// Returns true if the box lies completely inside a `width` x `height` image.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x1 >= 0 && self.y1 >= 0 && self.x2() <= width as i64 && self.y2() <= height as i64
    }
}
