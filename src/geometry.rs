// SPDX-License-Identifier: Apache-2.0

//! Geometry primitives shared by every mask representation: the `(height,
//! width)` pair a mask is measured against, the bounding box returned by
//! area/bbox queries, and the dense bitmap every conversion routes through.

use std::fmt;

/// A non-negative `(height, width)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Size {
    pub height: u32,
    pub width: u32,
}

impl Size {
    pub fn new(height: u32, width: u32) -> Self {
        Self { height, width }
    }

    pub fn area(&self) -> usize {
        self.height as usize * self.width as usize
    }
}

/// An axis-aligned bounding box in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl BBox {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// The degenerate box returned for an empty mask or polygon.
    pub fn empty() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }
}

impl fmt::Display for BBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BBox(left={}, top={}, width={}, height={})",
            self.left, self.top, self.width, self.height
        )
    }
}

/// A dense, column-major bitmap: pixel `(row, col)` lives at
/// `data[row + col * height]`. This layout is load-bearing — every codec in
/// this crate reads and writes it directly rather than transposing to
/// row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenseMask {
    size: Size,
    data: Vec<u8>,
}

impl DenseMask {
    /// A blank (all-zero) mask of the given size.
    pub fn new(size: Size) -> Self {
        Self {
            size,
            data: vec![0u8; size.area()],
        }
    }

    /// Wraps an existing column-major byte buffer. `data.len()` must equal
    /// `size.area()`.
    pub fn from_raw(size: Size, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), size.area());
        Self { size, data }
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn get(&self, row: u32, col: u32) -> u8 {
        self.data[row as usize + col as usize * self.size.height as usize]
    }

    pub fn set(&mut self, row: u32, col: u32, value: u8) {
        let idx = row as usize + col as usize * self.size.height as usize;
        self.data[idx] = value;
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Count of set (`1`) pixels.
    pub fn popcount(&self) -> u64 {
        self.data.iter().map(|&v| v as u64).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_mask_indexing_is_column_major() {
        let mut mask = DenseMask::new(Size::new(2, 3));
        mask.set(1, 0, 1);
        assert_eq!(mask.data()[1], 1);
        assert_eq!(mask.get(1, 0), 1);
        assert_eq!(mask.get(0, 0), 0);
    }

    #[test]
    fn bbox_display_matches_pinned_form() {
        let bbox = BBox::new(2.0, 1.0, 2.0, 4.0);
        assert_eq!(bbox.to_string(), "BBox(left=2, top=1, width=2, height=4)");
    }

    #[test]
    fn empty_bbox_is_all_zero() {
        assert_eq!(BBox::empty(), BBox::new(0.0, 0.0, 0.0, 0.0));
    }
}
