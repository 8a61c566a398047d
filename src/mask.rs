// SPDX-License-Identifier: Apache-2.0

//! The four interchangeable segmentation-mask representations, the
//! conversion matrix between them, and the `area`/`bbox` measures.

use std::fmt;

use crate::error::Error;
use crate::geometry::{BBox, DenseMask, Size};
use crate::raster;
use crate::rle;

/// One of the four segmentation representations a COCO annotation can
/// carry.
///
/// `Polygons` carries no size of its own; every other variant is
/// self-contained. `PolygonsRS` is never produced by document parsing — it
/// only arises from in-memory construction or from converting another
/// variant with a known size.
#[derive(Debug, Clone, PartialEq)]
pub enum Segmentation {
    Polygons(Vec<Vec<f64>>),
    PolygonsRS { size: Size, polygons: Vec<Vec<f64>> },
    Rle { size: Size, counts: Vec<u32> },
    CocoRle { size: Size, counts: String },
}

/// Discriminant for [`Segmentation::convert`]'s target representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Polygons,
    PolygonsRS,
    Rle,
    CocoRle,
}

fn fmt_polygons(f: &mut fmt::Formatter<'_>, polygons: &[Vec<f64>]) -> fmt::Result {
    write!(f, "[")?;
    for (i, ring) in polygons.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "[")?;
        for (j, v) in ring.iter().enumerate() {
            if j > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, "]")?;
    }
    write!(f, "]")
}

impl fmt::Display for Segmentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segmentation::Polygons(polygons) => {
                write!(f, "Polygons(counts=")?;
                fmt_polygons(f, polygons)?;
                write!(f, ")")
            }
            Segmentation::PolygonsRS { size, polygons } => {
                write!(f, "PolygonsRS(size=[{}, {}], counts=", size.height, size.width)?;
                fmt_polygons(f, polygons)?;
                write!(f, ")")
            }
            Segmentation::Rle { size, counts } => {
                write!(
                    f,
                    "RLE(size=[{}, {}], counts={:?})",
                    size.height, size.width, counts
                )
            }
            Segmentation::CocoRle { size, counts } => {
                write!(
                    f,
                    "COCO_RLE(size=[{}, {}], counts='{}')",
                    size.height, size.width, counts
                )
            }
        }
    }
}

impl Segmentation {
    pub fn kind(&self) -> Kind {
        match self {
            Segmentation::Polygons(_) => Kind::Polygons,
            Segmentation::PolygonsRS { .. } => Kind::PolygonsRS,
            Segmentation::Rle { .. } => Kind::Rle,
            Segmentation::CocoRle { .. } => Kind::CocoRle,
        }
    }

    /// The size this segmentation carries, if any. Only `Polygons` lacks
    /// one.
    pub fn size(&self) -> Option<Size> {
        match self {
            Segmentation::Polygons(_) => None,
            Segmentation::PolygonsRS { size, .. }
            | Segmentation::Rle { size, .. }
            | Segmentation::CocoRle { size, .. } => Some(*size),
        }
    }

    /// Decode to a dense column-major bitmap. `size` is required only when
    /// `self` is `Polygons`.
    pub fn decode(&self, size: Option<Size>) -> Result<DenseMask, Error> {
        match self {
            Segmentation::Polygons(rings) => {
                let size = size.ok_or(Error::MissingSize)?;
                raster::rasterize(rings, size)
            }
            Segmentation::PolygonsRS { size, polygons } => raster::rasterize(polygons, *size),
            Segmentation::Rle { size, counts } => rle::decode(*size, counts),
            Segmentation::CocoRle { size, counts } => rle::decode_coco_rle(*size, counts),
        }
    }

    /// Pixel area. For `Rle`/`CocoRle` this sums counts at odd (0-indexed)
    /// positions without materialising the bitmap. For `PolygonsRS` it
    /// rasterises and counts set pixels. `Polygons` always fails with
    /// [`Error::MissingSize`] since it carries no size to rasterise against.
    pub fn area(&self) -> Result<u64, Error> {
        match self {
            Segmentation::Polygons(_) => Err(Error::MissingSize),
            Segmentation::PolygonsRS { size, polygons } => {
                Ok(raster::rasterize(polygons, *size)?.popcount())
            }
            Segmentation::Rle { size, counts } => {
                rle_checksum(*size, counts)?;
                Ok(area_from_counts(counts))
            }
            Segmentation::CocoRle { size, counts } => {
                let counts = rle::unpack_counts(counts)?;
                rle_checksum(*size, &counts).map_err(as_coco_rle_error)?;
                Ok(area_from_counts(&counts))
            }
        }
    }

    /// Bounding box. For polygon variants this is the extent of the raw
    /// vertex coordinates, not the rasterised mask's extent. For
    /// `Rle`/`CocoRle` it is the extent of set pixels, found by scanning
    /// runs.
    pub fn bbox(&self) -> Result<BBox, Error> {
        match self {
            Segmentation::Polygons(rings) => Ok(bbox_from_vertices(rings)),
            Segmentation::PolygonsRS { polygons, .. } => Ok(bbox_from_vertices(polygons)),
            Segmentation::Rle { size, counts } => {
                let dense = rle::decode(*size, counts)?;
                Ok(bbox_from_dense(&dense))
            }
            Segmentation::CocoRle { size, counts } => {
                let dense = rle::decode_coco_rle(*size, counts)?;
                Ok(bbox_from_dense(&dense))
            }
        }
    }

    /// Convert to another segmentation representation. `size` is consulted
    /// only when `self` is `Polygons`, which carries no size of its own;
    /// every other source variant uses its own size and `size` is ignored.
    pub fn convert(&self, target: Kind, size: Option<Size>) -> Result<Segmentation, Error> {
        use Kind::*;
        match (self, target) {
            (Segmentation::Polygons(p), Polygons) => Ok(Segmentation::Polygons(p.clone())),
            (Segmentation::Polygons(p), PolygonsRS) => Ok(Segmentation::PolygonsRS {
                size: size.ok_or(Error::MissingSize)?,
                polygons: p.clone(),
            }),
            (Segmentation::Polygons(p), Rle) => {
                let sz = size.ok_or(Error::MissingSize)?;
                let dense = raster::rasterize(p, sz)?;
                Ok(Segmentation::Rle {
                    size: sz,
                    counts: rle::encode(&dense),
                })
            }
            (Segmentation::Polygons(p), CocoRle) => {
                let sz = size.ok_or(Error::MissingSize)?;
                let dense = raster::rasterize(p, sz)?;
                Ok(Segmentation::CocoRle {
                    size: sz,
                    counts: rle::pack_counts(&rle::encode(&dense)),
                })
            }

            (Segmentation::PolygonsRS { polygons, .. }, Polygons) => {
                Ok(Segmentation::Polygons(polygons.clone()))
            }
            (Segmentation::PolygonsRS { .. }, PolygonsRS) => Ok(self.clone()),
            (Segmentation::PolygonsRS { size, polygons }, Rle) => {
                let dense = raster::rasterize(polygons, *size)?;
                Ok(Segmentation::Rle {
                    size: *size,
                    counts: rle::encode(&dense),
                })
            }
            (Segmentation::PolygonsRS { size, polygons }, CocoRle) => {
                let dense = raster::rasterize(polygons, *size)?;
                Ok(Segmentation::CocoRle {
                    size: *size,
                    counts: rle::pack_counts(&rle::encode(&dense)),
                })
            }

            (Segmentation::Rle { size, counts }, Polygons) => {
                let dense = rle::decode(*size, counts)?;
                Ok(Segmentation::Polygons(raster::trace_contours(&dense)))
            }
            (Segmentation::Rle { size, counts }, PolygonsRS) => {
                let dense = rle::decode(*size, counts)?;
                Ok(Segmentation::PolygonsRS {
                    size: *size,
                    polygons: raster::trace_contours(&dense),
                })
            }
            (Segmentation::Rle { .. }, Rle) => Ok(self.clone()),
            (Segmentation::Rle { size, counts }, CocoRle) => Ok(Segmentation::CocoRle {
                size: *size,
                counts: rle::pack_counts(counts),
            }),

            (Segmentation::CocoRle { size, counts }, Polygons) => {
                let dense = rle::decode_coco_rle(*size, counts)?;
                Ok(Segmentation::Polygons(raster::trace_contours(&dense)))
            }
            (Segmentation::CocoRle { size, counts }, PolygonsRS) => {
                let dense = rle::decode_coco_rle(*size, counts)?;
                Ok(Segmentation::PolygonsRS {
                    size: *size,
                    polygons: raster::trace_contours(&dense),
                })
            }
            (Segmentation::CocoRle { size, counts }, Rle) => Ok(Segmentation::Rle {
                size: *size,
                counts: rle::unpack_counts(counts)?,
            }),
            (Segmentation::CocoRle { .. }, CocoRle) => Ok(self.clone()),
        }
    }
}

fn rle_checksum(size: Size, counts: &[u32]) -> Result<(), Error> {
    let total = size.area() as u64;
    let sum: u64 = counts.iter().map(|&c| c as u64).sum();
    if sum != total {
        return Err(Error::InvalidRle(format!(
            "counts sum {sum} does not match size {}x{} = {total}",
            size.height, size.width
        )));
    }
    Ok(())
}

fn as_coco_rle_error(e: Error) -> Error {
    match e {
        Error::InvalidRle(msg) => Error::InvalidCocoRle(msg),
        other => other,
    }
}

fn area_from_counts(counts: &[u32]) -> u64 {
    counts.iter().skip(1).step_by(2).map(|&c| c as u64).sum()
}

fn bbox_from_vertices(rings: &[Vec<f64>]) -> BBox {
    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    let mut any = false;
    for ring in rings {
        for chunk in ring.chunks(2) {
            if chunk.len() < 2 {
                continue;
            }
            any = true;
            min_x = min_x.min(chunk[0]);
            max_x = max_x.max(chunk[0]);
            min_y = min_y.min(chunk[1]);
            max_y = max_y.max(chunk[1]);
        }
    }
    if !any {
        return BBox::empty();
    }
    BBox::new(min_x, min_y, max_x - min_x, max_y - min_y)
}

fn bbox_from_dense(mask: &DenseMask) -> BBox {
    let size = mask.size();
    let mut min_row: Option<u32> = None;
    let mut max_row = 0u32;
    let mut min_col: Option<u32> = None;
    let mut max_col = 0u32;
    for col in 0..size.width {
        for row in 0..size.height {
            if mask.get(row, col) == 1 {
                min_row = Some(min_row.map_or(row, |m| m.min(row)));
                max_row = max_row.max(row);
                min_col = Some(min_col.map_or(col, |m| m.min(col)));
                max_col = max_col.max(col);
            }
        }
    }
    match (min_row, min_col) {
        (Some(min_row), Some(min_col)) => BBox::new(
            min_col as f64,
            min_row as f64,
            (max_col - min_col) as f64,
            (max_row - min_row) as f64,
        ),
        _ => BBox::empty(),
    }
}
