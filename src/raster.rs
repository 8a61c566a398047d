// SPDX-License-Identifier: Apache-2.0

//! Polygon rasterisation and its approximate inverse.
//!
//! `rasterize` fills a set of polygon rings into a dense bitmap. Each ring is
//! traced independently at 5x upsampled resolution (matching the reference
//! COCO mask API's `rleFrPoly`: scale every vertex by 5, walk each edge as a
//! discrete line at unit steps along its dominant axis, then collect
//! y-boundary crossings at every column change and downsample them back to
//! the original resolution to get that ring's run-length encoding) and the
//! resulting per-ring masks are unioned together — COCO's polygon list holds
//! independent parts of an object (e.g. split by occlusion), not nested
//! holes. `trace_contours` walks a bitmap's boundary pixels to recover an
//! approximate polygon, used by the `RLE`/`COCO_RLE` -> `Polygons` conversion
//! paths.

use crate::error::Error;
use crate::geometry::{DenseMask, Size};
use crate::rle;

/// Vertices are upsampled by this factor before line-tracing, matching the
/// reference COCO mask API.
const SCALE: f64 = 5.0;

/// Rasterise polygon rings (each a flat `[x0, y0, x1, y1, ...]` list) into a
/// dense bitmap of the given size. Each ring must have an even-length
/// coordinate list; an odd-length ring is malformed input and fails with
/// [`Error::InvalidPolygon`] rather than silently dropping its trailing
/// coordinate. Rings with fewer than 2 vertices contribute nothing. Multiple
/// rings are combined by union, not XOR: COCO's polygon segmentation lists
/// independent regions, not holes.
pub fn rasterize(rings: &[Vec<f64>], size: Size) -> Result<DenseMask, Error> {
    let mut mask = DenseMask::new(size);
    if size.height == 0 || size.width == 0 {
        return Ok(mask);
    }
    for ring in rings {
        if ring.len() % 2 != 0 {
            return Err(Error::InvalidPolygon(format!(
                "ring has an odd-length coordinate list ({} values)",
                ring.len()
            )));
        }
        if ring.len() / 2 < 2 {
            continue;
        }
        let counts = rasterize_ring(ring, size);
        let ring_mask = rle::decode(size, &counts)?;
        for row in 0..size.height {
            for col in 0..size.width {
                if ring_mask.get(row, col) == 1 {
                    mask.set(row, col, 1);
                }
            }
        }
    }
    Ok(mask)
}

/// Trace one ring's boundary at 5x upsampled resolution and downsample the
/// resulting y-crossings into uncompressed RLE run lengths over `size`.
fn rasterize_ring(ring: &[f64], size: Size) -> Vec<u32> {
    let h = size.height as i64;
    let w = size.width as i64;
    let n = ring.len() / 2;

    let mut xs: Vec<i64> = (0..n).map(|i| (SCALE * ring[i * 2] + 0.5).floor() as i64).collect();
    let mut ys: Vec<i64> = (0..n).map(|i| (SCALE * ring[i * 2 + 1] + 0.5).floor() as i64).collect();
    xs.push(xs[0]);
    ys.push(ys[0]);

    // Trace every edge as a discrete line at unit steps along its dominant
    // axis, collecting every touched (u, v) point in upsampled space.
    let mut u: Vec<i64> = Vec::new();
    let mut v: Vec<i64> = Vec::new();
    for j in 0..n {
        let (mut x0, mut y0, mut x1, mut y1) =
            (xs[j] as f64, ys[j] as f64, xs[j + 1] as f64, ys[j + 1] as f64);
        let dx = (x1 - x0).abs();
        let dy = (y1 - y0).abs();
        let flip = (dx >= dy && x0 > x1) || (dx < dy && y0 > y1);
        if flip {
            std::mem::swap(&mut x0, &mut x1);
            std::mem::swap(&mut y0, &mut y1);
        }
        if dx >= dy {
            let steps = dx as i64;
            for d in 0..=steps {
                let t = if flip { (steps - d) as f64 } else { d as f64 };
                let vv = if dx == 0.0 { y0 } else { y0 + t * (y1 - y0) / dx };
                u.push((t + x0) as i64);
                v.push((vv + 0.5).floor() as i64);
            }
        } else {
            let steps = dy as i64;
            for d in 0..=steps {
                let t = if flip { (steps - d) as f64 } else { d as f64 };
                let uu = if dy == 0.0 { x0 } else { x0 + t * (x1 - x0) / dy };
                v.push((t + y0) as i64);
                u.push((uu + 0.5).floor() as i64);
            }
        }
    }

    // Downsample: at every column change in the traced boundary, record a
    // y-crossing back at the original resolution.
    let mut xd_pts: Vec<i64> = Vec::new();
    let mut yd_pts: Vec<i64> = Vec::new();
    for j in 1..u.len() {
        if u[j] == u[j - 1] {
            continue;
        }
        let xd_scaled = if u[j] < u[j - 1] { u[j] } else { u[j] - 1 };
        let xd = (xd_scaled as f64 + 0.5) / SCALE - 0.5;
        if xd.floor() != xd || xd < 0.0 || xd > (w - 1) as f64 {
            continue;
        }
        let yd_scaled = if v[j] < v[j - 1] { v[j] } else { v[j - 1] };
        let mut yd = (yd_scaled as f64 + 0.5) / SCALE - 0.5;
        if yd < 0.0 {
            yd = 0.0;
        } else if yd > h as f64 {
            yd = h as f64;
        }
        yd = yd.ceil();
        xd_pts.push(xd as i64);
        yd_pts.push(yd as i64);
    }

    // Column-major linear index (col*height + row), matching this crate's
    // dense bitmap convention, with a sentinel closing the mask at its end.
    let mut a: Vec<i64> = xd_pts.iter().zip(&yd_pts).map(|(&x, &y)| x * h + y).collect();
    a.push(h * w);
    if a.len() == 1 {
        return vec![size.area() as u32];
    }
    a.sort_unstable();
    let mut prev = 0i64;
    for val in a.iter_mut() {
        let cur = *val;
        *val -= prev;
        prev = cur;
    }

    // Collapse zero-length runs (coincident crossings) into the previous run.
    let mut counts: Vec<u32> = Vec::with_capacity(a.len());
    let mut j = 0usize;
    counts.push(a[j] as u32);
    j += 1;
    while j < a.len() {
        if a[j] > 0 {
            counts.push(a[j] as u32);
            j += 1;
        } else {
            j += 1;
            if j < a.len() {
                *counts.last_mut().unwrap() += a[j] as u32;
                j += 1;
            }
        }
    }
    counts
}

/// Trace the boundary of every connected foreground region into an
/// approximate polygon ring, using 8-connected Moore-neighbour tracing.
/// This is a lossy inverse of [`rasterize`]: it recovers a polygon whose
/// rasterisation approximates the input mask, not necessarily the exact
/// vertex list that produced it.
pub fn trace_contours(mask: &DenseMask) -> Vec<Vec<f64>> {
    let size = mask.size();
    let (h, w) = (size.height, size.width);
    let mut visited = vec![false; (h as usize) * (w as usize)];
    let visited_idx = |row: u32, col: u32| row as usize + col as usize * h as usize;

    // 8-connected neighbour offsets in clockwise order, starting north.
    const DIRS: [(i32, i32); 8] = [
        (-1, 0),
        (-1, 1),
        (0, 1),
        (1, 1),
        (1, 0),
        (1, -1),
        (0, -1),
        (-1, -1),
    ];

    let in_bounds = |row: i32, col: i32| row >= 0 && col >= 0 && row < h as i32 && col < w as i32;
    let is_set = |row: i32, col: i32| in_bounds(row, col) && mask.get(row as u32, col as u32) == 1;

    let mut rings = Vec::new();
    for col in 0..w {
        for row in 0..h {
            if mask.get(row, col) != 1 || visited[visited_idx(row, col)] {
                continue;
            }
            // Only start tracing at a boundary pixel whose west neighbour is
            // background (left-most pixel of its run on this row), avoiding
            // re-tracing interior pixels of the same region from elsewhere.
            if is_set(row as i32, col as i32 - 1) {
                continue;
            }

            let mut ring = Vec::new();
            let start = (row as i32, col as i32);
            let mut current = start;
            let mut dir = 0usize;
            loop {
                visited[visited_idx(current.0 as u32, current.1 as u32)] = true;
                ring.push(current.1 as f64);
                ring.push(current.0 as f64);

                let mut found = None;
                for step in 0..8 {
                    let d = (dir + 7 + step) % 8;
                    let (dr, dc) = DIRS[d];
                    let next = (current.0 + dr, current.1 + dc);
                    if is_set(next.0, next.1) {
                        found = Some((next, d));
                        break;
                    }
                }
                match found {
                    Some((next, d)) => {
                        dir = d;
                        current = next;
                    }
                    None => break,
                }
                if current == start {
                    break;
                }
            }
            if !ring.is_empty() {
                rings.push(ring);
            }
        }
    }
    rings
}
