// SPDX-License-Identifier: Apache-2.0

//! Run-length codec: uncompressed RLE counts <-> dense bitmap, and the COCO
//! variable-length string encoding of those counts.

use crate::error::Error;
use crate::geometry::{DenseMask, Size};

fn validate_checksum(size: Size, counts: &[u32]) -> Result<(), Error> {
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

/// Decode an uncompressed RLE counts sequence into a dense column-major
/// bitmap. `counts` alternates background/foreground run lengths starting
/// with background, and must sum to exactly `size.height * size.width`.
pub fn decode(size: Size, counts: &[u32]) -> Result<DenseMask, Error> {
    validate_checksum(size, counts)?;
    let mut data = vec![0u8; size.area()];
    let mut pos = 0usize;
    let mut value = 0u8;
    for &count in counts {
        let count = count as usize;
        if value == 1 {
            data[pos..pos + count].fill(1);
        }
        pos += count;
        value = 1 - value;
    }
    Ok(DenseMask::from_raw(size, data))
}

/// Encode a dense column-major bitmap into uncompressed RLE run lengths.
/// Always begins with the background run length, emitting `0` if the first
/// pixel is already set.
pub fn encode(mask: &DenseMask) -> Vec<u32> {
    let data = mask.data();
    if data.is_empty() {
        return vec![0];
    }
    let mut counts = Vec::new();
    let mut current = 0u8;
    let mut run = 0u32;
    for &v in data {
        if v == current {
            run += 1;
        } else {
            counts.push(run);
            current = v;
            run = 1;
        }
    }
    counts.push(run);
    counts
}

/// Pack an uncompressed RLE counts sequence into the COCO variable-length
/// string encoding: each count is delta-coded against the count two
/// positions back (from the third entry on) and split into 5-bit groups,
/// continuation bit `0x20`, offset by ASCII `'0'` (48).
pub fn pack_counts(counts: &[u32]) -> String {
    let mut out = Vec::<u8>::with_capacity(counts.len());
    for (i, &count) in counts.iter().enumerate() {
        let mut x: i64 = count as i64;
        if i > 2 {
            x -= counts[i - 2] as i64;
        }
        loop {
            let mut byte = (x & 0x1f) as u8;
            x >>= 5;
            let more = if byte & 0x10 != 0 { x != -1 } else { x != 0 };
            if more {
                byte |= 0x20;
            }
            out.push(byte + 48);
            if !more {
                break;
            }
        }
    }
    // Every pushed byte lies in 48..=111, which is valid ASCII/UTF-8.
    String::from_utf8(out).expect("coco rle packing always produces ascii")
}

/// Unpack a COCO variable-length string encoding into uncompressed RLE
/// counts. Inverse of [`pack_counts`].
pub fn unpack_counts(s: &str) -> Result<Vec<u32>, Error> {
    let bytes = s.as_bytes();
    let mut counts: Vec<i64> = Vec::new();
    let mut p = 0usize;
    while p < bytes.len() {
        let mut x: i64 = 0;
        let mut k = 0u32;
        let mut more;
        loop {
            if p >= bytes.len() {
                return Err(Error::InvalidCocoRle(
                    "truncated count near end of string".into(),
                ));
            }
            let byte = bytes[p] as i64 - 48;
            p += 1;
            if !(0..=63).contains(&byte) {
                return Err(Error::InvalidCocoRle(format!(
                    "byte outside valid range at offset {}",
                    p - 1
                )));
            }
            x |= (byte & 0x1f) << (5 * k);
            k += 1;
            more = byte & 0x20 != 0;
            if !more {
                if byte & 0x10 != 0 {
                    x |= -1i64 << (5 * k);
                }
                break;
            }
        }
        let i = counts.len();
        if i > 2 {
            x += counts[i - 2];
        }
        counts.push(x);
    }
    counts
        .into_iter()
        .map(|c| {
            u32::try_from(c)
                .map_err(|_| Error::InvalidCocoRle(format!("decoded run length {c} is negative")))
        })
        .collect()
}

/// Decode a COCO RLE string directly into a dense bitmap.
pub fn decode_coco_rle(size: Size, s: &str) -> Result<DenseMask, Error> {
    let counts = unpack_counts(s)?;
    decode(size, &counts).map_err(|e| match e {
        Error::InvalidRle(msg) => Error::InvalidCocoRle(msg),
        other => other,
    })
}

/// Encode a dense bitmap directly into a COCO RLE string.
pub fn encode_coco_rle(mask: &DenseMask) -> String {
    pack_counts(&encode(mask))
}
