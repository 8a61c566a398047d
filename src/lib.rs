// SPDX-License-Identifier: Apache-2.0

//! Loading, indexing, and mask-codec conversions for COCO-format object
//! detection and segmentation datasets.
//!
//! A [`coco::Dataset`] parses an annotations document and builds lookup
//! indices over its images, categories, and annotations in one atomic
//! pass; construction fails if any id is duplicated or any annotation
//! references an image or category that doesn't exist. Each annotation's
//! `segmentation` is one of four interchangeable representations
//! ([`mask::Segmentation`]) — polygon rings, polygon rings with their own
//! size, uncompressed run-length counts, or the COCO variable-length
//! string encoding of those counts — convertible between one another via
//! [`mask::Segmentation::convert`].

pub mod coco;
pub mod error;
pub mod geometry;
pub mod mask;
pub mod raster;
pub mod rle;

pub use coco::{Annotation, Category, Dataset, Document, Image, ReadOptions};
pub use error::Error;
pub use geometry::{BBox, DenseMask, Size};
pub use mask::{Kind, Segmentation};

#[cfg(test)]
mod tests {
    #[ctor::ctor]
    fn init() {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }
}
