// SPDX-License-Identifier: Apache-2.0

//! Parsing, indexing, and read-only lookup over a COCO annotations
//! document.

mod dataset;
mod document;
mod index;

pub use dataset::{Dataset, ReadOptions};
pub use document::{Annotation, Category, Document, Image};
