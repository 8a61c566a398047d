// SPDX-License-Identifier: Apache-2.0

use std::fmt;

/// Errors produced by mask decoding, dataset parsing, and dataset lookups.
///
/// Every fallible operation in this crate surfaces one of these variants;
/// construction of a `Dataset` or a mask conversion never partially
/// succeeds.
#[derive(Debug)]
pub enum Error {
    /// Failed to parse the annotations document as JSON.
    Json(serde_json::Error),
    /// Failed to read the annotations document from disk.
    Io(std::io::Error),
    /// The document is missing a required top-level key or field.
    InvalidDocument(String),
    /// Two entities of the same kind share an id.
    DuplicateId { kind: &'static str, id: u64 },
    /// An annotation references an image or category id that does not exist.
    DanglingReference {
        annotation_id: u64,
        field: &'static str,
        missing_id: u64,
    },
    /// A lookup by id found no matching entity.
    NotFound { kind: &'static str, id: u64 },
    /// An uncompressed RLE's run-lengths do not sum to `height * width`.
    InvalidRle(String),
    /// A COCO RLE string could not be decoded.
    InvalidCocoRle(String),
    /// A polygon ring had an odd-length coordinate list.
    InvalidPolygon(String),
    /// A `Polygons` segmentation was decoded without a target size.
    MissingSize,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Json(e) => write!(f, "JSON error: {e}"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::InvalidDocument(msg) => write!(f, "invalid document: {msg}"),
            Error::DuplicateId { kind, id } => write!(f, "duplicate {kind} id: {id}"),
            Error::DanglingReference {
                annotation_id,
                field,
                missing_id,
            } => write!(
                f,
                "annotation {annotation_id} references unknown {field} {missing_id}"
            ),
            Error::NotFound { kind, id } => write!(f, "{kind} {id} not found"),
            Error::InvalidRle(msg) => write!(f, "invalid RLE: {msg}"),
            Error::InvalidCocoRle(msg) => write!(f, "invalid COCO RLE string: {msg}"),
            Error::InvalidPolygon(msg) => write!(f, "invalid polygon: {msg}"),
            Error::MissingSize => {
                write!(f, "decoding Polygons requires an externally supplied size")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}
