// SPDX-License-Identifier: Apache-2.0

//! Typed entities parsed straight off a COCO annotations document, plus the
//! raw wire-format structs used only to drive `serde`'s untagged matching.
//!
//! Parsing goes through a permissive "raw" shape first (every required
//! field optional) so that a missing field never surfaces as a bare
//! `serde_json` error; `TryFrom<RawDocument>` then validates presence
//! itself and reports [`Error::InvalidDocument`] for anything missing.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;
use crate::geometry::{BBox, Size};
use crate::mask::Segmentation;

/// One image entry. Fields the document carries beyond `id`/`width`/
/// `height`/`file_name` (`flickr_url`, `coco_url`, `date_captured`, a
/// dataset's own extensions, ...) are preserved opaquely in `extra` rather
/// than dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Image {
    pub id: u64,
    pub width: u32,
    pub height: u32,
    pub file_name: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl fmt::Display for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Image(id={}, width='{}', height='{}', file_name='{}')",
            self.id, self.width, self.height, self.file_name
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawImage {
    id: Option<u64>,
    width: Option<u32>,
    height: Option<u32>,
    file_name: Option<String>,
    #[serde(flatten)]
    extra: serde_json::Map<String, Value>,
}

impl TryFrom<RawImage> for Image {
    type Error = Error;

    fn try_from(raw: RawImage) -> Result<Self, Error> {
        Ok(Image {
            id: raw.id.ok_or_else(|| Error::InvalidDocument("image missing required field 'id'".into()))?,
            width: raw
                .width
                .ok_or_else(|| Error::InvalidDocument("image missing required field 'width'".into()))?,
            height: raw
                .height
                .ok_or_else(|| Error::InvalidDocument("image missing required field 'height'".into()))?,
            file_name: raw
                .file_name
                .ok_or_else(|| Error::InvalidDocument("image missing required field 'file_name'".into()))?,
            extra: raw.extra,
        })
    }
}

/// One category entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub supercategory: String,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Category(id={}, name='{}', supercategory='{}')",
            self.id, self.name, self.supercategory
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawCategory {
    id: Option<u32>,
    name: Option<String>,
    #[serde(default)]
    supercategory: String,
}

impl TryFrom<RawCategory> for Category {
    type Error = Error;

    fn try_from(raw: RawCategory) -> Result<Self, Error> {
        Ok(Category {
            id: raw.id.ok_or_else(|| Error::InvalidDocument("category missing required field 'id'".into()))?,
            name: raw
                .name
                .ok_or_else(|| Error::InvalidDocument("category missing required field 'name'".into()))?,
            supercategory: raw.supercategory,
        })
    }
}

/// One annotation entry, with its segmentation already resolved into the
/// in-memory [`Segmentation`] union.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub id: u64,
    pub image_id: u64,
    pub category_id: u32,
    pub segmentation: Segmentation,
    pub area: f64,
    pub bbox: BBox,
    pub iscrowd: u8,
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Annotation(id={}, image_id={}, category_id={}, segmentation={}, area={}, bbox={}, iscrowd={})",
            self.id, self.image_id, self.category_id, self.segmentation, self.area, self.bbox, self.iscrowd
        )
    }
}

/// Wire-format shapes a `segmentation` field can take. `serde`'s untagged
/// matching tells them apart by JSON shape: a bare array is `Polygons`, an
/// object whose `counts` is itself an array is `Rle`, and an object whose
/// `counts` is a string is `CocoRle`. `PolygonsRS` has no wire form — it is
/// only ever constructed in memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawSegmentation {
    Polygons(Vec<Vec<f64>>),
    Rle { counts: Vec<u32>, size: [u32; 2] },
    CocoRle { counts: String, size: [u32; 2] },
}

impl From<RawSegmentation> for Segmentation {
    fn from(raw: RawSegmentation) -> Self {
        match raw {
            RawSegmentation::Polygons(polygons) => Segmentation::Polygons(polygons),
            RawSegmentation::Rle { counts, size } => Segmentation::Rle {
                size: Size::new(size[0], size[1]),
                counts,
            },
            RawSegmentation::CocoRle { counts, size } => Segmentation::CocoRle {
                size: Size::new(size[0], size[1]),
                counts,
            },
        }
    }
}

impl From<&Segmentation> for RawSegmentation {
    fn from(seg: &Segmentation) -> Self {
        match seg.clone() {
            Segmentation::Polygons(polygons) => RawSegmentation::Polygons(polygons),
            Segmentation::PolygonsRS { polygons, .. } => RawSegmentation::Polygons(polygons),
            Segmentation::Rle { size, counts } => RawSegmentation::Rle {
                counts,
                size: [size.height, size.width],
            },
            Segmentation::CocoRle { size, counts } => RawSegmentation::CocoRle {
                counts,
                size: [size.height, size.width],
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawAnnotation {
    id: Option<u64>,
    image_id: Option<u64>,
    category_id: Option<u32>,
    segmentation: Option<RawSegmentation>,
    area: Option<f64>,
    bbox: Option<[f64; 4]>,
    #[serde(default)]
    iscrowd: u8,
}

impl Serialize for Annotation {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("Annotation", 7)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("image_id", &self.image_id)?;
        state.serialize_field("category_id", &self.category_id)?;
        state.serialize_field("segmentation", &RawSegmentation::from(&self.segmentation))?;
        state.serialize_field("area", &self.area)?;
        state.serialize_field(
            "bbox",
            &[self.bbox.left, self.bbox.top, self.bbox.width, self.bbox.height],
        )?;
        state.serialize_field("iscrowd", &self.iscrowd)?;
        state.end()
    }
}

impl TryFrom<RawAnnotation> for Annotation {
    type Error = Error;

    fn try_from(raw: RawAnnotation) -> Result<Self, Error> {
        let bbox = raw
            .bbox
            .ok_or_else(|| Error::InvalidDocument("annotation missing required field 'bbox'".into()))?;
        Ok(Annotation {
            id: raw
                .id
                .ok_or_else(|| Error::InvalidDocument("annotation missing required field 'id'".into()))?,
            image_id: raw
                .image_id
                .ok_or_else(|| Error::InvalidDocument("annotation missing required field 'image_id'".into()))?,
            category_id: raw.category_id.ok_or_else(|| {
                Error::InvalidDocument("annotation missing required field 'category_id'".into())
            })?,
            segmentation: raw
                .segmentation
                .ok_or_else(|| Error::InvalidDocument("annotation missing required field 'segmentation'".into()))?
                .into(),
            area: raw
                .area
                .ok_or_else(|| Error::InvalidDocument("annotation missing required field 'area'".into()))?,
            bbox: BBox::new(bbox[0], bbox[1], bbox[2], bbox[3]),
            iscrowd: raw.iscrowd,
        })
    }
}

/// The whole annotations document: images, categories, and annotations,
/// plus the `info`/`licenses` blocks preserved opaquely since this crate
/// does not model them further.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    #[serde(default)]
    pub info: Value,
    #[serde(default)]
    pub licenses: Vec<Value>,
    pub images: Vec<Image>,
    pub annotations: Vec<Annotation>,
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawDocument {
    #[serde(default)]
    info: Value,
    #[serde(default)]
    licenses: Vec<Value>,
    images: Option<Vec<RawImage>>,
    annotations: Option<Vec<RawAnnotation>>,
    categories: Option<Vec<RawCategory>>,
}

impl TryFrom<RawDocument> for Document {
    type Error = Error;

    fn try_from(raw: RawDocument) -> Result<Self, Error> {
        let images = raw
            .images
            .ok_or_else(|| Error::InvalidDocument("missing top-level key 'images'".into()))?
            .into_iter()
            .map(Image::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let annotations = raw
            .annotations
            .ok_or_else(|| Error::InvalidDocument("missing top-level key 'annotations'".into()))?
            .into_iter()
            .map(Annotation::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let categories = raw
            .categories
            .ok_or_else(|| Error::InvalidDocument("missing top-level key 'categories'".into()))?
            .into_iter()
            .map(Category::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Document {
            info: raw.info,
            licenses: raw.licenses,
            images,
            annotations,
            categories,
        })
    }
}

/// Parse a document from any reader, surfacing malformed JSON as
/// [`Error::Json`] and a structurally incomplete-but-valid-JSON document as
/// [`Error::InvalidDocument`].
pub(crate) fn parse_reader<R: std::io::Read>(reader: R) -> Result<Document, Error> {
    let raw: RawDocument = serde_json::from_reader(reader)?;
    Document::try_from(raw)
}

/// Parse a document from a JSON string, same error split as
/// [`parse_reader`].
pub(crate) fn parse_str(s: &str) -> Result<Document, Error> {
    let raw: RawDocument = serde_json::from_str(s)?;
    Document::try_from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_annotation(json: &str) -> Result<Annotation, Error> {
        let raw: RawAnnotation = serde_json::from_str(json)?;
        Annotation::try_from(raw)
    }

    #[test]
    fn category_display_matches_pinned_form() {
        let cat = Category {
            id: 2,
            name: "bicycle".to_string(),
            supercategory: "vehicle".to_string(),
        };
        assert_eq!(
            cat.to_string(),
            "Category(id=2, name='bicycle', supercategory='vehicle')"
        );
    }

    #[test]
    fn image_display_matches_pinned_form() {
        let img = Image {
            id: 174482,
            width: 640,
            height: 388,
            file_name: "000000174482.jpg".to_string(),
            extra: Default::default(),
        };
        assert_eq!(
            img.to_string(),
            "Image(id=174482, width='640', height='388', file_name='000000174482.jpg')"
        );
    }

    #[test]
    fn deserializes_polygon_segmentation() {
        let json = r#"{
            "id": 1, "image_id": 2, "category_id": 3,
            "segmentation": [[0.0, 0.0, 1.0, 0.0, 1.0, 1.0]],
            "area": 0.5, "bbox": [0.0, 0.0, 1.0, 1.0], "iscrowd": 0
        }"#;
        let ann = parse_annotation(json).unwrap();
        assert!(matches!(ann.segmentation, Segmentation::Polygons(_)));
    }

    #[test]
    fn deserializes_rle_segmentation() {
        let json = r#"{
            "id": 1, "image_id": 2, "category_id": 3,
            "segmentation": {"counts": [5, 2, 2, 2, 5], "size": [4, 4]},
            "area": 4.0, "bbox": [1.0, 1.0, 2.0, 2.0], "iscrowd": 1
        }"#;
        let ann = parse_annotation(json).unwrap();
        assert!(matches!(ann.segmentation, Segmentation::Rle { .. }));
    }

    #[test]
    fn deserializes_coco_rle_segmentation() {
        let json = r#"{
            "id": 1, "image_id": 2, "category_id": 3,
            "segmentation": {"counts": "52203", "size": [4, 4]},
            "area": 4.0, "bbox": [1.0, 1.0, 2.0, 2.0], "iscrowd": 1
        }"#;
        let ann = parse_annotation(json).unwrap();
        assert!(matches!(ann.segmentation, Segmentation::CocoRle { .. }));
    }

    #[test]
    fn annotation_round_trips_through_json() {
        let ann = Annotation {
            id: 1,
            image_id: 2,
            category_id: 3,
            segmentation: Segmentation::Rle {
                size: Size::new(4, 4),
                counts: vec![5, 2, 2, 2, 5],
            },
            area: 4.0,
            bbox: BBox::new(1.0, 1.0, 2.0, 2.0),
            iscrowd: 0,
        };
        let json = serde_json::to_string(&ann).unwrap();
        let back = parse_annotation(&json).unwrap();
        assert_eq!(ann, back);
    }

    #[test]
    fn annotation_missing_id_fails_invalid_document() {
        let json = r#"{
            "image_id": 2, "category_id": 3,
            "segmentation": [[0.0, 0.0, 1.0, 0.0, 1.0, 1.0]],
            "area": 0.5, "bbox": [0.0, 0.0, 1.0, 1.0], "iscrowd": 0
        }"#;
        assert!(matches!(parse_annotation(json), Err(Error::InvalidDocument(_))));
    }

    #[test]
    fn annotation_display_matches_pinned_polygons_rs_form() {
        let ann = Annotation {
            id: 1348739,
            image_id: 174482,
            category_id: 3,
            segmentation: Segmentation::PolygonsRS {
                size: Size::new(388, 640),
                polygons: vec![vec![
                    81.28, 87.23, 82.91, 83.96, 84.0, 76.33, 99.48, 76.22, 105.91, 84.5, 108.09,
                    93.98, 98.17, 93.44, 90.33, 94.2, 85.97, 94.53, 84.0, 94.31,
                ]],
            },
            area: 390.6123,
            bbox: BBox::new(81.28, 76.22, 26.81, 18.31),
            iscrowd: 0,
        };
        assert_eq!(
            ann.to_string(),
            "Annotation(id=1348739, image_id=174482, category_id=3, segmentation=PolygonsRS(size=[388, 640], counts=[[81.28, 87.23, 82.91, 83.96, 84, 76.33, 99.48, 76.22, 105.91, 84.5, 108.09, 93.98, 98.17, 93.44, 90.33, 94.2, 85.97, 94.53, 84, 94.31]]), area=390.6123, bbox=BBox(left=81.28, top=76.22, width=26.81, height=18.31), iscrowd=0)"
        );
    }

    #[test]
    fn document_parses_minimal_dataset() {
        let json = r#"{
            "images": [{"id": 1, "width": 10, "height": 10, "file_name": "a.jpg"}],
            "annotations": [],
            "categories": [{"id": 1, "name": "cat", "supercategory": "animal"}]
        }"#;
        let doc = parse_str(json).unwrap();
        assert_eq!(doc.images.len(), 1);
        assert_eq!(doc.categories.len(), 1);
        assert_eq!(doc.images[0].file_name, "a.jpg");
    }

    #[test]
    fn document_missing_top_level_key_fails_invalid_document() {
        let json = r#"{
            "images": [{"id": 1, "width": 10, "height": 10, "file_name": "a.jpg"}],
            "categories": [{"id": 1, "name": "cat", "supercategory": "animal"}]
        }"#;
        assert!(matches!(parse_str(json), Err(Error::InvalidDocument(_))));
    }
}
