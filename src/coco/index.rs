// SPDX-License-Identifier: Apache-2.0

//! Reverse indices built in one atomic pass over a parsed document: id ->
//! entity maps, plus image id -> its annotations.

use std::collections::HashMap;

use crate::coco::document::{Annotation, Category, Document, Image};
use crate::error::Error;

#[derive(Debug)]
pub struct Index {
    pub imgs_by_id: HashMap<u64, usize>,
    pub cats_by_id: HashMap<u32, usize>,
    pub anns_by_id: HashMap<u64, usize>,
    pub anns_by_image_id: HashMap<u64, Vec<usize>>,
}

impl Index {
    /// Build the reverse indices for a document, failing the whole document
    /// if any id is duplicated or any annotation references an image or
    /// category id that does not exist.
    pub fn build(doc: &Document) -> Result<Self, Error> {
        let mut imgs_by_id = HashMap::with_capacity(doc.images.len());
        for (i, img) in doc.images.iter().enumerate() {
            if imgs_by_id.insert(img.id, i).is_some() {
                log::warn!("rejecting document: duplicate image id {}", img.id);
                return Err(Error::DuplicateId {
                    kind: "image",
                    id: img.id,
                });
            }
        }

        let mut cats_by_id = HashMap::with_capacity(doc.categories.len());
        for (i, cat) in doc.categories.iter().enumerate() {
            if cats_by_id.insert(cat.id, i).is_some() {
                log::warn!("rejecting document: duplicate category id {}", cat.id);
                return Err(Error::DuplicateId {
                    kind: "category",
                    id: cat.id as u64,
                });
            }
        }

        let mut anns_by_id = HashMap::with_capacity(doc.annotations.len());
        let mut anns_by_image_id: HashMap<u64, Vec<usize>> = HashMap::new();
        for (i, ann) in doc.annotations.iter().enumerate() {
            if anns_by_id.insert(ann.id, i).is_some() {
                log::warn!("rejecting document: duplicate annotation id {}", ann.id);
                return Err(Error::DuplicateId {
                    kind: "annotation",
                    id: ann.id,
                });
            }
            if !imgs_by_id.contains_key(&ann.image_id) {
                log::warn!(
                    "rejecting document: annotation {} references unknown image_id {}",
                    ann.id,
                    ann.image_id
                );
                return Err(Error::DanglingReference {
                    annotation_id: ann.id,
                    field: "image_id",
                    missing_id: ann.image_id,
                });
            }
            if !cats_by_id.contains_key(&ann.category_id) {
                log::warn!(
                    "rejecting document: annotation {} references unknown category_id {}",
                    ann.id,
                    ann.category_id
                );
                return Err(Error::DanglingReference {
                    annotation_id: ann.id,
                    field: "category_id",
                    missing_id: ann.category_id as u64,
                });
            }
            anns_by_image_id.entry(ann.image_id).or_default().push(i);
        }

        log::debug!(
            "indexed {} images, {} categories, {} annotations",
            doc.images.len(),
            doc.categories.len(),
            doc.annotations.len()
        );

        Ok(Self {
            imgs_by_id,
            cats_by_id,
            anns_by_id,
            anns_by_image_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{BBox, Size};
    use crate::mask::Segmentation;

    fn image(id: u64) -> Image {
        Image {
            id,
            width: 10,
            height: 10,
            file_name: format!("{id}.jpg"),
            extra: Default::default(),
        }
    }

    fn category(id: u32) -> Category {
        Category {
            id,
            name: "cat".to_string(),
            supercategory: "animal".to_string(),
        }
    }

    fn annotation(id: u64, image_id: u64, category_id: u32) -> Annotation {
        Annotation {
            id,
            image_id,
            category_id,
            segmentation: Segmentation::Rle {
                size: Size::new(1, 1),
                counts: vec![0, 1],
            },
            area: 1.0,
            bbox: BBox::new(0.0, 0.0, 1.0, 1.0),
            iscrowd: 0,
        }
    }

    #[test]
    fn builds_indices_over_valid_document() {
        let doc = Document {
            info: Default::default(),
            licenses: vec![],
            images: vec![image(1), image(2)],
            annotations: vec![annotation(10, 1, 100), annotation(11, 1, 100)],
            categories: vec![category(100)],
        };
        let index = Index::build(&doc).unwrap();
        assert_eq!(index.imgs_by_id.len(), 2);
        assert_eq!(index.cats_by_id.len(), 1);
        assert_eq!(index.anns_by_image_id[&1].len(), 2);
        assert!(!index.anns_by_image_id.contains_key(&2));
    }

    #[test]
    fn rejects_duplicate_image_id() {
        let doc = Document {
            info: Default::default(),
            licenses: vec![],
            images: vec![image(1), image(1)],
            annotations: vec![],
            categories: vec![],
        };
        assert!(matches!(
            Index::build(&doc),
            Err(Error::DuplicateId { kind: "image", id: 1 })
        ));
    }

    #[test]
    fn rejects_dangling_image_reference() {
        let doc = Document {
            info: Default::default(),
            licenses: vec![],
            images: vec![image(1)],
            annotations: vec![annotation(10, 99, 100)],
            categories: vec![category(100)],
        };
        assert!(matches!(
            Index::build(&doc),
            Err(Error::DanglingReference {
                annotation_id: 10,
                field: "image_id",
                missing_id: 99
            })
        ));
    }

    #[test]
    fn rejects_dangling_category_reference() {
        let doc = Document {
            info: Default::default(),
            licenses: vec![],
            images: vec![image(1)],
            annotations: vec![annotation(10, 1, 999)],
            categories: vec![category(100)],
        };
        assert!(matches!(
            Index::build(&doc),
            Err(Error::DanglingReference {
                annotation_id: 10,
                field: "category_id",
                missing_id: 999
            })
        ));
    }
}
