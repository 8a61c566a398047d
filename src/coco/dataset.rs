// SPDX-License-Identifier: Apache-2.0

//! The read-only, immutable-after-construction dataset façade: parses a
//! document, builds its indices, and exposes lookup methods over both.

use std::fs::File;
use std::io::Read as _;
use std::path::{Path, PathBuf};

use crate::coco::document::{self, Annotation, Category, Document, Image};
use crate::coco::index::Index;
use crate::error::Error;

/// Governs how strictly a document is checked beyond the structural checks
/// that are always enforced (id uniqueness, dangling references).
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    /// Additionally reject annotations whose `bbox` has a negative width or
    /// height.
    pub validate: bool,
}

/// A parsed, indexed COCO dataset. Once built, it never changes: there is
/// no API to add, remove, or edit images, categories, or annotations.
#[derive(Debug)]
pub struct Dataset {
    document: Document,
    index: Index,
    image_root: Option<PathBuf>,
}

impl Dataset {
    /// Build a dataset from an already-parsed document, running the same
    /// index construction and validation `from_reader`/`from_path` do.
    pub fn from_document(document: Document, options: ReadOptions) -> Result<Self, Error> {
        Self::build(document, options, None)
    }

    /// Build a dataset straight from in-memory collections, applying the
    /// same structural validation `parse` does. `image_root` is carried as
    /// inert metadata alongside the dataset — this crate does no image file
    /// I/O, so it is never read from or resolved against.
    pub fn from_components(
        images: Vec<Image>,
        annotations: Vec<Annotation>,
        categories: Vec<Category>,
        image_root: Option<PathBuf>,
    ) -> Result<Self, Error> {
        let document = Document {
            info: Default::default(),
            licenses: Vec::new(),
            images,
            annotations,
            categories,
        };
        Self::build(document, ReadOptions::default(), image_root)
    }

    /// Parse a document from any reader (already-open file, in-memory
    /// buffer, ...) and build its dataset.
    pub fn from_reader<R: std::io::Read>(reader: R, options: ReadOptions) -> Result<Self, Error> {
        let document = document::parse_reader(reader)?;
        Self::build(document, options, None)
    }

    /// Parse a document from a JSON file on disk and build its dataset.
    pub fn from_path<P: AsRef<Path>>(path: P, options: ReadOptions) -> Result<Self, Error> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let document = document::parse_str(&contents)?;
        Self::build(document, options, None)
    }

    fn build(document: Document, options: ReadOptions, image_root: Option<PathBuf>) -> Result<Self, Error> {
        if options.validate {
            for ann in &document.annotations {
                if ann.bbox.width < 0.0 || ann.bbox.height < 0.0 {
                    return Err(Error::InvalidDocument(format!(
                        "annotation {} has a negative bbox dimension",
                        ann.id
                    )));
                }
            }
        }
        let index = Index::build(&document)?;
        Ok(Self { document, index, image_root })
    }

    /// The image directory this dataset was constructed with, if any.
    pub fn image_root(&self) -> Option<&Path> {
        self.image_root.as_deref()
    }

    pub fn get_imgs(&self) -> &[Image] {
        &self.document.images
    }

    pub fn get_cats(&self) -> &[Category] {
        &self.document.categories
    }

    pub fn get_anns(&self) -> &[Annotation] {
        &self.document.annotations
    }

    pub fn get_img(&self, id: u64) -> Result<&Image, Error> {
        let idx = *self
            .index
            .imgs_by_id
            .get(&id)
            .ok_or(Error::NotFound { kind: "image", id })?;
        Ok(&self.document.images[idx])
    }

    pub fn get_cat(&self, id: u32) -> Result<&Category, Error> {
        let idx = *self.index.cats_by_id.get(&id).ok_or(Error::NotFound {
            kind: "category",
            id: id as u64,
        })?;
        Ok(&self.document.categories[idx])
    }

    pub fn get_ann(&self, id: u64) -> Result<&Annotation, Error> {
        let idx = *self.index.anns_by_id.get(&id).ok_or(Error::NotFound {
            kind: "annotation",
            id,
        })?;
        Ok(&self.document.annotations[idx])
    }

    /// Every annotation belonging to image `id`, in document order. Fails
    /// if `id` is not a known image, even if it simply has zero
    /// annotations.
    pub fn get_img_anns(&self, id: u64) -> Result<Vec<&Annotation>, Error> {
        if !self.index.imgs_by_id.contains_key(&id) {
            return Err(Error::NotFound { kind: "image", id });
        }
        Ok(self
            .index
            .anns_by_image_id
            .get(&id)
            .map(|idxs| idxs.iter().map(|&i| &self.document.annotations[i]).collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "images": [
            {"id": 1, "width": 10, "height": 10, "file_name": "a.jpg"},
            {"id": 2, "width": 20, "height": 20, "file_name": "b.jpg"}
        ],
        "annotations": [
            {"id": 100, "image_id": 1, "category_id": 1,
             "segmentation": {"counts": [5, 2, 2, 2, 5], "size": [4, 4]},
             "area": 4.0, "bbox": [1.0, 1.0, 2.0, 2.0], "iscrowd": 0},
            {"id": 101, "image_id": 1, "category_id": 2,
             "segmentation": [[0.0, 0.0, 1.0, 0.0, 1.0, 1.0]],
             "area": 0.5, "bbox": [0.0, 0.0, 1.0, 1.0], "iscrowd": 0}
        ],
        "categories": [
            {"id": 1, "name": "cat", "supercategory": "animal"},
            {"id": 2, "name": "dog", "supercategory": "animal"}
        ]
    }"#;

    fn dataset() -> Dataset {
        Dataset::from_reader(FIXTURE.as_bytes(), ReadOptions::default()).unwrap()
    }

    #[test]
    fn parses_and_indexes_fixture() {
        let ds = dataset();
        assert_eq!(ds.get_imgs().len(), 2);
        assert_eq!(ds.get_cats().len(), 2);
        assert_eq!(ds.get_anns().len(), 2);
    }

    #[test]
    fn looks_up_entities_by_id() {
        let ds = dataset();
        assert_eq!(ds.get_img(2).unwrap().file_name, "b.jpg");
        assert_eq!(ds.get_cat(2).unwrap().name, "dog");
        assert_eq!(ds.get_ann(100).unwrap().iscrowd, 0);
    }

    #[test]
    fn missing_lookups_fail_with_not_found() {
        let ds = dataset();
        assert!(matches!(
            ds.get_img(999),
            Err(Error::NotFound { kind: "image", id: 999 })
        ));
        assert!(matches!(
            ds.get_cat(999),
            Err(Error::NotFound { kind: "category", id: 999 })
        ));
        assert!(matches!(
            ds.get_ann(999),
            Err(Error::NotFound { kind: "annotation", id: 999 })
        ));
    }

    #[test]
    fn img_anns_groups_by_image() {
        let ds = dataset();
        let anns = ds.get_img_anns(1).unwrap();
        assert_eq!(anns.len(), 2);
        assert!(ds.get_img_anns(2).unwrap().is_empty());
        assert!(matches!(
            ds.get_img_anns(999),
            Err(Error::NotFound { kind: "image", id: 999 })
        ));
    }

    #[test]
    fn dangling_reference_fails_construction() {
        let bad = r#"{
            "images": [{"id": 1, "width": 1, "height": 1, "file_name": "a.jpg"}],
            "annotations": [{"id": 1, "image_id": 2, "category_id": 1,
                "segmentation": [[0.0,0.0,1.0,0.0,1.0,1.0]],
                "area": 0.5, "bbox": [0.0,0.0,1.0,1.0], "iscrowd": 0}],
            "categories": [{"id": 1, "name": "cat", "supercategory": "animal"}]
        }"#;
        let result = Dataset::from_reader(bad.as_bytes(), ReadOptions::default());
        assert!(matches!(result, Err(Error::DanglingReference { .. })));
    }

    #[test]
    fn validate_option_rejects_negative_bbox() {
        let bad = r#"{
            "images": [{"id": 1, "width": 1, "height": 1, "file_name": "a.jpg"}],
            "annotations": [{"id": 1, "image_id": 1, "category_id": 1,
                "segmentation": [[0.0,0.0,1.0,0.0,1.0,1.0]],
                "area": 0.5, "bbox": [0.0,0.0,-1.0,1.0], "iscrowd": 0}],
            "categories": [{"id": 1, "name": "cat", "supercategory": "animal"}]
        }"#;
        let options = ReadOptions { validate: true };
        let result = Dataset::from_reader(bad.as_bytes(), options);
        assert!(matches!(result, Err(Error::InvalidDocument(_))));

        let lenient = Dataset::from_reader(bad.as_bytes(), ReadOptions::default());
        assert!(lenient.is_ok());
    }

    #[test]
    fn from_path_parses_a_document_written_to_disk() {
        use std::io::Write as _;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FIXTURE.as_bytes()).unwrap();
        let ds = Dataset::from_path(file.path(), ReadOptions::default()).unwrap();
        assert_eq!(ds.get_imgs().len(), 2);
        assert_eq!(ds.get_ann(100).unwrap().iscrowd, 0);
    }

    #[test]
    fn from_components_applies_the_same_validations_as_parse() {
        let images = vec![Image {
            id: 1,
            width: 4,
            height: 4,
            file_name: "a.jpg".to_string(),
            extra: Default::default(),
        }];
        let categories = vec![Category {
            id: 1,
            name: "cat".to_string(),
            supercategory: "animal".to_string(),
        }];
        let ds = Dataset::from_components(
            images,
            Vec::new(),
            categories,
            Some(std::path::PathBuf::from("/data/images")),
        )
        .unwrap();
        assert_eq!(ds.get_imgs().len(), 1);
        assert_eq!(ds.image_root(), Some(std::path::Path::new("/data/images")));
    }

    #[test]
    fn from_components_rejects_dangling_reference() {
        let annotations = vec![Annotation {
            id: 1,
            image_id: 99,
            category_id: 1,
            segmentation: crate::mask::Segmentation::Rle {
                size: crate::geometry::Size::new(1, 1),
                counts: vec![0, 1],
            },
            area: 1.0,
            bbox: crate::geometry::BBox::new(0.0, 0.0, 1.0, 1.0),
            iscrowd: 0,
        }];
        let categories = vec![Category {
            id: 1,
            name: "cat".to_string(),
            supercategory: "animal".to_string(),
        }];
        let result = Dataset::from_components(Vec::new(), annotations, categories, None);
        assert!(matches!(result, Err(Error::DanglingReference { .. })));
    }
}
