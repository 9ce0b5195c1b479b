//! Asset ingestion collaborator.
//!
//! The loader hands an image cell to [`AssetPipeline::attach_images`]
//! unmodified; how the cell is interpreted is up to the pipeline.
//! [`LocalAssets`] reads it as a list of file paths.

use serde::Serialize;
use std::path::PathBuf;

use crate::error::AssetError;
use crate::grammar::Delimiters;
use crate::models::Id;

/// Where images are attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "id")]
pub enum ImageTarget {
    /// Legacy schemas attach images to the product itself.
    Product(Id),
    /// The product's master variant.
    MasterVariant(Id),
}

/// Attaches images described by a raw cell.
pub trait AssetPipeline {
    /// Returns the number of images attached.
    fn attach_images(&mut self, target: ImageTarget, raw: &str) -> Result<usize, AssetError>;
}

/// One recorded attachment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAttachment {
    pub target: ImageTarget,
    pub path: PathBuf,
    /// Optional alt text given as `path:alt`.
    pub alt: Option<String>,
}

/// File based pipeline.
///
/// Splits the cell on the association delimiter; each entry is a path,
/// optionally followed by alt text (`shots/mug.jpg:Front view`). With a base
/// directory every file must exist under it.
#[derive(Debug, Default)]
pub struct LocalAssets {
    base_dir: Option<PathBuf>,
    delimiters: Delimiters,
    attached: Vec<ImageAttachment>,
}

impl LocalAssets {
    /// Record attachments without touching the file system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve and check paths under `base_dir`.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
            ..Self::default()
        }
    }

    pub fn with_delimiters(mut self, delimiters: Delimiters) -> Self {
        self.delimiters = delimiters;
        self
    }

    pub fn attached(&self) -> &[ImageAttachment] {
        &self.attached
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, AssetError> {
        match &self.base_dir {
            Some(base) => {
                let full = base.join(path);
                if full.is_file() {
                    Ok(full)
                } else {
                    Err(AssetError::MissingFile(full.display().to_string()))
                }
            }
            None => Ok(PathBuf::from(path)),
        }
    }
}

impl AssetPipeline for LocalAssets {
    fn attach_images(&mut self, target: ImageTarget, raw: &str) -> Result<usize, AssetError> {
        let mut pending = Vec::new();
        for entry in self.delimiters.split_associations(raw) {
            let (path, alt) = self.delimiters.split_name_value(&entry);
            if path.is_empty() {
                return Err(AssetError::Rejected(format!("no path in '{}'", entry)));
            }
            pending.push(ImageAttachment {
                target,
                path: self.resolve(&path)?,
                alt,
            });
        }

        let count = pending.len();
        self.attached.extend(pending);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_attach_records_every_entry() {
        let mut assets = LocalAssets::new();
        let count = assets
            .attach_images(ImageTarget::MasterVariant(4), "mug.jpg:Front view | mug-back.jpg")
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(assets.attached()[0].alt.as_deref(), Some("Front view"));
        assert_eq!(assets.attached()[1].path, PathBuf::from("mug-back.jpg"));
        assert_eq!(assets.attached()[1].target, ImageTarget::MasterVariant(4));
    }

    #[test]
    fn test_missing_file_under_base_dir() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("mug.jpg"), b"jpeg").unwrap();
        let mut assets = LocalAssets::with_base_dir(dir.path());

        assert_eq!(assets.attach_images(ImageTarget::Product(1), "mug.jpg").unwrap(), 1);

        let err = assets
            .attach_images(ImageTarget::Product(1), "mug.jpg|cap.jpg")
            .unwrap_err();
        assert!(matches!(err, AssetError::MissingFile(ref p) if p.ends_with("cap.jpg")));
        // Nothing from the failed cell is kept
        assert_eq!(assets.attached().len(), 1);
    }

    #[test]
    fn test_entry_without_path_rejected() {
        let mut assets = LocalAssets::new();
        assert!(matches!(
            assets.attach_images(ImageTarget::Product(1), ":alt only"),
            Err(AssetError::Rejected(_))
        ));
    }
}
