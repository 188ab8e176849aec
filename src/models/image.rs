//! Gallery images stored on the local filesystem
//!
//! Images are not database records: an image exists exactly when a file
//! exists at `<root>/galleries/<gallery_id>/<filename>`.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncRead;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Image {
    pub gallery_id: i64,
    pub filename: String,
}

impl Image {
    /// Path relative to the images root
    pub fn relative_path(&self) -> PathBuf {
        gallery_dir(self.gallery_id).join(&self.filename)
    }

    /// Where the HTTP layer serves this image
    pub fn url_path(&self) -> String {
        format!("/images/galleries/{}/{}", self.gallery_id, self.filename)
    }
}

fn gallery_dir(gallery_id: i64) -> PathBuf {
    PathBuf::from("galleries").join(gallery_id.to_string())
}

fn validate_filename(filename: &str) -> Result<()> {
    let bad = filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains(['/', '\\', '\0']);
    if bad {
        return Err(Error::InvalidFilename(filename.to_string()));
    }
    Ok(())
}

pub struct ImageService {
    root: PathBuf,
}

impl ImageService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Copy `reader` into the gallery's directory, creating it on demand
    pub async fn create<R>(&self, gallery_id: i64, mut reader: R, filename: &str) -> Result<Image>
    where
        R: AsyncRead + Unpin,
    {
        validate_filename(filename)?;
        let dir = self.root.join(gallery_dir(gallery_id));
        tokio::fs::create_dir_all(&dir).await?;

        let mut dst = tokio::fs::File::create(dir.join(filename)).await?;
        let written = tokio::io::copy(&mut reader, &mut dst).await?;
        tracing::debug!(gallery_id, filename, bytes = written, "Stored image");

        Ok(Image {
            gallery_id,
            filename: filename.to_string(),
        })
    }

    /// All images of a gallery, sorted by filename
    pub async fn by_gallery_id(&self, gallery_id: i64) -> Result<Vec<Image>> {
        let dir = self.root.join(gallery_dir(gallery_id));
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut images = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(filename) = entry.file_name().to_str() {
                images.push(Image {
                    gallery_id,
                    filename: filename.to_string(),
                });
            }
        }
        images.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(images)
    }

    pub async fn delete(&self, image: &Image) -> Result<()> {
        validate_filename(&image.filename)?;
        match tokio::fs::remove_file(self.root.join(image.relative_path())).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a gallery's directory and everything in it
    pub async fn delete_all(&self, gallery_id: i64) -> Result<()> {
        match tokio::fs::remove_dir_all(self.root.join(gallery_dir(gallery_id))).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_and_list() {
        let dir = TempDir::new().unwrap();
        let images = ImageService::new(dir.path());

        images.create(3, &b"second"[..], "b.png").await.unwrap();
        let first = images.create(3, &b"first"[..], "a.jpg").await.unwrap();

        let listed = images.by_gallery_id(3).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0], first);
        assert_eq!(listed[1].filename, "b.png");

        let bytes = std::fs::read(dir.path().join(first.relative_path())).unwrap();
        assert_eq!(bytes, b"first");
    }

    #[tokio::test]
    async fn test_missing_gallery_is_empty() {
        let dir = TempDir::new().unwrap();
        let images = ImageService::new(dir.path());
        assert!(images.by_gallery_id(99).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = TempDir::new().unwrap();
        let images = ImageService::new(dir.path());
        for name in ["", "..", "../escape.png", "a/b.png", "a\\b.png"] {
            let result = images.create(1, &b"x"[..], name).await;
            assert!(matches!(result, Err(Error::InvalidFilename(_))), "{}", name);
        }
    }

    #[tokio::test]
    async fn test_delete() {
        let dir = TempDir::new().unwrap();
        let images = ImageService::new(dir.path());
        let image = images.create(1, &b"x"[..], "a.png").await.unwrap();

        images.delete(&image).await.unwrap();
        assert!(images.by_gallery_id(1).await.unwrap().is_empty());
        assert!(matches!(images.delete(&image).await, Err(Error::NotFound)));
    }

    #[tokio::test]
    async fn test_delete_all() {
        let dir = TempDir::new().unwrap();
        let images = ImageService::new(dir.path());
        images.create(1, &b"x"[..], "a.png").await.unwrap();
        images.create(1, &b"y"[..], "b.png").await.unwrap();

        images.delete_all(1).await.unwrap();
        images.delete_all(1).await.unwrap();
        assert!(images.by_gallery_id(1).await.unwrap().is_empty());
    }

    #[test]
    fn test_url_path() {
        let image = Image {
            gallery_id: 4,
            filename: "cat.png".to_string(),
        };
        assert_eq!(image.url_path(), "/images/galleries/4/cat.png");
        assert_eq!(image.relative_path(), PathBuf::from("galleries/4/cat.png"));
    }
}
