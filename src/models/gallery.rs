//! Galleries and their validators

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::store::GalleryStore;

/// A titled collection of images owned by one user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Gallery {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Gallery {
    pub fn new(user_id: i64, title: impl Into<String>) -> Self {
        Self {
            user_id,
            title: title.into(),
            ..Default::default()
        }
    }
}

type GalleryValFn = fn(&Gallery) -> Result<()>;

fn run_gallery_val_fns(gallery: &Gallery, fns: &[GalleryValFn]) -> Result<()> {
    for f in fns {
        f(gallery)?;
    }
    Ok(())
}

fn user_id_required(gallery: &Gallery) -> Result<()> {
    if gallery.user_id <= 0 {
        return Err(Error::UserIdRequired);
    }
    Ok(())
}

fn title_required(gallery: &Gallery) -> Result<()> {
    if gallery.title.is_empty() {
        return Err(Error::TitleRequired);
    }
    Ok(())
}

pub struct GalleryService {
    store: Arc<dyn GalleryStore>,
}

impl GalleryService {
    pub fn new(store: Arc<dyn GalleryStore>) -> Self {
        Self { store }
    }

    pub async fn by_id(&self, id: i64) -> Result<Gallery> {
        self.store.by_id(id).await
    }

    pub async fn by_user_id(&self, user_id: i64) -> Result<Vec<Gallery>> {
        self.store.by_user_id(user_id).await
    }

    pub async fn create(&self, gallery: &mut Gallery) -> Result<()> {
        run_gallery_val_fns(gallery, &[user_id_required, title_required])?;
        self.store.create(gallery).await?;
        tracing::info!(gallery_id = gallery.id, user_id = gallery.user_id, "Created gallery");
        Ok(())
    }

    pub async fn update(&self, gallery: &mut Gallery) -> Result<()> {
        run_gallery_val_fns(gallery, &[user_id_required, title_required])?;
        self.store.update(gallery).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        if id <= 0 {
            return Err(Error::InvalidId);
        }
        self.store.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use async_trait::async_trait;

    /// Fails the test if the validators ever let a call through
    struct UnreachableStore;

    #[async_trait]
    impl GalleryStore for UnreachableStore {
        async fn by_id(&self, _id: i64) -> Result<Gallery> {
            unreachable!("storage must not be reached")
        }
        async fn by_user_id(&self, _user_id: i64) -> Result<Vec<Gallery>> {
            unreachable!("storage must not be reached")
        }
        async fn create(&self, _gallery: &mut Gallery) -> Result<()> {
            unreachable!("storage must not be reached")
        }
        async fn update(&self, _gallery: &mut Gallery) -> Result<()> {
            unreachable!("storage must not be reached")
        }
        async fn delete(&self, _id: i64) -> Result<()> {
            unreachable!("storage must not be reached")
        }
    }

    #[tokio::test]
    async fn test_invalid_galleries_never_reach_storage() {
        let galleries = GalleryService::new(Arc::new(UnreachableStore));

        let mut no_owner = Gallery::new(0, "Holiday");
        assert!(matches!(
            galleries.create(&mut no_owner).await,
            Err(Error::UserIdRequired)
        ));

        let mut no_title = Gallery::new(1, "");
        assert!(matches!(
            galleries.create(&mut no_title).await,
            Err(Error::TitleRequired)
        ));

        let mut negative_owner = Gallery::new(-1, "");
        assert!(matches!(
            galleries.update(&mut negative_owner).await,
            Err(Error::UserIdRequired)
        ));

        assert!(matches!(galleries.delete(0).await, Err(Error::InvalidId)));
    }

    #[tokio::test]
    async fn test_any_non_empty_title_is_accepted() {
        let store = Arc::new(MemoryStore::new());
        let galleries = GalleryService::new(store.clone());
        let owner = store.seed_user("owner@example.com").await;

        let mut gallery = Gallery::new(owner, " ");
        galleries.create(&mut gallery).await.unwrap();
        assert_eq!(galleries.by_id(gallery.id).await.unwrap().title, " ");
    }

    #[tokio::test]
    async fn test_missing_owner_is_rejected_by_storage() {
        let store = Arc::new(MemoryStore::new());
        let galleries = GalleryService::new(store.clone());

        let mut gallery = Gallery::new(424242, "Holiday");
        assert!(matches!(
            galleries.create(&mut gallery).await,
            Err(Error::Constraint(_))
        ));
        assert_eq!(store.gallery_count().await, 0);
    }

    #[tokio::test]
    async fn test_create_update_delete() {
        let store = Arc::new(MemoryStore::new());
        let galleries = GalleryService::new(store.clone());
        let owner = store.seed_user("owner@example.com").await;

        let mut gallery = Gallery::new(owner, "Holiday");
        galleries.create(&mut gallery).await.unwrap();
        assert!(gallery.id > 0);

        gallery.title = "Summer holiday".to_string();
        galleries.update(&mut gallery).await.unwrap();
        assert_eq!(
            galleries.by_id(gallery.id).await.unwrap().title,
            "Summer holiday"
        );

        assert_eq!(galleries.by_user_id(owner).await.unwrap().len(), 1);
        assert!(galleries.by_user_id(owner + 1).await.unwrap().is_empty());

        galleries.delete(gallery.id).await.unwrap();
        assert!(matches!(
            galleries.by_id(gallery.id).await,
            Err(Error::NotFound)
        ));
    }
}
