//! Image repository for database operations.
//!
//! Implements image record CRUD operations using SeaORM.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::entities::images;
use prism_core::image::{CreateImageInput, Image, ImageError, ImageRepository as ImageRepoTrait};
use prism_shared::types::{ImageId, PageRequest, PageResponse, UserId};

/// Image repository implementation.
#[derive(Debug, Clone)]
pub struct ImageRepository {
    db: DatabaseConnection,
}

impl ImageRepository {
    /// Create a new image repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl ImageRepoTrait for ImageRepository {
    async fn create(&self, input: CreateImageInput) -> Result<Image, ImageError> {
        let now = Utc::now();
        let active_model = images::ActiveModel {
            id: Set(input.id.into_inner()),
            user_id: Set(input.user_id.into_inner()),
            url: Set(input.url),
            content_type: Set(input.content_type),
            file_size: Set(input.file_size),
            metadata: Set(input.metadata),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let model = active_model
            .insert(&self.db)
            .await
            .map_err(|e| ImageError::repository(e.to_string()))?;

        Ok(to_domain(model))
    }

    async fn find_by_id(&self, id: ImageId) -> Result<Option<Image>, ImageError> {
        let model = images::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(|e| ImageError::repository(e.to_string()))?;

        Ok(model.map(to_domain))
    }

    async fn list_by_user(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<PageResponse<Image>, ImageError> {
        let query = images::Entity::find()
            .filter(images::Column::UserId.eq(user_id.into_inner()))
            .order_by_desc(images::Column::CreatedAt)
            .order_by_desc(images::Column::Id);

        let total = query
            .clone()
            .count(&self.db)
            .await
            .map_err(|e| ImageError::repository(e.to_string()))?;

        let models = query
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(|e| ImageError::repository(e.to_string()))?;

        Ok(PageResponse::new(
            models.into_iter().map(to_domain).collect(),
            page,
            total,
        ))
    }

    async fn delete(&self, id: ImageId) -> Result<bool, ImageError> {
        let result = images::Entity::delete_by_id(id.into_inner())
            .exec(&self.db)
            .await
            .map_err(|e| ImageError::repository(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }
}

/// Convert database model to domain model.
fn to_domain(model: images::Model) -> Image {
    Image {
        id: ImageId::from_uuid(model.id),
        user_id: UserId::from_uuid(model.user_id),
        url: model.url,
        content_type: model.content_type,
        file_size: model.file_size,
        metadata: model.metadata,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn test_to_domain() {
        let offset = FixedOffset::east_opt(7 * 3600).unwrap();
        let created = offset.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let model = images::Model {
            id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            url: "https://cdn.test/originals/a/b/cat.png".to_string(),
            content_type: "image/png".to_string(),
            file_size: 42,
            metadata: Some(json!({"width": 6})),
            created_at: created,
            updated_at: created,
        };

        let image = to_domain(model.clone());

        assert_eq!(image.id.into_inner(), model.id);
        assert_eq!(image.user_id.into_inner(), model.user_id);
        assert_eq!(image.url, model.url);
        assert_eq!(image.metadata, model.metadata);
        assert_eq!(
            image.created_at,
            Utc.with_ymd_and_hms(2026, 3, 1, 5, 0, 0).unwrap()
        );
    }
}
