//! Images migration.
//!
//! Creates the images table holding one metadata record per uploaded original.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(IMAGES_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            "DROP TABLE IF EXISTS images CASCADE;
             DROP FUNCTION IF EXISTS set_images_updated_at();",
        )
        .await?;
        Ok(())
    }
}

const IMAGES_SQL: &str = r"
-- Image metadata; bytes live in the object store
CREATE TABLE images (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL,
    url TEXT NOT NULL,
    content_type VARCHAR(100) NOT NULL,
    file_size BIGINT NOT NULL,
    metadata JSONB,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_file_size_positive CHECK (file_size > 0)
);

-- Index for a user's images, newest first
CREATE INDEX idx_images_user ON images(user_id, created_at DESC, id DESC);

CREATE OR REPLACE FUNCTION set_images_updated_at()
RETURNS TRIGGER AS $$
BEGIN
    NEW.updated_at = now();
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_images_updated_at
BEFORE UPDATE ON images
FOR EACH ROW
EXECUTE FUNCTION set_images_updated_at();
";
