//! Image routes: upload, retrieval, transformation, deletion, listing.

use axum::{
    Json, Router,
    extract::{
        Multipart, Path, Query, State,
        multipart::{MultipartError, MultipartRejection},
        rejection::QueryRejection,
    },
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use bytes::Bytes;
use serde_json::json;
use tracing::info;

use prism_core::image::{
    Image, ImageRepository, TransformResult, TransformSpec, UploadImageInput,
};
use prism_shared::types::{ImageId, PageRequest, PageResponse};

use crate::{AppState, error::ApiError, extractors::Owner};

/// Multipart field that carries the upload.
pub const IMAGE_FIELD: &str = "image";

/// Creates the image routes.
pub fn routes<R: ImageRepository + 'static>() -> Router<AppState<R>> {
    Router::new()
        .route("/images", get(list_images::<R>))
        .route("/images/upload", post(upload_image::<R>))
        .route(
            "/images/{image_id}",
            get(get_image::<R>).delete(delete_image::<R>),
        )
        .route("/images/{image_id}/transform", post(transform_image::<R>))
}

fn parse_image_id(raw: &str) -> Result<ImageId, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::validation("image id must be a valid UUID"))
}

fn multipart_error(err: &MultipartError) -> ApiError {
    ApiError::with_status(err.status(), err.body_text())
}

/// POST `/images/upload`
/// Upload a new image as multipart field `image`.
async fn upload_image<R: ImageRepository + 'static>(
    State(state): State<AppState<R>>,
    owner: Owner,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let mut multipart =
        multipart.map_err(|rej| ApiError::with_status(rej.status(), rej.body_text()))?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&e))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or("image").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field.bytes().await.map_err(|e| multipart_error(&e))?;
        upload = Some((filename, content_type, data));
        break;
    }

    let Some((filename, content_type, data)) = upload.filter(|(_, _, data)| !data.is_empty())
    else {
        return Err(ApiError::validation("image file is required"));
    };

    let image = state
        .images
        .upload(UploadImageInput {
            user_id: owner.user_id(),
            filename,
            content_type,
            data,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Image uploaded successfully",
            "image": image
        })),
    ))
}

/// POST `/images/{image_id}/transform`
/// Transform an image; the body is the transformation spec.
async fn transform_image<R: ImageRepository + 'static>(
    State(state): State<AppState<R>>,
    Path(image_id): Path<String>,
    body: Bytes,
) -> Result<Json<TransformResult>, ApiError> {
    let image_id = parse_image_id(&image_id)?;
    let spec = TransformSpec::from_json(&body)?;

    let result = state.images.transform(image_id, &spec).await?;
    Ok(Json(result))
}

/// GET `/images/{image_id}`
/// Stream the original bytes with their stored content type.
async fn get_image<R: ImageRepository + 'static>(
    State(state): State<AppState<R>>,
    Path(image_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let image_id = parse_image_id(&image_id)?;
    let stored = state.images.get(image_id).await?;

    Ok((
        [(header::CONTENT_TYPE, stored.image.content_type)],
        stored.data,
    ))
}

/// DELETE `/images/{image_id}`
/// Delete an image's original and record.
async fn delete_image<R: ImageRepository + 'static>(
    State(state): State<AppState<R>>,
    Path(image_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let image_id = parse_image_id(&image_id)?;
    state.images.delete(image_id).await?;

    info!(image_id = %image_id, "Image delete requested");

    Ok(Json(json!({
        "success": true,
        "message": "Image deleted successfully"
    })))
}

/// GET `/images?page=&limit=`
/// List the owner's images, newest first.
async fn list_images<R: ImageRepository + 'static>(
    State(state): State<AppState<R>>,
    owner: Owner,
    page: Result<Query<PageRequest>, QueryRejection>,
) -> Result<Json<PageResponse<Image>>, ApiError> {
    let Query(page) = page.map_err(|rej| ApiError::with_status(rej.status(), rej.body_text()))?;

    let images = state.images.list(owner.user_id(), page).await?;
    Ok(Json(images))
}
