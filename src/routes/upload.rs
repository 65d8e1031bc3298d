//! Image uploads stored on local disk and served from `/uploads`.

use std::path::Path;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use rand::Rng;
use serde_json::{json, Value};
use tracing::info;

use crate::auth::AuthUser;
use crate::error::{ApiError, Result};
use crate::state::AppState;

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];
const FIELD: &str = "image";

pub fn routes() -> Router<AppState> {
    // headroom for the multipart framing around the file
    Router::new().route("/", post(upload)).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + 64 * 1024))
}

/// Lower-cased extension of an acceptable image file name.
fn image_extension(file_name: &str, content_type: Option<&str>) -> Result<String> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|e| ALLOWED_EXTENSIONS.contains(&e.as_str()))
        .ok_or_else(|| ApiError::BadRequest("Only image files (jpg, jpeg, png, gif) are allowed!".into()))?;
    if !content_type.is_some_and(|c| c.starts_with("image/")) {
        return Err(ApiError::BadRequest("Only image files are allowed!".into()));
    }
    Ok(ext)
}

/// `{unix millis}-{random}.{ext}`
fn unique_name(ext: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!("{}-{suffix}.{ext}", Utc::now().timestamp_millis())
}

async fn upload(AuthUser(claims): AuthUser, State(state): State<AppState>, mut multipart: Multipart) -> Result<Json<Value>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FIELD) {
            continue;
        }
        let ext = image_extension(field.file_name().unwrap_or_default(), field.content_type())?;
        let data = field.bytes().await?;
        if data.len() > MAX_IMAGE_BYTES {
            return Err(ApiError::BadRequest("File size cannot be larger than 5MB!".into()));
        }

        let dir = &state.config.upload_dir;
        let name = unique_name(&ext);
        tokio::fs::create_dir_all(dir).await.map_err(|e| ApiError::Internal(format!("upload dir: {e}")))?;
        tokio::fs::write(dir.join(&name), &data)
            .await
            .map_err(|e| ApiError::Internal(format!("writing {name}: {e}")))?;

        let image_url = format!("{}/uploads/{name}", state.config.public_url);
        info!(user_id = %claims.sub, %image_url, bytes = data.len(), "image uploaded");
        return Ok(Json(json!({ "success": true, "imageUrl": image_url, "message": "Image uploaded successfully" })));
    }
    Err(ApiError::BadRequest("Please upload an image file".into()))
}
