//! Axum route handlers for session lifecycle, characters, and the reference image.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::genai_client::ReferenceImage;
use crate::models::Character;
use crate::session::ComicSession;
use crate::state::AppState;

const REFERENCE_FIELD: &str = "file";

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub characters: Vec<Character>,
    pub page_count: usize,
    pub has_reference_image: bool,
    pub has_api_key: bool,
    pub session_handle_id: Option<Uuid>,
}

impl From<&ComicSession> for SessionSummary {
    fn from(session: &ComicSession) -> Self {
        Self {
            session_id: session.id,
            created_at: session.created_at,
            characters: session.characters.clone(),
            page_count: session.store.len(),
            has_reference_image: session.reference_image.is_some(),
            has_api_key: session.api_key.is_some(),
            session_handle_id: session.store.current_handle().map(|h| h.id()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CharactersResponse {
    pub characters: Vec<Character>,
}

#[derive(Debug, Serialize)]
pub struct ReferenceResponse {
    pub mime_type: String,
    pub size_bytes: usize,
}

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
    request: Option<Json<CreateSessionRequest>>,
) -> (StatusCode, Json<CreateSessionResponse>) {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let session_id = state.sessions.create(request.api_key).await;
    (StatusCode::CREATED, Json(CreateSessionResponse { session_id }))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSummary>, AppError> {
    let session = state.sessions.get(id).await?;
    let session = session.lock().await;
    Ok(Json(SessionSummary::from(&*session)))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.sessions.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/sessions/:id/characters
///
/// "Add Character". An empty body appends a blank character to fill in later.
pub async fn handle_add_character(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    character: Option<Json<Character>>,
) -> Result<(StatusCode, Json<CharactersResponse>), AppError> {
    let session = state.sessions.get(id).await?;
    let mut session = session.lock().await;

    session
        .characters
        .push(character.map(|Json(c)| c).unwrap_or_default());

    Ok((
        StatusCode::CREATED,
        Json(CharactersResponse {
            characters: session.characters.clone(),
        }),
    ))
}

/// PUT /api/v1/sessions/:id/characters/:idx (0-based)
pub async fn handle_update_character(
    State(state): State<AppState>,
    Path((id, idx)): Path<(Uuid, usize)>,
    Json(character): Json<Character>,
) -> Result<Json<CharactersResponse>, AppError> {
    let session = state.sessions.get(id).await?;
    let mut session = session.lock().await;

    let slot = session
        .characters
        .get_mut(idx)
        .ok_or_else(|| AppError::NotFound(format!("Character {idx} not found")))?;
    *slot = character;

    Ok(Json(CharactersResponse {
        characters: session.characters.clone(),
    }))
}

/// DELETE /api/v1/sessions/:id/characters/:idx (0-based)
pub async fn handle_remove_character(
    State(state): State<AppState>,
    Path((id, idx)): Path<(Uuid, usize)>,
) -> Result<Json<CharactersResponse>, AppError> {
    let session = state.sessions.get(id).await?;
    let mut session = session.lock().await;

    if idx >= session.characters.len() {
        return Err(AppError::NotFound(format!("Character {idx} not found")));
    }
    session.characters.remove(idx);

    Ok(Json(CharactersResponse {
        characters: session.characters.clone(),
    }))
}

/// PUT /api/v1/sessions/:id/reference
///
/// Multipart upload, field `file`, PNG or JPEG. Sent along with every new page.
pub async fn handle_upload_reference(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<ReferenceResponse>, AppError> {
    let session = state.sessions.get(id).await?;

    let mut upload: Option<Bytes> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() == Some(REFERENCE_FIELD) {
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
            upload = Some(data);
            break;
        }
    }

    let data = upload.ok_or_else(|| {
        AppError::Validation(format!("Multipart field '{REFERENCE_FIELD}' is required"))
    })?;
    let mime_type = reference_mime_type(&data)?.to_string();
    let size_bytes = data.len();

    let mut session = session.lock().await;
    session.reference_image = Some(ReferenceImage {
        mime_type: mime_type.clone(),
        data,
    });
    info!("Session {id}: reference image set ({mime_type}, {size_bytes} bytes)");

    Ok(Json(ReferenceResponse {
        mime_type,
        size_bytes,
    }))
}

/// DELETE /api/v1/sessions/:id/reference
pub async fn handle_clear_reference(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let session = state.sessions.get(id).await?;
    session.lock().await.reference_image = None;
    Ok(StatusCode::NO_CONTENT)
}

/// Sniffs the upload; only PNG and JPEG are accepted.
fn reference_mime_type(data: &[u8]) -> Result<&'static str, AppError> {
    match image::guess_format(data) {
        Ok(ImageFormat::Png) => Ok("image/png"),
        Ok(ImageFormat::Jpeg) => Ok("image/jpeg"),
        _ => Err(AppError::Validation(
            "Reference image must be a PNG or JPEG file".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_signature_is_accepted() {
        let data = b"\x89PNG\r\n\x1a\n0000";
        assert_eq!(reference_mime_type(data).unwrap(), "image/png");
    }

    #[test]
    fn test_jpeg_signature_is_accepted() {
        let data = b"\xFF\xD8\xFF\xE0rest";
        assert_eq!(reference_mime_type(data).unwrap(), "image/jpeg");
    }

    #[test]
    fn test_other_files_are_rejected() {
        assert!(reference_mime_type(b"%PDF-1.5").is_err());
        assert!(reference_mime_type(b"").is_err());
    }
}
