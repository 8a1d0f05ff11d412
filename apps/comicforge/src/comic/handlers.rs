//! Axum route handlers for the comic page actions.

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::comic::generator::{
    apply_edit, export_session_pdf, generate_new_page, page_png, PageOutcome,
};
use crate::errors::AppError;
use crate::models::story::{SUGGESTED_STYLES, SUGGESTED_THEMES};
use crate::models::{Character, Panel, StoryContext};
use crate::pdf::{PDF_FILENAME, PDF_MIME_TYPE};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GeneratePageRequest {
    pub story: StoryContext,
    pub panel: Panel,
    /// When present, replaces the session's character list once the page is generated.
    #[serde(default)]
    pub characters: Option<Vec<Character>>,
}

#[derive(Debug, Deserialize)]
pub struct EditPageRequest {
    pub instruction: String,
}

#[derive(Debug, Serialize)]
pub struct PageInfo {
    pub number: usize,
    pub width: u32,
    pub height: u32,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PageListResponse {
    pub pages: Vec<PageInfo>,
    pub session_handle_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct NextPageResponse {
    pub next_page_number: usize,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct OptionsResponse {
    pub themes: &'static [&'static str],
    pub styles: &'static [&'static str],
    pub max_plot_chars: usize,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/options
pub async fn handle_options(State(state): State<AppState>) -> Json<OptionsResponse> {
    Json(OptionsResponse {
        themes: SUGGESTED_THEMES,
        styles: SUGGESTED_STYLES,
        max_plot_chars: state.config.max_plot_chars,
    })
}

/// POST /api/v1/sessions/:id/pages
///
/// "Generate Comic Page". Starts a fresh generation session; a response with
/// `changed: false` means the model produced no image.
pub async fn handle_generate_page(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<GeneratePageRequest>,
) -> Result<Json<PageOutcome>, AppError> {
    let session = state.sessions.get(id).await?;
    let mut session = session.lock().await;

    let outcome = generate_new_page(
        &mut session,
        state.generator.as_ref(),
        &request.story,
        &request.panel,
        request.characters,
        state.config.max_plot_chars,
    )
    .await?;

    Ok(Json(outcome))
}

/// POST /api/v1/sessions/:id/edit
///
/// "Apply Edit". Rewrites the last page within the current generation session.
pub async fn handle_edit_last_page(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<EditPageRequest>,
) -> Result<Json<PageOutcome>, AppError> {
    let session = state.sessions.get(id).await?;
    let mut session = session.lock().await;

    let outcome = apply_edit(&mut session, state.generator.as_ref(), &request.instruction).await?;

    Ok(Json(outcome))
}

/// GET /api/v1/sessions/:id/pages
pub async fn handle_list_pages(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PageListResponse>, AppError> {
    let session = state.sessions.get(id).await?;
    let session = session.lock().await;

    let pages = session
        .store
        .all_pages()
        .iter()
        .enumerate()
        .map(|(idx, page)| PageInfo {
            number: idx + 1,
            width: page.image.width(),
            height: page.image.height(),
            generated_at: page.generated_at,
        })
        .collect();

    Ok(Json(PageListResponse {
        pages,
        session_handle_id: session.store.current_handle().map(|h| h.id()),
    }))
}

/// GET /api/v1/sessions/:id/pages/:number
///
/// Page preview as PNG. `number` is 1-based.
pub async fn handle_get_page(
    State(state): State<AppState>,
    Path((id, number)): Path<(Uuid, usize)>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.sessions.get(id).await?;
    let session = session.lock().await;

    let png = page_png(&session, number).await?;

    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}

/// GET /api/v1/sessions/:id/pdf
///
/// "Download PDF". All pages, in order, as `comic.pdf`.
pub async fn handle_download_pdf(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.sessions.get(id).await?;
    let session = session.lock().await;

    let pdf = export_session_pdf(&session).await?;

    Ok((
        [
            (header::CONTENT_TYPE, PDF_MIME_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{PDF_FILENAME}\""),
            ),
        ],
        pdf,
    ))
}

/// POST /api/v1/sessions/:id/next
///
/// "Generate Next Page". Nothing is generated here; the client clears its
/// panel form and the next `pages` call starts a fresh generation session.
pub async fn handle_next_page(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<NextPageResponse>, AppError> {
    let session = state.sessions.get(id).await?;
    let session = session.lock().await;

    Ok(Json(NextPageResponse {
        next_page_number: session.store.len() + 1,
        message: "You can now describe and generate the next page".to_string(),
    }))
}
