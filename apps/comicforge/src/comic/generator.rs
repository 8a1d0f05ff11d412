//! Comic page pipeline: one user action, one pass.
//!
//! Flow (new page): validate → assemble prompt → generate in a fresh session →
//!                  store.new_page
//! Flow (edit):     validate → require a page → generate in the current session →
//!                  store.edit_last_page
//!
//! The session is only touched after the remote call succeeds, so a failed call
//! leaves pages, handle and characters exactly as they were.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::comic::assembler::assemble;
use crate::comic::validation::{
    validate_characters, validate_edit_instruction, validate_panel, validate_story,
};
use crate::errors::AppError;
use crate::genai_client::{GenerationRequest, PageGenerator};
use crate::models::{Character, Panel, StoryContext};
use crate::pdf::export_pdf;
use crate::session::ComicSession;

pub const NOTHING_PRODUCED: &str = "No image was produced; try rephrasing the request";

/// What a generate or edit call did to the session.
#[derive(Debug, Clone, Serialize)]
pub struct PageOutcome {
    /// A page was appended (new page) or replaced (edit).
    pub changed: bool,
    /// 1-based number of the page that was added or replaced.
    pub page_number: Option<usize>,
    pub page_count: usize,
    pub session_handle_id: Uuid,
    pub message: String,
}

/// "Generate Comic Page": always starts a fresh generation session.
pub async fn generate_new_page(
    session: &mut ComicSession,
    generator: &dyn PageGenerator,
    story: &StoryContext,
    panel: &Panel,
    characters: Option<Vec<Character>>,
    max_plot_chars: usize,
) -> Result<PageOutcome, AppError> {
    let characters = characters.unwrap_or_else(|| session.characters.clone());

    validate_story(story, max_plot_chars)?;
    validate_panel(panel)?;
    validate_characters(&characters)?;

    let prompt = assemble(story, &characters, panel);
    info!(
        "Generating page {} for session {} ({} characters, reference image: {})",
        session.store.len() + 1,
        session.id,
        characters.len(),
        session.reference_image.is_some()
    );

    let output = generator
        .generate(GenerationRequest {
            prompt,
            session: None,
            reference_image: session.reference_image.clone(),
            force_new_session: true,
            api_key: session.api_key.clone(),
        })
        .await?;

    let handle_id = output.session.id();
    session.characters = characters;
    let added = session.store.new_page(output.images, output.session);
    let page_count = session.store.len();

    Ok(PageOutcome {
        changed: added,
        page_number: added.then_some(page_count),
        page_count,
        session_handle_id: handle_id,
        message: if added {
            format!("Page {page_count} generated")
        } else {
            NOTHING_PRODUCED.to_string()
        },
    })
}

/// "Apply Edit": continues the current generation session against the last page.
pub async fn apply_edit(
    session: &mut ComicSession,
    generator: &dyn PageGenerator,
    instruction: &str,
) -> Result<PageOutcome, AppError> {
    validate_edit_instruction(instruction)?;
    if session.store.is_empty() {
        return Err(AppError::NoPageToEdit);
    }

    info!(
        "Editing page {} for session {}",
        session.store.len(),
        session.id
    );

    let output = generator
        .generate(GenerationRequest {
            prompt: instruction.trim().to_string(),
            session: session.store.current_handle().cloned(),
            reference_image: None,
            force_new_session: false,
            api_key: session.api_key.clone(),
        })
        .await?;

    let handle_id = output.session.id();
    let replaced = session.store.edit_last_page(output.images, output.session)?;
    let page_count = session.store.len();

    Ok(PageOutcome {
        changed: replaced,
        page_number: replaced.then_some(page_count),
        page_count,
        session_handle_id: handle_id,
        message: if replaced {
            "Last page updated with your edit".to_string()
        } else {
            NOTHING_PRODUCED.to_string()
        },
    })
}

/// "Download PDF": every page, in order, one per PDF page.
pub async fn export_session_pdf(session: &ComicSession) -> Result<Vec<u8>, AppError> {
    if session.store.is_empty() {
        return Err(AppError::EmptyExport);
    }

    let images: Vec<DynamicImage> = session
        .store
        .all_pages()
        .iter()
        .map(|page| page.image.clone())
        .collect();
    let page_count = images.len();

    let pdf = tokio::task::spawn_blocking(move || export_pdf(&images))
        .await
        .map_err(|e| AppError::Internal(e.into()))??;

    info!(
        "Exported {page_count} page(s) for session {} ({} bytes)",
        session.id,
        pdf.len()
    );
    Ok(pdf)
}

/// PNG bytes of page `number` (1-based).
pub async fn page_png(session: &ComicSession, number: usize) -> Result<Vec<u8>, AppError> {
    let page = number
        .checked_sub(1)
        .and_then(|idx| session.store.all_pages().get(idx))
        .ok_or_else(|| AppError::NotFound(format!("Page {number} not found")))?;
    let image = page.image.clone();

    tokio::task::spawn_blocking(move || {
        let mut buf = Cursor::new(Vec::new());
        image
            .write_to(&mut buf, ImageFormat::Png)
            .map(|_| buf.into_inner())
    })
    .await
    .map_err(|e| AppError::Internal(e.into()))?
    .map_err(|e| AppError::Internal(e.into()))
}
