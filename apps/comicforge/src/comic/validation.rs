//! Input checks run before any prompt is assembled or any remote call is made.

use tracing::debug;

use crate::errors::AppError;
use crate::models::story::{SUGGESTED_STYLES, SUGGESTED_THEMES};
use crate::models::{Character, Panel, StoryContext};

pub fn validate_story(story: &StoryContext, max_plot_chars: usize) -> Result<(), AppError> {
    if story.header.trim().is_empty() {
        return Err(AppError::Validation("Story header cannot be empty".to_string()));
    }

    if let Some(plot) = story.plot_text() {
        let chars = plot.chars().count();
        if chars > max_plot_chars {
            return Err(AppError::Validation(format!(
                "Story plot is {chars} characters; the limit is {max_plot_chars}"
            )));
        }
    }

    if !SUGGESTED_THEMES.contains(&story.theme.trim()) {
        debug!("Custom theme in use: {:?}", story.theme);
    }
    if !SUGGESTED_STYLES.contains(&story.style.trim()) {
        debug!("Custom style in use: {:?}", story.style);
    }

    Ok(())
}

pub fn validate_panel(panel: &Panel) -> Result<(), AppError> {
    if panel.description.trim().is_empty() {
        return Err(AppError::Validation(
            "Panel description cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Every character needs a name; the error names the 1-based position.
pub fn validate_characters(characters: &[Character]) -> Result<(), AppError> {
    match characters.iter().position(|c| c.name.trim().is_empty()) {
        Some(idx) => Err(AppError::Validation(format!(
            "Character {} has no name",
            idx + 1
        ))),
        None => Ok(()),
    }
}

pub fn validate_edit_instruction(instruction: &str) -> Result<(), AppError> {
    if instruction.trim().is_empty() {
        return Err(AppError::Validation(
            "Edit instruction cannot be empty".to_string(),
        ));
    }
    Ok(())
}
