// Authoring sessions: one isolated ComicSession per user, held in the registry.
// All page/handle mutation goes through PageSessionStore.

pub mod handlers;
pub mod registry;
pub mod store;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::genai_client::ReferenceImage;
use crate::models::Character;

pub use registry::SessionRegistry;
pub use store::PageSessionStore;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("No page to edit")]
    NoPageToEdit,
}

/// Everything one user accumulates while authoring a comic.
/// Created on session start, dropped when the session is deleted.
#[derive(Debug)]
pub struct ComicSession {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    /// Credential typed in by the user; overrides `GOOGLE_API_KEY` when set.
    pub api_key: Option<String>,
    pub characters: Vec<Character>,
    pub reference_image: Option<ReferenceImage>,
    pub store: PageSessionStore,
}

impl ComicSession {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            api_key: api_key
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            characters: Vec::new(),
            reference_image: None,
            store: PageSessionStore::new(),
        }
    }
}
