//! Page generation client, the single point of entry for image model calls.
//!
//! No other module may talk to the Gemini API directly. Handlers go through
//! the `PageGenerator` trait held in `AppState`, so tests can swap in a fake.
//!
//! The REST endpoint is stateless: a "chat session" is the ordered list of
//! user/model turns carried by `SessionHandle` and replayed on every call.
//! Continuing a handle is how an edit keeps the previous page in context.
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use bytes::Bytes;
use image::DynamicImage;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::optional_env;

#[cfg(test)]
pub mod fake;

pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// The only time limit on a call. Image generation itself may take minutes.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("No Google API key configured (set GOOGLE_API_KEY or provide one for the session)")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Inline image data is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Inline image could not be decoded: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("Image decoding task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

// ────────────────────────────────────────────────────────────────────────────
// Request / session types
// ────────────────────────────────────────────────────────────────────────────

/// One piece of a user message.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Text(String),
    Image { mime_type: String, data: Bytes },
}

/// A user-supplied image sent alongside the prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceImage {
    pub mime_type: String,
    pub data: Bytes,
}

/// Opaque handle to a conversation with the image model.
///
/// A fresh handle (new `id`, empty history) is created for every new page;
/// edits continue the existing one.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: Uuid,
    history: Vec<Turn>,
}

impl SessionHandle {
    pub fn start() -> Self {
        Self {
            id: Uuid::new_v4(),
            history: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Number of completed user/model exchanges.
    #[cfg(test)]
    pub fn exchange_count(&self) -> usize {
        self.history.iter().filter(|t| t.role == ROLE_USER).count()
    }

    pub(crate) fn record_exchange(&mut self, user: Turn, model: Turn) {
        self.history.push(user);
        self.history.push(model);
    }
}

/// Everything one generation call needs.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub session: Option<SessionHandle>,
    pub reference_image: Option<ReferenceImage>,
    pub force_new_session: bool,
    /// Per-session credential; falls back to `GOOGLE_API_KEY` when absent.
    pub api_key: Option<String>,
}

/// Result of one generation call. `images` may be empty.
#[derive(Debug, Clone)]
pub struct GenerationOutput {
    pub images: Vec<DynamicImage>,
    pub session: SessionHandle,
}

/// The page generator trait. Implement this to swap the backend without
/// touching handlers or the page pipeline.
///
/// Carried in `AppState` as `Arc<dyn PageGenerator>`.
#[async_trait]
pub trait PageGenerator: Send + Sync {
    async fn generate(&self, request: GenerationRequest)
        -> Result<GenerationOutput, GenerationError>;
}

/// Starts a new session when none is given or a fresh one is forced.
/// This never decides *whether* to force; that is the caller's call.
pub fn resolve_session(session: Option<SessionHandle>, force_new_session: bool) -> SessionHandle {
    match session {
        Some(existing) if !force_new_session => existing,
        _ => SessionHandle::start(),
    }
}

/// Prompt text first, then the reference image if one was supplied.
pub fn build_contents(prompt: &str, reference_image: Option<&ReferenceImage>) -> Vec<Content> {
    let mut contents = vec![Content::Text(prompt.to_string())];
    if let Some(reference) = reference_image {
        contents.push(Content::Image {
            mime_type: reference.mime_type.clone(),
            data: reference.data.clone(),
        });
    }
    contents
}

// ────────────────────────────────────────────────────────────────────────────
// Gemini wire format
// ────────────────────────────────────────────────────────────────────────────

const ROLE_USER: &str = "user";
const ROLE_MODEL: &str = "model";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Turn {
    role: String,
    #[serde(default)]
    parts: Vec<WirePart>,
}

impl Turn {
    pub(crate) fn user(contents: &[Content]) -> Self {
        Self {
            role: ROLE_USER.to_string(),
            parts: contents.iter().map(WirePart::from).collect(),
        }
    }

    #[cfg(test)]
    pub(crate) fn model_text(text: &str) -> Self {
        Self {
            role: ROLE_MODEL.to_string(),
            parts: vec![WirePart {
                text: Some(text.to_string()),
                ..WirePart::default()
            }],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, alias = "inline_data", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought_signature: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(alias = "mime_type")]
    mime_type: String,
    data: String,
}

impl From<&Content> for WirePart {
    fn from(content: &Content) -> Self {
        match content {
            Content::Text(text) => WirePart {
                text: Some(text.clone()),
                ..WirePart::default()
            },
            Content::Image { mime_type, data } => WirePart {
                inline_data: Some(InlineData {
                    mime_type: mime_type.clone(),
                    data: BASE64_STANDARD.encode(data),
                }),
                ..WirePart::default()
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: &'a [Turn],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: [&'static str; 2],
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

/// Pulls the model turn out of a response. A response without a candidate
/// or without content is malformed; a turn without images is not.
fn extract_model_turn(response: GenerateContentResponse) -> Result<Turn, GenerationError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| GenerationError::MalformedResponse("response has no candidates".into()))?;

    let content = candidate.content.ok_or_else(|| {
        GenerationError::MalformedResponse(format!(
            "candidate has no content (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        ))
    })?;

    Ok(Turn {
        role: ROLE_MODEL.to_string(),
        parts: content.parts,
    })
}

/// Walks the response parts in order: text is logged, inline data is
/// base64-decoded and collected. Thought parts are skipped.
fn collect_inline_images(turn: &Turn) -> Result<Vec<Vec<u8>>, GenerationError> {
    let mut images = Vec::new();

    for part in &turn.parts {
        if part.thought == Some(true) {
            debug!("Skipping model thought part");
            continue;
        }
        if let Some(text) = &part.text {
            info!("Model commentary: {text}");
        } else if let Some(inline) = &part.inline_data {
            debug!("Inline {} part received", inline.mime_type);
            images.push(BASE64_STANDARD.decode(inline.data.as_bytes())?);
        }
    }

    Ok(images)
}

fn decode_images(raw: Vec<Vec<u8>>) -> Result<Vec<DynamicImage>, GenerationError> {
    raw.iter()
        .map(|bytes| image::load_from_memory(bytes).map_err(GenerationError::from))
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// GeminiImageClient
// ────────────────────────────────────────────────────────────────────────────

/// Gemini `generateContent` client for image output.
/// No retries, throttling, or caching: every failure goes straight back to the caller.
#[derive(Clone)]
pub struct GeminiImageClient {
    client: Client,
    model: String,
    api_base: String,
}

impl GeminiImageClient {
    pub fn new(
        model: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;
        Ok(Self {
            client,
            model: model.into(),
            api_base: api_base.into(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        let model = self.model.trim();
        let model_path = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{model}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    /// The session key wins; otherwise the environment is read on every call.
    fn resolve_api_key(override_key: Option<String>) -> Result<String, GenerationError> {
        override_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .or_else(|| optional_env(API_KEY_ENV))
            .ok_or(GenerationError::MissingApiKey)
    }

    async fn send(&self, api_key: &str, contents: &[Turn]) -> Result<Turn, GenerationError> {
        let body = GenerateContentRequest {
            contents,
            generation_config: GenerationConfig {
                response_modalities: ["TEXT", "IMAGE"],
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            warn!("Gemini API returned {status}: {message}");
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

        extract_model_turn(parsed)
    }
}

#[async_trait]
impl PageGenerator for GeminiImageClient {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationOutput, GenerationError> {
        let api_key = Self::resolve_api_key(request.api_key)?;

        let mut session = resolve_session(request.session, request.force_new_session);
        let user_turn = Turn::user(&build_contents(
            &request.prompt,
            request.reference_image.as_ref(),
        ));

        let mut contents = session.history.clone();
        contents.push(user_turn.clone());

        debug!(
            "Sending {} turn(s) to {} (session {})",
            contents.len(),
            self.model,
            session.id
        );

        let model_turn = self.send(&api_key, &contents).await?;
        let raw_images = collect_inline_images(&model_turn)?;
        let images = tokio::task::spawn_blocking(move || decode_images(raw_images)).await??;

        info!(
            "Generation returned {} image(s) for session {}",
            images.len(),
            session.id
        );

        session.record_exchange(user_turn, model_turn);

        Ok(GenerationOutput { images, session })
    }
}
