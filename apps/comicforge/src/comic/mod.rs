// Comic authoring pipeline: prompt assembly, input validation, page generation.
// All image model calls go through genai_client; no direct HTTP calls here.

pub mod assembler;
pub mod generator;
pub mod handlers;
pub mod prompts;
pub mod validation;
