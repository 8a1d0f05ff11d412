//! In-process `PageGenerator` for pipeline and router tests.

use std::sync::Mutex;

use async_trait::async_trait;
use image::{DynamicImage, Rgb, RgbImage};

use super::{
    build_contents, resolve_session, GenerationError, GenerationOutput, GenerationRequest,
    PageGenerator, Turn,
};

pub struct FakePageGenerator {
    images_per_call: usize,
    fail: bool,
    calls: Mutex<Vec<GenerationRequest>>,
}

impl FakePageGenerator {
    /// Returns `images_per_call` solid images on every call.
    pub fn returning(images_per_call: usize) -> Self {
        Self {
            images_per_call,
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Fails every call the way an unreachable service would.
    pub fn failing() -> Self {
        Self {
            images_per_call: 0,
            fail: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<GenerationRequest> {
        self.calls.lock().unwrap().clone()
    }
}

/// A 4x3 image whose red channel encodes `shade`, so tests can tell pages apart.
pub fn solid_image(shade: u8) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 3, Rgb([shade, 0, 0])))
}

#[async_trait]
impl PageGenerator for FakePageGenerator {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationOutput, GenerationError> {
        let call_index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(request.clone());
            calls.len()
        };

        if self.fail {
            return Err(GenerationError::Api {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }

        let mut session = resolve_session(request.session, request.force_new_session);
        session.record_exchange(
            Turn::user(&build_contents(&request.prompt, request.reference_image.as_ref())),
            Turn::model_text("done"),
        );

        let images = (0..self.images_per_call)
            .map(|i| solid_image((call_index * 10 + i) as u8))
            .collect();

        Ok(GenerationOutput { images, session })
    }
}
