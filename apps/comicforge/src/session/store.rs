//! Page session store: the ordered comic pages plus the active generation handle.
//!
//! Every mutation adopts the new handle and touches at most one page, in the
//! same call, so pages and handle never drift apart.

use chrono::{DateTime, Utc};
use image::DynamicImage;
use tracing::warn;

use crate::genai_client::SessionHandle;
use crate::session::SessionError;

/// One generated comic page.
#[derive(Debug, Clone)]
pub struct Page {
    pub image: DynamicImage,
    pub generated_at: DateTime<Utc>,
}

impl Page {
    fn new(image: DynamicImage) -> Self {
        Self {
            image,
            generated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Default)]
pub struct PageSessionStore {
    pages: Vec<Page>,
    handle: Option<SessionHandle>,
}

impl PageSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the first image as a new page (if any) and adopts `new_handle`.
    /// Returns whether a page was appended.
    pub fn new_page(&mut self, images: Vec<DynamicImage>, new_handle: SessionHandle) -> bool {
        self.handle = Some(new_handle);
        match take_first(images) {
            Some(image) => {
                self.pages.push(Page::new(image));
                true
            }
            None => false,
        }
    }

    /// Replaces the last page with the first image (if any) and adopts `new_handle`.
    /// Returns whether the last page was replaced.
    pub fn edit_last_page(
        &mut self,
        images: Vec<DynamicImage>,
        new_handle: SessionHandle,
    ) -> Result<bool, SessionError> {
        let Some(last) = self.pages.last_mut() else {
            return Err(SessionError::NoPageToEdit);
        };

        let replaced = match take_first(images) {
            Some(image) => {
                *last = Page::new(image);
                true
            }
            None => false,
        };
        self.handle = Some(new_handle);
        Ok(replaced)
    }

    pub fn all_pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn current_handle(&self) -> Option<&SessionHandle> {
        self.handle.as_ref()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Only the first image becomes a page; extras are dropped with a warning.
fn take_first(images: Vec<DynamicImage>) -> Option<DynamicImage> {
    if images.len() > 1 {
        warn!(
            "Model returned {} images; keeping the first, discarding {}",
            images.len(),
            images.len() - 1
        );
    }
    images.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genai_client::fake::solid_image;

    fn red(page: &Page) -> u8 {
        page.image.to_rgb8().get_pixel(0, 0)[0]
    }

    #[test]
    fn test_new_store_is_empty_without_handle() {
        let store = PageSessionStore::new();
        assert!(store.is_empty());
        assert!(store.current_handle().is_none());
    }

    #[test]
    fn test_new_page_with_one_image_appends() {
        let mut store = PageSessionStore::new();
        let handle = SessionHandle::start();
        let handle_id = handle.id();

        assert!(store.new_page(vec![solid_image(7)], handle));

        assert_eq!(store.len(), 1);
        assert_eq!(red(&store.all_pages()[0]), 7);
        assert_eq!(store.current_handle().unwrap().id(), handle_id);
    }

    #[test]
    fn test_new_page_with_no_images_adopts_handle_only() {
        let mut store = PageSessionStore::new();
        let handle = SessionHandle::start();
        let handle_id = handle.id();

        assert!(!store.new_page(vec![], handle));

        assert_eq!(store.len(), 0);
        assert_eq!(store.current_handle().unwrap().id(), handle_id);
    }

    #[test]
    fn test_new_page_keeps_only_first_image() {
        let mut store = PageSessionStore::new();
        store.new_page(
            vec![solid_image(1), solid_image(2), solid_image(3)],
            SessionHandle::start(),
        );
        assert_eq!(store.len(), 1);
        assert_eq!(red(&store.all_pages()[0]), 1);
    }

    #[test]
    fn test_edit_replaces_only_last_page() {
        let mut store = PageSessionStore::new();
        store.new_page(vec![solid_image(1)], SessionHandle::start());
        store.new_page(vec![solid_image(2)], SessionHandle::start());
        store.new_page(vec![solid_image(3)], SessionHandle::start());

        let edit_handle = SessionHandle::start();
        let edit_id = edit_handle.id();
        assert!(store.edit_last_page(vec![solid_image(9)], edit_handle).unwrap());

        let shades: Vec<u8> = store.all_pages().iter().map(red).collect();
        assert_eq!(shades, vec![1, 2, 9]);
        assert_eq!(store.current_handle().unwrap().id(), edit_id);
    }

    #[test]
    fn test_edit_on_empty_store_fails_and_keeps_state() {
        let mut store = PageSessionStore::new();
        let result = store.edit_last_page(vec![solid_image(1)], SessionHandle::start());

        assert!(matches!(result, Err(SessionError::NoPageToEdit)));
        assert!(store.is_empty());
        assert!(store.current_handle().is_none());
    }

    #[test]
    fn test_edit_with_no_images_keeps_page_and_adopts_handle() {
        let mut store = PageSessionStore::new();
        store.new_page(vec![solid_image(4)], SessionHandle::start());

        let edit_handle = SessionHandle::start();
        let edit_id = edit_handle.id();
        assert!(!store.edit_last_page(vec![], edit_handle).unwrap());

        assert_eq!(store.len(), 1);
        assert_eq!(red(&store.all_pages()[0]), 4);
        assert_eq!(store.current_handle().unwrap().id(), edit_id);
    }
}
