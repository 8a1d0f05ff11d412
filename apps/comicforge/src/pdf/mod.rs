//! PDF export: one comic page image per PDF page.
//!
//! Pure CPU work: callers on the async runtime should run `export_pdf`
//! inside `tokio::task::spawn_blocking`.

pub mod geometry;

use image::DynamicImage;
use lopdf::{
    content::{Content, Operation},
    dictionary, Document, Object, Stream,
};
use thiserror::Error;
use tracing::debug;

pub use geometry::{fit_to_page, Placement, A4};

pub const PDF_FILENAME: &str = "comic.pdf";
pub const PDF_MIME_TYPE: &str = "application/pdf";

const IMAGE_RESOURCE_NAME: &[u8] = b"Im0";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No images provided to export")]
    EmptyInput,

    #[error("Image {index} has zero width or height")]
    EmptyImage { index: usize },

    #[error("PDF serialization failed: {0}")]
    Serialize(String),
}

/// Serializes `images` into a single PDF with exactly one A4 page per image,
/// in order. Each image is scaled to fit and centered.
///
/// Output is byte-for-byte deterministic for identical input: no dates, no
/// document ID.
pub fn export_pdf(images: &[DynamicImage]) -> Result<Vec<u8>, ExportError> {
    if images.is_empty() {
        return Err(ExportError::EmptyInput);
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::with_capacity(images.len());

    for (index, image) in images.iter().enumerate() {
        // Canonical 3-channel form; RGB8 input is copied unchanged.
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        if width == 0 || height == 0 {
            return Err(ExportError::EmptyImage { index });
        }

        let placement = fit_to_page(width, height, A4);
        debug!(
            "Page {}: {}x{} px drawn at {:.1},{:.1} size {:.1}x{:.1} pt",
            index + 1,
            width,
            height,
            placement.x,
            placement.y,
            placement.width,
            placement.height
        );

        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            rgb.into_raw(),
        ));

        let content = Content {
            operations: draw_image_ops(&placement),
        };
        let encoded = content
            .encode()
            .map_err(|e| ExportError::Serialize(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), A4.width.into(), A4.height.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    "Im0" => image_id,
                },
            },
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    doc.set_object(
        pages_id,
        dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
        },
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| ExportError::Serialize(e.to_string()))?;
    Ok(buffer)
}

/// `q w 0 0 h x y cm /Im0 Do Q`: the image XObject is drawn into the unit
/// square, so the CTM carries both the scale and the offset.
fn draw_image_ops(placement: &Placement) -> Vec<Operation> {
    vec![
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            vec![
                placement.width.into(),
                0.into(),
                0.into(),
                placement.height.into(),
                placement.x.into(),
                placement.y.into(),
            ],
        ),
        Operation::new("Do", vec![Object::Name(IMAGE_RESOURCE_NAME.to_vec())]),
        Operation::new("Q", vec![]),
    ]
}
