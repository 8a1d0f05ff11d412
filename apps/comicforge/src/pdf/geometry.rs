//! Page geometry for the PDF exporter: fixed A4 page, scale-to-fit, centered.

use serde::{Deserialize, Serialize};

/// Page size in PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub fn aspect(&self) -> f32 {
        self.width / self.height
    }
}

/// A4 portrait, rounded to whole points.
pub const A4: PageSize = PageSize {
    width: 595.0,
    height: 842.0,
};

/// Where an image is drawn on the page. Origin is the bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Scales an image uniformly so it fits inside `page` without cropping, then
/// centers it. Images wider than the page's aspect span the full width;
/// all others span the full height.
///
/// Both dimensions must be non-zero.
pub fn fit_to_page(image_width: u32, image_height: u32, page: PageSize) -> Placement {
    let aspect = image_width as f32 / image_height as f32;

    let (width, height) = if aspect > page.aspect() {
        (page.width, page.width / aspect)
    } else {
        (page.height * aspect, page.height)
    };

    Placement {
        x: (page.width - width) / 2.0,
        y: (page.height - height) / 2.0,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-3;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < EPS
    }

    #[test]
    fn test_wide_image_fits_by_width() {
        let p = fit_to_page(1600, 900, A4);
        assert!(approx(p.width, A4.width));
        assert!(approx(p.height, A4.width * 900.0 / 1600.0));
        assert!(p.height <= A4.height);
        // touches left/right edges, centered vertically
        assert!(approx(p.x, 0.0));
        assert!(approx(p.y, (A4.height - p.height) / 2.0));
        assert!(p.y > 0.0);
    }

    #[test]
    fn test_tall_image_fits_by_height() {
        let p = fit_to_page(500, 2000, A4);
        assert!(approx(p.height, A4.height));
        assert!(approx(p.width, A4.height * 500.0 / 2000.0));
        assert!(p.width <= A4.width);
        // touches top/bottom edges, centered horizontally
        assert!(approx(p.y, 0.0));
        assert!(approx(p.x, (A4.width - p.width) / 2.0));
        assert!(p.x > 0.0);
    }

    #[test]
    fn test_square_image_fits_by_width_on_portrait_page() {
        let p = fit_to_page(1024, 1024, A4);
        assert!(approx(p.width, A4.width));
        assert!(approx(p.height, A4.width));
        assert!(approx(p.x, 0.0));
        assert!(approx(p.y + p.height + p.y, A4.height));
    }

    #[test]
    fn test_same_aspect_as_page_fills_it() {
        let p = fit_to_page(595, 842, A4);
        assert!(approx(p.width, A4.width));
        assert!(approx(p.height, A4.height));
        assert!(approx(p.x, 0.0));
        assert!(approx(p.y, 0.0));
    }

    #[test]
    fn test_aspect_ratio_is_preserved() {
        let p = fit_to_page(1234, 567, A4);
        assert!(approx(p.width / p.height, 1234.0 / 567.0));
    }

    #[test]
    fn test_placement_never_exceeds_page() {
        for (w, h) in [(1, 1000), (1000, 1), (3, 4), (4, 3), (842, 595)] {
            let p = fit_to_page(w, h, A4);
            assert!(p.width <= A4.width + EPS, "{w}x{h} too wide");
            assert!(p.height <= A4.height + EPS, "{w}x{h} too tall");
            assert!(p.x >= -EPS && p.y >= -EPS);
        }
    }
}
