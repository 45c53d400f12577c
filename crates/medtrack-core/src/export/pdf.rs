//! Single-page PDF rendering of an image record.

use printpdf::image_crate::{self, DynamicImage, GenericImageView};
use printpdf::{Image, ImageTransform, Mm, PdfDocument};
use std::io::BufWriter;

use super::{ExportError, ExportResult};

/// A4 portrait.
pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;

/// Resolution the image is embedded at before scaling.
const EMBED_DPI: f32 = 300.0;
const MM_PER_INCH: f32 = 25.4;

/// Position and size of the image on the page, in millimetres.
///
/// Origin is the bottom-left corner of the page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x_mm: f32,
    pub y_mm: f32,
    pub width_mm: f32,
    pub height_mm: f32,
}

/// Scale an image to fit the page, keeping its aspect ratio, and center it.
pub fn fit_to_page(width_px: u32, height_px: u32, page_width_mm: f32, page_height_mm: f32) -> Placement {
    let (w, h) = (width_px as f32, height_px as f32);
    let ratio = (page_width_mm / w).min(page_height_mm / h);
    let width_mm = w * ratio;
    let height_mm = h * ratio;

    Placement {
        x_mm: (page_width_mm - width_mm) / 2.0,
        y_mm: (page_height_mm - height_mm) / 2.0,
        width_mm,
        height_mm,
    }
}

/// Render encoded image bytes (PNG, JPEG) into a one-page PDF.
pub fn image_to_pdf(title: &str, bytes: &[u8]) -> ExportResult<Vec<u8>> {
    let decoded =
        image_crate::load_from_memory(bytes).map_err(|e| ExportError::ImageDecode(e.to_string()))?;
    let (width_px, height_px) = decoded.dimensions();
    if width_px == 0 || height_px == 0 {
        return Err(ExportError::ImageDecode("image has no pixels".into()));
    }

    let placement = fit_to_page(width_px, height_px, PAGE_WIDTH_MM, PAGE_HEIGHT_MM);
    let natural_width_mm = width_px as f32 * MM_PER_INCH / EMBED_DPI;
    let natural_height_mm = height_px as f32 * MM_PER_INCH / EMBED_DPI;

    let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
    let layer = doc.get_page(page).get_layer(layer);

    // PDF has no alpha in the base image; flatten to RGB
    let image = Image::from_dynamic_image(&DynamicImage::ImageRgb8(decoded.to_rgb8()));
    image.add_to_layer(
        layer,
        ImageTransform {
            translate_x: Some(Mm(placement.x_mm)),
            translate_y: Some(Mm(placement.y_mm)),
            scale_x: Some(placement.width_mm / natural_width_mm),
            scale_y: Some(placement.height_mm / natural_height_mm),
            dpi: Some(EMBED_DPI),
            ..Default::default()
        },
    );

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| ExportError::Render(format!("PDF save error: {e}")))?;
    buf.into_inner()
        .map_err(|e| ExportError::Render(format!("PDF buffer error: {e}")))
}

/// Encoded test images.
#[cfg(test)]
pub(crate) mod fixtures {
    use printpdf::image_crate::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    pub(crate) fn encoded_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 30, 30]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }
}
