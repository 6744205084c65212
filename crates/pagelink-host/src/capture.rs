//! Screen capture.

use std::io::Cursor;

use base64::Engine;
use image::{ImageFormat, Rgba, RgbaImage};
use pagelink_dom::{Document, Rect};
use pagelink_protocols::ScreenshotData;

use crate::error::HostError;
use crate::highlight::{DEFAULT_COLOR, HighlightLayer, parse_color};

/// Renders a page-coordinate region of the document to PNG bytes.
pub trait ScreenCapture: Send {
    fn capture(
        &mut self,
        doc: &Document,
        highlights: &HighlightLayer,
        region: Rect,
    ) -> Result<Vec<u8>, HostError>;
}

/// Draws element layout boxes as outlines and highlights as filled boxes
/// on a white canvas.
#[derive(Debug, Default)]
pub struct WireframeCapture;

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const OUTLINE: Rgba<u8> = Rgba([160, 160, 160, 255]);

impl WireframeCapture {
    pub fn new() -> Self {
        Self
    }
}

/// Pixel size of a region; at least one pixel each way.
pub fn pixel_size(region: Rect) -> (u32, u32) {
    let px = |v: f64| v.round().max(1.0) as u32;
    (px(region.width), px(region.height))
}

/// Region box translated into canvas pixels, clipped to the canvas.
fn to_canvas(region: Rect, r: Rect, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    let clipped = r.intersect(&region);
    if clipped.width <= 0.0 || clipped.height <= 0.0 {
        return None;
    }
    let x0 = (clipped.x - region.x).floor().max(0.0) as u32;
    let y0 = (clipped.y - region.y).floor().max(0.0) as u32;
    let x1 = ((clipped.right() - region.x).ceil() as u32).min(width);
    let y1 = ((clipped.bottom() - region.y).ceil() as u32).min(height);
    (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
}

impl ScreenCapture for WireframeCapture {
    fn capture(
        &mut self,
        doc: &Document,
        highlights: &HighlightLayer,
        region: Rect,
    ) -> Result<Vec<u8>, HostError> {
        let (width, height) = pixel_size(region);
        let mut canvas = RgbaImage::from_pixel(width, height, BACKGROUND);

        for node in doc.descendant_elements(doc.root()) {
            let Some(layout) = doc.layout(node) else {
                continue;
            };
            if let Some((x0, y0, x1, y1)) = to_canvas(region, layout, width, height) {
                for x in x0..x1 {
                    canvas.put_pixel(x, y0, OUTLINE);
                    canvas.put_pixel(x, y1 - 1, OUTLINE);
                }
                for y in y0..y1 {
                    canvas.put_pixel(x0, y, OUTLINE);
                    canvas.put_pixel(x1 - 1, y, OUTLINE);
                }
            }
        }

        let fallback = parse_color(DEFAULT_COLOR).unwrap_or([255, 204, 0, 255]);
        for highlight in highlights.entries() {
            let Some(layout) = doc.layout(highlight.node) else {
                continue;
            };
            let color = Rgba(parse_color(&highlight.color).unwrap_or(fallback));
            if let Some((x0, y0, x1, y1)) = to_canvas(region, layout, width, height) {
                for y in y0..y1 {
                    for x in x0..x1 {
                        canvas.put_pixel(x, y, color);
                    }
                }
            }
        }

        let mut png = Vec::new();
        canvas
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| HostError::Capture(e.to_string()))?;
        Ok(png)
    }
}

/// Capture `region` and package it for the wire.
pub fn screenshot(
    capture: &mut dyn ScreenCapture,
    doc: &Document,
    highlights: &HighlightLayer,
    region: Rect,
) -> Result<ScreenshotData, HostError> {
    let png = capture.capture(doc, highlights, region)?;
    let (width, height) = pixel_size(region);
    Ok(ScreenshotData {
        data: base64::engine::general_purpose::STANDARD.encode(png),
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagelink_protocols::Selector;

    fn decode(data: &ScreenshotData) -> RgbaImage {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&data.data)
            .unwrap();
        image::load_from_memory_with_format(&bytes, ImageFormat::Png)
            .unwrap()
            .to_rgba8()
    }

    fn boxed_page() -> Document {
        let mut doc =
            Document::parse_html("<div id='a'>A</div><div id='b'>B</div>", "https://a.test/")
                .unwrap();
        doc.set_viewport_size(40.0, 30.0);
        let a = doc.get_element_by_id("a").unwrap();
        let b = doc.get_element_by_id("b").unwrap();
        doc.set_layout_box(a, Rect::new(0.0, 0.0, 10.0, 10.0)).unwrap();
        doc.set_layout_box(b, Rect::new(20.0, 10.0, 10.0, 10.0)).unwrap();
        doc
    }

    #[test]
    fn test_capture_dimensions_and_outline() {
        let doc = boxed_page();
        let layer = HighlightLayer::new();
        let shot = screenshot(
            &mut WireframeCapture::new(),
            &doc,
            &layer,
            Rect::new(0.0, 0.0, 40.0, 30.0),
        )
        .unwrap();
        assert_eq!((shot.width, shot.height), (40, 30));

        let image = decode(&shot);
        assert_eq!(image.dimensions(), (40, 30));
        assert_eq!(*image.get_pixel(0, 0), OUTLINE);
        assert_eq!(*image.get_pixel(5, 5), BACKGROUND);
        assert_eq!(*image.get_pixel(35, 25), BACKGROUND);
    }

    #[test]
    fn test_highlight_is_filled_in_region_coordinates() {
        let doc = boxed_page();
        let mut layer = HighlightLayer::new();
        layer
            .highlight(&doc, &Selector::rule("#b"), Some("#ff0000"))
            .unwrap();

        // Region anchored at the element itself.
        let shot = screenshot(
            &mut WireframeCapture::new(),
            &doc,
            &layer,
            Rect::new(20.0, 10.0, 10.0, 10.0),
        )
        .unwrap();
        let image = decode(&shot);
        assert_eq!(image.dimensions(), (10, 10));
        assert_eq!(*image.get_pixel(5, 5), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_zero_region_still_one_pixel() {
        assert_eq!(pixel_size(Rect::default()), (1, 1));
    }
}
