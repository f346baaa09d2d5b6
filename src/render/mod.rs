//! Renderer trait and built-in implementations.
//!
//! The diagram renderer is a seam, not a hardwired call: the orchestrator
//! holds an `Arc<dyn Renderer>` so tests can stub the whole rendering leg.
//! [`SchematicRenderer`] is the default — it parses the notation, exports
//! BPMN 2.0 XML and draws a deterministic schematic raster. [`MockRenderer`]
//! returns a fixed pair and counts calls.

pub mod bpmn;
pub mod raster;

use crate::error::Result;
use crate::piperflow;
use image::RgbaImage;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

/// What a render produces: the BPMN XML document and the in-memory bitmap.
///
/// The bitmap stays unencoded here; the orchestrator owns PNG and base64
/// encoding.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub bpmn_xml: String,
    pub image: RgbaImage,
}

/// Abstraction over diagram renderers.
///
/// Rendering is synchronous CPU-bound work; callers on the async runtime
/// should dispatch it via `spawn_blocking`.
///
/// # Object Safety
///
/// This trait is object-safe and designed to be used as `Arc<dyn Renderer>`.
pub trait Renderer: Send + Sync {
    /// Render PiperFlow notation into XML + bitmap.
    fn render(&self, notation: &str) -> Result<RenderOutput>;

    /// Human-readable name for logging and diagnostics.
    fn name(&self) -> &'static str;
}

/// The built-in renderer: PiperFlow → BPMN 2.0 XML + schematic raster.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchematicRenderer;

impl SchematicRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for SchematicRenderer {
    fn render(&self, notation: &str) -> Result<RenderOutput> {
        let map = piperflow::parse(notation)?;
        let bpmn_xml = bpmn::to_bpmn_xml(&map)?;
        let image = raster::draw(&map);
        Ok(RenderOutput { bpmn_xml, image })
    }

    fn name(&self) -> &'static str {
        "schematic"
    }
}

/// A test renderer that returns a fixed output, counts calls, and records
/// the notation it was handed.
#[derive(Debug)]
pub struct MockRenderer {
    bpmn_xml: String,
    image: RgbaImage,
    calls: AtomicUsize,
    notations: std::sync::Mutex<Vec<String>>,
}

impl MockRenderer {
    /// Create a mock returning the given XML and bitmap on every call.
    pub fn new(bpmn_xml: impl Into<String>, image: RgbaImage) -> Self {
        Self {
            bpmn_xml: bpmn_xml.into(),
            image,
            calls: AtomicUsize::new(0),
            notations: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// A 1×1 white image and `"<bpmn/>"`.
    pub fn fixed() -> Self {
        Self::new("<bpmn/>", RgbaImage::from_pixel(1, 1, image::Rgba([255, 255, 255, 255])))
    }

    /// Number of render calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    /// The notation strings received so far, in call order.
    pub fn notations(&self) -> Vec<String> {
        self.notations.lock().expect("mock lock poisoned").clone()
    }
}

impl Renderer for MockRenderer {
    fn render(&self, notation: &str) -> Result<RenderOutput> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.notations
            .lock()
            .expect("mock lock poisoned")
            .push(notation.to_string());
        Ok(RenderOutput {
            bpmn_xml: self.bpmn_xml.clone(),
            image: self.image.clone(),
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Encode a rendered bitmap as PNG bytes.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    image.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "title: T\nlane: L\n(start) as s\n(end) as e\ns->e";

    #[test]
    fn schematic_renders_minimal_notation() {
        let out = SchematicRenderer::new().render(MINIMAL).unwrap();
        assert!(out.bpmn_xml.contains("<bpmn:startEvent"));
        assert!(out.image.width() > 0 && out.image.height() > 0);
    }

    #[test]
    fn schematic_render_twice_is_byte_identical() {
        let renderer = SchematicRenderer::new();
        let a = renderer.render(MINIMAL).unwrap();
        let b = renderer.render(MINIMAL).unwrap();
        assert_eq!(a.bpmn_xml, b.bpmn_xml);
        assert_eq!(a.image.as_raw(), b.image.as_raw());
    }

    #[test]
    fn schematic_rejects_invalid_notation() {
        assert!(SchematicRenderer::new().render("definitely not piperflow").is_err());
    }

    #[test]
    fn mock_counts_calls_and_returns_fixed_pair() {
        let mock = MockRenderer::fixed();
        assert_eq!(mock.calls(), 0);
        let out = mock.render("ignored").unwrap();
        assert_eq!(out.bpmn_xml, "<bpmn/>");
        assert_eq!(out.image.dimensions(), (1, 1));
        assert_eq!(mock.calls(), 1);
    }

    #[test]
    fn encode_png_emits_png_magic() {
        let out = MockRenderer::fixed().render("x").unwrap();
        let png = encode_png(&out.image).unwrap();
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }
}
