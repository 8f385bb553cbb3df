//! Stamp a label onto every page of a PDF.

use tracing::debug;

use super::document::PdfDocument;
use super::overlay::{LabelOverlay, LabelText};
use super::position::{self, Anchor};
use crate::config::{LabelDefaults, TextColor};
use crate::error::Result;

/// How the label looks and where it goes. Shared by every page of every
/// document in a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSpec {
    pub text: String,
    pub anchor: Anchor,
    pub x_offset: i32,
    pub y_offset: i32,
    pub font_size: u32,
    /// `#RRGGBB`, decoded when the label is applied
    pub color: String,
}

impl LabelSpec {
    pub fn from_defaults(defaults: &LabelDefaults) -> Self {
        Self {
            text: defaults.text.clone(),
            anchor: Anchor::from_name(&defaults.position),
            x_offset: defaults.x_offset,
            y_offset: defaults.y_offset,
            font_size: defaults.font_size,
            color: defaults.color.clone(),
        }
    }
}

impl Default for LabelSpec {
    fn default() -> Self {
        Self::from_defaults(&LabelDefaults::default())
    }
}

/// Applies one [`LabelSpec`] to documents.
pub struct PageLabeler<'a> {
    spec: &'a LabelSpec,
    color: TextColor,
}

impl<'a> PageLabeler<'a> {
    /// Prepare a labeler, decoding the spec's color.
    pub fn new(spec: &'a LabelSpec) -> Result<Self> {
        let color = TextColor::from_hex(&spec.color)?;
        Ok(Self { spec, color })
    }

    /// Label every page of `doc` in place.
    pub fn label_document(&self, doc: &mut PdfDocument) -> Result<()> {
        for (index, page_id) in doc.page_ids().into_iter().enumerate() {
            let geometry = doc.page_geometry(page_id)?;
            let (width, height) = (geometry.width(), geometry.height());

            let origin = position::resolve(
                width,
                height,
                self.spec.anchor,
                self.spec.x_offset,
                self.spec.y_offset,
                self.spec.font_size,
                &self.spec.text,
            );
            debug!(
                "Page {}: {}x{} label at ({:.1}, {:.1})",
                index + 1,
                width,
                height,
                origin.0,
                origin.1
            );

            let label = LabelText {
                text: &self.spec.text,
                font_size: self.spec.font_size,
                color: self.color,
                origin,
            };
            let overlay = LabelOverlay::render(width, height, &label)?;
            overlay.merge_onto(doc.inner_mut(), page_id, &geometry)?;
        }
        Ok(())
    }

    /// Parse `input`, label it and return the new PDF bytes.
    pub fn apply(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut doc = PdfDocument::from_bytes(input)?;
        self.label_document(&mut doc)?;
        doc.save_to_bytes()
    }
}

/// Label every page of the PDF in `input`.
///
/// Fails with `Encoding` for a bad color and `MalformedDocument` when the
/// input is not a usable PDF.
pub fn apply_label(input: &[u8], spec: &LabelSpec) -> Result<Vec<u8>> {
    PageLabeler::new(spec)?.apply(input)
}
