use lopdf::{Document, Object, ObjectId};

use crate::error::{Error, Result};

/// Page tree nesting deeper than this is treated as a reference cycle.
const MAX_TREE_DEPTH: usize = 64;

/// A parsed PDF owned by a single labeling call.
pub struct PdfDocument {
    inner: Document,
}

/// Physical boundary of a page, normalised so that `[0] <= [2]` and
/// `[1] <= [3]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub media_box: [f32; 4],
}

impl PageGeometry {
    pub fn from_corners(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            media_box: [x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)],
        }
    }

    pub fn width(&self) -> f32 {
        self.media_box[2] - self.media_box[0]
    }

    pub fn height(&self) -> f32 {
        self.media_box[3] - self.media_box[1]
    }

    /// Lower-left corner of the page in user space.
    pub const fn origin(&self) -> (f32, f32) {
        (self.media_box[0], self.media_box[1])
    }
}

impl PdfDocument {
    /// Parse a PDF from bytes.
    ///
    /// Fails with [`Error::MalformedDocument`] when the bytes are not a PDF,
    /// the document is encrypted or it has no pages.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let inner = Document::load_mem(bytes)
            .map_err(|e| Error::MalformedDocument(format!("Failed to parse PDF: {e}")))?;

        if inner.trailer.get(b"Encrypt").is_ok() {
            return Err(Error::MalformedDocument(
                "encrypted documents are not supported".to_string(),
            ));
        }

        if inner.get_pages().is_empty() {
            return Err(Error::MalformedDocument("document has no pages".to_string()));
        }

        Ok(Self { inner })
    }

    /// Get number of pages
    pub fn page_count(&self) -> usize {
        self.inner.get_pages().len()
    }

    /// Page object ids in page order.
    pub fn page_ids(&self) -> Vec<ObjectId> {
        self.inner.get_pages().into_values().collect()
    }

    /// Read a page's MediaBox, following page tree inheritance.
    pub fn page_geometry(&self, page_id: ObjectId) -> Result<PageGeometry> {
        let media_box = inherited_attribute(&self.inner, page_id, b"MediaBox").ok_or_else(|| {
            Error::MalformedDocument(format!("page {page_id:?} has no MediaBox"))
        })?;

        let values = match resolve(&self.inner, &media_box)? {
            Object::Array(arr) => arr
                .iter()
                .map(|o| resolve(&self.inner, o).ok().and_then(number))
                .collect::<Option<Vec<f32>>>(),
            _ => None,
        };

        match values.as_deref() {
            Some(&[x0, y0, x1, y1]) if (x1 - x0).abs() > 0.0 && (y1 - y0).abs() > 0.0 => {
                Ok(PageGeometry::from_corners(x0, y0, x1, y1))
            }
            _ => Err(Error::MalformedDocument(format!(
                "page {page_id:?} has an invalid MediaBox"
            ))),
        }
    }

    /// Geometry of every page, in page order.
    pub fn pages(&self) -> Result<Vec<PageGeometry>> {
        self.page_ids()
            .into_iter()
            .map(|id| self.page_geometry(id))
            .collect()
    }

    pub(crate) fn inner_mut(&mut self) -> &mut Document {
        &mut self.inner
    }

    /// Serialize the document.
    pub fn save_to_bytes(mut self) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        self.inner
            .save_to(&mut output)
            .map_err(|e| Error::PdfSave(format!("Failed to save PDF: {e}")))?;
        Ok(output)
    }
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("page_count", &self.page_count())
            .field("version", &self.inner.version)
            .finish()
    }
}

// =============================================================================
// Object Helpers
// =============================================================================

/// Follow indirect references until a direct object is reached.
pub(crate) fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Result<&'a Object> {
    let mut current = object;
    for _ in 0..MAX_TREE_DEPTH {
        match current {
            Object::Reference(id) => {
                current = doc.get_object(*id).map_err(|e| {
                    Error::MalformedDocument(format!("dangling reference {id:?}: {e}"))
                })?;
            }
            direct => return Ok(direct),
        }
    }
    Err(Error::MalformedDocument("reference chain too long".to_string()))
}

/// Look up a page attribute, walking up `Parent` links for inheritable keys
/// (`Resources`, `MediaBox`, `CropBox`, `Rotate`).
pub(crate) fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(value.clone());
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

#[allow(clippy::cast_precision_loss)]
fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}
