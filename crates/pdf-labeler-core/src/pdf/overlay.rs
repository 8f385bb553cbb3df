//! Label overlay creation and page merging.
//!
//! # Coordinate System
//!
//! PDF uses a **bottom-left origin** coordinate system where:
//! - (0, 0) is at the bottom-left corner of the page
//! - X increases to the right
//! - Y increases upward
//!
//! The overlay is rendered on a page whose MediaBox starts at (0, 0). Source
//! pages may start elsewhere (`[50 50 662 842]`), so the overlay content is
//! translated by the source MediaBox origin when it is merged.
//!
//! # Merge Strategy
//!
//! The overlay is composited as an additional content layer:
//! 1. The page's existing content streams are bracketed by `q` / `Q` so any
//!    graphics state they leave behind (CTM, colors, clipping) is discarded
//!    before the label is drawn
//! 2. The overlay's resources are merged into a page-local copy of the page's
//!    resources, renaming entries that would clash with existing names
//! 3. The overlay content is appended as a new stream
//!
//! Original streams and resource objects are never rewritten.

use std::collections::HashMap;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use super::document::{PageGeometry, inherited_attribute, resolve};
use super::font::{LABEL_FONT_RESOURCE, StandardFont};
use crate::config::TextColor;
use crate::error::{Error, Result};

/// Resource categories whose names appear as content stream operands, with
/// the operator that references them.
const NAMED_RESOURCE_OPERATORS: [(&[u8], &str); 3] = [
    (b"Font", "Tf"),
    (b"XObject", "Do"),
    (b"ExtGState", "gs"),
];

// =============================================================================
// Overlay
// =============================================================================

/// What to draw and where, for a single page.
#[derive(Debug, Clone)]
pub struct LabelText<'a> {
    pub text: &'a str,
    pub font_size: u32,
    pub color: TextColor,
    /// Baseline origin, relative to the page's lower-left corner
    pub origin: (f32, f32),
}

/// A single-page, label-only PDF document sized like its source page.
pub struct LabelOverlay {
    document: Document,
}

impl LabelOverlay {
    /// Render the label onto a blank page of `width` x `height` points.
    pub fn render(width: f32, height: f32, label: &LabelText<'_>) -> Result<Self> {
        let font = StandardFont::HELVETICA;
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(font.dictionary());

        let content = Content {
            operations: label_operations(font, label),
        };
        let content_bytes = content
            .encode()
            .map_err(|e| Error::PdfOverlay(format!("Failed to encode label content: {e}")))?;
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content_bytes));

        let resources = Dictionary::from_iter([(
            "Font",
            Object::Dictionary(Dictionary::from_iter([(
                LABEL_FONT_RESOURCE,
                Object::Reference(font_id),
            )])),
        )]);

        let page_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(width),
                    Object::Real(height),
                ]),
            ),
            ("Resources", Object::Dictionary(resources)),
            ("Contents", Object::Reference(content_id)),
        ]));

        doc.objects.insert(
            pages_id,
            Object::Dictionary(Dictionary::from_iter([
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Kids", Object::Array(vec![Object::Reference(page_id)])),
                ("Count", Object::Integer(1)),
            ])),
        );

        let catalog_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        Ok(Self { document: doc })
    }

    /// The overlay as a standalone document.
    pub const fn document(&self) -> &Document {
        &self.document
    }

    /// Composite this overlay on top of `page_id` in `target`.
    ///
    /// Consumes the overlay: its objects are renumbered and moved into the
    /// target document.
    pub fn merge_onto(
        mut self,
        target: &mut Document,
        page_id: ObjectId,
        geometry: &PageGeometry,
    ) -> Result<()> {
        self.document.renumber_objects_with(target.max_id + 1);

        let overlay_page_id = self
            .document
            .get_pages()
            .into_values()
            .next()
            .ok_or_else(|| Error::PdfOverlay("overlay has no page".to_string()))?;

        let overlay_content = self
            .document
            .get_page_content(overlay_page_id)
            .map_err(|e| Error::PdfOverlay(format!("Failed to read overlay content: {e}")))?;
        let mut overlay_content = Content::decode(&overlay_content)
            .map_err(|e| Error::PdfOverlay(format!("Failed to decode overlay content: {e}")))?;

        let overlay_page = self
            .document
            .get_dictionary(overlay_page_id)
            .map_err(|e| Error::PdfOverlay(format!("Failed to get overlay page: {e}")))?;
        let overlay_resources = match overlay_page.get(b"Resources") {
            Ok(resources) => resolve(&self.document, resources)?
                .as_dict()
                .map_err(|e| Error::PdfOverlay(format!("overlay resources: {e}")))?
                .clone(),
            Err(_) => Dictionary::new(),
        };
        let overlay_content_ids = content_stream_ids(&self.document, overlay_page);

        // Resource merge works on a copy so shared dictionaries stay untouched
        let mut resources = page_resources(target, page_id)?;
        let renames = merge_resources(target, &mut resources, &overlay_resources)?;
        rename_operands(&mut overlay_content.operations, &renames);

        let (origin_x, origin_y) = geometry.origin();
        let layer = wrap_layer(overlay_content.operations, origin_x, origin_y);
        let layer_bytes = Content { operations: layer }
            .encode()
            .map_err(|e| Error::PdfOverlay(format!("Failed to encode merged content: {e}")))?;

        // Move fonts and other shared objects across; page tree objects and
        // the original overlay content stream are left behind
        for (object_id, object) in std::mem::take(&mut self.document.objects) {
            if overlay_content_ids.contains(&object_id) {
                continue;
            }
            match object.type_name().unwrap_or(b"") {
                b"Catalog" | b"Pages" | b"Page" => {}
                _ => {
                    target.objects.insert(object_id, object);
                }
            }
        }
        target.max_id = target.max_id.max(self.document.max_id);

        let layer_id = target.add_object(Stream::new(Dictionary::new(), layer_bytes));
        let mut contents = existing_contents(target, page_id)?;
        if !contents.is_empty() {
            let save_id = target.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
            let restore_id = target.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));
            contents.insert(0, Object::Reference(save_id));
            contents.push(Object::Reference(restore_id));
        }
        contents.push(Object::Reference(layer_id));

        let page = target
            .get_dictionary_mut(page_id)
            .map_err(|e| Error::PdfOverlay(format!("Failed to get page: {e}")))?;
        page.set("Contents", Object::Array(contents));
        page.set("Resources", Object::Dictionary(resources));

        Ok(())
    }
}

/// Content operations drawing the label text.
fn label_operations(font: StandardFont, label: &LabelText<'_>) -> Vec<Operation> {
    let TextColor { r, g, b } = label.color;
    let (x, y) = label.origin;

    vec![
        Operation::new("rg", vec![Object::Real(r), Object::Real(g), Object::Real(b)]),
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![
                Object::Name(LABEL_FONT_RESOURCE.as_bytes().to_vec()),
                Object::Integer(i64::from(label.font_size)),
            ],
        ),
        Operation::new("Td", vec![Object::Real(x), Object::Real(y)]),
        Operation::new(
            "Tj",
            vec![Object::String(font.encode(label.text), StringFormat::Literal)],
        ),
        Operation::new("ET", vec![]),
    ]
}

/// Bracket overlay operations in `q`/`Q`, translating to the page origin.
fn wrap_layer(operations: Vec<Operation>, origin_x: f32, origin_y: f32) -> Vec<Operation> {
    let mut layer = Vec::with_capacity(operations.len() + 3);
    layer.push(Operation::new("q", vec![]));
    if origin_x != 0.0 || origin_y != 0.0 {
        layer.push(Operation::new(
            "cm",
            vec![
                Object::Integer(1),
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(1),
                Object::Real(origin_x),
                Object::Real(origin_y),
            ],
        ));
    }
    layer.extend(operations);
    layer.push(Operation::new("Q", vec![]));
    layer
}

// =============================================================================
// Resource Merging
// =============================================================================

/// Renamed resources, keyed by category then old name.
type Renames = HashMap<Vec<u8>, HashMap<Vec<u8>, Vec<u8>>>;

/// Effective resources of a page as an owned, direct dictionary.
fn page_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let Some(resources) = inherited_attribute(doc, page_id, b"Resources") else {
        return Ok(Dictionary::new());
    };
    match resolve(doc, &resources)? {
        Object::Dictionary(dict) => Ok(dict.clone()),
        Object::Null => Ok(Dictionary::new()),
        other => Err(Error::MalformedDocument(format!(
            "page resources are not a dictionary: {}",
            String::from_utf8_lossy(other.type_name().unwrap_or(b"?"))
        ))),
    }
}

/// Copy every overlay resource into `resources`, renaming on collision.
fn merge_resources(
    doc: &Document,
    resources: &mut Dictionary,
    overlay: &Dictionary,
) -> Result<Renames> {
    let mut renames = Renames::new();

    for (category, entries) in overlay.iter() {
        let Ok(entries) = entries.as_dict() else {
            // ProcSet arrays and the like carry no names to merge
            if !resources.has(category) {
                resources.set(category.clone(), entries.clone());
            }
            continue;
        };

        let mut merged = match resources.get(category) {
            Ok(existing) => match resolve(doc, existing)? {
                Object::Dictionary(dict) => dict.clone(),
                _ => Dictionary::new(),
            },
            Err(_) => Dictionary::new(),
        };

        for (name, value) in entries.iter() {
            let unique = unique_name(&merged, name);
            if unique != *name {
                renames
                    .entry(category.clone())
                    .or_default()
                    .insert(name.clone(), unique.clone());
            }
            merged.set(unique, value.clone());
        }

        resources.set(category.clone(), Object::Dictionary(merged));
    }

    Ok(renames)
}

/// `name`, or `name_1`, `name_2`, ... whichever is free in `dict`.
fn unique_name(dict: &Dictionary, name: &[u8]) -> Vec<u8> {
    if !dict.has(name) {
        return name.to_vec();
    }
    (1_u32..)
        .map(|n| {
            let mut candidate = name.to_vec();
            candidate.extend_from_slice(format!("_{n}").as_bytes());
            candidate
        })
        .find(|candidate| !dict.has(candidate))
        .unwrap_or_else(|| name.to_vec())
}

/// Point operands at renamed resources.
fn rename_operands(operations: &mut [Operation], renames: &Renames) {
    if renames.is_empty() {
        return;
    }
    for (category, operator) in NAMED_RESOURCE_OPERATORS {
        let Some(map) = renames.get(category) else {
            continue;
        };
        for op in operations.iter_mut().filter(|op| op.operator == operator) {
            if let Some(Object::Name(name)) = op.operands.first_mut()
                && let Some(new_name) = map.get(name.as_slice())
            {
                name.clone_from(new_name);
            }
        }
    }
}

// =============================================================================
// Content Streams
// =============================================================================

/// Object ids of the streams making up a page's `Contents`.
fn content_stream_ids(doc: &Document, page: &Dictionary) -> Vec<ObjectId> {
    let mut ids = Vec::new();
    if let Ok(contents) = page.get(b"Contents") {
        match contents {
            Object::Reference(id) => match doc.get_object(*id) {
                Ok(Object::Array(arr)) => ids.extend(arr.iter().filter_map(|o| o.as_reference().ok())),
                _ => ids.push(*id),
            },
            Object::Array(arr) => ids.extend(arr.iter().filter_map(|o| o.as_reference().ok())),
            _ => {}
        }
    }
    ids
}

/// The page's current `Contents` entries as a flat list of stream references.
fn existing_contents(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>> {
    let page = doc
        .get_dictionary(page_id)
        .map_err(|e| Error::MalformedDocument(format!("page {page_id:?} is not a dictionary: {e}")))?;

    let contents = match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(arr)) => arr.clone(),
            Ok(Object::Stream(_)) => vec![Object::Reference(*id)],
            Ok(_) => Vec::new(),
            Err(e) => {
                return Err(Error::MalformedDocument(format!(
                    "page {page_id:?} has dangling contents: {e}"
                )));
            }
        },
        Ok(Object::Array(arr)) => arr.clone(),
        _ => Vec::new(),
    };

    Ok(contents)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn label() -> LabelText<'static> {
        LabelText {
            text: "Made in China",
            font_size: 8,
            color: TextColor::red(),
            origin: (531.6, 766.0),
        }
    }

    /// Minimal one-page document whose content sets a CTM and a fill color
    /// without restoring them, and uses `F1` for its own text.
    fn source_document(resources_inline: bool) -> (Document, ObjectId) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(StandardFont::HELVETICA.dictionary());
        let font_dict = Dictionary::from_iter([("F1", Object::Reference(font_id))]);
        let resources = Dictionary::from_iter([("Font", Object::Dictionary(font_dict))]);

        let content = b"0 0 1 rg 2 0 0 2 0 0 cm BT /F1 12 Tf 72 700 Td (Body) Tj ET".to_vec();
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content));

        let mut page = Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
        ]);
        let mut pages = Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(1)),
            (
                "MediaBox",
                Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
            ),
        ]);
        if resources_inline {
            page.set("Resources", Object::Dictionary(resources));
        } else {
            let resources_id = doc.add_object(resources);
            pages.set("Resources", Object::Reference(resources_id));
        }

        let page_id = doc.add_object(page);
        pages.set("Kids", Object::Array(vec![Object::Reference(page_id)]));
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        (doc, page_id)
    }

    fn letter() -> PageGeometry {
        PageGeometry::from_corners(0.0, 0.0, 612.0, 792.0)
    }

    fn operators(doc: &Document, page_id: ObjectId) -> Vec<String> {
        let bytes = doc.get_page_content(page_id).unwrap();
        Content::decode(&bytes)
            .unwrap()
            .operations
            .into_iter()
            .map(|op| op.operator)
            .collect()
    }

    #[test]
    fn test_render_produces_single_label_page() {
        let overlay = LabelOverlay::render(612.0, 792.0, &label()).unwrap();
        let doc = overlay.document();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 1);

        let page_id = *pages.get(&1).unwrap();
        let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
        let tj = content.operations.iter().find(|op| op.operator == "Tj").unwrap();
        assert_eq!(tj.operands[0].as_str().unwrap(), b"Made in China");

        let td = content.operations.iter().find(|op| op.operator == "Td").unwrap();
        assert!((td.operands[0].as_float().unwrap() - 531.6).abs() < 0.01);
        assert!((td.operands[1].as_float().unwrap() - 766.0).abs() < 0.01);

        let rg = content.operations.iter().find(|op| op.operator == "rg").unwrap();
        assert!((rg.operands[0].as_float().unwrap() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_merge_wraps_original_and_appends_label() {
        let (mut doc, page_id) = source_document(true);
        let overlay = LabelOverlay::render(612.0, 792.0, &label()).unwrap();
        overlay.merge_onto(&mut doc, page_id, &letter()).unwrap();

        let ops = operators(&doc, page_id);
        // q <original> Q q <label> Q
        assert_eq!(ops.first().map(String::as_str), Some("q"));
        let body_tj = ops.iter().position(|op| op == "Tj").unwrap();
        let label_tj = ops.iter().rposition(|op| op == "Tj").unwrap();
        assert!(body_tj < label_tj);
        let restore = ops[body_tj..].iter().position(|op| op == "Q").unwrap() + body_tj;
        assert!(restore < label_tj, "original state must be restored before the label");
        assert_eq!(ops.last().map(String::as_str), Some("Q"));
    }

    #[test]
    fn test_merge_keeps_original_stream_untouched() {
        let (mut doc, page_id) = source_document(true);
        let original_id = doc
            .get_dictionary(page_id)
            .unwrap()
            .get(b"Contents")
            .unwrap()
            .as_reference()
            .unwrap();
        let original = doc.get_object(original_id).unwrap().as_stream().unwrap().content.clone();

        let overlay = LabelOverlay::render(612.0, 792.0, &label()).unwrap();
        overlay.merge_onto(&mut doc, page_id, &letter()).unwrap();

        let after = doc.get_object(original_id).unwrap().as_stream().unwrap().content.clone();
        assert_eq!(original, after);

        let contents = doc.get_dictionary(page_id).unwrap().get(b"Contents").unwrap();
        let refs = contents.as_array().unwrap();
        assert_eq!(refs.len(), 4);
        assert_eq!(refs[1].as_reference().unwrap(), original_id);
    }

    #[test]
    fn test_merge_keeps_existing_fonts() {
        let (mut doc, page_id) = source_document(true);
        let overlay = LabelOverlay::render(612.0, 792.0, &label()).unwrap();
        overlay.merge_onto(&mut doc, page_id, &letter()).unwrap();

        let page = doc.get_dictionary(page_id).unwrap();
        let fonts = page
            .get(b"Resources")
            .unwrap()
            .as_dict()
            .unwrap()
            .get(b"Font")
            .unwrap()
            .as_dict()
            .unwrap();
        assert!(fonts.has(b"F1"));
        assert!(fonts.has(LABEL_FONT_RESOURCE.as_bytes()));

        let label_font = fonts.get(LABEL_FONT_RESOURCE.as_bytes()).unwrap().as_reference().unwrap();
        let font = doc.get_dictionary(label_font).unwrap();
        assert_eq!(font.get(b"BaseFont").unwrap().as_name().unwrap(), b"Helvetica");
    }

    #[test]
    fn test_merge_copies_inherited_resources_down() {
        let (mut doc, page_id) = source_document(false);
        let shared_id = doc
            .get_dictionary(doc.get_dictionary(page_id).unwrap().get(b"Parent").unwrap().as_reference().unwrap())
            .unwrap()
            .get(b"Resources")
            .unwrap()
            .as_reference()
            .unwrap();

        let overlay = LabelOverlay::render(612.0, 792.0, &label()).unwrap();
        overlay.merge_onto(&mut doc, page_id, &letter()).unwrap();

        let page = doc.get_dictionary(page_id).unwrap();
        let fonts = page.get(b"Resources").unwrap().as_dict().unwrap().get(b"Font").unwrap().as_dict().unwrap();
        assert!(fonts.has(b"F1"), "inherited font must stay reachable");
        assert!(fonts.has(LABEL_FONT_RESOURCE.as_bytes()));

        // the shared dictionary on the page tree is not modified
        let shared = doc.get_dictionary(shared_id).unwrap();
        let shared_fonts = shared.get(b"Font").unwrap().as_dict().unwrap();
        assert!(!shared_fonts.has(LABEL_FONT_RESOURCE.as_bytes()));
    }

    #[test]
    fn test_merge_renames_clashing_font() {
        let (mut doc, page_id) = source_document(true);
        // occupy the overlay's font name with the page's own font
        {
            let page = doc.get_dictionary_mut(page_id).unwrap();
            let resources = page.get_mut(b"Resources").unwrap().as_dict_mut().unwrap();
            let fonts = resources.get_mut(b"Font").unwrap().as_dict_mut().unwrap();
            let f1 = fonts.get(b"F1").unwrap().clone();
            fonts.set(LABEL_FONT_RESOURCE, f1);
        }

        let overlay = LabelOverlay::render(612.0, 792.0, &label()).unwrap();
        overlay.merge_onto(&mut doc, page_id, &letter()).unwrap();

        let renamed = format!("{LABEL_FONT_RESOURCE}_1");
        let page = doc.get_dictionary(page_id).unwrap();
        let fonts = page.get(b"Resources").unwrap().as_dict().unwrap().get(b"Font").unwrap().as_dict().unwrap();
        assert!(fonts.has(renamed.as_bytes()));

        let bytes = doc.get_page_content(page_id).unwrap();
        let content = Content::decode(&bytes).unwrap();
        let last_tf = content.operations.iter().rev().find(|op| op.operator == "Tf").unwrap();
        assert_eq!(last_tf.operands[0].as_name().unwrap(), renamed.as_bytes());
    }

    #[test]
    fn test_merge_translates_to_media_box_origin() {
        let (mut doc, page_id) = source_document(true);
        let geometry = PageGeometry::from_corners(50.0, 40.0, 662.0, 832.0);

        let overlay = LabelOverlay::render(geometry.width(), geometry.height(), &label()).unwrap();
        overlay.merge_onto(&mut doc, page_id, &geometry).unwrap();

        let bytes = doc.get_page_content(page_id).unwrap();
        let content = Content::decode(&bytes).unwrap();
        let cm = content.operations.iter().rev().find(|op| op.operator == "cm").unwrap();
        assert!((cm.operands[4].as_float().unwrap() - 50.0).abs() < f32::EPSILON);
        assert!((cm.operands[5].as_float().unwrap() - 40.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_merge_onto_page_without_contents() {
        let (mut doc, page_id) = source_document(true);
        doc.get_dictionary_mut(page_id).unwrap().remove(b"Contents");

        let overlay = LabelOverlay::render(612.0, 792.0, &label()).unwrap();
        overlay.merge_onto(&mut doc, page_id, &letter()).unwrap();

        let contents = doc.get_dictionary(page_id).unwrap().get(b"Contents").unwrap();
        assert_eq!(contents.as_array().unwrap().len(), 1);
        assert_eq!(operators(&doc, page_id).first().map(String::as_str), Some("q"));
    }

    #[test]
    fn test_merged_document_has_no_overlay_page_tree() {
        let (mut doc, page_id) = source_document(true);
        let overlay = LabelOverlay::render(612.0, 792.0, &label()).unwrap();
        overlay.merge_onto(&mut doc, page_id, &letter()).unwrap();

        let page_objects = doc
            .objects
            .values()
            .filter(|o| o.type_name().unwrap_or(b"") == b"Page")
            .count();
        assert_eq!(page_objects, 1);
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_unique_name() {
        let dict = Dictionary::from_iter([
            ("F", Object::Null),
            ("F_1", Object::Null),
        ]);
        assert_eq!(unique_name(&dict, b"G"), b"G");
        assert_eq!(unique_name(&dict, b"F"), b"F_2");
    }
}
