//! Askama templates.
//!
//! - `base.html` - Common layout and styles
//! - `index.html` - Upload form posting to `/process`

use askama::Template;
use askama_web::WebTemplate;
use pdf_labeler_core::{Anchor, FONT_SIZE_RANGE, LabelDefaults, OFFSET_RANGE};

/// One entry of the position dropdown.
pub struct PositionOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

const fn position_label(anchor: Anchor) -> &'static str {
    match anchor {
        Anchor::TopLeft => "左上角",
        Anchor::TopCenter => "顶部居中",
        Anchor::TopRight => "右上角",
        Anchor::MiddleLeft => "左侧居中",
        Anchor::Center => "正中",
        Anchor::MiddleRight => "右侧居中",
        Anchor::BottomLeft => "左下角",
        Anchor::BottomCenter => "底部居中",
        Anchor::BottomRight => "右下角",
    }
}

/// Landing page with upload form.
#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub label_text: String,
    pub positions: Vec<PositionOption>,
    pub font_size: u32,
    pub font_size_min: u32,
    pub font_size_max: u32,
    pub color: String,
    pub x_offset: i32,
    pub y_offset: i32,
    pub offset_min: i32,
    pub offset_max: i32,
    pub max_upload_mb: usize,
}

impl IndexTemplate {
    pub fn new(defaults: &LabelDefaults, max_upload_bytes: usize) -> Self {
        let selected = Anchor::from_name(&defaults.position);
        Self {
            label_text: defaults.text.clone(),
            positions: Anchor::ALL
                .iter()
                .map(|&anchor| PositionOption {
                    value: anchor.as_str(),
                    label: position_label(anchor),
                    selected: anchor == selected,
                })
                .collect(),
            font_size: defaults.font_size,
            font_size_min: *FONT_SIZE_RANGE.start(),
            font_size_max: *FONT_SIZE_RANGE.end(),
            color: defaults.color.clone(),
            x_offset: defaults.x_offset,
            y_offset: defaults.y_offset,
            offset_min: *OFFSET_RANGE.start(),
            offset_max: *OFFSET_RANGE.end(),
            max_upload_mb: max_upload_bytes / (1024 * 1024),
        }
    }
}
