//! Label placement on a page.
//!
//! Coordinates are PDF user space: origin at the bottom-left corner, y grows
//! upward. The returned point is the text baseline origin.
//!
//! Label width is estimated from the character count alone
//! (`chars * font_size * 0.6`); no font metrics are consulted, so the same
//! inputs always land the label in the same place regardless of the font the
//! viewer substitutes.

use std::fmt;

/// Average glyph width as a fraction of the font size.
const CHAR_WIDTH_FACTOR: f32 = 0.6;

/// Distance kept from the page edge, on top of the font size.
const BASE_MARGIN: f32 = 10.0;

/// Named position of the label on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Anchor {
    TopLeft,
    TopCenter,
    #[default]
    TopRight,
    MiddleLeft,
    Center,
    MiddleRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl Anchor {
    pub const ALL: [Self; 9] = [
        Self::TopLeft,
        Self::TopCenter,
        Self::TopRight,
        Self::MiddleLeft,
        Self::Center,
        Self::MiddleRight,
        Self::BottomLeft,
        Self::BottomCenter,
        Self::BottomRight,
    ];

    /// Look up an anchor by its form name. Unknown names fall back to
    /// [`Anchor::TopRight`].
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|anchor| anchor.as_str() == name)
            .unwrap_or_default()
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TopLeft => "top-left",
            Self::TopCenter => "top-center",
            Self::TopRight => "top-right",
            Self::MiddleLeft => "middle-left",
            Self::Center => "center",
            Self::MiddleRight => "middle-right",
            Self::BottomLeft => "bottom-left",
            Self::BottomCenter => "bottom-center",
            Self::BottomRight => "bottom-right",
        }
    }

    /// Unclamped baseline origin for this anchor.
    fn base(self, width: f32, height: f32, text_width: f32, margin: f32) -> (f32, f32) {
        let left = margin;
        let center = (width - text_width) / 2.0;
        let right = width - text_width - margin;

        let top = height - margin;
        let middle = height / 2.0;
        let bottom = margin;

        match self {
            Self::TopLeft => (left, top),
            Self::TopCenter => (center, top),
            Self::TopRight => (right, top),
            Self::MiddleLeft => (left, middle),
            Self::Center => (center, middle),
            Self::MiddleRight => (right, middle),
            Self::BottomLeft => (left, bottom),
            Self::BottomCenter => (center, bottom),
            Self::BottomRight => (right, bottom),
        }
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Estimated rendered width of `text` at `font_size`.
#[allow(clippy::cast_precision_loss)]
pub fn estimate_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * font_size * CHAR_WIDTH_FACTOR
}

/// Minimum distance between the label and the page edge.
pub fn margin_for(font_size: f32) -> f32 {
    BASE_MARGIN + font_size
}

/// Compute the baseline origin of the label on a `width` x `height` page.
///
/// Offsets are applied to the anchor position before clamping, so they can
/// never push the label past the margin. When the label is too large for the
/// page the clamp range is empty; the lower bound wins and the label is pinned
/// at `margin` on that axis.
#[allow(clippy::cast_precision_loss)]
pub fn resolve(
    width: f32,
    height: f32,
    anchor: Anchor,
    x_offset: i32,
    y_offset: i32,
    font_size: u32,
    text: &str,
) -> (f32, f32) {
    let font_size = font_size as f32;
    let text_width = estimate_text_width(text, font_size);
    let margin = margin_for(font_size);

    let (x, y) = anchor.base(width, height, text_width, margin);
    let x = x + x_offset as f32;
    let y = y + y_offset as f32;

    // min-then-max rather than f32::clamp: the bounds may be inverted
    let x = x.min(width - text_width - margin).max(margin);
    let y = y.min(height - margin - font_size).max(margin);

    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LABEL: &str = "Made in China";

    fn close(a: (f32, f32), b: (f32, f32)) -> bool {
        (a.0 - b.0).abs() < 0.01 && (a.1 - b.1).abs() < 0.01
    }

    #[test]
    fn test_letter_top_right() {
        // text width 13 * 8 * 0.6 = 62.4, margin 18
        let (x, y) = resolve(612.0, 792.0, Anchor::TopRight, 0, 0, 8, LABEL);
        assert!((x - 531.6).abs() < 0.01, "x = {x}");
        // top (774) is pulled down to leave room for the glyph height
        assert!((y - 766.0).abs() < 0.01, "y = {y}");
    }

    #[test]
    fn test_every_anchor_base_position() {
        let expected = [
            (Anchor::TopLeft, (18.0, 766.0)),
            (Anchor::TopCenter, (274.8, 766.0)),
            (Anchor::TopRight, (531.6, 766.0)),
            (Anchor::MiddleLeft, (18.0, 396.0)),
            (Anchor::Center, (274.8, 396.0)),
            (Anchor::MiddleRight, (531.6, 396.0)),
            (Anchor::BottomLeft, (18.0, 18.0)),
            (Anchor::BottomCenter, (274.8, 18.0)),
            (Anchor::BottomRight, (531.6, 18.0)),
        ];

        for (anchor, point) in expected {
            let got = resolve(612.0, 792.0, anchor, 0, 0, 8, LABEL);
            assert!(close(got, point), "{anchor}: got {got:?}, want {point:?}");
        }
    }

    #[test]
    fn test_offsets_move_label() {
        let got = resolve(612.0, 792.0, Anchor::Center, -20, 35, 8, LABEL);
        assert!(close(got, (254.8, 431.0)), "got {got:?}");
    }

    #[test]
    fn test_offsets_cannot_escape_margin() {
        let got = resolve(612.0, 792.0, Anchor::BottomLeft, -50, -50, 8, LABEL);
        assert!(close(got, (18.0, 18.0)), "got {got:?}");

        let got = resolve(612.0, 792.0, Anchor::TopRight, 50, 50, 8, LABEL);
        assert!(close(got, (531.6, 766.0)), "got {got:?}");
    }

    #[test]
    fn test_unknown_anchor_is_top_right() {
        assert_eq!(Anchor::from_name("middle-center"), Anchor::TopRight);
        assert_eq!(Anchor::from_name(""), Anchor::TopRight);
        assert_eq!(Anchor::from_name("TOP-LEFT"), Anchor::TopRight);

        let unknown = resolve(300.0, 400.0, Anchor::from_name("nowhere"), 3, -4, 12, LABEL);
        let top_right = resolve(300.0, 400.0, Anchor::TopRight, 3, -4, 12, LABEL);
        assert_eq!(unknown, top_right);
    }

    #[test]
    fn test_from_name_round_trips_known_names() {
        for anchor in Anchor::ALL {
            assert_eq!(Anchor::from_name(anchor.as_str()), anchor);
        }
    }

    #[test]
    fn test_label_wider_than_page_pins_to_margin() {
        let long = "x".repeat(200);
        for anchor in Anchor::ALL {
            let (x, _) = resolve(100.0, 100.0, anchor, 50, 0, 20, &long);
            assert!((x - 30.0).abs() < f32::EPSILON, "{anchor}: x = {x}");
        }
    }

    #[test]
    fn test_page_shorter_than_label_pins_to_margin() {
        let (_, y) = resolve(500.0, 20.0, Anchor::TopLeft, 0, 0, 10, "hi");
        assert!((y - 20.0).abs() < f32::EPSILON, "y = {y}");
    }

    #[test]
    fn test_result_stays_inside_margins() {
        let sizes = [(612.0, 792.0), (595.0, 842.0), (200.0, 150.0), (1224.0, 792.0)];
        for (width, height) in sizes {
            for font_size in [6_u32, 8, 13, 20] {
                for anchor in Anchor::ALL {
                    for (dx, dy) in [(-50, -50), (0, 0), (50, 50), (-50, 50)] {
                        let fs = font_size as f32;
                        let margin = margin_for(fs);
                        let (x, y) = resolve(width, height, anchor, dx, dy, font_size, LABEL);
                        assert!(x >= margin && x <= width - margin, "{anchor} x = {x}");
                        assert!(y >= margin && y <= height - margin, "{anchor} y = {y}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let a = resolve(421.0, 595.0, Anchor::BottomCenter, 7, -3, 11, LABEL);
        let b = resolve(421.0, 595.0, Anchor::BottomCenter, 7, -3, 11, LABEL);
        assert_eq!(a, b);
    }

    #[test]
    fn test_width_counts_characters_not_bytes() {
        let ascii = estimate_text_width("abcd", 10.0);
        let cjk = estimate_text_width("中国制造", 10.0);
        assert!((ascii - cjk).abs() < f32::EPSILON);
        assert!((ascii - 24.0).abs() < f32::EPSILON);
    }
}
