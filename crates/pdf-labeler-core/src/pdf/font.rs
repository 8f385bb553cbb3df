//! Standard Type1 font used for label text.
//!
//! Labels are drawn with Helvetica, one of the 14 fonts every PDF viewer
//! ships, so nothing has to be embedded. Text is encoded with
//! WinAnsiEncoding; characters the encoding cannot express are replaced by
//! `?` rather than producing undecodable bytes.

use lopdf::{Dictionary, Object};

/// Resource name the overlay uses for its font before merging.
pub const LABEL_FONT_RESOURCE: &str = "FLabel";

/// Byte substituted for characters outside WinAnsiEncoding.
const REPLACEMENT: u8 = b'?';

/// One of the PDF standard 14 fonts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardFont {
    base_font: &'static str,
}

impl StandardFont {
    /// Sans-serif face used for labels.
    pub const HELVETICA: Self = Self {
        base_font: "Helvetica",
    };

    pub const fn base_font(self) -> &'static str {
        self.base_font
    }

    /// Font dictionary referencing this standard font.
    pub fn dictionary(self) -> Dictionary {
        Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(self.base_font.as_bytes().to_vec())),
            ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
        ])
    }

    /// Encode text as WinAnsi bytes for a `Tj` operand.
    #[allow(clippy::unused_self)]
    pub fn encode(self, text: &str) -> Vec<u8> {
        text.chars().map(win_ansi_byte).collect()
    }
}

/// Map a character to its WinAnsiEncoding code.
fn win_ansi_byte(c: char) -> u8 {
    let code = u32::from(c);
    match code {
        // Latin-1 overlaps WinAnsi outside the 0x80..0xA0 window
        0x20..=0x7E | 0xA0..=0xFF => u8::try_from(code).unwrap_or(REPLACEMENT),
        _ => match c {
            '€' => 0x80,
            '‚' => 0x82,
            'ƒ' => 0x83,
            '„' => 0x84,
            '…' => 0x85,
            '†' => 0x86,
            '‡' => 0x87,
            'ˆ' => 0x88,
            '‰' => 0x89,
            'Š' => 0x8A,
            '‹' => 0x8B,
            'Œ' => 0x8C,
            'Ž' => 0x8E,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '˜' => 0x98,
            '™' => 0x99,
            'š' => 0x9A,
            '›' => 0x9B,
            'œ' => 0x9C,
            'ž' => 0x9E,
            'Ÿ' => 0x9F,
            _ => REPLACEMENT,
        },
    }
}
