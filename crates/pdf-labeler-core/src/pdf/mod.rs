mod document;
mod font;
mod labeler;
pub mod overlay;
pub mod position;

pub use document::{PageGeometry, PdfDocument};
pub use font::StandardFont;
pub use labeler::{LabelSpec, PageLabeler, apply_label};
pub use overlay::{LabelOverlay, LabelText};
pub use position::{Anchor, resolve};
