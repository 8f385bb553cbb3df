//! PDF Labeler Core Library
//!
//! This library stamps a short text label onto every page of PDF documents:
//! - Label placement from a named anchor, offsets and font size
//! - Label overlay rendering and content-stream merging with lopdf
//! - Batch processing for download (single PDF or ZIP) or directory output
//! - Configuration defaults for the web and CLI front ends

pub mod archive;
pub mod batch;
pub mod config;
pub mod error;
pub mod pdf;
pub mod util;

pub use archive::{ARCHIVE_FILENAME, build_zip};
pub use batch::{
    Destination, OutputMode, RequestContext, StatusLine, UploadedFile, process_batch,
    render_report,
};
pub use config::{
    AppConfig, LabelDefaults, TextColor, DEFAULT_COLOR, DEFAULT_FONT_SIZE, DEFAULT_LABEL_TEXT,
    DEFAULT_POSITION, FONT_SIZE_RANGE, OFFSET_RANGE,
};
pub use error::{Error, Result};
pub use pdf::{Anchor, LabelSpec, PageGeometry, PageLabeler, PdfDocument, apply_label};
pub use util::{allowed_file, processed_name, secure_filename};
