//! HTTP route handlers for the PDF labeler web application.
//!
//! `/` renders the upload form from the `templates` module; `/process`
//! returns a PDF, a ZIP archive or a plain-text report.

mod pages;
mod process;

pub use pages::{health, index};
pub use process::process_files;
