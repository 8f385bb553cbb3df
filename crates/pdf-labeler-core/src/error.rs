use thiserror::Error;

/// Unified error type for pdf-labeler-core
///
/// This enum encompasses all error cases that can occur in the library:
/// - Request validation (no files, bad output directory)
/// - PDF operations (parsing, page geometry, merging, saving)
/// - Label styling (color parsing)
/// - Batch processing and archive packaging
/// - Configuration loading and general I/O
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // Request Errors
    // ==========================================================================
    /// The caller supplied unusable input (no files, missing directory, ...)
    #[error("{0}")]
    Validation(String),

    // ==========================================================================
    // PDF Errors
    // ==========================================================================
    /// Input could not be read as a paginated PDF document
    #[error("malformed PDF document: {0}")]
    MalformedDocument(String),

    /// A label style value could not be decoded
    #[error("invalid encoding: {0}")]
    Encoding(String),

    /// Failed to merge the label overlay into a page
    #[error("failed to merge label overlay: {0}")]
    PdfOverlay(String),

    /// Failed to save a PDF
    #[error("failed to save PDF: {0}")]
    PdfSave(String),

    // ==========================================================================
    // Batch Errors
    // ==========================================================================
    /// Processing of one uploaded file failed
    #[error("处理失败 {filename}: {source}")]
    FileFailed {
        filename: String,
        #[source]
        source: Box<Error>,
    },

    /// Failed to build the ZIP archive
    #[error("failed to build archive: {0}")]
    Archive(String),

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error was caused by the caller's input rather than by
    /// processing.
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
