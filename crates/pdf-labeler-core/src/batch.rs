//! Label a batch of uploaded files and decide how to hand them back.
//!
//! Two destinations are supported:
//! - [`Destination::Download`]: every PDF must succeed; the first failure
//!   aborts the batch and nothing is returned
//! - [`Destination::Directory`]: each PDF is written next to the others and
//!   failures are recorded per file while the rest carry on

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{Span, error, info, info_span, warn};

use crate::archive::build_zip;
use crate::error::{Error, Result};
use crate::pdf::{LabelSpec, apply_label};
use crate::util::{allowed_file, processed_name};

/// One uploaded file.
#[derive(Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }
}

impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("filename", &self.filename)
            .field("bytes_len", &self.bytes.len())
            .finish()
    }
}

/// Where processed documents go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Return the documents to the caller
    Download,
    /// Write the documents into an existing server-side directory
    Directory(PathBuf),
}

/// Outcome of one file in directory-write mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusLine {
    Saved(PathBuf),
    Skipped(String),
    Failed { filename: String, reason: String },
}

impl StatusLine {
    pub const fn is_saved(&self) -> bool {
        matches!(self, Self::Saved(_))
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Saved(path) => write!(f, "已保存: {}", path.display()),
            Self::Skipped(filename) => write!(f, "跳过非PDF文件: {filename}"),
            Self::Failed { filename, reason } => write!(f, "处理失败 {filename}: {reason}"),
        }
    }
}

/// Result of a batch, decided once from the file count and destination.
#[derive(Debug)]
pub enum OutputMode {
    /// Exactly one labeled PDF
    Single { filename: String, bytes: Vec<u8> },
    /// Several labeled PDFs, to be packed into [`crate::archive::ARCHIVE_FILENAME`]
    Archive { entries: Vec<(String, Vec<u8>)> },
    /// Per-file status of a directory write
    DirectoryReport(Vec<StatusLine>),
}

impl OutputMode {
    /// ZIP bytes for the `Archive` arm.
    pub fn archive_bytes(&self) -> Option<Result<Vec<u8>>> {
        match self {
            Self::Archive { entries } => Some(build_zip(entries)),
            _ => None,
        }
    }
}

/// Plain-text report for directory-write mode.
pub fn render_report(lines: &[StatusLine]) -> String {
    let mut report = String::from("批量处理完成!");
    for line in lines {
        report.push('\n');
        report.push_str(&line.to_string());
    }
    report
}

/// Request-scoped settings threaded through a batch instead of globals.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Span every log line of this request is recorded under
    pub span: Span,
    /// Upper bound on the combined size of all files, in bytes
    pub max_upload_bytes: usize,
}

impl RequestContext {
    pub fn new(request_id: &str, max_upload_bytes: usize) -> Self {
        Self {
            span: info_span!("process", request_id = %request_id),
            max_upload_bytes,
        }
    }
}

/// Label `files` with `spec` and deliver them to `destination`.
pub fn process_batch(
    files: Vec<UploadedFile>,
    spec: &LabelSpec,
    destination: &Destination,
    ctx: &RequestContext,
) -> Result<OutputMode> {
    let _guard = ctx.span.enter();

    let files: Vec<UploadedFile> = files
        .into_iter()
        .filter(|f| !f.filename.is_empty())
        .collect();
    if files.is_empty() {
        return Err(Error::Validation("未选择文件".to_string()));
    }

    let total: usize = files.iter().map(|f| f.bytes.len()).sum();
    if total > ctx.max_upload_bytes {
        return Err(Error::Validation(format!(
            "上传文件过大: {total} 字节 (上限 {} 字节)",
            ctx.max_upload_bytes
        )));
    }

    info!(
        "Processing {} file(s): position {}, text {:?}, font size {}",
        files.len(),
        spec.anchor,
        spec.text,
        spec.font_size
    );

    match destination {
        Destination::Download => label_for_download(files, spec),
        Destination::Directory(dir) => {
            if !dir.is_dir() {
                return Err(Error::Validation(format!(
                    "错误: 指定的目录不存在: {}",
                    dir.display()
                )));
            }
            Ok(OutputMode::DirectoryReport(label_into_directory(
                files, spec, dir,
            )))
        }
    }
}

fn label_for_download(files: Vec<UploadedFile>, spec: &LabelSpec) -> Result<OutputMode> {
    let mut processed = Vec::with_capacity(files.len());

    for file in files {
        if !allowed_file(&file.filename) {
            info!("Skipping non-PDF upload {}", file.filename);
            continue;
        }

        match apply_label(&file.bytes, spec) {
            Ok(bytes) => {
                info!("Labeled {}", file.filename);
                processed.push((processed_name(&file.filename), bytes));
            }
            Err(e) => {
                error!("处理失败 {}: {}", file.filename, e);
                return Err(Error::FileFailed {
                    filename: file.filename,
                    source: Box::new(e),
                });
            }
        }
    }

    match processed.len() {
        0 => Err(Error::Validation("未选择有效的PDF文件".to_string())),
        1 => {
            let (filename, bytes) = processed.remove(0);
            info!("Returning single file {}", filename);
            Ok(OutputMode::Single { filename, bytes })
        }
        n => {
            info!("Returning archive with {} files", n);
            Ok(OutputMode::Archive { entries: processed })
        }
    }
}

fn label_into_directory(files: Vec<UploadedFile>, spec: &LabelSpec, dir: &Path) -> Vec<StatusLine> {
    files
        .into_iter()
        .map(|file| {
            if !allowed_file(&file.filename) {
                warn!("Skipping non-PDF upload {}", file.filename);
                return StatusLine::Skipped(file.filename);
            }

            let path = dir.join(processed_name(&file.filename));
            match apply_label(&file.bytes, spec).and_then(|bytes| write_new(&path, &bytes)) {
                Ok(()) => {
                    info!("Saved {}", path.display());
                    StatusLine::Saved(path)
                }
                Err(e) => {
                    error!("处理失败 {}: {}", file.filename, e);
                    StatusLine::Failed {
                        filename: file.filename,
                        reason: e.to_string(),
                    }
                }
            }
        })
        .collect()
}

/// Write `bytes` to `path`, refusing to replace an existing file.
fn write_new(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}
