//! Process route - label uploaded PDFs and hand them back.

use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::Response,
};
use axum_extra::extract::{Multipart, multipart::MultipartError};
use bytes::Bytes;
use pdf_labeler_core::{
    ARCHIVE_FILENAME, Anchor, Destination, FONT_SIZE_RANGE, LabelSpec, OFFSET_RANGE, OutputMode,
    RequestContext, UploadedFile, build_zip, process_batch, render_report,
};
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::helpers::{CoreResultExt, ResultExt, RouteResult};
use crate::state::AppState;

/// Problems with the submitted form itself, before any file is labeled.
#[derive(Debug, Error)]
enum FormError {
    #[error("参数无效 {field}: {value}")]
    NotANumber { field: &'static str, value: String },

    #[error("参数超出范围 {field}: {value} (允许 {min}..={max})")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("上传文件过大 (上限 {limit} 字节)")]
    TooLarge { limit: usize },

    #[error("{0}")]
    Multipart(#[from] MultipartError),
}

impl FormError {
    fn reject(self) -> (StatusCode, String) {
        let status = match &self {
            Self::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Multipart(e) => e.status(),
            Self::NotANumber { .. } | Self::OutOfRange { .. } => StatusCode::BAD_REQUEST,
        };
        (status, self.to_string())
    }
}

/// Everything `/process` needs, pulled out of the multipart body.
struct ProcessForm {
    files: Vec<UploadedFile>,
    spec: LabelSpec,
    output_dir: Option<PathBuf>,
}

/// Parse an optional integer field and check it against `range`.
///
/// A blank value counts as absent.
fn parse_in_range<T>(
    field: &'static str,
    value: &str,
    range: &RangeInclusive<T>,
) -> Result<Option<T>, FormError>
where
    T: FromStr + PartialOrd + Copy + Into<i64>,
{
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }

    let parsed: T = value.parse().map_err(|_| FormError::NotANumber {
        field,
        value: value.to_string(),
    })?;

    if range.contains(&parsed) {
        Ok(Some(parsed))
    } else {
        Err(FormError::OutOfRange {
            field,
            value: parsed.into(),
            min: (*range.start()).into(),
            max: (*range.end()).into(),
        })
    }
}

async fn read_file(field: axum_extra::extract::multipart::Field) -> Result<Bytes, FormError> {
    Ok(field.bytes().await?)
}

/// Collect the form, starting from `spec` for anything the client left out.
async fn read_form(
    mut multipart: Multipart,
    spec: LabelSpec,
    limit: usize,
) -> Result<ProcessForm, FormError> {
    let mut form = ProcessForm {
        files: Vec::new(),
        spec,
        output_dir: None,
    };
    let mut total = 0_usize;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "pdfFile" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let data = read_file(field).await?;
                total += data.len();
                if total > limit {
                    return Err(FormError::TooLarge { limit });
                }
                if filename.is_empty() {
                    debug!("Ignoring file part without a name");
                } else {
                    form.files.push(UploadedFile::new(filename, data.to_vec()));
                }
            }
            "labelText" => form.spec.text = field.text().await?,
            "position" => form.spec.anchor = Anchor::from_name(field.text().await?.trim()),
            "fontSize" => {
                if let Some(size) = parse_in_range("fontSize", &field.text().await?, &FONT_SIZE_RANGE)? {
                    form.spec.font_size = size;
                }
            }
            "fontColor" => {
                let color = field.text().await?;
                if !color.trim().is_empty() {
                    form.spec.color = color.trim().to_string();
                }
            }
            "xOffset" => {
                if let Some(offset) = parse_in_range("xOffset", &field.text().await?, &OFFSET_RANGE)? {
                    form.spec.x_offset = offset;
                }
            }
            "yOffset" => {
                if let Some(offset) = parse_in_range("yOffset", &field.text().await?, &OFFSET_RANGE)? {
                    form.spec.y_offset = offset;
                }
            }
            "outputDir" => {
                let dir = field.text().await?;
                let dir = dir.trim();
                form.output_dir = (!dir.is_empty()).then(|| PathBuf::from(dir));
            }
            other => debug!("Ignoring unknown form field {other:?}"),
        }
    }

    Ok(form)
}

fn attachment(content_type: &str, filename: &str, body: Vec<u8>) -> RouteResult<Response> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(Body::from(body))
        .or_internal_error()
}

/// Serialize one [`OutputMode`] arm.
fn respond(output: OutputMode) -> RouteResult<Response> {
    match output {
        OutputMode::Single { filename, bytes } => attachment("application/pdf", &filename, bytes),
        OutputMode::Archive { entries } => {
            let zip = build_zip(&entries).or_status()?;
            attachment("application/zip", ARCHIVE_FILENAME, zip)
        }
        OutputMode::DirectoryReport(lines) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(Body::from(render_report(&lines)))
            .or_internal_error(),
    }
}

/// Label every uploaded PDF.
///
/// Returns the labeled PDF, a ZIP of all of them, or, when `outputDir` is
/// given, a plain-text report of what was written there.
pub async fn process_files(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> RouteResult<Response> {
    let limit = state.config.max_upload_bytes;
    let form = read_form(multipart, state.default_spec(), limit)
        .await
        .map_err(FormError::reject)?;

    let request_id = Uuid::new_v4().to_string();
    let ctx = RequestContext::new(&request_id, limit);
    info!(
        parent: &ctx.span,
        "Received {} file(s), output {}",
        form.files.len(),
        form.output_dir
            .as_ref()
            .map_or_else(|| "download".to_string(), |dir| dir.display().to_string())
    );

    let ProcessForm {
        files,
        spec,
        output_dir,
    } = form;
    let destination = output_dir.map_or(Destination::Download, Destination::Directory);

    // Labeling is CPU-bound and directory mode writes files
    let output = tokio::task::spawn_blocking(move || process_batch(files, &spec, &destination, &ctx))
        .await
        .map_err(|e| {
            error!("Labeling task panicked: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "处理失败: 内部错误".to_string(),
            )
        })?
        .or_status()?;

    respond(output)
}
