//! PDF Labeler CLI - Command line tool for stamping labels onto PDF documents.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf_labeler_core::{
    ARCHIVE_FILENAME, Anchor, AppConfig, Destination, FONT_SIZE_RANGE, LabelSpec, OFFSET_RANGE,
    OutputMode, RequestContext, StatusLine, UploadedFile, process_batch, render_report,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

fn parse_anchor(value: &str) -> Result<Anchor, String> {
    Anchor::ALL
        .into_iter()
        .find(|anchor| anchor.as_str() == value)
        .ok_or_else(|| {
            let names: Vec<&str> = Anchor::ALL.iter().map(|a| a.as_str()).collect();
            format!("expected one of: {}", names.join(", "))
        })
}

fn parse_font_size(value: &str) -> Result<u32, String> {
    let size: u32 = value.parse().map_err(|e| format!("{e}"))?;
    if FONT_SIZE_RANGE.contains(&size) {
        Ok(size)
    } else {
        Err(format!(
            "must be between {} and {}",
            FONT_SIZE_RANGE.start(),
            FONT_SIZE_RANGE.end()
        ))
    }
}

fn parse_offset(value: &str) -> Result<i32, String> {
    let offset: i32 = value.parse().map_err(|e| format!("{e}"))?;
    if OFFSET_RANGE.contains(&offset) {
        Ok(offset)
    } else {
        Err(format!(
            "must be between {} and {}",
            OFFSET_RANGE.start(),
            OFFSET_RANGE.end()
        ))
    }
}

#[derive(Parser, Debug)]
#[command(name = "pdf-label")]
#[command(author, version, about = "Stamp a text label onto every page of PDF documents", long_about = None)]
struct Args {
    /// Input PDF files
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Label text (default from config: "Made in China")
    #[arg(long)]
    text: Option<String>,

    /// Label position
    #[arg(long, value_parser = parse_anchor)]
    position: Option<Anchor>,

    /// Font size in points
    #[arg(long, value_parser = parse_font_size)]
    font_size: Option<u32>,

    /// Label color as #RRGGBB
    #[arg(long)]
    color: Option<String>,

    /// Horizontal offset in points
    #[arg(long, value_parser = parse_offset, allow_hyphen_values = true)]
    x_offset: Option<i32>,

    /// Vertical offset in points
    #[arg(long, value_parser = parse_offset, allow_hyphen_values = true)]
    y_offset: Option<i32>,

    /// Output file: the labeled PDF for one input, a ZIP archive for several
    #[arg(short, long, conflicts_with = "output_dir")]
    output: Option<PathBuf>,

    /// Write each labeled PDF into this existing directory instead
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    /// Config defaults overridden by whatever was given on the command line.
    fn label_spec(&self, config: &AppConfig) -> LabelSpec {
        let mut spec = LabelSpec::from_defaults(&config.label);
        if let Some(text) = &self.text {
            spec.text.clone_from(text);
        }
        if let Some(anchor) = self.position {
            spec.anchor = anchor;
        }
        if let Some(size) = self.font_size {
            spec.font_size = size;
        }
        if let Some(color) = &self.color {
            spec.color.clone_from(color);
        }
        if let Some(x) = self.x_offset {
            spec.x_offset = x;
        }
        if let Some(y) = self.y_offset {
            spec.y_offset = y;
        }
        spec
    }
}

fn read_inputs(paths: &[PathBuf]) -> Result<Vec<UploadedFile>> {
    paths
        .iter()
        .map(|path| {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read input: {}", path.display()))?;
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(UploadedFile::new(filename, bytes))
        })
        .collect()
}

/// Default location of a single labeled PDF: next to its input.
fn single_output_path(input: &Path, filename: &str) -> PathBuf {
    input.with_file_name(filename)
}

fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Setup logging
    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    // Load or create config
    let config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };

    let spec = args.label_spec(&config);
    let files = read_inputs(&args.inputs)?;
    let total: usize = files.iter().map(|f| f.bytes.len()).sum();

    let destination = args
        .output_dir
        .clone()
        .map_or(Destination::Download, Destination::Directory);
    // The command line has no upload cap
    let ctx = RequestContext::new("cli", total.max(config.max_upload_bytes));

    let spinner = ProgressBar::new_spinner();
    // Template is hardcoded and valid, unwrap is safe
    #[allow(clippy::unwrap_used)]
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}").unwrap());
    spinner.set_message(format!("Labeling {} file(s)", files.len()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let output = process_batch(files, &spec, &destination, &ctx);
    spinner.finish_and_clear();
    let output = output.context("Labeling failed")?;

    match output {
        OutputMode::Single { ref filename, ref bytes } => {
            let path = args.output.clone().unwrap_or_else(|| {
                let first_pdf = args
                    .inputs
                    .iter()
                    .find(|p| pdf_labeler_core::allowed_file(&p.to_string_lossy()))
                    .map_or_else(|| PathBuf::from("."), Clone::clone);
                single_output_path(&first_pdf, filename)
            });
            std::fs::write(&path, bytes)
                .with_context(|| format!("Failed to write output: {}", path.display()))?;
            info!("Wrote {}", path.display());

            // CLI output is intentional
            #[allow(clippy::print_stdout)]
            {
                println!("Labeled PDF saved to: {}", path.display());
            }
        }
        OutputMode::Archive { ref entries } => {
            let path = args
                .output
                .clone()
                .unwrap_or_else(|| PathBuf::from(ARCHIVE_FILENAME));
            let zip = output
                .archive_bytes()
                .transpose()
                .context("Failed to build archive")?
                .unwrap_or_default();
            std::fs::write(&path, zip)
                .with_context(|| format!("Failed to write output: {}", path.display()))?;
            info!("Wrote {} with {} entries", path.display(), entries.len());

            #[allow(clippy::print_stdout)]
            {
                println!("{} labeled PDFs saved to: {}", entries.len(), path.display());
            }
        }
        OutputMode::DirectoryReport(ref lines) => {
            #[allow(clippy::print_stdout)]
            {
                println!("{}", render_report(lines));
            }

            let failed = lines
                .iter()
                .filter(|line| matches!(line, StatusLine::Failed { .. }))
                .count();
            if failed > 0 {
                anyhow::bail!("{failed} file(s) failed");
            }
        }
    }

    Ok(())
}
